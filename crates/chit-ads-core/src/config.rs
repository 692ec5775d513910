//! Engine timing configuration.
//!
//! Every field has a default, so an empty config section (or none at all)
//! yields the stock cadence: a 60 s scheduler tick, 15 min per-ad and global
//! spacing, and a 5 s mandatory countdown.

use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Timing knobs for [`AdEngine`](crate::engine::AdEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Period of the scheduler evaluation tick.
  pub tick_interval_secs:   u64,
  /// Minimum spacing between two showings of the same ad.
  pub per_ad_interval_secs: u64,
  /// Minimum spacing between any two ad showings.
  pub global_cooldown_secs: u64,
  /// Length of the mandatory viewing window.
  pub countdown_secs:       u32,
  /// Duration of the visual progress timeline.
  pub progress_ms:          u64,
  /// Period of the carousel auto-advance.
  pub carousel_period_secs: u64,
  /// Period of the single-advertiser repeating timer.
  pub fixed_interval_secs:  u64,
  /// Delay of the single-advertiser first-ad one-shot.
  pub first_ad_delay_secs:  u64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      tick_interval_secs:   60,
      per_ad_interval_secs: 15 * 60,
      global_cooldown_secs: 15 * 60,
      countdown_secs:       5,
      progress_ms:          5_000,
      carousel_period_secs: 3,
      fixed_interval_secs:  15 * 60,
      first_ad_delay_secs:  5,
    }
  }
}

/// Longest period any timer may have: one year.
pub const MAX_PERIOD_SECS: u64 = 365 * 24 * 60 * 60;

impl EngineConfig {
  /// Reject zero periods and periods longer than [`MAX_PERIOD_SECS`].
  pub fn validate(&self) -> Result<()> {
    let periods = [
      ("tick_interval_secs", self.tick_interval_secs, MAX_PERIOD_SECS),
      ("per_ad_interval_secs", self.per_ad_interval_secs, MAX_PERIOD_SECS),
      ("global_cooldown_secs", self.global_cooldown_secs, MAX_PERIOD_SECS),
      ("countdown_secs", u64::from(self.countdown_secs), MAX_PERIOD_SECS),
      ("progress_ms", self.progress_ms, MAX_PERIOD_SECS * 1_000),
      ("carousel_period_secs", self.carousel_period_secs, MAX_PERIOD_SECS),
      ("fixed_interval_secs", self.fixed_interval_secs, MAX_PERIOD_SECS),
      ("first_ad_delay_secs", self.first_ad_delay_secs, MAX_PERIOD_SECS),
    ];
    for (name, value, max) in periods {
      // Spacing intervals may be zero; timer periods may not.
      let may_be_zero = matches!(name, "per_ad_interval_secs" | "global_cooldown_secs");
      if value == 0 && !may_be_zero {
        return Err(Error::InvalidConfig(format!("{name} must be non-zero")));
      }
      if value > max {
        return Err(Error::InvalidConfig(format!("{name} must be at most {max}")));
      }
    }
    Ok(())
  }

  pub fn tick_interval(&self) -> Duration {
    Duration::from_secs(self.tick_interval_secs)
  }

  pub fn per_ad_interval(&self) -> TimeDelta {
    TimeDelta::seconds(self.per_ad_interval_secs as i64)
  }

  pub fn global_cooldown(&self) -> TimeDelta {
    TimeDelta::seconds(self.global_cooldown_secs as i64)
  }

  pub fn progress_span(&self) -> TimeDelta {
    TimeDelta::milliseconds(self.progress_ms as i64)
  }

  pub fn carousel_period(&self) -> Duration {
    Duration::from_secs(self.carousel_period_secs)
  }

  pub fn fixed_interval(&self) -> Duration {
    Duration::from_secs(self.fixed_interval_secs)
  }

  pub fn first_ad_delay(&self) -> Duration {
    Duration::from_secs(self.first_ad_delay_secs)
  }
}
