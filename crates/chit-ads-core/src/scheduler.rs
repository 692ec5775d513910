//! The rotation scheduler: which ad, if any, to show on a tick.
//!
//! Selection rules, in order:
//!
//! 1. Nothing is picked while an ad occupies the surface or the host has
//!    paused the engine.
//! 2. Nothing is picked inside the global cooldown window.
//! 3. Only ads whose own interval has elapsed are candidates.
//! 4. Merchant ads beat brand ads; within a class the least recently shown
//!    wins, and remaining ties go to the ad listed first.

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::{
  ad::{AdKind, Advertisement},
  config::EngineConfig,
  cooldown::GlobalCooldownGuard,
  ledger::FrequencyLedger,
};

/// Who currently holds the display surface, as seen by a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
  Free,
  /// An ad is being presented.
  Occupied,
  /// The host suppressed new selections.
  Paused,
}

/// Result of one scheduler evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "ad", rename_all = "snake_case")]
pub enum TickOutcome {
  Selected(Advertisement),
  /// An ad is already on screen; never preempted.
  Busy,
  Paused,
  /// Inside the global cooldown window.
  CoolingDown,
  /// No candidate has passed its per-ad interval.
  NothingDue,
}

#[derive(Debug)]
pub struct Scheduler {
  ledger:          FrequencyLedger,
  cooldown:        GlobalCooldownGuard,
  candidates:      Vec<Advertisement>,
  per_ad_interval: TimeDelta,
  global_cooldown: TimeDelta,
}

impl Scheduler {
  pub fn new(config: &EngineConfig) -> Self {
    Self {
      ledger:          FrequencyLedger::new(),
      cooldown:        GlobalCooldownGuard::new(),
      candidates:      Vec::new(),
      per_ad_interval: config.per_ad_interval(),
      global_cooldown: config.global_cooldown(),
    }
  }

  /// Replace the candidate list. Ids seen for the first time are seeded with
  /// `now`; ids already in the ledger keep their history. Duplicate ids keep
  /// their first occurrence.
  ///
  /// Returns the number of newly seeded ids.
  pub fn set_candidates(
    &mut self,
    ads: Vec<Advertisement>,
    now: DateTime<Utc>,
  ) -> usize {
    let mut seen = HashSet::new();
    let mut seeded = 0;
    self.candidates.clear();
    for ad in ads {
      if !seen.insert(ad.id.clone()) {
        tracing::warn!(ad_id = %ad.id, "duplicate ad id in candidate list; ignoring");
        continue;
      }
      if self.ledger.observe(&ad.id, now) {
        seeded += 1;
      }
      self.candidates.push(ad);
    }
    seeded
  }

  pub fn candidates(&self) -> &[Advertisement] { &self.candidates }

  pub fn ledger(&self) -> &FrequencyLedger { &self.ledger }

  pub fn ledger_mut(&mut self) -> &mut FrequencyLedger { &mut self.ledger }

  pub fn cooldown(&self) -> &GlobalCooldownGuard { &self.cooldown }

  /// Due candidates in priority order.
  pub fn ranked_candidates(&self, now: DateTime<Utc>) -> Vec<&Advertisement> {
    let mut due: Vec<&Advertisement> = self
      .candidates
      .iter()
      .filter(|ad| self.ledger.is_due(&ad.id, now, self.per_ad_interval))
      .collect();
    // Stable: equal keys keep list order.
    due.sort_by_key(|ad| (ad.kind() != AdKind::Merchant, self.ledger.last_shown(&ad.id)));
    due
  }

  /// Evaluate one tick. On selection the ledger and the cooldown guard are
  /// both stamped with `now`.
  pub fn tick(&mut self, now: DateTime<Utc>, surface: Surface) -> TickOutcome {
    match surface {
      Surface::Occupied => return TickOutcome::Busy,
      Surface::Paused => return TickOutcome::Paused,
      Surface::Free => {}
    }
    if !self.cooldown.can_show_now(now, self.global_cooldown) {
      return TickOutcome::CoolingDown;
    }
    let Some(selected) = self.ranked_candidates(now).first().map(|ad| (*ad).clone())
    else {
      return TickOutcome::NothingDue;
    };
    self.ledger.record_shown(&selected.id, now);
    self.cooldown.mark_shown(now);
    TickOutcome::Selected(selected)
  }
}
