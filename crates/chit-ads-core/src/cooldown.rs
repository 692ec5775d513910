//! Cross-ad throttle: no two showings of any ads closer than the cooldown.

use chrono::{DateTime, TimeDelta, Utc};

/// Tracks the most recent showing of any ad.
///
/// Lives only as long as the owning engine; never persisted.
#[derive(Debug, Clone)]
pub struct GlobalCooldownGuard {
  last_global_shown_at: DateTime<Utc>,
}

impl Default for GlobalCooldownGuard {
  fn default() -> Self {
    Self {
      last_global_shown_at: DateTime::<Utc>::UNIX_EPOCH,
    }
  }
}

impl GlobalCooldownGuard {
  pub fn new() -> Self { Self::default() }

  pub fn can_show_now(&self, now: DateTime<Utc>, cooldown: TimeDelta) -> bool {
    now - self.last_global_shown_at >= cooldown
  }

  /// Record a showing at `now`. The stored instant never moves backwards.
  pub fn mark_shown(&mut self, now: DateTime<Utc>) {
    self.last_global_shown_at = self.last_global_shown_at.max(now);
  }

  pub fn last_shown_at(&self) -> DateTime<Utc> { self.last_global_shown_at }
}
