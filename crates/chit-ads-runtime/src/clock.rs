//! Wall-clock readings derived from tokio's monotonic clock.
//!
//! The engine reasons in `DateTime<Utc>`, but timers run on
//! [`tokio::time::Instant`]. Anchoring one to the other at start-up keeps the
//! two consistent, and lets tests move both with a paused tokio clock.

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct Clock {
  origin_wall:    DateTime<Utc>,
  origin_instant: Instant,
}

impl Clock {
  pub fn new() -> Self { Self::starting_at(Utc::now()) }

  /// A clock reading `wall` right now.
  pub fn starting_at(wall: DateTime<Utc>) -> Self {
    Self {
      origin_wall:    wall,
      origin_instant: Instant::now(),
    }
  }

  pub fn now(&self) -> DateTime<Utc> { self.wall_at(Instant::now()) }

  /// The wall time corresponding to `instant`.
  pub fn wall_at(&self, instant: Instant) -> DateTime<Utc> {
    let elapsed = instant.saturating_duration_since(self.origin_instant);
    let elapsed = TimeDelta::from_std(elapsed).unwrap_or_else(|_| TimeDelta::zero());
    self.origin_wall + elapsed
  }
}

impl Default for Clock {
  fn default() -> Self { Self::new() }
}
