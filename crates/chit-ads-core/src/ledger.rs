//! Per-ad frequency capping.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

use crate::ad::AdId;

/// Last-shown timestamps keyed by ad id.
///
/// An id with no entry reads as shown at the Unix epoch, i.e. "never".
#[derive(Debug, Clone, Default)]
pub struct FrequencyLedger {
  last_shown: HashMap<AdId, DateTime<Utc>>,
}

impl FrequencyLedger {
  pub fn new() -> Self { Self::default() }

  /// Record that `id` was shown at `now`.
  pub fn record_shown(&mut self, id: &AdId, now: DateTime<Utc>) {
    self.last_shown.insert(id.clone(), now);
  }

  /// When `id` was last shown, or the epoch if never.
  pub fn last_shown(&self, id: &AdId) -> DateTime<Utc> {
    self
      .last_shown
      .get(id)
      .copied()
      .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
  }

  /// `true` once strictly more than `interval` has elapsed since `id` was
  /// last shown.
  pub fn is_due(&self, id: &AdId, now: DateTime<Utc>, interval: TimeDelta) -> bool {
    now - self.last_shown(id) > interval
  }

  /// Seed `id` with `now` unless it already has an entry. Returns whether an
  /// entry was created.
  ///
  /// Newly observed ads start their interval at observation time so a fresh
  /// candidate list does not come due all at once.
  pub fn observe(&mut self, id: &AdId, now: DateTime<Utc>) -> bool {
    if self.last_shown.contains_key(id) {
      return false;
    }
    self.last_shown.insert(id.clone(), now);
    true
  }

  pub fn contains(&self, id: &AdId) -> bool { self.last_shown.contains_key(id) }

  pub fn len(&self) -> usize { self.last_shown.len() }

  pub fn is_empty(&self) -> bool { self.last_shown.is_empty() }
}
