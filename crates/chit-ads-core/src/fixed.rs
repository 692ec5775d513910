//! Fixed-interval scheduling for a single-advertiser context.
//!
//! Used where at most one campaign is relevant, e.g. a merchant viewing their
//! own dashboard. There is no ledger, no cooldown and no candidate ranking: a
//! repeating timer fires every interval, plus a single early firing shortly
//! after activation. Every firing picks one of the brand ads through a
//! [`BrandPicker`].

use std::time::Duration;

use crate::{
  ad::Advertisement,
  config::EngineConfig,
  picker::BrandPicker,
  timer::{TimerBook, TimerDomain, TimerToken},
};

pub struct FixedIntervalScheduler {
  interval:       Duration,
  first_delay:    Duration,
  choices:        Vec<Advertisement>,
  picker:         Box<dyn BrandPicker>,
  timers:         TimerBook,
  activated:      bool,
  /// Set once the first-ad timer has been armed; never reset.
  one_shot_latch: bool,
}

impl std::fmt::Debug for FixedIntervalScheduler {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FixedIntervalScheduler")
      .field("interval", &self.interval)
      .field("first_delay", &self.first_delay)
      .field("choices", &self.choices.len())
      .field("activated", &self.activated)
      .field("one_shot_latch", &self.one_shot_latch)
      .finish_non_exhaustive()
  }
}

impl FixedIntervalScheduler {
  pub fn new(
    config: &EngineConfig,
    choices: Vec<Advertisement>,
    picker: Box<dyn BrandPicker>,
  ) -> Self {
    Self {
      interval: config.fixed_interval(),
      first_delay: config.first_ad_delay(),
      choices,
      picker,
      timers: TimerBook::new(),
      activated: false,
      one_shot_latch: false,
    }
  }

  /// The triggering context became active. Arms the repeating timer and, the
  /// first time only, the early one-shot.
  pub fn activate(&mut self) {
    self.activated = true;
    self.timers.arm(TimerDomain::FixedRepeat, self.interval, true);
    if !self.one_shot_latch {
      self.one_shot_latch = true;
      self.timers.arm(TimerDomain::FixedOneShot, self.first_delay, false);
    }
  }

  /// Clear every pending timer.
  pub fn pause(&mut self) { self.timers.clear(); }

  /// Re-arm the repeating timer. A one-shot cleared by [`pause`](Self::pause)
  /// stays cleared.
  pub fn resume(&mut self) {
    if self.activated && !self.timers.is_armed(TimerDomain::FixedRepeat) {
      self.timers.arm(TimerDomain::FixedRepeat, self.interval, true);
    }
  }

  pub fn deactivate(&mut self) {
    self.activated = false;
    self.timers.clear();
  }

  /// Apply a timer firing; returns the ad to show, if the token is live and
  /// there is anything to choose from.
  pub fn on_timer(&mut self, token: TimerToken) -> Option<Advertisement> {
    if !self.timers.is_current(token) {
      return None;
    }
    match token.domain {
      TimerDomain::FixedOneShot => {
        self.timers.cancel(TimerDomain::FixedOneShot);
      }
      TimerDomain::FixedRepeat => {}
      _ => return None,
    }
    self.pick()
  }

  fn pick(&mut self) -> Option<Advertisement> {
    if self.choices.is_empty() {
      return None;
    }
    let index = self.picker.pick(self.choices.len()).min(self.choices.len() - 1);
    self.choices.get(index).cloned()
  }

  pub fn is_activated(&self) -> bool { self.activated }

  pub fn timers(&self) -> &TimerBook { &self.timers }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ad::{BRAND_BANNER_ID, BRAND_FULL_ID, brand_fallbacks};

  struct Scripted(Vec<usize>);

  impl BrandPicker for Scripted {
    fn pick(&mut self, _count: usize) -> usize {
      if self.0.is_empty() { 0 } else { self.0.remove(0) }
    }
  }

  fn scheduler(script: Vec<usize>) -> FixedIntervalScheduler {
    FixedIntervalScheduler::new(
      &EngineConfig::default(),
      brand_fallbacks(),
      Box::new(Scripted(script)),
    )
  }

  fn token(s: &FixedIntervalScheduler, domain: TimerDomain) -> Option<TimerToken> {
    s.timers()
      .specs()
      .find(|spec| spec.token.domain == domain)
      .map(|spec| spec.token)
  }

  #[test]
  fn activation_arms_repeat_and_one_shot() {
    let mut s = scheduler(vec![]);
    s.activate();
    let specs: Vec<_> = s.timers().specs().copied().collect();
    assert_eq!(specs.len(), 2);
    assert!(specs.iter().any(|t| t.token.domain == TimerDomain::FixedRepeat
      && t.period == Duration::from_secs(900)
      && t.repeating));
    assert!(specs.iter().any(|t| t.token.domain == TimerDomain::FixedOneShot
      && t.period == Duration::from_secs(5)
      && !t.repeating));
  }

  #[test]
  fn one_shot_fires_once() {
    let mut s = scheduler(vec![1, 0]);
    s.activate();
    let one_shot = token(&s, TimerDomain::FixedOneShot).unwrap();

    let ad = s.on_timer(one_shot).unwrap();
    assert_eq!(ad.id.as_str(), BRAND_BANNER_ID);
    assert_eq!(s.on_timer(one_shot), None);

    // Re-activating does not re-arm the latch.
    s.activate();
    assert!(token(&s, TimerDomain::FixedOneShot).is_none());

    let repeat = token(&s, TimerDomain::FixedRepeat).unwrap();
    assert_eq!(s.on_timer(repeat).unwrap().id.as_str(), BRAND_FULL_ID);
  }

  #[test]
  fn pause_clears_everything_and_resume_skips_one_shot() {
    let mut s = scheduler(vec![]);
    s.activate();
    let stale_repeat = token(&s, TimerDomain::FixedRepeat).unwrap();

    s.pause();
    assert_eq!(s.timers().specs().count(), 0);

    s.resume();
    assert!(token(&s, TimerDomain::FixedOneShot).is_none());
    let repeat = token(&s, TimerDomain::FixedRepeat).unwrap();
    assert_ne!(repeat, stale_repeat);
    assert_eq!(s.on_timer(stale_repeat), None);
  }

  #[test]
  fn resume_before_activation_is_noop() {
    let mut s = scheduler(vec![]);
    s.resume();
    assert_eq!(s.timers().specs().count(), 0);
  }

  #[test]
  fn out_of_range_pick_is_clamped() {
    let mut s = scheduler(vec![7]);
    s.activate();
    let one_shot = token(&s, TimerDomain::FixedOneShot).unwrap();
    assert_eq!(s.on_timer(one_shot).unwrap().id.as_str(), BRAND_BANNER_ID);
  }
}
