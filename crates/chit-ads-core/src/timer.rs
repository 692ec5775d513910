//! Timer bookkeeping shared by the scheduler and the presentation controller.
//!
//! The core never sleeps. Components record which timers *should* be running
//! in a [`TimerBook`]; a runtime reconciles its real timers against the book
//! and delivers each firing back with the [`TimerToken`] it was armed with.
//! Re-arming a domain bumps its generation, so firings from a superseded
//! instance fail [`TimerBook::is_current`] and are dropped.

use std::{collections::BTreeMap, time::Duration};

use serde::Serialize;

/// The independent timer domains of an engine.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TimerDomain {
  /// Rotation scheduler evaluation tick.
  SchedulerTick,
  /// Single-advertiser repeating timer.
  FixedRepeat,
  /// Single-advertiser first-ad timer.
  FixedOneShot,
  /// Mandatory-viewing countdown.
  Countdown,
  /// Carousel auto-advance.
  Carousel,
}

/// Identifies one armed instance of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimerToken {
  pub domain:     TimerDomain,
  pub generation: u64,
}

/// What a runtime needs to run one timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSpec {
  pub token:     TimerToken,
  /// Delay until the first firing, and between firings when repeating.
  pub period:    Duration,
  pub repeating: bool,
}

/// The set of timers a component currently wants running.
#[derive(Debug, Default)]
pub struct TimerBook {
  next_generation: u64,
  armed:           BTreeMap<TimerDomain, TimerSpec>,
}

impl TimerBook {
  pub fn new() -> Self { Self::default() }

  /// Arm `domain`, replacing any instance already armed there.
  pub fn arm(
    &mut self,
    domain: TimerDomain,
    period: Duration,
    repeating: bool,
  ) -> TimerToken {
    self.next_generation += 1;
    let token = TimerToken {
      domain,
      generation: self.next_generation,
    };
    self.armed.insert(domain, TimerSpec {
      token,
      period,
      repeating,
    });
    token
  }

  /// Disarm `domain`. Returns whether anything was armed.
  pub fn cancel(&mut self, domain: TimerDomain) -> bool {
    self.armed.remove(&domain).is_some()
  }

  pub fn clear(&mut self) { self.armed.clear(); }

  /// `true` if `token` is the live instance of its domain.
  pub fn is_current(&self, token: TimerToken) -> bool {
    self
      .armed
      .get(&token.domain)
      .is_some_and(|spec| spec.token == token)
  }

  pub fn is_armed(&self, domain: TimerDomain) -> bool {
    self.armed.contains_key(&domain)
  }

  pub fn specs(&self) -> impl Iterator<Item = &TimerSpec> + '_ {
    self.armed.values()
  }
}
