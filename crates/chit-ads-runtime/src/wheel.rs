//! Real deadlines for the timers an engine has armed.

use std::collections::BTreeMap;

use chit_ads_core::timer::{TimerDomain, TimerSpec, TimerToken};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Running {
  spec:     TimerSpec,
  deadline: Instant,
}

/// At most one running timer per domain, mirroring the engine's books.
#[derive(Debug, Default)]
pub(crate) struct TimerWheel {
  running: BTreeMap<TimerDomain, Running>,
}

impl TimerWheel {
  /// Match the running set to `armed`. A timer whose token is unchanged keeps
  /// its deadline; a new or re-armed one starts counting from `now`; one no
  /// longer armed is dropped.
  pub fn reconcile(&mut self, armed: &[TimerSpec], now: Instant) {
    self
      .running
      .retain(|_, r| armed.iter().any(|spec| spec.token == r.spec.token));
    for spec in armed {
      let fresh = self
        .running
        .get(&spec.token.domain)
        .is_none_or(|r| r.spec.token != spec.token);
      if fresh {
        self.running.insert(spec.token.domain, Running {
          spec:     *spec,
          deadline: now + spec.period,
        });
      }
    }
  }

  pub fn next_deadline(&self) -> Option<Instant> {
    self.running.values().map(|r| r.deadline).min()
  }

  /// Pop every firing due at or before `now`, earliest first. Repeating
  /// timers are pushed one period forward; one-shots are removed.
  pub fn take_due(&mut self, now: Instant) -> Vec<(TimerToken, Instant)> {
    let mut due: Vec<(TimerToken, Instant)> = Vec::new();
    let mut spent = Vec::new();
    for (domain, r) in self.running.iter_mut() {
      while r.deadline <= now {
        due.push((r.spec.token, r.deadline));
        if !r.spec.repeating {
          spent.push(*domain);
          break;
        }
        r.deadline += r.spec.period;
      }
    }
    for domain in spent {
      self.running.remove(&domain);
    }
    due.sort_by_key(|(token, at)| (*at, token.domain));
    due
  }

  #[cfg(test)]
  pub fn len(&self) -> usize { self.running.len() }
}
