//! [`AdEngine`]: the per-screen context object tying everything together.
//!
//! A host creates one engine when an ad-bearing dashboard mounts and drops it
//! when the dashboard unmounts. All scheduling state (ledger, cooldown, the
//! one-shot latch) lives here and nowhere else.
//!
//! The engine is driven entirely from outside: the host (or
//! `chit-ads-runtime`) runs the timers listed by [`AdEngine::armed_timers`]
//! and reports each firing through [`AdEngine::on_timer`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Result,
  ad::{AdId, Advertisement, brand_fallbacks},
  config::EngineConfig,
  fixed::FixedIntervalScheduler,
  picker::BrandPicker,
  presentation::{
    ControllerTick, DismissOutcome, DismissRequest, LinkOpener, Phase,
    PresentationController, TapOutcome,
  },
  scheduler::{Scheduler, Surface, TickOutcome},
  timer::{TimerBook, TimerDomain, TimerSpec, TimerToken},
};

// ─── Events ──────────────────────────────────────────────────────────────────

/// Why an ad went on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowTrigger {
  Rotation,
  FirstAd,
  FixedInterval,
}

/// Why a scheduler tick picked nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
  Busy,
  Paused,
  CoolingDown,
  NothingDue,
}

/// Observable state changes, in the order they happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
  Shown {
    ad:      Advertisement,
    phase:   Phase,
    trigger: ShowTrigger,
  },
  TickSkipped {
    reason: SkipReason,
  },
  Countdown {
    remaining_secs: u32,
  },
  Dismissible {
    ad_id: AdId,
  },
  CarouselAdvanced {
    index: usize,
  },
  Dismissed {
    ad_id:   AdId,
    request: DismissRequest,
  },
  DismissRefused {
    remaining_secs: u32,
  },
  LinkOpened {
    url: String,
  },
  LinkFailed {
    url: String,
  },
  Paused,
  Resumed,
}

impl EngineEvent {
  /// Render as a single JSON line.
  pub fn to_json(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }
}

/// Point-in-time view of the display surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
  pub session_id:     Uuid,
  pub phase:          Phase,
  pub ad_id:          Option<AdId>,
  pub image:          Option<String>,
  pub carousel_index: usize,
  pub remaining_secs: u32,
  pub dismissible:    bool,
  pub progress:       Option<f64>,
  pub paused:         bool,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Mode {
  Rotation(Scheduler),
  FixedInterval(FixedIntervalScheduler),
}

#[derive(Debug)]
pub struct AdEngine {
  session_id:  Uuid,
  config:      EngineConfig,
  mode:        Mode,
  controller:  PresentationController,
  tick_timers: TimerBook,
  started:     bool,
  paused:      bool,
}

impl AdEngine {
  /// Engine for the multi-ad subscriber feed: ranked rotation with per-ad
  /// and global spacing.
  pub fn rotation(config: EngineConfig) -> Result<Self> {
    config.validate()?;
    let mode = Mode::Rotation(Scheduler::new(&config));
    Ok(Self::with_mode(config, mode))
  }

  /// Engine for a single-advertiser context: brand ads on a fixed interval,
  /// chosen by `picker`.
  pub fn fixed_interval(
    config: EngineConfig,
    picker: Box<dyn BrandPicker>,
  ) -> Result<Self> {
    config.validate()?;
    let mode = Mode::FixedInterval(FixedIntervalScheduler::new(
      &config,
      brand_fallbacks(),
      picker,
    ));
    Ok(Self::with_mode(config, mode))
  }

  fn with_mode(config: EngineConfig, mode: Mode) -> Self {
    Self {
      session_id: Uuid::new_v4(),
      controller: PresentationController::new(&config),
      config,
      mode,
      tick_timers: TimerBook::new(),
      started: false,
      paused: false,
    }
  }

  pub fn session_id(&self) -> Uuid { self.session_id }

  pub fn config(&self) -> &EngineConfig { &self.config }

  pub fn is_paused(&self) -> bool { self.paused }

  pub fn controller(&self) -> &PresentationController { &self.controller }

  /// The rotation scheduler, if this engine runs one.
  pub fn scheduler(&self) -> Option<&Scheduler> {
    match &self.mode {
      Mode::Rotation(s) => Some(s),
      Mode::FixedInterval(_) => None,
    }
  }

  // ── Lifecycle ───────────────────────────────────────────────────────────

  /// The owning screen mounted. Arms the scheduling timers unless paused.
  pub fn start(&mut self) {
    if self.started {
      return;
    }
    self.started = true;
    tracing::info!(session = %self.session_id, paused = self.paused, "ad engine started");
    if !self.paused {
      self.arm_scheduling();
    }
  }

  /// The owning screen unmounted. Every timer is cleared and any ad on
  /// screen is dropped.
  pub fn shutdown(&mut self) {
    self.started = false;
    self.tick_timers.clear();
    if let Mode::FixedInterval(fixed) = &mut self.mode {
      fixed.deactivate();
    }
    self.controller.teardown();
    tracing::info!(session = %self.session_id, "ad engine shut down");
  }

  /// Suppress new selections. An ad already on screen keeps running its own
  /// countdown and carousel.
  pub fn pause(&mut self) -> Option<EngineEvent> {
    if self.paused {
      return None;
    }
    self.paused = true;
    self.tick_timers.clear();
    if let Mode::FixedInterval(fixed) = &mut self.mode {
      fixed.pause();
    }
    tracing::debug!(session = %self.session_id, "ad engine paused");
    Some(EngineEvent::Paused)
  }

  pub fn resume(&mut self) -> Option<EngineEvent> {
    if !self.paused {
      return None;
    }
    self.paused = false;
    if self.started {
      let rotation = matches!(self.mode, Mode::Rotation(_));
      if rotation {
        self.arm_scheduling();
      } else if let Mode::FixedInterval(fixed) = &mut self.mode {
        // Started while paused: this is the first real activation.
        if fixed.is_activated() {
          fixed.resume();
        } else {
          fixed.activate();
        }
      }
    }
    tracing::debug!(session = %self.session_id, "ad engine resumed");
    Some(EngineEvent::Resumed)
  }

  fn arm_scheduling(&mut self) {
    match &mut self.mode {
      Mode::Rotation(_) => {
        self.tick_timers.arm(
          TimerDomain::SchedulerTick,
          self.config.tick_interval(),
          true,
        );
      }
      Mode::FixedInterval(fixed) => fixed.activate(),
    }
  }

  // ── Inputs ──────────────────────────────────────────────────────────────

  /// Install a fresh candidate list. Returns how many ids were seen for the
  /// first time. Single-advertiser engines ignore candidates.
  pub fn set_candidates(
    &mut self,
    ads: Vec<Advertisement>,
    now: DateTime<Utc>,
  ) -> usize {
    match &mut self.mode {
      Mode::Rotation(scheduler) => {
        let seeded = scheduler.set_candidates(ads, now);
        tracing::debug!(
          session = %self.session_id,
          candidates = scheduler.candidates().len(),
          seeded,
          "candidate list installed"
        );
        seeded
      }
      Mode::FixedInterval(_) => 0,
    }
  }

  /// Every timer the runtime should currently be running.
  pub fn armed_timers(&self) -> Vec<TimerSpec> {
    let mut specs: Vec<TimerSpec> = self.tick_timers.specs().copied().collect();
    if let Mode::FixedInterval(fixed) = &self.mode {
      specs.extend(fixed.timers().specs().copied());
    }
    specs.extend(self.controller.timers().specs().copied());
    specs
  }

  /// Apply a timer firing. Stale tokens produce no events.
  pub fn on_timer(
    &mut self,
    token: TimerToken,
    now: DateTime<Utc>,
  ) -> Vec<EngineEvent> {
    match token.domain {
      TimerDomain::SchedulerTick => self.on_scheduler_tick(token, now),
      TimerDomain::FixedRepeat | TimerDomain::FixedOneShot => {
        self.on_fixed_timer(token, now)
      }
      TimerDomain::Countdown | TimerDomain::Carousel => {
        self.on_controller_timer(token)
      }
    }
  }

  fn surface(&self) -> Surface {
    if self.controller.is_active() {
      Surface::Occupied
    } else if self.paused {
      Surface::Paused
    } else {
      Surface::Free
    }
  }

  fn on_scheduler_tick(
    &mut self,
    token: TimerToken,
    now: DateTime<Utc>,
  ) -> Vec<EngineEvent> {
    if !self.tick_timers.is_current(token) {
      return Vec::new();
    }
    let surface = self.surface();
    let Mode::Rotation(scheduler) = &mut self.mode else {
      return Vec::new();
    };
    let reason = match scheduler.tick(now, surface) {
      TickOutcome::Selected(ad) => {
        return vec![self.show(ad, ShowTrigger::Rotation, now)];
      }
      TickOutcome::Busy => SkipReason::Busy,
      TickOutcome::Paused => SkipReason::Paused,
      TickOutcome::CoolingDown => SkipReason::CoolingDown,
      TickOutcome::NothingDue => SkipReason::NothingDue,
    };
    tracing::debug!(session = %self.session_id, ?reason, "scheduler tick skipped");
    vec![EngineEvent::TickSkipped { reason }]
  }

  fn on_fixed_timer(
    &mut self,
    token: TimerToken,
    now: DateTime<Utc>,
  ) -> Vec<EngineEvent> {
    let busy = self.controller.is_active();
    let Mode::FixedInterval(fixed) = &mut self.mode else {
      return Vec::new();
    };
    let Some(ad) = fixed.on_timer(token) else {
      return Vec::new();
    };
    if busy {
      tracing::debug!(session = %self.session_id, ad_id = %ad.id, "fixed-interval firing dropped; ad on screen");
      return vec![EngineEvent::TickSkipped {
        reason: SkipReason::Busy,
      }];
    }
    let trigger = if token.domain == TimerDomain::FixedOneShot {
      ShowTrigger::FirstAd
    } else {
      ShowTrigger::FixedInterval
    };
    vec![self.show(ad, trigger, now)]
  }

  fn on_controller_timer(&mut self, token: TimerToken) -> Vec<EngineEvent> {
    match self.controller.on_timer(token) {
      Some(ControllerTick::Countdown {
        remaining_secs,
        dismissible,
      }) => {
        let mut events = vec![EngineEvent::Countdown { remaining_secs }];
        if dismissible && let Some(ad) = self.controller.active_ad() {
          events.push(EngineEvent::Dismissible { ad_id: ad.id.clone() });
        }
        events
      }
      Some(ControllerTick::Carousel { index }) => {
        vec![EngineEvent::CarouselAdvanced { index }]
      }
      None => Vec::new(),
    }
  }

  fn show(
    &mut self,
    ad: Advertisement,
    trigger: ShowTrigger,
    now: DateTime<Utc>,
  ) -> EngineEvent {
    tracing::info!(
      session = %self.session_id,
      ad_id = %ad.id,
      kind = ?ad.kind(),
      ?trigger,
      "showing ad"
    );
    let phase = self.controller.present(ad.clone(), now);
    EngineEvent::Shown { ad, phase, trigger }
  }

  /// A dismissal attempt from the user or the host.
  pub fn dismiss(&mut self, request: DismissRequest) -> Option<EngineEvent> {
    match self.controller.dismiss(request) {
      DismissOutcome::Dismissed(ad) => {
        tracing::info!(session = %self.session_id, ad_id = %ad.id, ?request, "ad dismissed");
        Some(EngineEvent::Dismissed {
          ad_id: ad.id,
          request,
        })
      }
      DismissOutcome::Refused { remaining_secs } => {
        Some(EngineEvent::DismissRefused { remaining_secs })
      }
      DismissOutcome::NothingActive => None,
    }
  }

  /// A tap on the ad body.
  pub fn tap(&self, opener: &dyn LinkOpener) -> Option<EngineEvent> {
    match self.controller.tap_body(opener) {
      TapOutcome::Opened(url) => Some(EngineEvent::LinkOpened { url }),
      TapOutcome::Failed(url) => Some(EngineEvent::LinkFailed { url }),
      TapOutcome::NoLink | TapOutcome::NothingActive => None,
    }
  }

  pub fn snapshot(&self, now: DateTime<Utc>) -> Snapshot {
    let c = &self.controller;
    Snapshot {
      session_id:     self.session_id,
      phase:          c.phase(),
      ad_id:          c.active_ad().map(|ad| ad.id.clone()),
      image:          c.current_image().map(str::to_owned),
      carousel_index: c.carousel_index(),
      remaining_secs: c.remaining_secs(),
      dismissible:    c.is_dismissible(),
      progress:       c.progress(now),
      paused:         self.paused,
    }
  }
}
