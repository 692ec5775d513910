//! Presentation lifecycle of the ad currently on screen.
//!
//! ```text
//! Idle ──present──▶ Mandatory ──countdown hits 0──▶ Dismissible ──dismiss──▶ Idle
//! ```
//!
//! Banner brand ads enter `Dismissible` directly and run no timers. While an
//! ad with more than one image is on screen the carousel advances on its own
//! timer, independent of the countdown.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::{
  Result,
  ad::Advertisement,
  config::EngineConfig,
  timer::{TimerBook, TimerDomain, TimerToken},
};

// ─── Boundary ────────────────────────────────────────────────────────────────

/// Opens an outbound link in an external browser context.
///
/// Implementations must not block; errors are logged by the caller and never
/// affect presentation state.
pub trait LinkOpener {
  fn open(&self, url: &str) -> Result<()>;
}

// ─── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Idle,
  /// Showing; dismissal is refused until the countdown completes.
  Mandatory,
  Dismissible,
}

/// Where a dismissal attempt came from. All sources obey the same gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissRequest {
  /// The close control on the ad.
  CloseTap,
  /// OS back button or back gesture.
  BackGesture,
  /// The host closing a banner overlay.
  ExternalClose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DismissOutcome {
  Dismissed(Advertisement),
  /// Still inside the mandatory window.
  Refused { remaining_secs: u32 },
  NothingActive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapOutcome {
  Opened(String),
  Failed(String),
  NoLink,
  NothingActive,
}

/// State change caused by a controller timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerTick {
  Countdown {
    remaining_secs: u32,
    dismissible:    bool,
  },
  Carousel {
    index: usize,
  },
}

// ─── Controller ──────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Presentation {
  ad:             Advertisement,
  shown_at:       DateTime<Utc>,
  carousel_index: usize,
  remaining_secs: u32,
  dismissible:    bool,
}

/// Owns the display surface for one ad at a time.
#[derive(Debug)]
pub struct PresentationController {
  countdown_secs:  u32,
  carousel_period: std::time::Duration,
  progress_span:   TimeDelta,
  active:          Option<Presentation>,
  timers:          TimerBook,
}

impl PresentationController {
  pub fn new(config: &EngineConfig) -> Self {
    Self {
      countdown_secs:  config.countdown_secs,
      carousel_period: config.carousel_period(),
      progress_span:   config.progress_span(),
      active:          None,
      timers:          TimerBook::new(),
    }
  }

  /// Put `ad` on screen. Any previous presentation and its timers are
  /// discarded first.
  pub fn present(&mut self, ad: Advertisement, now: DateTime<Utc>) -> Phase {
    self.timers.clear();

    let banner = ad.is_banner();
    if !banner {
      self
        .timers
        .arm(TimerDomain::Countdown, std::time::Duration::from_secs(1), true);
      if ad.images().len() > 1 {
        self.timers.arm(TimerDomain::Carousel, self.carousel_period, true);
      }
    }

    self.active = Some(Presentation {
      ad,
      shown_at: now,
      carousel_index: 0,
      remaining_secs: if banner { 0 } else { self.countdown_secs },
      dismissible: banner,
    });
    self.phase()
  }

  /// Apply a firing of one of this controller's timers. Stale or foreign
  /// tokens are ignored.
  pub fn on_timer(&mut self, token: TimerToken) -> Option<ControllerTick> {
    if !self.timers.is_current(token) {
      return None;
    }
    let presentation = self.active.as_mut()?;
    match token.domain {
      TimerDomain::Countdown => {
        presentation.remaining_secs = presentation.remaining_secs.saturating_sub(1);
        if presentation.remaining_secs == 0 {
          presentation.dismissible = true;
          self.timers.cancel(TimerDomain::Countdown);
        }
        Some(ControllerTick::Countdown {
          remaining_secs: presentation.remaining_secs,
          dismissible:    presentation.dismissible,
        })
      }
      TimerDomain::Carousel => {
        let count = presentation.ad.images().len();
        if count < 2 {
          return None;
        }
        presentation.carousel_index = (presentation.carousel_index + 1) % count;
        Some(ControllerTick::Carousel {
          index: presentation.carousel_index,
        })
      }
      _ => None,
    }
  }

  /// Attempt to close the current ad.
  pub fn dismiss(&mut self, request: DismissRequest) -> DismissOutcome {
    let Some(presentation) = &self.active else {
      return DismissOutcome::NothingActive;
    };
    if !presentation.dismissible {
      tracing::debug!(
        ad_id = %presentation.ad.id,
        ?request,
        remaining_secs = presentation.remaining_secs,
        "dismiss refused during mandatory viewing"
      );
      return DismissOutcome::Refused {
        remaining_secs: presentation.remaining_secs,
      };
    }
    self.timers.clear();
    match self.active.take() {
      Some(p) => DismissOutcome::Dismissed(p.ad),
      None => DismissOutcome::NothingActive,
    }
  }

  /// Handle a tap on the ad body: open its link, if any. Never changes the
  /// presentation state.
  pub fn tap_body(&self, opener: &dyn LinkOpener) -> TapOutcome {
    let Some(presentation) = &self.active else {
      return TapOutcome::NothingActive;
    };
    let Some(url) = presentation.ad.link() else {
      return TapOutcome::NoLink;
    };
    match opener.open(url) {
      Ok(()) => TapOutcome::Opened(url.to_owned()),
      Err(e) => {
        tracing::warn!(ad_id = %presentation.ad.id, error = %e, "failed to open ad link");
        TapOutcome::Failed(url.to_owned())
      }
    }
  }

  /// Drop the current ad and every timer without the dismiss gate. Used on
  /// teardown.
  pub fn teardown(&mut self) {
    self.timers.clear();
    self.active = None;
  }

  // ── Queries ─────────────────────────────────────────────────────────────

  pub fn phase(&self) -> Phase {
    match &self.active {
      None => Phase::Idle,
      Some(p) if p.dismissible => Phase::Dismissible,
      Some(_) => Phase::Mandatory,
    }
  }

  pub fn is_active(&self) -> bool { self.active.is_some() }

  pub fn active_ad(&self) -> Option<&Advertisement> {
    self.active.as_ref().map(|p| &p.ad)
  }

  pub fn carousel_index(&self) -> usize {
    self.active.as_ref().map_or(0, |p| p.carousel_index)
  }

  /// The image the carousel is on. `None` for an ad without usable images.
  pub fn current_image(&self) -> Option<&str> {
    let p = self.active.as_ref()?;
    p.ad.images().get(p.carousel_index).map(String::as_str)
  }

  pub fn remaining_secs(&self) -> u32 {
    self.active.as_ref().map_or(0, |p| p.remaining_secs)
  }

  pub fn is_dismissible(&self) -> bool {
    self.active.as_ref().is_some_and(|p| p.dismissible)
  }

  /// Linear 0→1 position of the visual timeline. `None` when idle or for a
  /// banner, which has no timeline.
  pub fn progress(&self, now: DateTime<Utc>) -> Option<f64> {
    let p = self.active.as_ref()?;
    if p.ad.is_banner() {
      return None;
    }
    let span = self.progress_span.num_milliseconds() as f64;
    let elapsed = (now - p.shown_at).num_milliseconds() as f64;
    Some((elapsed / span).clamp(0.0, 1.0))
  }

  pub fn timers(&self) -> &TimerBook { &self.timers }
}
