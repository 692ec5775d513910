//! Stdin commands and event rendering.

use chit_ads_core::{
  EngineEvent, Snapshot,
  engine::SkipReason,
  presentation::{DismissRequest, Phase},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
  Pause,
  Resume,
  Dismiss(DismissRequest),
  Tap,
  Refresh,
  Status,
  Quit,
}

impl Input {
  /// Parse one line typed by the user. Blank lines and unknown words give
  /// `None`.
  pub fn parse(line: &str) -> Option<Self> {
    let input = match line.trim().to_ascii_lowercase().as_str() {
      "pause" | "p" => Self::Pause,
      "resume" | "r" => Self::Resume,
      "close" | "x" => Self::Dismiss(DismissRequest::CloseTap),
      "back" | "b" => Self::Dismiss(DismissRequest::BackGesture),
      "tap" | "t" => Self::Tap,
      "refresh" => Self::Refresh,
      "status" | "s" => Self::Status,
      "quit" | "q" | "exit" => Self::Quit,
      _ => return None,
    };
    Some(input)
  }
}

pub const HELP: &str =
  "commands: pause resume close back tap refresh status quit";

/// One human-readable line per event.
pub fn describe(event: &EngineEvent) -> String {
  match event {
    EngineEvent::Shown { ad, phase, trigger } => {
      let phase = if *phase == Phase::Dismissible { " (dismissible)" } else { "" };
      format!(
        "showing {} [{:?}, {:?}, {} image(s)]{phase}",
        ad.id,
        ad.kind(),
        trigger,
        ad.images().len()
      )
    }
    EngineEvent::TickSkipped { reason } => {
      let reason = match reason {
        SkipReason::Busy => "an ad is on screen",
        SkipReason::Paused => "paused",
        SkipReason::CoolingDown => "global cooldown",
        SkipReason::NothingDue => "nothing due",
      };
      format!("tick: {reason}")
    }
    EngineEvent::Countdown { remaining_secs } => format!("close in {remaining_secs}s"),
    EngineEvent::Dismissible { ad_id } => format!("{ad_id} can now be closed"),
    EngineEvent::CarouselAdvanced { index } => format!("image {index}"),
    EngineEvent::Dismissed { ad_id, request } => format!("closed {ad_id} ({request:?})"),
    EngineEvent::DismissRefused { remaining_secs } => {
      format!("cannot close yet ({remaining_secs}s left)")
    }
    EngineEvent::LinkOpened { url } => format!("opened {url}"),
    EngineEvent::LinkFailed { url } => format!("could not open {url}"),
    EngineEvent::Paused => "paused".into(),
    EngineEvent::Resumed => "resumed".into(),
  }
}

pub fn describe_snapshot(snap: &Snapshot) -> String {
  let Some(ad_id) = &snap.ad_id else {
    return format!("idle{}", if snap.paused { ", paused" } else { "" });
  };
  let mut line = format!(
    "{ad_id} {:?} image {}",
    snap.phase, snap.carousel_index
  );
  if !snap.dismissible {
    line.push_str(&format!(", close in {}s", snap.remaining_secs));
  }
  if let Some(progress) = snap.progress {
    line.push_str(&format!(", progress {:.0}%", progress * 100.0));
  }
  if snap.paused {
    line.push_str(", paused");
  }
  line
}
