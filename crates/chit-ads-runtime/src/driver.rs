//! The control task: one tokio task per engine, owning it exclusively.
//!
//! Host input (pause, dismiss, …) arrives as [`Command`]s, candidate lists
//! arrive from background fetches, and timer deadlines come from the
//! [`TimerWheel`]. All three are multiplexed with `select!` on a single task,
//! so the engine is only ever touched from one place and needs no locks.

use std::sync::Arc;

use chit_ads_core::{
  AdEngine, EngineEvent, Snapshot,
  ad::{Advertisement, brand_fallbacks},
  presentation::{DismissRequest, LinkOpener},
  source::AdSource,
};
use tokio::{
  sync::{mpsc, oneshot},
  task::JoinHandle,
  time::Instant,
};
use tracing::Instrument as _;

use crate::{Error, Result, clock::Clock, wheel::TimerWheel};

// ─── Commands & handle ───────────────────────────────────────────────────────

#[derive(Debug)]
enum Command {
  Pause,
  Resume,
  Dismiss(DismissRequest),
  Tap,
  Refresh,
  Snapshot(oneshot::Sender<Snapshot>),
  Shutdown,
}

/// Cloneable control surface for a running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
  tx: mpsc::Sender<Command>,
}

impl EngineHandle {
  async fn send(&self, command: Command) -> Result<()> {
    self.tx.send(command).await.map_err(|_| Error::Closed)
  }

  /// Stop new selections, e.g. while a payment sheet is open.
  pub async fn pause(&self) -> Result<()> { self.send(Command::Pause).await }

  pub async fn resume(&self) -> Result<()> { self.send(Command::Resume).await }

  pub async fn dismiss(&self, request: DismissRequest) -> Result<()> {
    self.send(Command::Dismiss(request)).await
  }

  /// The user tapped the ad body.
  pub async fn tap(&self) -> Result<()> { self.send(Command::Tap).await }

  /// Re-fetch candidates; call when the campaign set or viewer changes.
  pub async fn refresh(&self) -> Result<()> { self.send(Command::Refresh).await }

  pub async fn snapshot(&self) -> Result<Snapshot> {
    let (tx, rx) = oneshot::channel();
    self.send(Command::Snapshot(tx)).await?;
    rx.await.map_err(|_| Error::Closed)
  }

  /// Tear the engine down. Every timer is cleared.
  pub async fn shutdown(&self) -> Result<()> { self.send(Command::Shutdown).await }
}

/// Events buffered for a host that is not reading; newer ones are dropped
/// once this many are waiting.
pub const EVENT_BUFFER: usize = 256;

/// A spawned engine: its handle, its event stream, and the task itself.
#[derive(Debug)]
pub struct RunningEngine {
  pub handle: EngineHandle,
  pub events: mpsc::Receiver<EngineEvent>,
  pub task:   JoinHandle<()>,
}

/// Start `engine` on its own task. Candidates are fetched from `source`
/// immediately and again on every [`EngineHandle::refresh`].
pub fn spawn<S, O>(engine: AdEngine, source: Arc<S>, opener: O) -> RunningEngine
where
  S: AdSource + 'static,
  O: LinkOpener + Send + 'static,
{
  let (tx, commands) = mpsc::channel(32);
  let (events_tx, events) = mpsc::channel(EVENT_BUFFER);
  let (fetched_tx, fetched) = mpsc::channel(4);

  let span = tracing::info_span!("ad_engine", session = %engine.session_id());
  let driver = Driver {
    engine,
    source,
    opener,
    clock: Clock::new(),
    wheel: TimerWheel::default(),
    commands,
    events: events_tx,
    dropped_events: 0,
    fetch_generation: 0,
    fetched_tx,
    fetched,
  };
  let task = tokio::spawn(driver.run().instrument(span));

  RunningEngine {
    handle: EngineHandle { tx },
    events,
    task,
  }
}

// ─── Driver ──────────────────────────────────────────────────────────────────

/// A finished fetch, tagged with the request it answers.
struct Fetched {
  generation: u64,
  result:     chit_ads_core::Result<Vec<Advertisement>>,
}

struct Driver<S, O> {
  engine:           AdEngine,
  source:           Arc<S>,
  opener:           O,
  clock:            Clock,
  wheel:            TimerWheel,
  commands:         mpsc::Receiver<Command>,
  events:           mpsc::Sender<EngineEvent>,
  dropped_events:   u64,
  /// Only the fetch with this generation may install candidates.
  fetch_generation: u64,
  fetched_tx:       mpsc::Sender<Fetched>,
  fetched:          mpsc::Receiver<Fetched>,
}

async fn sleep_until(deadline: Option<Instant>) {
  match deadline {
    Some(at) => tokio::time::sleep_until(at).await,
    None => std::future::pending().await,
  }
}

impl<S, O> Driver<S, O>
where
  S: AdSource + 'static,
  O: LinkOpener + Send + 'static,
{
  async fn run(mut self) {
    self.engine.start();
    self.request_candidates();
    self.reconcile();

    loop {
      let deadline = self.wheel.next_deadline();
      tokio::select! {
        command = self.commands.recv() => match command {
          Some(Command::Shutdown) | None => break,
          Some(command) => self.handle(command),
        },
        Some(fetched) = self.fetched.recv() => self.install(fetched),
        () = sleep_until(deadline) => self.fire_due(),
      }
      self.reconcile();
    }

    self.engine.shutdown();
    self.wheel.reconcile(&[], Instant::now());
  }

  fn reconcile(&mut self) {
    self.wheel.reconcile(&self.engine.armed_timers(), Instant::now());
  }

  fn emit(&mut self, event: EngineEvent) {
    match self.events.try_send(event) {
      Ok(()) => {
        if self.dropped_events > 0 {
          tracing::warn!(dropped = self.dropped_events, "event consumer caught up");
          self.dropped_events = 0;
        }
      }
      Err(mpsc::error::TrySendError::Full(_)) => {
        if self.dropped_events == 0 {
          tracing::warn!(capacity = EVENT_BUFFER, "event consumer is behind; dropping events");
        }
        self.dropped_events += 1;
      }
      // A host that dropped the receiver simply stops listening.
      Err(mpsc::error::TrySendError::Closed(_)) => {}
    }
  }

  fn handle(&mut self, command: Command) {
    let event = match command {
      Command::Pause => self.engine.pause(),
      Command::Resume => self.engine.resume(),
      Command::Dismiss(request) => self.engine.dismiss(request),
      Command::Tap => self.engine.tap(&self.opener),
      Command::Refresh => {
        self.request_candidates();
        None
      }
      Command::Snapshot(reply) => {
        let _ = reply.send(self.engine.snapshot(self.clock.now()));
        None
      }
      Command::Shutdown => None,
    };
    if let Some(event) = event {
      self.emit(event);
    }
  }

  fn fire_due(&mut self) {
    for (token, at) in self.wheel.take_due(Instant::now()) {
      let now = self.clock.wall_at(at);
      let events = self.engine.on_timer(token, now);
      for event in events {
        self.emit(event);
      }
    }
  }

  /// Fetch off the control task so a slow feed never delays a timer. A newer
  /// request supersedes every earlier one still in flight.
  fn request_candidates(&mut self) {
    self.fetch_generation += 1;
    let generation = self.fetch_generation;
    let source = Arc::clone(&self.source);
    let tx = self.fetched_tx.clone();
    tokio::spawn(
      async move {
        let result = source
          .list_candidates()
          .await
          .map_err(|e| chit_ads_core::Error::Source(Box::new(e)));
        let _ = tx.send(Fetched { generation, result }).await;
      }
      .in_current_span(),
    );
  }

  fn install(&mut self, fetched: Fetched) {
    if fetched.generation != self.fetch_generation {
      tracing::debug!(
        generation = fetched.generation,
        latest = self.fetch_generation,
        "discarding superseded candidate fetch"
      );
      return;
    }
    let ads = match fetched.result {
      Ok(ads) => ads,
      Err(e) => {
        tracing::warn!(error = %e, "ad source unavailable; using brand ads only");
        brand_fallbacks()
      }
    };
    let count = ads.len();
    let seeded = self.engine.set_candidates(ads, self.clock.now());
    tracing::info!(count, seeded, "candidates refreshed");
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::{
    sync::{
      Mutex,
      atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
  };

  use chit_ads_core::{
    EngineConfig,
    ad::{BRAND_FULL_ID, MerchantCreative},
    engine::ShowTrigger,
    picker::BrandPicker,
    presentation::Phase,
    source::StaticSource,
  };
  use tokio::time::sleep;

  use super::*;

  #[derive(Default)]
  struct Opener {
    fail:   bool,
    opened: Mutex<Vec<String>>,
  }

  impl LinkOpener for Opener {
    fn open(&self, url: &str) -> chit_ads_core::Result<()> {
      if self.fail {
        return Err(chit_ads_core::Error::Link {
          url:    url.into(),
          source: "blocked".into(),
        });
      }
      self.opened.lock().unwrap().push(url.into());
      Ok(())
    }
  }

  #[derive(Debug, thiserror::Error)]
  #[error("feed down")]
  struct FeedDown;

  struct Failing;

  impl AdSource for Failing {
    type Error = FeedDown;

    fn list_candidates(
      &self,
    ) -> impl std::future::Future<Output = Result<Vec<Advertisement>, FeedDown>> + Send + '_
    {
      async { Err(FeedDown) }
    }
  }

  /// The first fetch is slow and answers for the previous viewer; every
  /// later fetch answers at once for the current one.
  #[derive(Default)]
  struct ViewerSwitch {
    calls: AtomicUsize,
  }

  impl AdSource for ViewerSwitch {
    type Error = std::convert::Infallible;

    fn list_candidates(
      &self,
    ) -> impl std::future::Future<Output = Result<Vec<Advertisement>, Self::Error>> + Send + '_
    {
      let call = self.calls.fetch_add(1, Ordering::SeqCst);
      async move {
        if call == 0 {
          sleep(Duration::from_secs(10)).await;
          Ok(vec![merchant("old_viewer", 1)])
        } else {
          Ok(vec![merchant("new_viewer", 1)])
        }
      }
    }
  }

  struct AlwaysFirst;

  impl BrandPicker for AlwaysFirst {
    fn pick(&mut self, _count: usize) -> usize { 0 }
  }

  fn merchant(id: &str, images: usize) -> Advertisement {
    Advertisement::merchant(id, MerchantCreative {
      images: (0..images).map(|i| format!("https://cdn.example/{id}/{i}.png")).collect(),
      link: Some(format!("https://shop.example/{id}")),
      ..Default::default()
    })
  }

  fn rotation(ads: Vec<Advertisement>) -> RunningEngine {
    let engine = AdEngine::rotation(EngineConfig::default()).unwrap();
    spawn(engine, Arc::new(StaticSource::new(ads)), Opener::default())
  }

  /// Let `millis` of paused time pass, then collect what the driver emitted.
  async fn advance(running: &mut RunningEngine, millis: u64) -> Vec<EngineEvent> {
    sleep(Duration::from_millis(millis)).await;
    // Round-trip through the driver so everything up to now is flushed.
    running.handle.snapshot().await.unwrap();
    let mut out = Vec::new();
    while let Ok(event) = running.events.try_recv() {
      out.push(event);
    }
    out
  }

  fn shown(events: &[EngineEvent]) -> Vec<(String, ShowTrigger)> {
    events
      .iter()
      .filter_map(|e| match e {
        EngineEvent::Shown { ad, trigger, .. } => Some((ad.id.to_string(), *trigger)),
        _ => None,
      })
      .collect()
  }

  #[tokio::test(start_paused = true)]
  async fn first_selection_waits_for_interval() {
    let mut running = rotation(vec![merchant("m1", 1), merchant("m2", 1)]);

    // Seeded at start: nothing is due through the 900 s tick.
    let events = advance(&mut running, 900_500).await;
    assert!(shown(&events).is_empty(), "{events:?}");

    // The 960 s tick finds both due and picks the first listed.
    let events = advance(&mut running, 60_000).await;
    assert_eq!(shown(&events), vec![("m1".to_string(), ShowTrigger::Rotation)]);
  }

  #[tokio::test(start_paused = true)]
  async fn countdown_then_dismiss() {
    let mut running = rotation(vec![merchant("m1", 4)]);
    advance(&mut running, 960_500).await;

    running.handle.dismiss(DismissRequest::BackGesture).await.unwrap();
    let events = advance(&mut running, 0).await;
    assert!(matches!(
      events.as_slice(),
      [EngineEvent::DismissRefused { remaining_secs: 5 }]
    ));

    let events = advance(&mut running, 5_000).await;
    let countdown: Vec<u32> = events
      .iter()
      .filter_map(|e| match e {
        EngineEvent::Countdown { remaining_secs } => Some(*remaining_secs),
        _ => None,
      })
      .collect();
    assert_eq!(countdown, vec![4, 3, 2, 1, 0]);
    assert!(events.iter().any(|e| matches!(e, EngineEvent::Dismissible { .. })));
    assert!(events.contains(&EngineEvent::CarouselAdvanced { index: 1 }));

    let snap = running.handle.snapshot().await.unwrap();
    assert_eq!(snap.phase, Phase::Dismissible);
    assert_eq!(snap.progress, Some(1.0));

    running.handle.dismiss(DismissRequest::CloseTap).await.unwrap();
    let events = advance(&mut running, 0).await;
    assert!(matches!(events.as_slice(), [EngineEvent::Dismissed { .. }]));
    assert_eq!(running.handle.snapshot().await.unwrap().phase, Phase::Idle);
  }

  #[tokio::test(start_paused = true)]
  async fn carousel_keeps_turning_after_countdown() {
    let mut running = rotation(vec![merchant("m1", 4)]);
    advance(&mut running, 960_500).await;

    let events = advance(&mut running, 12_000).await;
    let indices: Vec<usize> = events
      .iter()
      .filter_map(|e| match e {
        EngineEvent::CarouselAdvanced { index } => Some(*index),
        _ => None,
      })
      .collect();
    assert_eq!(indices, vec![1, 2, 3, 0]);
  }

  #[tokio::test(start_paused = true)]
  async fn pause_holds_selection_until_resume() {
    let mut running = rotation(vec![merchant("m1", 1)]);
    running.handle.pause().await.unwrap();

    let events = advance(&mut running, 3_600_000).await;
    assert!(shown(&events).is_empty());
    assert!(running.handle.snapshot().await.unwrap().paused);

    running.handle.resume().await.unwrap();
    let events = advance(&mut running, 60_500).await;
    assert_eq!(shown(&events).len(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn unavailable_source_falls_back_to_brand_ads() {
    let engine = AdEngine::rotation(EngineConfig::default()).unwrap();
    let mut running = spawn(engine, Arc::new(Failing), Opener::default());

    let events = advance(&mut running, 960_500).await;
    assert_eq!(shown(&events), vec![(BRAND_FULL_ID.to_string(), ShowTrigger::Rotation)]);
  }

  #[tokio::test(start_paused = true)]
  async fn failed_link_is_reported_not_fatal() {
    let engine = AdEngine::rotation(EngineConfig::default()).unwrap();
    let source = Arc::new(StaticSource::new(vec![merchant("m1", 1)]));
    let opener = Opener {
      fail: true,
      ..Default::default()
    };
    let mut running = spawn(engine, source, opener);
    advance(&mut running, 960_500).await;

    running.handle.tap().await.unwrap();
    let events = advance(&mut running, 1_000).await;
    assert!(events.contains(&EngineEvent::LinkFailed {
      url: "https://shop.example/m1".into(),
    }));
    let snap = running.handle.snapshot().await.unwrap();
    assert_eq!(snap.phase, Phase::Mandatory);
    assert_eq!(snap.remaining_secs, 4);
  }

  #[tokio::test(start_paused = true)]
  async fn fixed_interval_runs_first_ad_then_cadence() {
    let engine =
      AdEngine::fixed_interval(EngineConfig::default(), Box::new(AlwaysFirst)).unwrap();
    let mut running = spawn(engine, Arc::new(StaticSource::new(Vec::new())), Opener::default());

    let events = advance(&mut running, 5_500).await;
    assert_eq!(shown(&events), vec![(BRAND_FULL_ID.to_string(), ShowTrigger::FirstAd)]);
    advance(&mut running, 5_000).await;
    running.handle.dismiss(DismissRequest::CloseTap).await.unwrap();

    // Repeating timer: 900 s after start.
    let events = advance(&mut running, 890_000).await;
    assert_eq!(shown(&events), vec![(BRAND_FULL_ID.to_string(), ShowTrigger::FixedInterval)]);
    advance(&mut running, 5_000).await;
    running.handle.dismiss(DismissRequest::CloseTap).await.unwrap();

    running.handle.pause().await.unwrap();
    let events = advance(&mut running, 3_600_000).await;
    assert!(shown(&events).is_empty());

    // Resume re-arms the repeat only; no early first ad.
    running.handle.resume().await.unwrap();
    let events = advance(&mut running, 10_000).await;
    assert!(shown(&events).is_empty());
    let events = advance(&mut running, 890_500).await;
    assert_eq!(shown(&events).len(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn late_fetch_does_not_override_newer_refresh() {
    let engine = AdEngine::rotation(EngineConfig::default()).unwrap();
    let source = Arc::new(ViewerSwitch::default());
    let mut running = spawn(engine, Arc::clone(&source), Opener::default());

    advance(&mut running, 1_000).await;
    running.handle.refresh().await.unwrap();

    let events = advance(&mut running, 999_000).await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    assert_eq!(shown(&events), vec![("new_viewer".to_string(), ShowTrigger::Rotation)]);
  }

  #[tokio::test(start_paused = true)]
  async fn slow_consumer_loses_events_not_memory() {
    let mut running = rotation(vec![merchant("m1", 4)]);
    advance(&mut running, 960_500).await;

    // An hour of carousel turns with nobody reading.
    sleep(Duration::from_secs(3_600)).await;
    let backlog = advance(&mut running, 0).await;
    assert_eq!(backlog.len(), EVENT_BUFFER);

    // Delivery resumes once the host reads again.
    let events = advance(&mut running, 3_000).await;
    assert!(
      events.iter().any(|e| matches!(e, EngineEvent::CarouselAdvanced { .. })),
      "{events:?}"
    );
  }

  #[tokio::test(start_paused = true)]
  async fn shutdown_stops_the_task() {
    let running = rotation(Vec::new());
    running.handle.shutdown().await.unwrap();
    running.task.await.unwrap();
    assert!(matches!(running.handle.pause().await, Err(Error::Closed)));
  }
}
