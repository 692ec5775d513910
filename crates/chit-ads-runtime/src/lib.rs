//! Tokio driver for [`chit_ads_core::AdEngine`].
//!
//! The core engine only *describes* its timers. This crate runs them: a
//! single task owns the engine, turns armed timers into real deadlines,
//! fetches candidates from an [`AdSource`](chit_ads_core::source::AdSource),
//! and forwards host commands. Every state change comes back out as an
//! [`EngineEvent`](chit_ads_core::EngineEvent).
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chit_ads_core::{AdEngine, EngineConfig, source::StaticSource};
//! # use chit_ads_core::presentation::LinkOpener;
//! # struct Noop;
//! # impl LinkOpener for Noop {
//! #   fn open(&self, _: &str) -> chit_ads_core::Result<()> { Ok(()) }
//! # }
//!
//! # async fn run() -> chit_ads_runtime::Result<()> {
//! let engine = AdEngine::rotation(EngineConfig::default())?;
//! let mut running =
//!   chit_ads_runtime::spawn(engine, Arc::new(StaticSource::new(Vec::new())), Noop);
//!
//! while let Some(event) = running.events.recv().await {
//!   println!("{event:?}");
//! }
//! running.handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod driver;
pub mod error;
mod wheel;

pub use clock::Clock;
pub use driver::{EVENT_BUFFER, EngineHandle, RunningEngine, spawn};
pub use error::{Error, Result};
