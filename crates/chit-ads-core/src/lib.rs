//! Core types and scheduling logic for the chit-fund marketplace ad engine.
//!
//! This crate does no I/O and never reads the wall clock. Every operation
//! takes the current time as an argument, and timers are described rather
//! than run (see [`timer`]). `chit-ads-runtime` drives an [`AdEngine`] on a
//! real clock; tests drive it by hand.

pub mod ad;
pub mod config;
pub mod cooldown;
pub mod engine;
pub mod error;
pub mod fixed;
pub mod ledger;
pub mod picker;
pub mod presentation;
pub mod scheduler;
pub mod source;
pub mod timer;

pub use ad::{AdId, AdKind, Advertisement};
pub use config::EngineConfig;
pub use engine::{AdEngine, EngineEvent, Snapshot};
pub use error::{Error, Result};
