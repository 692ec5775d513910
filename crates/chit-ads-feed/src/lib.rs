//! Campaign feed adapters for the chit-ads engine.
//!
//! Turns the marketplace's campaign payloads into
//! [`chit_ads_core::Advertisement`]s and implements
//! [`chit_ads_core::source::AdSource`] over HTTP and over a local file.
//!
//! # Quick start
//!
//! ```no_run
//! use chit_ads_core::source::AdSource;
//! use chit_ads_feed::{FeedConfig, HttpAdSource};
//!
//! # async fn run() -> chit_ads_feed::Result<()> {
//! let source = HttpAdSource::new(FeedConfig::default())?;
//! let ads = source.list_candidates().await?;
//! println!("{} candidates", ads.len());
//! # Ok(())
//! # }
//! ```

pub mod campaign;
pub mod config;
pub mod error;
pub mod file;
pub mod http;

pub use campaign::{Campaign, build_candidates, decode_feed};
pub use config::{FeedConfig, FeedScope};
pub use error::{Error, Result};
pub use file::FileAdSource;
pub use http::HttpAdSource;
