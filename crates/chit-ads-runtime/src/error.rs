//! Error type for `chit-ads-runtime`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The driver task has stopped; the handle is no longer usable.
  #[error("ad engine is no longer running")]
  Closed,

  #[error("engine error: {0}")]
  Core(#[from] chit_ads_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
