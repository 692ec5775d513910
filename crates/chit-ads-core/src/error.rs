//! Error types for `chit-ads-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid engine configuration: {0}")]
  InvalidConfig(String),

  #[error("ad source error: {0}")]
  Source(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("failed to open link {url:?}: {source}")]
  Link {
    url:    String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
