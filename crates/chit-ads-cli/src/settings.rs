//! Layered simulator settings: TOML file, then `CHITADS__*` environment
//! variables, then command-line flags.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chit_ads_core::EngineConfig;
use chit_ads_feed::{FeedConfig, FeedScope};
use serde::Deserialize;

/// Which engine variant to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimMode {
  /// Ranked rotation over the campaign feed.
  #[default]
  Rotation,
  /// Brand ads on a fixed interval (single-advertiser screens).
  Fixed,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimConfig {
  pub mode:      SimMode,
  /// Read campaigns from this JSON file instead of the HTTP feed.
  pub campaigns: Option<PathBuf>,
  pub feed:      FeedConfig,
  pub engine:    EngineConfig,
}

/// Values given on the command line; each one wins over file and env.
#[derive(Debug, Default)]
pub struct Overrides {
  pub feed_url:  Option<String>,
  pub token:     Option<String>,
  pub merchant:  bool,
  pub fixed:     bool,
  pub campaigns: Option<PathBuf>,
}

impl SimConfig {
  /// Read `path` (if present) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("CHITADS")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read config file")?;
    settings
      .try_deserialize()
      .context("failed to deserialise simulator config")
  }

  pub fn apply(&mut self, overrides: Overrides) {
    if let Some(url) = overrides.feed_url {
      self.feed.base_url = url;
    }
    if let Some(token) = overrides.token {
      self.feed.bearer_token = Some(token);
    }
    if overrides.merchant {
      self.feed.scope = FeedScope::Merchant;
    }
    if overrides.fixed {
      self.mode = SimMode::Fixed;
    }
    if overrides.campaigns.is_some() {
      self.campaigns = overrides.campaigns;
    }
  }
}
