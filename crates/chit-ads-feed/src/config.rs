//! Feed connection settings.

use serde::{Deserialize, Serialize};

/// Which campaign feed to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedScope {
  /// The public subscriber feed: every active campaign.
  #[default]
  Public,
  /// The signed-in merchant's own campaign; at most one.
  Merchant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
  pub base_url:       String,
  /// Base for relative image URLs; defaults to `base_url`.
  pub media_base_url: Option<String>,
  pub scope:          FeedScope,
  pub public_path:    String,
  pub merchant_path:  String,
  /// Session token sent as `Authorization: Bearer …`.
  pub bearer_token:   Option<String>,
  pub timeout_secs:   u64,
}

impl Default for FeedConfig {
  fn default() -> Self {
    Self {
      base_url:       "http://localhost:8080".into(),
      media_base_url: None,
      scope:          FeedScope::Public,
      public_path:    "/api/advertisements/active".into(),
      merchant_path:  "/api/merchant/advertisements/current".into(),
      bearer_token:   None,
      timeout_secs:   30,
    }
  }
}

impl FeedConfig {
  /// Full URL of the feed for the configured scope.
  pub fn feed_url(&self) -> String {
    let path = match self.scope {
      FeedScope::Public => &self.public_path,
      FeedScope::Merchant => &self.merchant_path,
    };
    format!(
      "{}/{}",
      self.base_url.trim_end_matches('/'),
      path.trim_start_matches('/')
    )
  }

  pub fn media_base(&self) -> &str {
    self.media_base_url.as_deref().unwrap_or(&self.base_url)
  }
}
