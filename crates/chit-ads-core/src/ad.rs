//! Advertisement types: the read-only input to the engine.
//!
//! An advertisement is never mutated once built. Everything the engine learns
//! about it over time (when it was last shown) lives in the
//! [`FrequencyLedger`](crate::ledger::FrequencyLedger), keyed by [`AdId`].

use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Id of the full-screen brand fallback ad.
pub const BRAND_FULL_ID: &str = "brand:full";
/// Id of the banner brand fallback ad.
pub const BRAND_BANNER_ID: &str = "brand:banner";

/// Opaque, stable identity of an advertisement; the ledger key.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AdId(String);

impl AdId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for AdId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for AdId {
  fn from(value: &str) -> Self { Self(value.to_owned()) }
}

impl From<String> for AdId {
  fn from(value: String) -> Self { Self(value) }
}

// ─── Classification ──────────────────────────────────────────────────────────

/// Priority class. Merchant ads always win over brand ads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdKind {
  /// A paid campaign published by a marketplace seller.
  Merchant,
  /// The platform's own fallback/promotional content.
  Brand,
}

/// How a brand ad is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrandVariant {
  /// Blocking full-screen takeover with the mandatory countdown.
  Full,
  /// Small non-blocking overlay; dismissible at once.
  Banner,
}

// ─── Creatives ───────────────────────────────────────────────────────────────

/// Creative payload of a merchant campaign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantCreative {
  /// Absolute image URLs, in carousel order. May be empty when the campaign
  /// carried no usable image.
  pub images:      Vec<String>,
  pub title:       Option<String>,
  pub description: Option<String>,
  pub logo:        Option<String>,
  /// Outbound URL opened when the ad body is tapped.
  pub link:        Option<String>,
}

/// The fixed asset set bundled with the app for a brand ad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandAsset {
  pub images: Vec<String>,
  pub link:   Option<String>,
}

/// The payload of an advertisement, tagged by its priority class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Creative {
  Merchant(MerchantCreative),
  Brand {
    asset:   BrandAsset,
    variant: BrandVariant,
  },
}

// ─── Advertisement ───────────────────────────────────────────────────────────

/// A candidate advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advertisement {
  pub id:       AdId,
  #[serde(flatten)]
  pub creative: Creative,
}

impl Advertisement {
  pub fn merchant(id: impl Into<AdId>, creative: MerchantCreative) -> Self {
    Self {
      id:       id.into(),
      creative: Creative::Merchant(creative),
    }
  }

  pub fn brand(
    id: impl Into<AdId>,
    asset: BrandAsset,
    variant: BrandVariant,
  ) -> Self {
    Self {
      id:       id.into(),
      creative: Creative::Brand { asset, variant },
    }
  }

  pub fn kind(&self) -> AdKind {
    match self.creative {
      Creative::Merchant(_) => AdKind::Merchant,
      Creative::Brand { .. } => AdKind::Brand,
    }
  }

  /// Image references in display order.
  pub fn images(&self) -> &[String] {
    match &self.creative {
      Creative::Merchant(c) => &c.images,
      Creative::Brand { asset, .. } => &asset.images,
    }
  }

  pub fn link(&self) -> Option<&str> {
    match &self.creative {
      Creative::Merchant(c) => c.link.as_deref(),
      Creative::Brand { asset, .. } => asset.link.as_deref(),
    }
  }

  /// `true` for banner brand ads, which skip the mandatory countdown.
  pub fn is_banner(&self) -> bool {
    matches!(
      self.creative,
      Creative::Brand {
        variant: BrandVariant::Banner,
        ..
      }
    )
  }
}

/// The two brand ads bundled with the app. Always present in a candidate
/// list so the engine has something to show with an empty campaign feed.
///
/// Ids are constant for the lifetime of the process.
pub fn brand_fallbacks() -> Vec<Advertisement> {
  vec![
    Advertisement::brand(
      BRAND_FULL_ID,
      BrandAsset {
        images: vec!["asset://brand/full.png".into()],
        link:   None,
      },
      BrandVariant::Full,
    ),
    Advertisement::brand(
      BRAND_BANNER_ID,
      BrandAsset {
        images: vec!["asset://brand/banner.png".into()],
        link:   None,
      },
      BrandVariant::Banner,
    ),
  ]
}
