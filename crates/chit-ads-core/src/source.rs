//! The `AdSource` trait: where candidate advertisements come from.
//!
//! Implemented by feed adapters (e.g. `chit-ads-feed`). The engine never calls
//! a source itself; the host or runtime fetches on start-up and whenever the
//! campaign set or the viewer changes, then installs the result with
//! [`AdEngine::set_candidates`](crate::engine::AdEngine::set_candidates).

use std::future::Future;

use crate::ad::{Advertisement, brand_fallbacks};

/// Supplies the current candidate list.
///
/// Implementations append the [`brand_fallbacks`] so the list stays usable
/// when the remote feed is empty.
pub trait AdSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn list_candidates(
    &self,
  ) -> impl Future<Output = Result<Vec<Advertisement>, Self::Error>> + Send + '_;
}

/// A fixed in-memory candidate list.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
  ads: Vec<Advertisement>,
}

impl StaticSource {
  /// Serve `merchant_ads` followed by the brand fallbacks.
  pub fn new(merchant_ads: Vec<Advertisement>) -> Self {
    let mut ads = merchant_ads;
    ads.extend(brand_fallbacks());
    Self { ads }
  }

  /// Serve exactly `ads`, with no fallbacks appended.
  pub fn exact(ads: Vec<Advertisement>) -> Self { Self { ads } }
}

impl AdSource for StaticSource {
  type Error = std::convert::Infallible;

  fn list_candidates(
    &self,
  ) -> impl Future<Output = Result<Vec<Advertisement>, Self::Error>> + Send + '_
  {
    let ads = self.ads.clone();
    async move { Ok(ads) }
  }
}
