//! [`HttpAdSource`]: candidate ads from the marketplace REST API.

use std::{future::Future, time::Duration};

use chit_ads_core::{ad::Advertisement, source::AdSource};
use reqwest::Client;

use crate::{
  Error, Result,
  campaign::{Campaign, build_candidates, decode_feed},
  config::{FeedConfig, FeedScope},
};

/// Async HTTP client for the campaign feed.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpAdSource {
  client: Client,
  config: FeedConfig,
}

impl HttpAdSource {
  pub fn new(config: FeedConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  pub fn config(&self) -> &FeedConfig { &self.config }

  /// `GET` the configured feed and decode it.
  pub async fn fetch_campaigns(&self) -> Result<Vec<Campaign>> {
    let url = self.config.feed_url();
    let mut req = self.client.get(&url);
    if let Some(token) = &self.config.bearer_token {
      req = req.bearer_auth(token);
    }
    let resp = req.send().await?;

    if !resp.status().is_success() {
      return Err(Error::Status {
        url,
        status: resp.status().as_u16(),
      });
    }
    let body = resp.bytes().await?;
    let mut campaigns = decode_feed(&body)?;

    if self.config.scope == FeedScope::Merchant && campaigns.len() > 1 {
      tracing::debug!(count = campaigns.len(), "merchant feed returned several campaigns; keeping the first");
      campaigns.truncate(1);
    }
    tracing::debug!(%url, count = campaigns.len(), "campaign feed fetched");
    Ok(campaigns)
  }
}

impl AdSource for HttpAdSource {
  type Error = Error;

  fn list_candidates(
    &self,
  ) -> impl Future<Output = Result<Vec<Advertisement>>> + Send + '_ {
    async move {
      let campaigns = self.fetch_campaigns().await?;
      Ok(build_candidates(campaigns, self.config.media_base()))
    }
  }
}

#[cfg(test)]
mod tests {
  use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
  };
  use chit_ads_core::ad::AdKind;
  use serde_json::json;
  use tokio::net::TcpListener;

  use super::*;

  async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
  }

  fn config(base_url: String, scope: FeedScope) -> FeedConfig {
    FeedConfig {
      base_url,
      scope,
      bearer_token: Some("tok".into()),
      ..Default::default()
    }
  }

  async fn public_feed(headers: HeaderMap) -> Response {
    let authorised = headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      == Some("Bearer tok");
    if !authorised {
      return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
      "data": [
        { "id": 1, "images": ["/uploads/one.png", "/uploads/two.png"], "link": "https://shop.example" },
        { "id": 2, "image": "https://cdn.example/three.png" }
      ]
    }))
    .into_response()
  }

  #[tokio::test]
  async fn public_feed_yields_merchants_then_brands() {
    let base = serve(Router::new().route("/api/advertisements/active", get(public_feed))).await;
    let source = HttpAdSource::new(config(base.clone(), FeedScope::Public)).unwrap();

    let ads = source.list_candidates().await.unwrap();
    let kinds: Vec<AdKind> = ads.iter().map(|a| a.kind()).collect();
    assert_eq!(kinds, vec![
      AdKind::Merchant,
      AdKind::Merchant,
      AdKind::Brand,
      AdKind::Brand
    ]);
    assert_eq!(ads[0].images()[0], format!("{base}/uploads/one.png"));
    assert_eq!(ads[0].images().len(), 2);
  }

  #[tokio::test]
  async fn missing_token_surfaces_status() {
    let base = serve(Router::new().route("/api/advertisements/active", get(public_feed))).await;
    let mut cfg = config(base, FeedScope::Public);
    cfg.bearer_token = None;
    let err = HttpAdSource::new(cfg).unwrap().fetch_campaigns().await.unwrap_err();
    assert!(matches!(err, Error::Status { status: 401, .. }), "{err}");
  }

  #[tokio::test]
  async fn merchant_feed_keeps_a_single_campaign() {
    let router = Router::new().route(
      "/api/merchant/advertisements/current",
      get(|| async { Json(json!([{ "id": "a" }, { "id": "b" }])) }),
    );
    let base = serve(router).await;
    let source = HttpAdSource::new(config(base, FeedScope::Merchant)).unwrap();
    let campaigns = source.fetch_campaigns().await.unwrap();
    assert_eq!(campaigns.len(), 1);
    assert_eq!(campaigns[0].id, "a");
  }

  #[tokio::test]
  async fn merchant_without_campaign_gets_brand_ads_only() {
    let router = Router::new().route(
      "/api/merchant/advertisements/current",
      get(|| async { Json(serde_json::Value::Null) }),
    );
    let base = serve(router).await;
    let source = HttpAdSource::new(config(base, FeedScope::Merchant)).unwrap();
    let ads = source.list_candidates().await.unwrap();
    assert!(ads.iter().all(|a| a.kind() == AdKind::Brand));
  }
}
