//! Campaign feed payloads and their conversion to [`Advertisement`]s.
//!
//! The backend is loose about shapes: ids arrive as strings or integers,
//! images as an `images` array and/or a single `image`, and the body may be a
//! bare array, a `{ "data": ... }` envelope, a single object, or `null` when
//! a merchant has no active campaign. All of these decode to a
//! `Vec<Campaign>`.

use chit_ads_core::ad::{
  Advertisement, BRAND_BANNER_ID, BRAND_FULL_ID, MerchantCreative, brand_fallbacks,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::Result;

// ─── Wire types ──────────────────────────────────────────────────────────────

/// One merchant campaign as served by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
  #[serde(alias = "_id", deserialize_with = "string_or_number")]
  pub id:          String,
  #[serde(default, alias = "image_urls")]
  pub images:      Vec<String>,
  #[serde(default)]
  pub image:       Option<String>,
  #[serde(default)]
  pub title:       Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub logo:        Option<String>,
  #[serde(default)]
  pub link:        Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum RawId {
    Text(String),
    Unsigned(u64),
    Signed(i64),
  }

  Ok(match RawId::deserialize(deserializer)? {
    RawId::Text(s) => s,
    RawId::Unsigned(n) => n.to_string(),
    RawId::Signed(n) => n.to_string(),
  })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
  Many(Vec<Campaign>),
  One(Campaign),
}

// `Bare` must come first: a bare campaign would otherwise match `Wrapped`
// with `data` absent.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeedBody {
  Bare(OneOrMany),
  Wrapped { data: Option<OneOrMany> },
}

impl From<OneOrMany> for Vec<Campaign> {
  fn from(value: OneOrMany) -> Self {
    match value {
      OneOrMany::Many(v) => v,
      OneOrMany::One(c) => vec![c],
    }
  }
}

/// Decode a feed response body.
pub fn decode_feed(body: &[u8]) -> Result<Vec<Campaign>> {
  let parsed: Option<FeedBody> = serde_json::from_slice(body)?;
  Ok(match parsed {
    None | Some(FeedBody::Wrapped { data: None }) => Vec::new(),
    Some(FeedBody::Bare(v)) | Some(FeedBody::Wrapped { data: Some(v) }) => v.into(),
  })
}

// ─── Conversion ──────────────────────────────────────────────────────────────

/// Resolve an image or link reference against `base_url`.
///
/// Absolute references pass through; protocol-relative ones get `https:`;
/// blank ones yield `None`.
pub fn resolve_url(base_url: &str, raw: &str) -> Option<String> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }
  const ABSOLUTE: [&str; 4] = ["http://", "https://", "asset://", "data:"];
  if ABSOLUTE.iter().any(|p| raw.starts_with(p)) {
    return Some(raw.to_owned());
  }
  if let Some(rest) = raw.strip_prefix("//") {
    return Some(format!("https://{rest}"));
  }
  Some(format!(
    "{}/{}",
    base_url.trim_end_matches('/'),
    raw.trim_start_matches('/')
  ))
}

impl Campaign {
  /// Build the merchant advertisement for this campaign. Unusable image
  /// references are dropped; the ad is kept even if none remain.
  pub fn into_advertisement(self, base_url: &str) -> Advertisement {
    let images: Vec<String> = self
      .images
      .iter()
      .chain(self.image.iter())
      .filter_map(|raw| resolve_url(base_url, raw))
      .fold(Vec::new(), |mut acc, url| {
        if !acc.contains(&url) {
          acc.push(url);
        }
        acc
      });

    let non_blank = |s: Option<String>| s.filter(|v| !v.trim().is_empty());

    Advertisement::merchant(self.id, MerchantCreative {
      images,
      title: non_blank(self.title),
      description: non_blank(self.description),
      logo: self.logo.and_then(|l| resolve_url(base_url, &l)),
      link: self.link.and_then(|l| resolve_url(base_url, &l)),
    })
  }
}

/// Merchant ads for `campaigns`, in feed order, followed by the brand
/// fallbacks. Campaigns using a reserved brand id are dropped.
pub fn build_candidates(campaigns: Vec<Campaign>, base_url: &str) -> Vec<Advertisement> {
  let mut ads: Vec<Advertisement> = campaigns
    .into_iter()
    .filter(|c| {
      let reserved = c.id == BRAND_FULL_ID || c.id == BRAND_BANNER_ID;
      if reserved {
        tracing::warn!(campaign_id = %c.id, "campaign uses a reserved brand id; skipped");
      }
      !reserved
    })
    .map(|c| c.into_advertisement(base_url))
    .collect();
  for ad in &ads {
    if ad.images().is_empty() {
      tracing::warn!(ad_id = %ad.id, "campaign has no usable image");
    }
  }
  ads.extend(brand_fallbacks());
  ads
}

#[cfg(test)]
mod tests {
  use chit_ads_core::ad::{AdKind, BRAND_BANNER_ID, BRAND_FULL_ID};

  use super::*;

  const BASE: &str = "https://api.example.com/";

  #[test]
  fn decodes_bare_array_with_numeric_ids() {
    let body = br#"[
      { "id": 17, "images": ["/uploads/a.png"], "title": "Gold plan" },
      { "_id": "abc", "image": "https://cdn.example/b.png" }
    ]"#;
    let campaigns = decode_feed(body).unwrap();
    assert_eq!(campaigns.len(), 2);
    assert_eq!(campaigns[0].id, "17");
    assert_eq!(campaigns[1].id, "abc");
    assert_eq!(campaigns[1].image.as_deref(), Some("https://cdn.example/b.png"));
  }

  #[test]
  fn decodes_envelope_single_and_null() {
    let wrapped = decode_feed(br#"{ "data": [{ "id": "a" }, { "id": "b" }] }"#).unwrap();
    assert_eq!(wrapped.len(), 2);

    let wrapped_one = decode_feed(br#"{ "data": { "id": "solo" } }"#).unwrap();
    assert_eq!(wrapped_one[0].id, "solo");

    let single = decode_feed(br#"{ "id": 5, "link": "https://x.example" }"#).unwrap();
    assert_eq!(single.len(), 1);
    assert_eq!(single[0].link.as_deref(), Some("https://x.example"));

    assert!(decode_feed(b"null").unwrap().is_empty());
    assert!(decode_feed(br#"{ "data": null }"#).unwrap().is_empty());
  }

  #[test]
  fn rejects_garbage() {
    assert!(decode_feed(b"<html>oops</html>").is_err());
  }

  #[test]
  fn resolves_relative_and_keeps_absolute() {
    assert_eq!(
      resolve_url(BASE, "/uploads/a.png").as_deref(),
      Some("https://api.example.com/uploads/a.png")
    );
    assert_eq!(
      resolve_url("https://api.example.com", "uploads/a.png").as_deref(),
      Some("https://api.example.com/uploads/a.png")
    );
    assert_eq!(
      resolve_url(BASE, "http://cdn.example/x.png").as_deref(),
      Some("http://cdn.example/x.png")
    );
    assert_eq!(
      resolve_url(BASE, "//cdn.example/x.png").as_deref(),
      Some("https://cdn.example/x.png")
    );
    assert_eq!(resolve_url(BASE, "   "), None);
  }

  #[test]
  fn conversion_merges_and_cleans_images() {
    let campaign = Campaign {
      id:          "m1".into(),
      images:      vec!["/a.png".into(), "".into(), "/b.png".into()],
      image:       Some("/a.png".into()),
      title:       Some("  ".into()),
      description: Some("Save monthly".into()),
      logo:        Some("/logo.png".into()),
      link:        Some("https://shop.example".into()),
    };
    let ad = campaign.into_advertisement(BASE);
    assert_eq!(ad.kind(), AdKind::Merchant);
    assert_eq!(ad.images(), [
      "https://api.example.com/a.png".to_string(),
      "https://api.example.com/b.png".to_string(),
    ]);
    assert_eq!(ad.link(), Some("https://shop.example"));
    match ad.creative {
      chit_ads_core::ad::Creative::Merchant(c) => {
        assert_eq!(c.title, None);
        assert_eq!(c.description.as_deref(), Some("Save monthly"));
        assert_eq!(c.logo.as_deref(), Some("https://api.example.com/logo.png"));
      }
      other => panic!("unexpected creative {other:?}"),
    }
  }

  #[test]
  fn imageless_campaign_is_kept() {
    let ads = build_candidates(
      decode_feed(br#"[{ "id": "m1", "images": ["", " "] }]"#).unwrap(),
      BASE,
    );
    assert_eq!(ads.len(), 3);
    assert!(ads[0].images().is_empty());
  }

  #[test]
  fn reserved_ids_cannot_shadow_brand_fallbacks() {
    let ads = build_candidates(
      decode_feed(
        br#"[
          { "id": "brand:full", "images": ["/fake.png"], "link": "https://evil.example" },
          { "id": "m1", "images": ["/a.png"] },
          { "id": "brand:banner", "images": ["/fake.png"] }
        ]"#,
      )
      .unwrap(),
      BASE,
    );
    let ids: Vec<&str> = ads.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", BRAND_FULL_ID, BRAND_BANNER_ID]);
    assert_eq!(ads[1].kind(), AdKind::Brand);
    assert_eq!(ads[1].link(), None);
  }

  #[test]
  fn candidates_end_with_brand_fallbacks() {
    let ads = build_candidates(Vec::new(), BASE);
    let ids: Vec<&str> = ads.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec![BRAND_FULL_ID, BRAND_BANNER_ID]);
  }
}
