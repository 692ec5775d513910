//! [`FileAdSource`]: a campaign feed saved on disk, for offline runs.

use std::{future::Future, path::PathBuf};

use chit_ads_core::{ad::Advertisement, source::AdSource};

use crate::{
  Error, Result,
  campaign::{Campaign, build_candidates, decode_feed},
};

/// Reads the feed file on every [`AdSource::list_candidates`] call, so edits
/// show up on the next refresh.
#[derive(Debug, Clone)]
pub struct FileAdSource {
  path:     PathBuf,
  base_url: String,
}

impl FileAdSource {
  /// `base_url` resolves relative image references in the file.
  pub fn new(path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
    Self {
      path:     path.into(),
      base_url: base_url.into(),
    }
  }

  pub async fn read_campaigns(&self) -> Result<Vec<Campaign>> {
    let body = tokio::fs::read(&self.path).await.map_err(|source| Error::Io {
      path: self.path.clone(),
      source,
    })?;
    decode_feed(&body)
  }
}

impl AdSource for FileAdSource {
  type Error = Error;

  fn list_candidates(
    &self,
  ) -> impl Future<Output = Result<Vec<Advertisement>>> + Send + '_ {
    async move {
      let campaigns = self.read_campaigns().await?;
      Ok(build_candidates(campaigns, &self.base_url))
    }
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  fn temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("chit-ads-feed-{}.json", Uuid::new_v4()))
  }

  #[tokio::test]
  async fn reads_feed_from_disk() {
    let path = temp_path();
    tokio::fs::write(&path, r#"[{ "id": "m1", "images": ["a.png"] }]"#)
      .await
      .unwrap();

    let source = FileAdSource::new(&path, "https://cdn.example");
    let ads = source.list_candidates().await.unwrap();
    tokio::fs::remove_file(&path).await.ok();

    assert_eq!(ads.len(), 3);
    assert_eq!(ads[0].images(), ["https://cdn.example/a.png".to_string()]);
  }

  #[tokio::test]
  async fn missing_file_is_an_io_error() {
    let source = FileAdSource::new(temp_path(), "https://cdn.example");
    let err = source.list_candidates().await.unwrap_err();
    assert!(matches!(err, Error::Io { .. }), "{err}");
  }
}
