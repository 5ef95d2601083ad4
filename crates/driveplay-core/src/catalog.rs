//! File catalog access
//!
//! The catalog supplies drive file records for a folder. This crate only
//! consumes it: records come in already ordered and are turned into
//! playable items without re-sorting.

use crate::{
    types::{DriveFile, PlayableItem},
    Error, Result,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Source of drive file listings
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// List the files of a folder, in display order
    async fn list(&self, folder_id: &str) -> Result<Vec<DriveFile>>;
}

/// Catalog payloads come either bare or wrapped
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogPayload {
    Files(Vec<DriveFile>),
    Wrapped { files: Vec<DriveFile> },
}

impl From<CatalogPayload> for Vec<DriveFile> {
    fn from(payload: CatalogPayload) -> Self {
        match payload {
            CatalogPayload::Files(files) => files,
            CatalogPayload::Wrapped { files } => files,
        }
    }
}

/// Parse a catalog JSON document
pub fn parse_catalog(json: &str) -> Result<Vec<DriveFile>> {
    let payload: CatalogPayload = serde_json::from_str(json)?;
    Ok(payload.into())
}

/// Keep the playable video records, in catalog order
pub fn playable_items(files: impl IntoIterator<Item = DriveFile>) -> Vec<PlayableItem> {
    files
        .into_iter()
        .filter(DriveFile::is_video)
        .map(PlayableItem::from)
        .collect()
}

/// Catalog snapshot stored as JSON on disk.
///
/// The folder id is ignored: the file is the folder.
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    path: PathBuf,
}

impl JsonCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogProvider for JsonCatalog {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn list(&self, _folder_id: &str) -> Result<Vec<DriveFile>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let files = parse_catalog(&raw)?;
        debug!(files = files.len(), "Catalog loaded from disk");
        Ok(files)
    }
}

/// Catalog served over HTTP at `{base}/api/drive/files?folderId=...`
///
/// The base is treated as a directory whether or not it ends in `/`.
#[cfg(feature = "http-catalog")]
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    base: url::Url,
    client: reqwest::Client,
}

#[cfg(feature = "http-catalog")]
impl HttpCatalog {
    pub fn new(mut base: url::Url) -> Result<Self> {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;
        Ok(Self { base, client })
    }

    /// Listing URL for a folder
    pub fn folder_url(&self, folder_id: &str) -> Result<url::Url> {
        let mut url = self.base.join("api/drive/files")?;
        url.query_pairs_mut().append_pair("folderId", folder_id);
        Ok(url)
    }
}

#[cfg(feature = "http-catalog")]
#[async_trait]
impl CatalogProvider for HttpCatalog {
    #[instrument(skip(self))]
    async fn list(&self, folder_id: &str) -> Result<Vec<DriveFile>> {
        let url = self.folder_url(folder_id)?;
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::CatalogFetch(format!("{} returned {}", url, status)));
        }
        let body = response.text().await?;
        let files = parse_catalog(&body)?;
        debug!(files = files.len(), "Catalog fetched");
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"[
        { "id": "v1", "name": "Intro.mp4", "mimeType": "video/mp4", "size": "1048576" },
        { "id": "p1", "name": "Notes.pdf", "mimeType": "application/pdf" },
        { "id": "v2", "name": "Arrays.mkv", "mimeType": "video/x-matroska" },
        { "id": "f1", "name": "Week 2", "mimeType": "application/vnd.google-apps.folder" }
    ]"#;

    #[test]
    fn test_playable_items_keep_order() {
        let files = parse_catalog(CATALOG).unwrap();
        let items = playable_items(files);
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["v1", "v2"]);
        assert_eq!(items[0].display_size(), "1MB");
        assert_eq!(items[1].display_size(), "Unknown size");
    }

    #[test]
    fn test_wrapped_payload() {
        let json = format!(r#"{{ "files": {} }}"#, CATALOG);
        assert_eq!(parse_catalog(&json).unwrap().len(), 4);
    }

    #[test]
    fn test_invalid_payload() {
        assert!(matches!(parse_catalog("{ nope"), Err(Error::CatalogParse(_))));
    }

    #[cfg(feature = "http-catalog")]
    #[test]
    fn test_folder_url() {
        let catalog = HttpCatalog::new(url::Url::parse("http://localhost:5000/").unwrap()).unwrap();
        assert_eq!(
            catalog.folder_url("abc 1").unwrap().as_str(),
            "http://localhost:5000/api/drive/files?folderId=abc+1"
        );
    }

    #[cfg(feature = "http-catalog")]
    #[test]
    fn test_folder_url_keeps_base_path() {
        for base in ["http://localhost:5000/drive", "http://localhost:5000/drive/"] {
            let catalog = HttpCatalog::new(url::Url::parse(base).unwrap()).unwrap();
            assert_eq!(
                catalog.folder_url("f1").unwrap().as_str(),
                "http://localhost:5000/drive/api/drive/files?folderId=f1"
            );
        }
    }

    #[tokio::test]
    async fn test_json_catalog_reads_file() {
        let path = std::env::temp_dir().join(format!("driveplay-catalog-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, CATALOG).await.unwrap();

        let files = JsonCatalog::new(&path).list("ignored").await.unwrap();
        assert_eq!(files.len(), 4);

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
