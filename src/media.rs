//! Media folders and icon assets for mirrored payment methods.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::entity::{Media, MediaDefaultFolder, MediaFolder};
use crate::store::{into_patch, Catalog, Repository, StoreError};

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("download of {url} failed: {message}")]
    Download { url: String, message: String },

    #[error("media storage failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error("media record write failed: {0}")]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait MediaPipeline: Send + Sync {
    async fn upsert_default_folder(&self, folder: MediaDefaultFolder) -> Result<(), MediaError>;

    async fn upsert_folder(&self, folder: MediaFolder) -> Result<(), MediaError>;

    /// Downloads `url` and stores it as media `media_id` inside `folder_id`.
    async fn store_from_url(&self, media_id: Uuid, folder_id: Uuid, url: &str, title: &str)
        -> Result<Media, MediaError>;
}

/// Writes media records to the catalog and the downloaded files to `media_dir`.
pub struct LocalMediaPipeline {
    media: Arc<dyn Repository<Media>>,
    folders: Arc<dyn Repository<MediaFolder>>,
    default_folders: Arc<dyn Repository<MediaDefaultFolder>>,
    media_dir: PathBuf,
    client: reqwest::Client,
}

impl LocalMediaPipeline {
    pub fn new(catalog: &Catalog, media_dir: PathBuf) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MediaError::Download {
                url: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self {
            media: catalog.media.clone(),
            folders: catalog.media_folders.clone(),
            default_folders: catalog.media_default_folders.clone(),
            media_dir,
            client,
        })
    }

    async fn download(&self, url: &str) -> Result<(Vec<u8>, Option<String>), MediaError> {
        let failed = |message: String| MediaError::Download {
            url: url.to_string(),
            message,
        };

        let resp = self.client.get(url).send().await.map_err(|e| failed(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(failed(format!("status {}", resp.status())));
        }

        let mime_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
        let bytes = resp.bytes().await.map_err(|e| failed(e.to_string()))?;

        Ok((bytes.to_vec(), mime_type))
    }
}

#[async_trait]
impl MediaPipeline for LocalMediaPipeline {
    async fn upsert_default_folder(&self, folder: MediaDefaultFolder) -> Result<(), MediaError> {
        self.default_folders.upsert(vec![into_patch(&folder)?]).await?;
        Ok(())
    }

    async fn upsert_folder(&self, folder: MediaFolder) -> Result<(), MediaError> {
        self.folders.upsert(vec![into_patch(&folder)?]).await?;
        Ok(())
    }

    async fn store_from_url(
        &self,
        media_id: Uuid,
        folder_id: Uuid,
        url: &str,
        title: &str,
    ) -> Result<Media, MediaError> {
        let (bytes, mime_type) = self.download(url).await?;

        let file_name = format!("{}.{}", media_id.simple(), file_extension(url, mime_type.as_deref()));
        tokio::fs::create_dir_all(&self.media_dir).await?;
        let path = self.media_dir.join(&file_name);
        tokio::fs::write(&path, &bytes).await?;

        let media = Media {
            id: media_id,
            media_folder_id: folder_id,
            title: title.to_string(),
            file_name,
            mime_type,
            file_size: bytes.len() as u64,
            path: path.to_string_lossy().into_owned(),
        };
        self.media.upsert(vec![into_patch(&media)?]).await?;

        tracing::debug!(media_id = %media_id, url, size = media.file_size, "Stored media from url");
        Ok(media)
    }
}

fn file_extension(url: &str, mime_type: Option<&str>) -> String {
    let from_url = url
        .split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    if let Some(ext) = from_url {
        return ext;
    }

    match mime_type {
        Some("image/svg+xml") => "svg",
        Some("image/png") => "png",
        Some("image/jpeg") => "jpg",
        Some("image/gif") => "gif",
        Some("image/webp") => "webp",
        _ => "bin",
    }
    .to_string()
}
