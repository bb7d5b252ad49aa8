//! Repository seams to the persisted Media Unit / Subtitle records.
//!
//! The relational datastore belongs to the CRUD layer; workers reach it
//! through these traits. Production deployments use [`HttpRepository`]
//! against the CRUD layer's internal API; tests and single-node setups
//! use [`InMemoryRepository`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use vod_models::{MediaId, MediaUnit, SubtitleId, SubtitleRecord};

use crate::error::{WorkerError, WorkerResult};

/// Read/write access to the pipeline-owned slice of a media unit.
#[async_trait]
pub trait MediaRepository: Send + Sync {
    async fn fetch_media(&self, media_id: &MediaId) -> WorkerResult<Option<MediaUnit>>;
    async fn update_media(&self, unit: &MediaUnit) -> WorkerResult<()>;
}

/// Read/write access to subtitle records.
#[async_trait]
pub trait SubtitleRepository: Send + Sync {
    async fn fetch_subtitle(&self, subtitle_id: &SubtitleId) -> WorkerResult<Option<SubtitleRecord>>;
    async fn update_subtitle(&self, record: &SubtitleRecord) -> WorkerResult<()>;
}

/// Repository over the CRUD layer's internal record API.
pub struct HttpRepository {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl HttpRepository {
    /// Create from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let base_url = std::env::var("INTERNAL_API_URL")
            .map_err(|_| WorkerError::config_error("INTERNAL_API_URL not set"))?;
        let token = std::env::var("INTERNAL_API_TOKEN")
            .map_err(|_| WorkerError::config_error("INTERNAL_API_TOKEN not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl MediaRepository for HttpRepository {
    async fn fetch_media(&self, media_id: &MediaId) -> WorkerResult<Option<MediaUnit>> {
        let response = self
            .client
            .get(self.url(&format!("/internal/media/{}", media_id)))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|e| WorkerError::repository(e.to_string()))?;

        Ok(Some(response.json().await?))
    }

    async fn update_media(&self, unit: &MediaUnit) -> WorkerResult<()> {
        self.client
            .patch(self.url(&format!("/internal/media/{}", unit.media_id)))
            .bearer_auth(&self.token)
            .json(unit)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| WorkerError::repository(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl SubtitleRepository for HttpRepository {
    async fn fetch_subtitle(&self, subtitle_id: &SubtitleId) -> WorkerResult<Option<SubtitleRecord>> {
        let response = self
            .client
            .get(self.url(&format!("/internal/subtitles/{}", subtitle_id)))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|e| WorkerError::repository(e.to_string()))?;

        Ok(Some(response.json().await?))
    }

    async fn update_subtitle(&self, record: &SubtitleRecord) -> WorkerResult<()> {
        self.client
            .patch(self.url(&format!("/internal/subtitles/{}", record.subtitle_id)))
            .bearer_auth(&self.token)
            .json(record)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| WorkerError::repository(e.to_string()))?;
        Ok(())
    }
}

/// In-memory repository for tests and single-node development.
#[derive(Default)]
pub struct InMemoryRepository {
    media: Arc<RwLock<HashMap<String, MediaUnit>>>,
    subtitles: Arc<RwLock<HashMap<String, SubtitleRecord>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a media unit.
    pub async fn insert_media(&self, unit: MediaUnit) {
        self.media
            .write()
            .await
            .insert(unit.media_id.to_string(), unit);
    }

    /// Seed a subtitle record.
    pub async fn insert_subtitle(&self, record: SubtitleRecord) {
        self.subtitles
            .write()
            .await
            .insert(record.subtitle_id.to_string(), record);
    }
}

#[async_trait]
impl MediaRepository for InMemoryRepository {
    async fn fetch_media(&self, media_id: &MediaId) -> WorkerResult<Option<MediaUnit>> {
        Ok(self.media.read().await.get(media_id.as_str()).cloned())
    }

    async fn update_media(&self, unit: &MediaUnit) -> WorkerResult<()> {
        self.media
            .write()
            .await
            .insert(unit.media_id.to_string(), unit.clone());
        Ok(())
    }
}

#[async_trait]
impl SubtitleRepository for InMemoryRepository {
    async fn fetch_subtitle(&self, subtitle_id: &SubtitleId) -> WorkerResult<Option<SubtitleRecord>> {
        Ok(self
            .subtitles
            .read()
            .await
            .get(subtitle_id.as_str())
            .cloned())
    }

    async fn update_subtitle(&self, record: &SubtitleRecord) -> WorkerResult<()> {
        self.subtitles
            .write()
            .await
            .insert(record.subtitle_id.to_string(), record.clone());
        Ok(())
    }
}
