//! Status-bucket counts for operational dashboards.

use std::collections::HashMap;

use redis::AsyncCommands;

use crate::error::QueueResult;

/// Per-pipeline job counts by status, kept in a Redis hash.
///
/// Workers bump buckets on every transition; the API layer reads the
/// whole hash for its dashboard without touching the datastore.
pub struct StatusBoard {
    client: redis::Client,
    key: String,
}

impl StatusBoard {
    /// Create a board for one pipeline ("encode", "subtitle").
    pub fn new(redis_url: &str, pipeline: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            key: format!("vod:status:{}", pipeline),
        })
    }

    /// Move a job from one bucket to another.
    ///
    /// Pass `None` as `from` for a job entering its first bucket.
    pub async fn transition(&self, from: Option<&str>, to: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        if let Some(from) = from {
            conn.hincr::<_, _, _, ()>(&self.key, from, -1).await?;
        }
        conn.hincr::<_, _, _, ()>(&self.key, to, 1).await?;
        Ok(())
    }

    /// All bucket counts for this pipeline.
    pub async fn counts(&self) -> QueueResult<HashMap<String, i64>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let counts: HashMap<String, i64> = conn.hgetall(&self.key).await?;
        Ok(counts)
    }
}
