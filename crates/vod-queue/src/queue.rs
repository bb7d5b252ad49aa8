//! FIFO job queue over Redis lists.
//!
//! `push` LPUSHes a JSON payload; `blocking_pop` BRPOPs it. A popped
//! payload is gone; the queue is not a log. Delivery is at-least-once at
//! the system level: a worker that dies mid-job leaves the persisted
//! record stuck in a processing state for an operator or sweep to
//! re-issue, and the pop itself is the sole concurrency-control point.

use std::time::Duration;

use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};

/// Topic consumed by the transcoding worker.
pub const ENCODE_TOPIC: &str = "encode";

/// Topic consumed by the subtitle worker.
pub const SUBTITLE_TOPIC: &str = "subtitle";

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Key namespace prefix
    pub namespace: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            namespace: "vod".to_string(),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            namespace: std::env::var("QUEUE_NAMESPACE").unwrap_or_else(|_| "vod".to_string()),
        }
    }
}

/// Job queue client.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    fn topic_key(&self, topic: &str) -> String {
        format!("{}:queue:{}", self.config.namespace, topic)
    }

    /// Push a job payload onto a topic.
    pub async fn push<T: Serialize>(&self, topic: &str, payload: &T) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = self.topic_key(topic);
        let json = serde_json::to_string(payload)?;

        conn.lpush::<_, _, ()>(&key, &json).await?;
        info!("Enqueued job on topic {}", topic);
        Ok(())
    }

    /// Block-pop one job payload from a topic.
    ///
    /// Returns `None` when the timeout elapses with nothing available.
    /// A payload that fails to deserialize is dropped with a warning so a
    /// single poison message cannot wedge the topic.
    pub async fn blocking_pop<T: DeserializeOwned>(
        &self,
        topic: &str,
        timeout: Duration,
    ) -> QueueResult<Option<T>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = self.topic_key(topic);

        let result: Option<(String, String)> =
            conn.brpop(&key, timeout.as_secs_f64()).await?;

        match result {
            Some((_, json)) => match serde_json::from_str(&json) {
                Ok(job) => {
                    debug!("Popped job from topic {}", topic);
                    Ok(Some(job))
                }
                Err(e) => {
                    warn!("Dropping malformed payload on topic {}: {}", topic, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Number of jobs waiting on a topic.
    pub async fn len(&self, topic: &str) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.llen(self.topic_key(topic)).await?;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_key_namespacing() {
        let queue = JobQueue::new(QueueConfig::default()).unwrap();
        assert_eq!(queue.topic_key(ENCODE_TOPIC), "vod:queue:encode");
        assert_eq!(queue.topic_key(SUBTITLE_TOPIC), "vod:queue:subtitle");
    }

    #[test]
    fn test_config_default() {
        let config = QueueConfig::default();
        assert_eq!(config.namespace, "vod");
        assert!(config.redis_url.starts_with("redis://"));
    }
}
