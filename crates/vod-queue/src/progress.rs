//! Progress events via Redis Pub/Sub.

use redis::AsyncCommands;
use tracing::debug;

use vod_models::{JobEvent, JobId};

use crate::error::QueueResult;

/// Channel for publishing/subscribing to job progress events.
///
/// Callers persist state first and publish second, so a subscriber never
/// observes a state that is not yet durable.
pub struct ProgressChannel {
    client: redis::Client,
}

impl ProgressChannel {
    /// Create a new progress channel.
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Get the channel name for a job.
    pub fn channel_name(job_id: &JobId) -> String {
        format!("vod:progress:{}", job_id)
    }

    /// Publish an event.
    pub async fn publish(&self, event: &JobEvent) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let channel = Self::channel_name(&event.job_id);
        let payload = serde_json::to_string(event)?;

        debug!("Publishing progress event to {}", channel);
        conn.publish::<_, _, ()>(channel, payload).await?;

        Ok(())
    }

    /// Publish a status/progress update.
    pub async fn status(
        &self,
        job_id: &JobId,
        status: impl Into<String>,
        progress: u8,
    ) -> QueueResult<()> {
        self.publish(&JobEvent::status(job_id, status, progress)).await
    }

    /// Publish a completion event.
    pub async fn completed(&self, job_id: &JobId, status: impl Into<String>) -> QueueResult<()> {
        self.publish(&JobEvent::completed(job_id, status)).await
    }

    /// Publish a failure event.
    pub async fn failed(
        &self,
        job_id: &JobId,
        status: impl Into<String>,
        progress: u8,
        error: impl Into<String>,
    ) -> QueueResult<()> {
        self.publish(&JobEvent::failed(job_id, status, progress, error))
            .await
    }

    /// Subscribe to progress events for a job.
    /// Returns a pinned stream that can be polled with `.next()`.
    pub async fn subscribe(
        &self,
        job_id: &JobId,
    ) -> QueueResult<std::pin::Pin<Box<dyn futures_util::Stream<Item = JobEvent> + Send>>> {
        use futures_util::StreamExt;

        let mut pubsub = self.client.get_async_pubsub().await?;
        let channel = Self::channel_name(job_id);

        pubsub.subscribe(&channel).await?;

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let payload: String = msg.get_payload().ok()?;
            serde_json::from_str(&payload).ok()
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_name() {
        let id = JobId::from_string("abc");
        assert_eq!(ProgressChannel::channel_name(&id), "vod:progress:abc");
    }
}
