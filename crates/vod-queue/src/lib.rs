//! Redis job queue and progress pub/sub.
//!
//! This crate provides:
//! - A durable FIFO queue per named topic (blocking pop, at-least-once)
//! - Progress events via Redis Pub/Sub
//! - Status-bucket counts for operational dashboards

pub mod error;
pub mod progress;
pub mod queue;
pub mod status;

pub use error::{QueueError, QueueResult};
pub use progress::ProgressChannel;
pub use queue::{JobQueue, QueueConfig, ENCODE_TOPIC, SUBTITLE_TOPIC};
pub use status::StatusBoard;
