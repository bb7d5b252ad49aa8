//! Media processing worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vod_queue::JobQueue;
use vod_worker::{run_encode_loop, run_subtitle_loop, WorkerConfig, WorkerContext, WorkerRole};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vod=info".parse().unwrap())
        .add_directive("aws_config=warn".parse().unwrap())
        .add_directive("hyper=warn".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vod-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let queue = match JobQueue::from_env() {
        Ok(q) => Arc::new(q),
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };

    let roles = config.roles.clone();
    let ctx = match WorkerContext::from_env(config) {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            error!("Failed to create worker context: {}", e);
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let mut handles = Vec::new();
    if roles.contains(&WorkerRole::Encode) {
        handles.push(tokio::spawn(run_encode_loop(
            Arc::clone(&ctx),
            Arc::clone(&queue),
            shutdown_rx.clone(),
        )));
    }
    if roles.contains(&WorkerRole::Subtitle) {
        handles.push(tokio::spawn(run_subtitle_loop(
            Arc::clone(&ctx),
            Arc::clone(&queue),
            shutdown_rx.clone(),
        )));
    }

    tokio::signal::ctrl_c().await.ok();
    info!("Received shutdown signal, finishing in-flight jobs");
    let _ = shutdown_tx.send(true);

    for handle in handles {
        handle.await.ok();
    }

    info!("Worker shutdown complete");
}
