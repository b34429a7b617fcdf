//! Summarization worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use textsum_queue::RedisWorkQueue;
use textsum_store::{RedisJobStore, RedisStatusCache};
use textsum_summarizer::HttpSummarizer;
use textsum_worker::{Processor, WorkerConfig, WorkerPool};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS Redis/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting textsum-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let queue = match RedisWorkQueue::from_env() {
        Ok(q) => q,
        Err(e) => {
            error!("Failed to create work queue: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = queue.init().await {
        error!("Failed to initialize work queue: {}", e);
        std::process::exit(1);
    }

    let store = match RedisJobStore::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create job store: {}", e);
            std::process::exit(1);
        }
    };

    let cache = match RedisStatusCache::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create status cache: {}", e);
            std::process::exit(1);
        }
    };

    let summarizer = match HttpSummarizer::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create summarizer client: {}", e);
            std::process::exit(1);
        }
    };

    let processor = Processor::new(Arc::new(store), Arc::new(cache), Arc::new(summarizer));
    let pool = Arc::new(WorkerPool::new(config, Arc::new(queue), processor));

    // Stop consuming on ctrl-c; run() drains in-flight jobs.
    let shutdown_pool = Arc::clone(&pool);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_pool.shutdown();
    });

    pool.run().await;

    info!("Worker shutdown complete");
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("textsum=info".parse().unwrap());

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
}
