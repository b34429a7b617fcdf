//! The worker pool.
//!
//! A fixed number of consumer loops share one queue. Unbounded
//! per-job task spawning is deliberately avoided; concurrency is
//! bounded by the pool size.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use textsum_queue::{SummarizeJob, WorkQueue};

use crate::config::WorkerConfig;
use crate::processor::Processor;

/// Fixed-size pool of queue consumers.
pub struct WorkerPool {
    config: WorkerConfig,
    queue: Arc<dyn WorkQueue>,
    processor: Arc<Processor>,
    shutdown: watch::Sender<bool>,
    pool_name: String,
}

impl WorkerPool {
    pub fn new(
        config: WorkerConfig,
        queue: Arc<dyn WorkQueue>,
        processor: Processor,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        let pool_name = format!("worker-{}", Uuid::new_v4());
        Self {
            config,
            queue,
            processor: Arc::new(processor),
            shutdown,
            pool_name,
        }
    }

    /// Signal all loops to stop after their current job.
    pub fn shutdown(&self) {
        self.shutdown.send(true).ok();
    }

    /// Run the pool until shutdown; waits for in-flight jobs to drain.
    pub async fn run(&self) {
        info!(
            "Starting worker pool '{}' with {} consumers",
            self.pool_name, self.config.concurrency
        );

        let mut handles = Vec::new();

        for i in 0..self.config.concurrency {
            let consumer_name = format!("{}-{}", self.pool_name, i);
            let queue = Arc::clone(&self.queue);
            let processor = Arc::clone(&self.processor);
            let config = self.config.clone();
            let shutdown_rx = self.shutdown.subscribe();

            handles.push(tokio::spawn(async move {
                consume_loop(consumer_name, queue, processor, config, shutdown_rx).await;
            }));
        }

        // Periodically reclaim deliveries stuck with crashed consumers.
        {
            let consumer_name = format!("{}-claim", self.pool_name);
            let queue = Arc::clone(&self.queue);
            let processor = Arc::clone(&self.processor);
            let config = self.config.clone();
            let shutdown_rx = self.shutdown.subscribe();

            handles.push(tokio::spawn(async move {
                claim_loop(consumer_name, queue, processor, config, shutdown_rx).await;
            }));
        }

        // Block until shutdown is signalled, then give in-flight jobs a
        // bounded window to drain.
        let mut shutdown_rx = self.shutdown.subscribe();
        while !*shutdown_rx.borrow() {
            if shutdown_rx.changed().await.is_err() {
                break;
            }
        }

        let drain = async {
            for handle in handles {
                handle.await.ok();
            }
        };
        if tokio::time::timeout(self.config.shutdown_timeout, drain)
            .await
            .is_err()
        {
            warn!("Shutdown timeout elapsed with jobs still in flight");
        }

        info!("Worker pool stopped");
    }
}

async fn consume_loop(
    consumer_name: String,
    queue: Arc<dyn WorkQueue>,
    processor: Arc<Processor>,
    config: WorkerConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let block_ms = config.consume_block.as_millis() as u64;
    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        let consumed = tokio::select! {
            _ = shutdown_rx.changed() => continue,
            result = queue.consume(&consumer_name, block_ms, 1) => result,
        };
        match consumed {
            Ok(jobs) if jobs.is_empty() => {
                idle_sleep(&mut shutdown_rx, config.poll_interval).await;
            }
            Ok(jobs) => {
                for (delivery_id, job) in jobs {
                    handle_delivery(&queue, &processor, &delivery_id, &job).await;
                }
            }
            Err(e) => {
                error!("{}: error consuming jobs: {}", consumer_name, e);
                idle_sleep(&mut shutdown_rx, config.poll_interval).await;
            }
        }
    }
    info!("{}: consumer stopped", consumer_name);
}

async fn claim_loop(
    consumer_name: String,
    queue: Arc<dyn WorkQueue>,
    processor: Arc<Processor>,
    config: WorkerConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let min_idle_ms = config.claim_min_idle.as_millis() as u64;
    let mut interval = tokio::time::interval(config.claim_interval);
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                match queue.claim_pending(&consumer_name, min_idle_ms, 5).await {
                    Ok(jobs) if !jobs.is_empty() => {
                        info!("Claimed {} pending deliveries", jobs.len());
                        for (delivery_id, job) in jobs {
                            handle_delivery(&queue, &processor, &delivery_id, &job).await;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Failed to claim pending deliveries: {}", e);
                    }
                }
            }
        }
    }
}

async fn handle_delivery(
    queue: &Arc<dyn WorkQueue>,
    processor: &Arc<Processor>,
    delivery_id: &str,
    job: &SummarizeJob,
) {
    let outcome = processor.process(job).await;
    if outcome.should_ack() {
        if let Err(e) = queue.ack(delivery_id).await {
            error!("Failed to ack delivery {}: {}", delivery_id, e);
        }
    }
}

async fn idle_sleep(shutdown_rx: &mut watch::Receiver<bool>, interval: Duration) {
    tokio::select! {
        _ = shutdown_rx.changed() => {}
        _ = tokio::time::sleep(interval) => {}
    }
}
