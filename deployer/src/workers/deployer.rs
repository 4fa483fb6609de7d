//! Deployer worker
//!
//! Receives queued deployment ids and runs each one on its own task, bounded
//! by a semaphore. A watchdog per job cancels the record once the job timeout
//! elapses; the orchestrator stops at its next checkpoint.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, info_span, warn, Instrument};

use crate::deploy::fsm::DeploymentStatus;
use crate::deploy::orchestrator::Orchestrator;
use crate::models::deployment::{LogEntry, LogLevel, RecordUpdate};
use crate::store::DeploymentStore;
use crate::utils::format_duration;

/// Deployer worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Jobs allowed to run at the same time
    pub max_concurrent_jobs: usize,

    /// Wall-clock limit per job
    pub job_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            job_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Run the deployer worker until shutdown or until the queue closes
pub async fn run(
    options: &Options,
    orchestrator: Arc<Orchestrator>,
    mut jobs: mpsc::Receiver<String>,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) {
    info!(
        "Deployer worker starting (max {} concurrent jobs)...",
        options.max_concurrent_jobs
    );

    let permits = Arc::new(Semaphore::new(options.max_concurrent_jobs.max(1)));
    let draining = Arc::new(AtomicBool::new(false));
    let mut in_flight: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_signal => {
                info!("Deployer worker shutting down...");
                break;
            }
            job = jobs.recv() => {
                let Some(id) = job else {
                    info!("Job queue closed, deployer worker stopping...");
                    break;
                };
                let span = info_span!("deployment", id = %id);
                in_flight.spawn(
                    process_job(
                        orchestrator.clone(),
                        id,
                        options.job_timeout,
                        permits.clone(),
                        draining.clone(),
                    )
                    .instrument(span),
                );
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    error!("Deployment task panicked: {}", e);
                }
            }
        }
    }

    // Jobs still waiting for a permit or in the channel are failed instead of started
    draining.store(true, Ordering::SeqCst);
    jobs.close();
    while let Ok(id) = jobs.try_recv() {
        abandon(orchestrator.store().as_ref(), &id).await;
    }
    if !in_flight.is_empty() {
        info!("Waiting for {} in-flight deployment(s)...", in_flight.len());
    }
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            error!("Deployment task panicked: {}", e);
        }
    }
    info!("Deployer worker stopped");
}

async fn process_job(
    orchestrator: Arc<Orchestrator>,
    id: String,
    job_timeout: Duration,
    permits: Arc<Semaphore>,
    draining: Arc<AtomicBool>,
) {
    let _permit = match permits.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return,
    };

    if draining.load(Ordering::SeqCst) {
        abandon(orchestrator.store().as_ref(), &id).await;
        return;
    }

    let watchdog = spawn_watchdog(orchestrator.store().clone(), id.clone(), job_timeout);
    match orchestrator.run_job(&id).await {
        Ok(record) => info!("Deployment {} finished as {}", id, record.status),
        Err(e) => error!("Deployment {} could not be run: {}", id, e),
    }
    watchdog.abort();
}

/// Cancel the record when the job outlives its timeout
fn spawn_watchdog(
    store: Arc<dyn DeploymentStore>,
    id: String,
    job_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(job_timeout).await;

        match store.get(&id).await {
            Ok(record) if !record.status.is_terminal() => {}
            _ => return,
        }
        warn!("Deployment {} exceeded {}, cancelling", id, format_duration(job_timeout));
        if store.cancel(&id).await.is_ok() {
            let message = format!("Deployment timed out after {}", format_duration(job_timeout));
            let _ = store.append_log(&id, LogEntry::new(LogLevel::Error, message)).await;
        }
    })
}

async fn abandon(store: &dyn DeploymentStore, id: &str) {
    let update = RecordUpdate {
        error_message: Some("Daemon shut down before the deployment started".to_string()),
        completed_at: Some(Utc::now()),
        ..Default::default()
    };
    if let Err(e) = store.update_status(id, DeploymentStatus::Failed, update).await {
        warn!("Could not fail abandoned deployment {}: {}", id, e);
    }
}
