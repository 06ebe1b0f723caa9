//! Restart-on-failure wrapper around the scheduler.
//!
//! Each scheduler invocation runs as its own tokio task, so an error, a
//! config that fails to load, or a panic all come back as a [`RunOutcome`].
//! After anything but a shutdown the supervisor waits `backoff` and starts a
//! fresh invocation, which reloads the configuration.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::scheduler::{self, LoopExit, SchedulerContext};
use crate::stats::TrafficStats;
use crate::task::join_failure;
use crate::transfer::TransferOutcome;

/// Pause between a failed scheduler invocation and the next one.
pub const RESTART_BACKOFF: Duration = Duration::from_secs(30);

/// How one scheduler invocation ended.
#[derive(Debug)]
pub enum RunOutcome {
    Exited(LoopExit),
    Failed(anyhow::Error),
    Panicked(String),
}

/// Runs `invocation` as a task and reports how it ended.
pub async fn run_and_report<F>(invocation: F) -> RunOutcome
where
    F: Future<Output = anyhow::Result<LoopExit>> + Send + 'static,
{
    match tokio::spawn(invocation).await {
        Ok(Ok(exit)) => RunOutcome::Exited(exit),
        Ok(Err(e)) => RunOutcome::Failed(e),
        Err(join_err) => RunOutcome::Panicked(join_failure(join_err)),
    }
}

pub struct Supervisor {
    config_path: PathBuf,
    stats: Arc<TrafficStats>,
    shutdown: CancellationToken,
    backoff: Duration,
    outcome_tx: Option<mpsc::UnboundedSender<TransferOutcome>>,
}

impl Supervisor {
    pub fn new(config_path: PathBuf, stats: Arc<TrafficStats>, shutdown: CancellationToken) -> Self {
        Self {
            config_path,
            stats,
            shutdown,
            backoff: RESTART_BACKOFF,
            outcome_tx: None,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Forward every finished transfer's outcome to `tx`.
    pub fn with_outcomes(mut self, tx: mpsc::UnboundedSender<TransferOutcome>) -> Self {
        self.outcome_tx = Some(tx);
        self
    }

    /// Runs scheduler invocations until shutdown. Returns how many were started.
    pub async fn run(&self) -> u32 {
        let mut invocations = 0u32;
        while !self.shutdown.is_cancelled() {
            let mut ctx = SchedulerContext::new(Arc::clone(&self.stats), self.shutdown.clone());
            if let Some(tx) = &self.outcome_tx {
                ctx = ctx.with_outcomes(tx.clone());
            }
            invocations += 1;
            let outcome =
                run_and_report(scheduler::run_from_path(self.config_path.clone(), ctx)).await;

            match outcome {
                RunOutcome::Exited(LoopExit::Shutdown) => break,
                RunOutcome::Exited(LoopExit::InsufficientEndpoints) => {
                    tracing::warn!("scheduler stopped: not enough endpoints configured");
                }
                RunOutcome::Failed(e) => tracing::error!("scheduler failed: {:#}", e),
                RunOutcome::Panicked(msg) => tracing::error!("scheduler panicked: {}", msg),
            }

            tracing::info!("restarting scheduler in {:?}", self.backoff);
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.backoff) => {}
            }
        }
        tracing::info!(invocations, "supervisor stopped");
        invocations
    }
}
