//! The scheduling loop: pick two endpoints, admit, spawn, pause, repeat.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::admission::AdmissionGate;
use crate::config::{self, TrafficConfig};
use crate::hourly_log::HourlyLogger;
use crate::limiter::RateLimiter;
use crate::stats::TrafficStats;
use crate::transfer::{run_transfer, TransferOutcome};

use super::choose::{pick_two_distinct, MIN_ENDPOINTS};

/// Why a scheduler invocation returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Fewer than two endpoints are configured.
    InsufficientEndpoints,
    /// The shutdown token was cancelled.
    Shutdown,
}

/// Shared state a scheduler invocation runs against. Cheap to clone.
#[derive(Clone)]
pub struct SchedulerContext {
    pub stats: Arc<TrafficStats>,
    pub shutdown: CancellationToken,
    /// If set, every finished transfer's outcome is sent here.
    pub outcome_tx: Option<mpsc::UnboundedSender<TransferOutcome>>,
}

impl SchedulerContext {
    pub fn new(stats: Arc<TrafficStats>, shutdown: CancellationToken) -> Self {
        Self {
            stats,
            shutdown,
            outcome_tx: None,
        }
    }

    pub fn with_outcomes(mut self, tx: mpsc::UnboundedSender<TransferOutcome>) -> Self {
        self.outcome_tx = Some(tx);
        self
    }
}

/// Loads the configuration at `config_path`, then runs [`run_scheduler`].
/// A load or validation failure is returned as an error.
pub async fn run_from_path(config_path: PathBuf, ctx: SchedulerContext) -> Result<LoopExit> {
    let cfg = config::load(&config_path)?;
    tracing::debug!("loaded config: {:?}", cfg);
    run_scheduler(&cfg, &ctx).await
}

/// Runs scheduling rounds until shutdown, or returns at once if fewer than two
/// endpoints are configured. Each round waits for an admission slot per pick
/// but never for the transfers themselves.
///
/// The hourly logger runs for the lifetime of this call.
pub async fn run_scheduler(cfg: &TrafficConfig, ctx: &SchedulerContext) -> Result<LoopExit> {
    for (i, url) in cfg.urls.iter().enumerate() {
        tracing::info!("URL {}: {}", i + 1, url);
    }

    let logger_token = ctx.shutdown.child_token();
    tokio::spawn(HourlyLogger::new(&cfg.log_file, Arc::clone(&ctx.stats)).run(logger_token.clone()));
    let _stop_logger = logger_token.drop_guard();

    let gate = AdmissionGate::new(cfg.max_concurrency);
    let mut rng = StdRng::from_entropy();

    loop {
        let Some((first, second)) = pick_two_distinct(cfg.urls.len(), &mut rng) else {
            tracing::warn!(
                configured = cfg.urls.len(),
                "need at least {} URLs",
                MIN_ENDPOINTS
            );
            return Ok(LoopExit::InsufficientEndpoints);
        };

        for idx in [first, second] {
            let slot = tokio::select! {
                biased;
                _ = ctx.shutdown.cancelled() => return Ok(LoopExit::Shutdown),
                slot = gate.acquire() => slot,
            };
            let url = cfg.urls[idx].clone();
            let limiter = RateLimiter::from_mbps(cfg.sample_speed_mbps(&mut rng));
            let stats = Arc::clone(&ctx.stats);
            let outcome_tx = ctx.outcome_tx.clone();
            let cancel = ctx.shutdown.clone();
            tokio::spawn(async move {
                let outcome = run_transfer(url, limiter, stats, slot, cancel).await;
                if let Some(tx) = outcome_tx {
                    let _ = tx.send(outcome);
                }
            });
        }

        let pause = cfg.sample_interval(&mut rng);
        tracing::debug!("sleep {:?}", pause);
        tokio::select! {
            biased;
            _ = ctx.shutdown.cancelled() => return Ok(LoopExit::Shutdown),
            _ = tokio::time::sleep(pause) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ctx() -> SchedulerContext {
        SchedulerContext::new(Arc::new(TrafficStats::new()), CancellationToken::new())
    }

    #[tokio::test]
    async fn single_endpoint_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = TrafficConfig::default();
        cfg.urls = vec!["http://127.0.0.1:9/only".into()];
        cfg.log_file = dir.path().join("traffic.log");
        let exit = tokio::time::timeout(Duration::from_secs(1), run_scheduler(&cfg, &ctx()))
            .await
            .expect("should not loop")
            .unwrap();
        assert_eq!(exit, LoopExit::InsufficientEndpoints);
    }

    #[tokio::test]
    async fn cancelled_token_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = TrafficConfig::default();
        cfg.urls = vec!["http://127.0.0.1:9/a".into(), "http://127.0.0.1:9/b".into()];
        cfg.log_file = dir.path().join("traffic.log");
        cfg.min_interval_sec = 3600;
        cfg.max_interval_sec = 3600;
        let ctx = ctx();
        ctx.shutdown.cancel();
        let exit = tokio::time::timeout(Duration::from_secs(1), run_scheduler(&cfg, &ctx))
            .await
            .expect("should stop")
            .unwrap();
        assert_eq!(exit, LoopExit::Shutdown);
    }

    #[tokio::test]
    async fn missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let res = run_from_path(dir.path().join("absent.toml"), ctx()).await;
        assert!(res.is_err());
    }
}
