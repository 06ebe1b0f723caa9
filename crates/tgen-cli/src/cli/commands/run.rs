//! `tgen run` – supervise the scheduler until Ctrl-C.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tgen_core::stats::TrafficStats;
use tgen_core::supervisor::Supervisor;
use tgen_core::transfer::TransferOutcome;
use tokio_util::sync::CancellationToken;

pub async fn run_generator(config_path: &Path) -> Result<()> {
    let shutdown = CancellationToken::new();

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            tracing::info!("interrupt received, shutting down");
            shutdown.cancel();
            // The listener replaced the default SIGINT action; restore "second Ctrl-C kills".
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("tgen: second interrupt, exiting now");
                std::process::exit(130);
            }
        });
    }

    generate_until(config_path, shutdown).await;
    Ok(())
}

/// Runs the supervisor and prints one line per finished transfer until
/// `shutdown` fires. Returns the number of scheduler invocations.
pub async fn generate_until(config_path: &Path, shutdown: CancellationToken) -> u32 {
    let stats = Arc::new(TrafficStats::new());

    let (outcome_tx, mut outcome_rx) = tokio::sync::mpsc::unbounded_channel::<TransferOutcome>();
    let printer = tokio::spawn(async move {
        while let Some(outcome) = outcome_rx.recv().await {
            let status = match &outcome.result {
                Ok(()) => "done".to_string(),
                Err(e) => format!("error: {}", e),
            };
            println!(
                "{:>12} bytes  {:>8.1}s  {}  {}",
                outcome.bytes,
                outcome.elapsed.as_secs_f64(),
                outcome.url,
                status
            );
        }
    });

    let supervisor = Supervisor::new(config_path.to_path_buf(), Arc::clone(&stats), shutdown)
        .with_outcomes(outcome_tx);
    let invocations = supervisor.run().await;
    drop(supervisor);
    // Aborted transfers may still hold sender clones; don't wait on them.
    printer.abort();

    tracing::info!(
        invocations,
        unlogged_bytes = stats.peek(),
        "tgen stopped"
    );
    invocations
}
