mod cli;

use crate::cli::Cli;

fn main() {
    let runtime = match cli::build_runtime() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("tgen error: failed to start async runtime: {}", err);
            std::process::exit(1);
        }
    };

    // Parse CLI and dispatch.
    let result = runtime.block_on(Cli::run_from_args());
    // Blocking transfer workers still running after the grace period are abandoned.
    runtime.shutdown_timeout(cli::SHUTDOWN_GRACE);

    if let Err(err) = result {
        eprintln!("tgen error: {:#}", err);
        std::process::exit(1);
    }
}
