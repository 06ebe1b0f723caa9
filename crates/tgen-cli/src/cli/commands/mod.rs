//! CLI command handlers, one per file.

mod check;
mod init;
mod run;

pub use check::run_check;
pub use init::run_init;
pub use run::{generate_until, run_generator};
