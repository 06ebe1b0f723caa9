pub mod config;
pub mod logging;

pub mod admission;
pub mod hourly_log;
pub mod limiter;
pub mod scheduler;
pub mod stats;
pub mod supervisor;
mod task;
pub mod transfer;
