//! Traffic scheduler.
//!
//! Each round picks two distinct endpoints, admits them through the
//! [`AdmissionGate`](crate::admission::AdmissionGate) (waiting when it is
//! full) and spawns a rate-limited transfer for each, then pauses for a
//! random interval. Rounds overlap with the transfers they started; only the
//! gate bounds how many run at once.

mod choose;
mod run;

pub use choose::{pick_two_distinct, MIN_ENDPOINTS};
pub use run::{run_from_path, run_scheduler, LoopExit, SchedulerContext};
