//! Sync module
//!
//! Reconcile loops, their pause schedule, and the supervisor that runs them.

mod reconciler;
mod schedule;
mod supervisor;

#[cfg(test)]
pub(crate) mod testing;

pub use reconciler::{create_fields, update_fields, Reconciler, RoundOutcome, SyncReport};
pub use schedule::{Pause, PollSchedule};
pub use supervisor::{Supervisor, SupervisorConfig};
