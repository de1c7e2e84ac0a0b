//! Core library for the To Do → Notion mirror
//!
//! This crate contains the synchronization engine, including:
//! - Task and task-list model for the source service
//! - Sparse record fields and the destination store interface
//! - Per-list reconcile loops and the supervisor that runs them

pub mod error;
pub mod record;
pub mod sync;
pub mod task;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
