//! Record store trait
//!
//! Defines the interface for destination record operations.

use async_trait::async_trait;

use super::fields::{RecordFields, RecordRef};
use crate::{Error, Result};

/// Write access to the destination database
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Find the record mirroring a source task.
    ///
    /// More than one match is an error rather than a pick.
    async fn find_by_task_id(&self, task_id: &str) -> Result<Option<RecordRef>>;

    /// Create a new record
    async fn create(&self, fields: RecordFields) -> Result<()>;

    /// Write the present fields onto an existing record
    async fn update(&self, record: &RecordRef, fields: RecordFields) -> Result<()>;

    /// Flag the record for a task as deleted without touching any other field
    async fn mark_deleted(&self, task_id: &str) -> Result<()> {
        let record = self
            .find_by_task_id(task_id)
            .await?
            .ok_or_else(|| Error::RecordNotFound(task_id.to_string()))?;
        self.update(&record, RecordFields::deletion()).await
    }
}
