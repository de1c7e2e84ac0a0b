//! Source service interface
//!
//! Defines the operations the sync loops need from the task-list service.

use async_trait::async_trait;

use super::model::{Task, TaskList};
use crate::{Error, Result};

/// Position in a task list's change feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeltaCursor {
    /// No cursor yet; the next fetch enumerates from scratch
    #[default]
    Start,
    /// More pages remain in the current round
    Next(String),
    /// Stable checkpoint a later poll can resume from
    Delta(String),
}

impl DeltaCursor {
    /// Build the cursor carried by a delta response. A delta link wins when both are set.
    pub fn from_links(next_link: Option<String>, delta_link: Option<String>) -> Result<Self> {
        match (non_empty(next_link), non_empty(delta_link)) {
            (_, Some(link)) => Ok(Self::Delta(link)),
            (Some(link), None) => Ok(Self::Next(link)),
            (None, None) => Err(Error::MissingCursor),
        }
    }

    pub fn link(&self) -> Option<&str> {
        match self {
            Self::Start => None,
            Self::Next(link) | Self::Delta(link) => Some(link),
        }
    }

    /// Whether this cursor marks a completed round
    pub fn is_checkpoint(&self) -> bool {
        matches!(self, Self::Delta(_))
    }
}

fn non_empty(link: Option<String>) -> Option<String> {
    link.filter(|l| !l.is_empty())
}

/// One page of changed tasks plus the cursor to fetch next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaPage {
    pub tasks: Vec<Task>,
    pub cursor: DeltaCursor,
}

/// Read access to the task-list service
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// List every task list visible to the account
    async fn list_task_lists(&self) -> Result<Vec<TaskList>>;

    /// Fetch the delta page at `cursor` for the given list
    async fn delta(&self, list_id: &str, cursor: &DeltaCursor) -> Result<DeltaPage>;

    /// Fetch a checkpoint at the current head of the list's change feed
    async fn latest_delta(&self, list_id: &str) -> Result<DeltaCursor>;
}
