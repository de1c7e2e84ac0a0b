//! Task model definitions

use chrono::{Duration, NaiveDateTime};

use crate::record::Priority;
use crate::{Error, Result};

/// Removal reason the source reports for a deleted task
pub const REMOVED_DELETED: &str = "deleted";

/// Layout of the source's `dateTime` strings, e.g. `2024-01-01T10:00:00.0000000`
pub const SOURCE_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A named collection of tasks on the source service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskList {
    pub id: String,
    pub display_name: String,
}

impl TaskList {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Task status as reported by the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
    WaitingOnOthers,
    Deferred,
    Other(String),
}

impl TaskStatus {
    /// Parse a raw status value; an empty string means the field was absent
    pub fn parse(raw: &str) -> Option<Self> {
        let status = match raw {
            "" => return None,
            "notStarted" => Self::NotStarted,
            "inProgress" => Self::InProgress,
            "completed" => Self::Completed,
            "waitingOnOthers" => Self::WaitingOnOthers,
            "deferred" => Self::Deferred,
            other => Self::Other(other.to_string()),
        };
        Some(status)
    }
}

/// Task importance as reported by the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Importance {
    Low,
    Normal,
    High,
    Other(String),
}

impl Importance {
    /// Parse a raw importance value; an empty string means the field was absent
    pub fn parse(raw: &str) -> Option<Self> {
        let importance = match raw {
            "" => return None,
            "low" => Self::Low,
            "normal" => Self::Normal,
            "high" => Self::High,
            other => Self::Other(other.to_string()),
        };
        Some(importance)
    }

    /// Destination priority for this importance. Only `high` is escalated.
    pub fn priority(&self) -> Priority {
        match self {
            Self::High => Priority::P0,
            _ => Priority::P2,
        }
    }
}

/// A task as returned by one delta fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub display_name: String,
    pub status: Option<TaskStatus>,
    pub importance: Option<Importance>,
    /// Raw due `dateTime`
    pub due: Option<String>,
    /// Raw completion `dateTime`
    pub completed: Option<String>,
    /// Removal reason, present only on tombstones
    pub removed: Option<String>,
}

impl Task {
    /// Create a task with the given id and display name
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            status: None,
            importance: None,
            due: None,
            completed: None,
            removed: None,
        }
    }

    /// Set the status
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the importance
    pub fn with_importance(mut self, importance: Importance) -> Self {
        self.importance = Some(importance);
        self
    }

    /// Set the raw due date-time
    pub fn with_due(mut self, due: impl Into<String>) -> Self {
        self.due = Some(due.into());
        self
    }

    /// Set the raw completion date-time
    pub fn with_completed(mut self, completed: impl Into<String>) -> Self {
        self.completed = Some(completed.into());
        self
    }

    /// Mark the task as removed for the given reason
    pub fn with_removed(mut self, reason: impl Into<String>) -> Self {
        self.removed = Some(reason.into());
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.removed.as_deref() == Some(REMOVED_DELETED)
    }

    pub fn is_completed(&self) -> bool {
        self.status == Some(TaskStatus::Completed)
    }

    /// Scheduled time for the destination: one day after the due date-time
    pub fn scheduled_time(&self) -> Result<Option<NaiveDateTime>> {
        self.due
            .as_deref()
            .map(|raw| parse_source_date_time(raw).map(|due| due + Duration::days(1)))
            .transpose()
    }

    pub fn completed_time(&self) -> Result<Option<NaiveDateTime>> {
        self.completed
            .as_deref()
            .map(parse_source_date_time)
            .transpose()
    }
}

/// Parse a source `dateTime` string with the fixed fractional-second layout
pub fn parse_source_date_time(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, SOURCE_DATE_TIME_FORMAT).map_err(|source| {
        Error::InvalidTimestamp {
            value: raw.to_string(),
            source,
        }
    })
}
