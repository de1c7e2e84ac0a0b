//! Destination record field set

use chrono::NaiveDateTime;

/// Priority select option on a destination record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    P0,
    P2,
}

impl Priority {
    /// Select-option name as it appears in the destination database
    pub fn option_name(&self) -> &'static str {
        match self {
            Self::P0 => "P0 🔥",
            Self::P2 => "P2",
        }
    }
}

/// Opaque handle to an existing destination record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordRef {
    pub id: String,
}

impl RecordRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Sparse set of record fields.
///
/// Only fields that are `Some` are written; `None` leaves the destination value
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFields {
    pub title: Option<String>,
    pub task_id: Option<String>,
    pub done: Option<bool>,
    pub deleted: Option<bool>,
    pub priority: Option<Priority>,
    pub task_list_name: Option<String>,
    pub scheduled: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
}

impl RecordFields {
    /// Field set for a deletion: the deleted flag and nothing else
    pub fn deletion() -> Self {
        Self {
            deleted: Some(true),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay the present fields of `other` onto `self`
    pub fn merge(&mut self, other: RecordFields) {
        fn overlay<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        overlay(&mut self.title, other.title);
        overlay(&mut self.task_id, other.task_id);
        overlay(&mut self.done, other.done);
        overlay(&mut self.deleted, other.deleted);
        overlay(&mut self.priority, other.priority);
        overlay(&mut self.task_list_name, other.task_list_name);
        overlay(&mut self.scheduled, other.scheduled);
        overlay(&mut self.completed_at, other.completed_at);
    }
}
