//! In-memory record store
//!
//! Keeps records in a map. Used for dry runs and tests; only a store built with
//! [`MemoryRecordStore::recording`] journals its calls.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::info;

use super::fields::{RecordFields, RecordRef};
use super::store::RecordStore;
use crate::{Error, Result};

/// A call made against a [`MemoryRecordStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Find(String),
    Create(RecordFields),
    Update(RecordRef, RecordFields),
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, RecordFields>,
    calls: Option<Vec<StoreCall>>,
    failing: HashSet<String>,
    next_id: u64,
}

/// In-memory record store
#[derive(Default)]
pub struct MemoryRecordStore {
    inner: RwLock<Inner>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that journals every call, for inspection with [`Self::calls`]
    pub fn recording() -> Self {
        Self {
            inner: RwLock::new(Inner {
                calls: Some(Vec::new()),
                ..Inner::default()
            }),
        }
    }

    /// Insert a record directly, bypassing the journal
    pub async fn insert(&self, fields: RecordFields) -> RecordRef {
        let mut inner = self.inner.write().await;
        let record = Self::allocate(&mut inner);
        inner.records.insert(record.id.clone(), fields);
        record
    }

    /// Current fields of a record
    pub async fn get(&self, record: &RecordRef) -> Option<RecordFields> {
        self.inner.read().await.records.get(&record.id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Every call made so far, oldest first. Empty unless recording.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.inner.read().await.calls.clone().unwrap_or_default()
    }

    /// Make creates and updates for the given task fail
    #[cfg(test)]
    pub(crate) async fn fail_writes_for(&self, task_id: impl Into<String>) {
        self.inner.write().await.failing.insert(task_id.into());
    }

    fn journal(inner: &mut Inner, call: impl FnOnce() -> StoreCall) {
        if let Some(calls) = inner.calls.as_mut() {
            calls.push(call());
        }
    }

    fn allocate(inner: &mut Inner) -> RecordRef {
        inner.next_id += 1;
        RecordRef::new(format!("record-{}", inner.next_id))
    }

    fn check_writable(inner: &Inner, task_id: Option<&str>) -> Result<()> {
        match task_id {
            Some(id) if inner.failing.contains(id) => Err(Error::status(
                "memory",
                503,
                format!("writes for task {} are failing", id),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_by_task_id(&self, task_id: &str) -> Result<Option<RecordRef>> {
        let mut inner = self.inner.write().await;
        Self::journal(&mut inner, || StoreCall::Find(task_id.to_string()));

        let mut matches: Vec<RecordRef> = inner
            .records
            .iter()
            .filter(|(_, fields)| fields.task_id.as_deref() == Some(task_id))
            .map(|(id, _)| RecordRef::new(id.clone()))
            .collect();

        match matches.len() {
            0 | 1 => Ok(matches.pop()),
            count => Err(Error::AmbiguousRecord {
                task_id: task_id.to_string(),
                count,
                truncated: false,
            }),
        }
    }

    async fn create(&self, fields: RecordFields) -> Result<()> {
        let mut inner = self.inner.write().await;
        Self::journal(&mut inner, || StoreCall::Create(fields.clone()));
        Self::check_writable(&inner, fields.task_id.as_deref())?;

        let record = Self::allocate(&mut inner);
        info!(record = %record.id, task_id = ?fields.task_id, "created record");
        inner.records.insert(record.id, fields);
        Ok(())
    }

    async fn update(&self, record: &RecordRef, fields: RecordFields) -> Result<()> {
        let mut inner = self.inner.write().await;
        Self::journal(&mut inner, || StoreCall::Update(record.clone(), fields.clone()));

        let task_id = inner
            .records
            .get(&record.id)
            .ok_or_else(|| Error::RecordNotFound(record.id.clone()))?
            .task_id
            .clone();
        Self::check_writable(&inner, task_id.as_deref())?;

        if let Some(stored) = inner.records.get_mut(&record.id) {
            stored.merge(fields);
        }
        info!(record = %record.id, task_id = ?task_id, "updated record");
        Ok(())
    }
}
