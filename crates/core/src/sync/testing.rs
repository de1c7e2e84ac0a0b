//! Scripted task source for loop tests

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::task::{DeltaCursor, DeltaPage, Task, TaskList, TaskSource};
use crate::{Error, Result};

/// Replays queued delta responses per list. Once a list's queue is empty its
/// fetches never complete, so a running loop idles until cancelled.
///
/// Latest-checkpoint lookups replay their own queue and fall back to
/// `Delta("{list}-latest")` once it is empty.
#[derive(Default)]
pub struct ScriptedSource {
    lists: Vec<TaskList>,
    fail_listing: bool,
    pages: Mutex<HashMap<String, VecDeque<Result<DeltaPage>>>>,
    requested: Mutex<Vec<(String, DeltaCursor)>>,
    latest: Mutex<HashMap<String, VecDeque<Result<DeltaCursor>>>>,
    latest_requests: Mutex<usize>,
}

impl ScriptedSource {
    pub fn new(lists: Vec<TaskList>) -> Self {
        Self {
            lists,
            ..Self::default()
        }
    }

    pub fn failing_listing() -> Self {
        Self {
            fail_listing: true,
            ..Self::default()
        }
    }

    pub fn push(&self, list_id: &str, response: Result<DeltaPage>) {
        self.pages
            .lock()
            .unwrap()
            .entry(list_id.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn push_latest(&self, list_id: &str, response: Result<DeltaCursor>) {
        self.latest
            .lock()
            .unwrap()
            .entry(list_id.to_string())
            .or_default()
            .push_back(response);
    }

    /// Number of latest-checkpoint lookups so far
    pub fn latest_requests(&self) -> usize {
        *self.latest_requests.lock().unwrap()
    }

    /// Every `(list id, cursor)` fetched so far
    pub fn requested(&self) -> Vec<(String, DeltaCursor)> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskSource for ScriptedSource {
    async fn list_task_lists(&self) -> Result<Vec<TaskList>> {
        if self.fail_listing {
            return Err(Error::status("scripted", 401, "unauthorized"));
        }
        Ok(self.lists.clone())
    }

    async fn delta(&self, list_id: &str, cursor: &DeltaCursor) -> Result<DeltaPage> {
        self.requested
            .lock()
            .unwrap()
            .push((list_id.to_string(), cursor.clone()));

        let next = self
            .pages
            .lock()
            .unwrap()
            .get_mut(list_id)
            .and_then(|queue| queue.pop_front());
        match next {
            Some(response) => response,
            None => std::future::pending().await,
        }
    }

    async fn latest_delta(&self, list_id: &str) -> Result<DeltaCursor> {
        *self.latest_requests.lock().unwrap() += 1;

        let next = self
            .latest
            .lock()
            .unwrap()
            .get_mut(list_id)
            .and_then(|queue| queue.pop_front());
        next.unwrap_or_else(|| Ok(DeltaCursor::Delta(format!("{}-latest", list_id))))
    }
}

pub fn delta_page(tasks: Vec<Task>, link: &str) -> Result<DeltaPage> {
    Ok(DeltaPage {
        tasks,
        cursor: DeltaCursor::Delta(link.to_string()),
    })
}

pub fn next_page(tasks: Vec<Task>, link: &str) -> Result<DeltaPage> {
    Ok(DeltaPage {
        tasks,
        cursor: DeltaCursor::Next(link.to_string()),
    })
}
