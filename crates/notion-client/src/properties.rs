//! Page property encoding
//!
//! Maps sparse [`RecordFields`] onto the database's property schema. Only
//! fields that are set produce a property, so an update never clears values
//! it was not asked to change.

use chrono::{NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{json, Map, Value};

use tns_core::record::RecordFields;

pub const TITLE: &str = "Task";
pub const TODO_ID: &str = "TodoID";
pub const DONE: &str = "Done";
pub const DELETED: &str = "Deleted";
pub const PRIORITY: &str = "Priority";
pub const TASK_LIST_NAME: &str = "Task List Name";
pub const SCHEDULED_TIME: &str = "Scheduled Time";
pub const COMPLETION_TIME: &str = "Completion time";

fn rich_text(content: &str) -> Value {
    json!([{ "type": "text", "text": { "content": content } }])
}

fn date(value: &NaiveDateTime) -> Value {
    let start = Utc
        .from_utc_datetime(value)
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    json!({ "date": { "start": start } })
}

/// Encode the present fields as a `properties` object
pub fn encode(fields: &RecordFields) -> Map<String, Value> {
    let mut props = Map::new();

    if let Some(title) = &fields.title {
        props.insert(TITLE.into(), json!({ "title": rich_text(title) }));
    }
    if let Some(task_id) = &fields.task_id {
        props.insert(TODO_ID.into(), json!({ "rich_text": rich_text(task_id) }));
    }
    if let Some(done) = fields.done {
        props.insert(DONE.into(), json!({ "checkbox": done }));
    }
    if let Some(deleted) = fields.deleted {
        props.insert(DELETED.into(), json!({ "checkbox": deleted }));
    }
    if let Some(priority) = fields.priority {
        props.insert(
            PRIORITY.into(),
            json!({ "select": { "name": priority.option_name() } }),
        );
    }
    if let Some(name) = &fields.task_list_name {
        props.insert(TASK_LIST_NAME.into(), json!({ "rich_text": rich_text(name) }));
    }
    if let Some(scheduled) = &fields.scheduled {
        props.insert(SCHEDULED_TIME.into(), date(scheduled));
    }
    if let Some(completed_at) = &fields.completed_at {
        props.insert(COMPLETION_TIME.into(), date(completed_at));
    }

    props
}

/// Query filter matching pages whose TodoID equals `task_id`
pub fn task_id_filter(task_id: &str) -> Value {
    json!({
        "filter": {
            "and": [
                { "property": TODO_ID, "rich_text": { "equals": task_id } }
            ]
        }
    })
}
