//! Graph wire types

use serde::Deserialize;

use tns_core::task::{DeltaCursor, DeltaPage, Importance, Task, TaskList, TaskStatus};
use tns_core::Error;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListDto {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub well_known_list_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskListsResponse {
    #[serde(default)]
    pub value: Vec<TaskListDto>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeTimeZone {
    #[serde(default)]
    pub date_time: String,
    #[serde(default)]
    pub time_zone: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemovedDto {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub importance: String,
    #[serde(default)]
    pub due_date_time: Option<DateTimeTimeZone>,
    #[serde(default)]
    pub completed_date_time: Option<DateTimeTimeZone>,
    #[serde(rename = "@removed", default)]
    pub removed: Option<RemovedDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeltaResponse {
    #[serde(default)]
    pub value: Vec<TaskDto>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
    #[serde(rename = "@odata.deltaLink", default)]
    pub delta_link: Option<String>,
}

fn date_time(value: Option<DateTimeTimeZone>) -> Option<String> {
    value
        .map(|v| v.date_time)
        .filter(|raw| !raw.is_empty())
}

impl From<TaskListDto> for TaskList {
    fn from(dto: TaskListDto) -> Self {
        TaskList::new(dto.id, dto.display_name)
    }
}

impl From<TaskDto> for Task {
    fn from(dto: TaskDto) -> Self {
        Task {
            id: dto.id,
            display_name: dto.display_name,
            status: TaskStatus::parse(&dto.status),
            importance: Importance::parse(&dto.importance),
            due: date_time(dto.due_date_time),
            completed: date_time(dto.completed_date_time),
            removed: dto.removed.map(|r| r.reason),
        }
    }
}

impl TryFrom<DeltaResponse> for DeltaPage {
    type Error = Error;

    fn try_from(response: DeltaResponse) -> Result<Self, Self::Error> {
        let cursor = DeltaCursor::from_links(response.next_link, response.delta_link)?;
        Ok(DeltaPage {
            tasks: response.value.into_iter().map(Task::from).collect(),
            cursor,
        })
    }
}
