//! Microsoft To Do client
//!
//! Talks to the Graph beta task-list endpoints and implements
//! [`tns_core::task::TaskSource`]. Authentication uses a stored OAuth refresh
//! token exchanged for short-lived access tokens.

mod auth;
mod client;
mod dto;

pub use auth::{AuthorizationGrant, OAuthConfig, TokenFile, TokenProvider};
pub use client::{GraphClient, GraphConfig, GRAPH_TASK_LISTS_URL};
pub use dto::{DateTimeTimeZone, DeltaResponse, RemovedDto, TaskDto, TaskListDto, TaskListsResponse};
