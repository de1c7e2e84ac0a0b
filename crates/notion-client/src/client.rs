//! Notion database client

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use tns_core::record::{RecordFields, RecordRef, RecordStore};
use tns_core::{Error, Result};

use crate::dto::{DatabaseDto, ErrorBody, PageDto, QueryResponse};
use crate::properties;

pub const NOTION_API_URL: &str = "https://api.notion.com";
pub const NOTION_VERSION: &str = "2022-06-28";

/// Configuration for [`NotionClient`]
#[derive(Debug, Clone)]
pub struct NotionConfig {
    pub api_url: String,
    pub secret: String,
    pub database_id: String,
}

impl NotionConfig {
    pub fn new(secret: impl Into<String>, database_id: impl Into<String>) -> Self {
        Self {
            api_url: NOTION_API_URL.to_string(),
            secret: secret.into(),
            database_id: database_id.into(),
        }
    }
}

/// Client writing task records into one Notion database
pub struct NotionClient {
    http: reqwest::Client,
    config: NotionConfig,
}

impl NotionClient {
    pub fn new(http: reqwest::Client, config: NotionConfig) -> Self {
        Self { http, config }
    }

    pub fn database_id(&self) -> &str {
        &self.config.database_id
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.config.api_url, path))
            .bearer_auth(&self.config.secret)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) if !body.message.is_empty() => format!("{}: {}", body.code, body.message),
                _ => text,
            };
            warn!(status = status.as_u16(), %message, "notion request failed");
            return Err(Error::status("notion", status.as_u16(), message));
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Check that the configured database exists and is shared with the integration
    pub async fn verify_database(&self) -> Result<DatabaseDto> {
        let path = format!("/v1/databases/{}", self.config.database_id);
        let database: DatabaseDto = self.send(self.request(reqwest::Method::GET, &path)).await?;
        info!(database = %database.name(), id = %database.id, "notion database reachable");
        Ok(database)
    }
}

#[async_trait]
impl RecordStore for NotionClient {
    async fn find_by_task_id(&self, task_id: &str) -> Result<Option<RecordRef>> {
        let path = format!("/v1/databases/{}/query", self.config.database_id);
        let request = self
            .request(reqwest::Method::POST, &path)
            .json(&properties::task_id_filter(task_id));
        let response: QueryResponse = self.send(request).await?;

        if response.has_more || response.results.len() > 1 {
            return Err(Error::AmbiguousRecord {
                task_id: task_id.to_string(),
                count: response.results.len(),
                truncated: response.has_more,
            });
        }
        Ok(response
            .results
            .into_iter()
            .next()
            .map(|page| RecordRef::new(page.id)))
    }

    async fn create(&self, fields: RecordFields) -> Result<()> {
        let body = json!({
            "parent": { "database_id": self.config.database_id },
            "properties": Value::Object(properties::encode(&fields)),
        });
        let page: PageDto = self
            .send(self.request(reqwest::Method::POST, "/v1/pages").json(&body))
            .await?;
        debug!(page = %page.id, task_id = ?fields.task_id, "created page");
        Ok(())
    }

    async fn update(&self, record: &RecordRef, fields: RecordFields) -> Result<()> {
        let body = json!({ "properties": Value::Object(properties::encode(&fields)) });
        let path = format!("/v1/pages/{}", record.id);
        let _: PageDto = self
            .send(self.request(reqwest::Method::PATCH, &path).json(&body))
            .await?;
        debug!(page = %record.id, "updated page");
        Ok(())
    }
}
