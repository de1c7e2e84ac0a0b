//! Graph task-list client

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use tns_core::task::{DeltaCursor, DeltaPage, TaskList, TaskSource};
use tns_core::{Error, Result};

use crate::auth::TokenProvider;
use crate::dto::{DeltaResponse, TaskListsResponse};

/// Task-list collection of the signed-in user
pub const GRAPH_TASK_LISTS_URL: &str = "https://graph.microsoft.com/beta/me/tasks/lists";

/// Configuration for [`GraphClient`]
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Task-list collection URL; every other endpoint hangs off it
    pub lists_url: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            lists_url: GRAPH_TASK_LISTS_URL.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct DeltaLinkOnly {
    #[serde(rename = "@odata.deltaLink", default)]
    delta_link: Option<String>,
}

/// Client for the To Do task-list endpoints
pub struct GraphClient {
    http: reqwest::Client,
    config: GraphConfig,
    tokens: TokenProvider,
}

impl GraphClient {
    pub fn new(http: reqwest::Client, config: GraphConfig, tokens: TokenProvider) -> Self {
        Self {
            http,
            config,
            tokens,
        }
    }

    fn delta_url(&self, list_id: &str) -> String {
        format!("{}/{}/tasks/delta", self.config.lists_url, list_id)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let token = self.tokens.access_token().await?;
        let resp = request.bearer_auth(token).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "graph request failed");
            return Err(Error::status("graph", status.as_u16(), text));
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl TaskSource for GraphClient {
    async fn list_task_lists(&self) -> Result<Vec<TaskList>> {
        let mut lists = Vec::new();
        let mut url = self.config.lists_url.clone();
        loop {
            let page: TaskListsResponse = self.send(self.http.get(&url)).await?;
            lists.extend(page.value.into_iter().map(TaskList::from));
            match page.next_link.filter(|link| !link.is_empty()) {
                Some(next) => url = next,
                None => break,
            }
        }
        debug!(count = lists.len(), "listed task lists");
        Ok(lists)
    }

    async fn delta(&self, list_id: &str, cursor: &DeltaCursor) -> Result<DeltaPage> {
        let url = match cursor.link() {
            Some(link) => link.to_string(),
            None => self.delta_url(list_id),
        };
        let response: DeltaResponse = self.send(self.http.get(&url)).await?;
        DeltaPage::try_from(response)
    }

    async fn latest_delta(&self, list_id: &str) -> Result<DeltaCursor> {
        let request = self
            .http
            .get(self.delta_url(list_id))
            .query(&[("$deltaToken", "latest")]);
        let response: DeltaLinkOnly = self.send(request).await?;
        response
            .delta_link
            .filter(|link| !link.is_empty())
            .map(DeltaCursor::Delta)
            .ok_or(Error::MissingCursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{OAuthConfig, TokenFile};
    use mockito::Matcher;
    use tempfile::TempDir;

    struct Fixture {
        server: mockito::ServerGuard,
        client: GraphClient,
        _dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token": "at-1", "expires_in": 3600}"#)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let file = TokenFile::new(dir.path().join("token.txt"));
        file.save("rt-1").await.unwrap();
        let oauth = OAuthConfig {
            token_url: format!("{}/token", server.url()),
            ..OAuthConfig::new("client-1", "secret-1")
        };
        let http = reqwest::Client::new();
        let tokens = TokenProvider::load(http.clone(), oauth, file).await.unwrap();
        let config = GraphConfig {
            lists_url: format!("{}/lists", server.url()),
        };

        Fixture {
            client: GraphClient::new(http, config, tokens),
            server,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_list_task_lists_follows_next_link() {
        let mut fx = fixture().await;
        let second = format!("{}/lists-page-2", fx.server.url());
        fx.server
            .mock("GET", "/lists")
            .match_header("authorization", "Bearer at-1")
            .with_status(200)
            .with_body(format!(
                r#"{{"value": [{{"id": "l1", "displayName": "Work", "wellKnownListName": "none"}}], "@odata.nextLink": "{}"}}"#,
                second
            ))
            .create_async()
            .await;
        fx.server
            .mock("GET", "/lists-page-2")
            .with_status(200)
            .with_body(r#"{"value": [{"id": "l2", "displayName": "Home"}]}"#)
            .create_async()
            .await;

        let lists = fx.client.list_task_lists().await.unwrap();

        assert_eq!(
            lists,
            vec![TaskList::new("l1", "Work"), TaskList::new("l2", "Home")]
        );
    }

    #[tokio::test]
    async fn test_first_delta_then_follow_link() {
        let mut fx = fixture().await;
        let next = format!("{}/lists/l1/tasks/delta-next", fx.server.url());
        fx.server
            .mock("GET", "/lists/l1/tasks/delta")
            .with_status(200)
            .with_body(format!(
                r#"{{"value": [{{"id": "t1", "displayName": "Write report"}}], "@odata.nextLink": "{}"}}"#,
                next
            ))
            .create_async()
            .await;
        let followed = fx
            .server
            .mock("GET", "/lists/l1/tasks/delta-next")
            .with_status(200)
            .with_body(r#"{"value": [], "@odata.deltaLink": "https://graph/delta?$deltatoken=abc"}"#)
            .expect(1)
            .create_async()
            .await;

        let first = fx.client.delta("l1", &DeltaCursor::Start).await.unwrap();
        assert_eq!(first.cursor, DeltaCursor::Next(next));
        assert_eq!(first.tasks[0].display_name, "Write report");

        let second = fx.client.delta("l1", &first.cursor).await.unwrap();
        assert_eq!(
            second.cursor,
            DeltaCursor::Delta("https://graph/delta?$deltatoken=abc".into())
        );
        followed.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_status_error() {
        let mut fx = fixture().await;
        fx.server
            .mock("GET", "/lists/l1/tasks/delta")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        match fx.client.delta("l1", &DeltaCursor::Start).await.unwrap_err() {
            Error::Status {
                service,
                status,
                message,
            } => {
                assert_eq!(service, "graph");
                assert_eq!(status, 429);
                assert_eq!(message, "slow down");
            }
            e => panic!("Expected Status error, got: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_undecodable_body_is_serialization_error() {
        let mut fx = fixture().await;
        fx.server
            .mock("GET", "/lists/l1/tasks/delta")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = fx.client.delta("l1", &DeltaCursor::Start).await.unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_latest_delta() {
        let mut fx = fixture().await;
        fx.server
            .mock("GET", "/lists/l1/tasks/delta")
            .match_query(Matcher::UrlEncoded("$deltaToken".into(), "latest".into()))
            .with_status(200)
            .with_body(r#"{"value": [], "@odata.deltaLink": "https://graph/delta?$deltatoken=head"}"#)
            .create_async()
            .await;

        let cursor = fx.client.latest_delta("l1").await.unwrap();
        assert_eq!(
            cursor,
            DeltaCursor::Delta("https://graph/delta?$deltatoken=head".into())
        );
    }

    #[tokio::test]
    async fn test_latest_delta_without_link() {
        let mut fx = fixture().await;
        fx.server
            .mock("GET", "/lists/l1/tasks/delta")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"value": []}"#)
            .create_async()
            .await;

        assert!(matches!(
            fx.client.latest_delta("l1").await,
            Err(Error::MissingCursor)
        ));
    }
}
