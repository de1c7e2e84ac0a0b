//! Startup wiring for the `run` and `login` commands

use anyhow::Context;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

use notion_client::{NotionClient, NotionConfig};
use tns_core::record::{MemoryRecordStore, RecordStore};
use tns_core::sync::{Supervisor, SupervisorConfig};
use todo_client::{GraphClient, GraphConfig, OAuthConfig, TokenFile, TokenProvider};

use crate::cli::{LoginArgs, RunArgs};

/// Validate configuration, check both services, then supervise the sync loops
pub async fn run(args: RunArgs, cancel: CancellationToken) -> anyhow::Result<()> {
    let todo = args.todo.credentials()?;
    let notion = args.notion_credentials()?;
    let config = args.supervisor_config()?;

    let http = reqwest::Client::builder()
        .timeout(args.request_timeout())
        .build()
        .context("failed to build HTTP client")?;

    let tokens = TokenProvider::load(
        http.clone(),
        OAuthConfig::new(todo.client_id, todo.client_secret),
        TokenFile::new(&args.todo.token_file),
    )
    .await?;
    tokens
        .access_token()
        .await
        .context("failed to obtain a To Do access token")?;
    info!("authenticated against Microsoft To Do");

    let source = Arc::new(GraphClient::new(http.clone(), GraphConfig::default(), tokens));

    match notion {
        Some(notion) => {
            let client = NotionClient::new(http, NotionConfig::new(notion.secret, notion.database_id));
            client
                .verify_database()
                .await
                .context("Notion database is not reachable")?;
            supervise(source, Arc::new(client), config, cancel).await
        }
        None => {
            info!("dry run: record writes are logged, not sent to Notion");
            supervise(source, Arc::new(MemoryRecordStore::new()), config, cancel).await
        }
    }
}

async fn supervise<D>(
    source: Arc<GraphClient>,
    store: Arc<D>,
    config: SupervisorConfig,
    cancel: CancellationToken,
) -> anyhow::Result<()>
where
    D: RecordStore + 'static,
{
    Supervisor::new(source, store, config)
        .run(cancel)
        .await
        .context("failed to start sync loops")?;
    info!("shutdown complete");
    Ok(())
}

/// Interactive authorization-code flow that stores a refresh token
pub async fn login(args: LoginArgs) -> anyhow::Result<()> {
    let todo = args.todo.credentials()?;
    let config = OAuthConfig::new(todo.client_id, todo.client_secret);
    let state = uuid::Uuid::new_v4().to_string();

    println!("Open this URL in a browser and sign in:\n\n{}\n", config.authorization_url(&state));
    println!("After consenting, paste the `code` parameter from the redirected URL:");

    let mut code = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut code)
        .await
        .context("failed to read authorization code")?;
    let code = code.trim();
    if code.is_empty() {
        anyhow::bail!("no authorization code entered");
    }

    let http = reqwest::Client::new();
    let grant = TokenProvider::exchange_code(&http, &config, code)
        .await
        .context("authorization code exchange failed")?;

    let file = TokenFile::new(&args.todo.token_file);
    file.save(&grant.refresh_token)
        .await
        .with_context(|| format!("failed to write {}", file.path().display()))?;
    info!(path = %file.path().display(), "saved refresh token");
    Ok(())
}
