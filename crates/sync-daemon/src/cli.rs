//! Command-line interface

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use tns_core::sync::{PollSchedule, SupervisorConfig};
use tns_core::{Error, Result};

#[derive(Parser, Debug)]
#[command(name = "todo-notion-sync")]
#[command(about = "Mirror Microsoft To Do task lists into a Notion database")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,
}

impl Cli {
    /// The selected command; `run` when none is given
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Run(self.run))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Poll every task list and mirror changes (default)
    Run(RunArgs),
    /// Authorize the To Do application and store a refresh token
    Login(LoginArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TodoAppArgs {
    /// Microsoft application (client) id
    #[arg(long, env = "TODO_CLIENT_ID")]
    pub todo_client_id: Option<String>,

    /// Microsoft application client secret
    #[arg(long, env = "TODO_CLIENT_SECRET", hide_env_values = true)]
    pub todo_client_secret: Option<String>,

    /// File holding the refresh token
    #[arg(long, default_value = "token.txt")]
    pub token_file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Notion integration secret
    #[arg(long, env = "NOTION_SECRET", hide_env_values = true)]
    pub notion_secret: Option<String>,

    /// Id of the Notion database receiving tasks
    #[arg(long, env = "NOTION_DATABASE_ID")]
    pub notion_database_id: Option<String>,

    #[command(flatten)]
    pub todo: TodoAppArgs,

    /// Start each list from its latest checkpoint instead of replaying existing tasks
    #[arg(long)]
    pub skip_backlog: bool,

    /// Log record writes instead of sending them to Notion
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, default_value_t = 30)]
    pub startup_stagger_secs: u64,

    #[arg(long, default_value_t = 30)]
    pub idle_min_secs: u64,

    #[arg(long, default_value_t = 60)]
    pub idle_max_secs: u64,

    /// Upper bound for the retry and page pauses
    #[arg(long, default_value_t = 3)]
    pub retry_max_secs: u64,

    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[command(flatten)]
    pub todo: TodoAppArgs,
}

/// Validated To Do application credentials
#[derive(Debug, Clone)]
pub struct TodoCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Validated Notion credentials
#[derive(Debug, Clone)]
pub struct NotionCredentials {
    pub secret: String,
    pub database_id: String,
}

fn required(value: &Option<String>, flag: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::Config(format!("--{} is required", flag))),
    }
}

impl TodoAppArgs {
    pub fn credentials(&self) -> Result<TodoCredentials> {
        Ok(TodoCredentials {
            client_id: required(&self.todo_client_id, "todo-client-id")?,
            client_secret: required(&self.todo_client_secret, "todo-client-secret")?,
        })
    }
}

impl RunArgs {
    /// Notion credentials; not needed for a dry run
    pub fn notion_credentials(&self) -> Result<Option<NotionCredentials>> {
        if self.dry_run {
            return Ok(None);
        }
        Ok(Some(NotionCredentials {
            secret: required(&self.notion_secret, "notion-secret")?,
            database_id: required(&self.notion_database_id, "notion-database-id")?,
        }))
    }

    pub fn schedule(&self) -> Result<PollSchedule> {
        let retry = Duration::from_secs(self.retry_max_secs);
        let schedule = PollSchedule {
            startup_stagger: Duration::from_secs(self.startup_stagger_secs),
            retry_max: retry,
            page_max: retry,
            idle_min: Duration::from_secs(self.idle_min_secs),
            idle_max: Duration::from_secs(self.idle_max_secs),
        };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn supervisor_config(&self) -> Result<SupervisorConfig> {
        Ok(SupervisorConfig {
            schedule: self.schedule()?,
            start_from_latest: self.skip_backlog,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
