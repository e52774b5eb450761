use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use adkchat_execution::{LoggingOptions, init_logging};
use adkchat_infrastructure::{ChatPaths, ConfigService};

mod commands;

use commands::Output;

#[derive(Parser)]
#[command(name = "adkchat-admin")]
#[command(about = "ADKChat admin CLI - apps, sessions, knowledge base and accounts", long_about = None)]
struct Cli {
    /// Base URL of the service the command talks to, instead of config.toml
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log at info level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the agent apps the backend serves
    Apps,
    /// Inspect sessions of an app
    Sessions {
        /// App to use; defaults to config.toml's default_app, then the first listed app
        #[arg(long, global = true)]
        app: Option<String>,
        #[command(subcommand)]
        action: SessionsAction,
    },
    /// Manage knowledge-base documents
    Kb {
        #[command(subcommand)]
        action: KbAction,
    },
    /// Register, log in and list accounts
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
}

#[derive(Subcommand)]
enum SessionsAction {
    /// List recent sessions of the local user
    List,
    /// Print the messages of one session
    History { session_id: String },
}

#[derive(Subcommand)]
enum KbAction {
    /// Upload a document and start ingestion
    Upload {
        path: PathBuf,
        /// Poll the ingestion workflow until it settles
        #[arg(long)]
        watch: bool,
    },
    /// Delete a document
    Delete {
        doc_uuid: String,
        #[arg(long)]
        watch: bool,
    },
    /// Re-embed a document
    ReEmbed {
        doc_uuid: String,
        /// Embedder version to use instead of the current one
        #[arg(long = "override")]
        version_override: Option<String>,
        #[arg(long)]
        watch: bool,
    },
    /// Query a workflow once
    Status { workflow_id: String },
    /// Poll a workflow until it settles (Ctrl-C stops)
    Watch { workflow_id: String },
}

#[derive(Subcommand)]
enum AuthAction {
    /// Create an account and print its token
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and print a token
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// List accounts
    Users {
        #[arg(long)]
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(LoggingOptions {
        default_filter: Some(if cli.verbose { "info" } else { "warn" }.to_string()),
        ..Default::default()
    })?;

    let config = ConfigService::new(ChatPaths::from_env()).get_config()?;
    let output = Output::new(cli.json);
    let base_url = |configured: &str| cli.base_url.clone().unwrap_or_else(|| configured.to_string());

    match cli.command {
        Commands::Apps => commands::apps::list(&base_url(&config.agent_base_url), &output).await?,
        Commands::Sessions { app, action } => {
            let target = commands::sessions::Target {
                base_url: base_url(&config.agent_base_url),
                app: app.or_else(|| config.default_app.clone()),
            };
            match action {
                SessionsAction::List => commands::sessions::list(&target, &output).await?,
                SessionsAction::History { session_id } => {
                    commands::sessions::history(&target, &session_id, &output).await?
                }
            }
        }
        Commands::Kb { action } => {
            let kb = commands::kb::KbCommand::new(
                &base_url(&config.kb_base_url),
                Duration::from_secs(config.workflow_poll_interval_secs),
                output,
            );
            match action {
                KbAction::Upload { path, watch } => kb.upload(&path, watch).await?,
                KbAction::Delete { doc_uuid, watch } => kb.delete(&doc_uuid, watch).await?,
                KbAction::ReEmbed {
                    doc_uuid,
                    version_override,
                    watch,
                } => kb.re_embed(&doc_uuid, version_override.as_deref(), watch).await?,
                KbAction::Status { workflow_id } => kb.status(&workflow_id).await?,
                KbAction::Watch { workflow_id } => kb.watch(&workflow_id).await?,
            }
        }
        Commands::Auth { action } => {
            let auth = commands::auth::AuthCommand::new(&base_url(&config.auth_base_url), output);
            match action {
                AuthAction::Register { username, password } => {
                    auth.register(username, password).await?
                }
                AuthAction::Login { username, password } => auth.login(username, password).await?,
                AuthAction::Users { token } => auth.users(token).await?,
            }
        }
    }

    Ok(())
}
