use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use adkchat_application::{AppContext, MessageStore, SessionManager};
use adkchat_core::store::KeyValueStore;
use adkchat_execution::{
    ChatController, ChatNotice, Diagnostic, LoggingOptions, StreamStatus, init_logging,
};
use adkchat_infrastructure::{ChatPaths, ConfigService, FileKeyValueStore};
use adkchat_interaction::AgentApiClient;

mod command;
mod helper;
mod render;

use command::{HELP, ReplCommand};
use helper::CliHelper;
use render::{Segment, TranscriptRenderer};

const REASON_USER_CANCEL: &str = "Cancelled by user";

/// Interactive chat client for an agent backend.
///
/// The transcript and notices are printed by background tasks; the prompt
/// loop only dispatches commands and submissions.
#[tokio::main]
async fn main() -> Result<()> {
    // ===== Logging =====
    // Warnings are queued for /logs instead of interleaving with the prompt.
    let (diagnostic_tx, mut diagnostic_rx) = mpsc::unbounded_channel::<Diagnostic>();
    init_logging(LoggingOptions {
        default_filter: Some("warn".into()),
        json: false,
        quiet: true,
        diagnostics: Some(diagnostic_tx),
    })?;

    // ===== Backend Initialization =====
    let config = ConfigService::new(ChatPaths::from_env()).get_config()?;
    let store: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::open_default().await?);
    let client = Arc::new(AgentApiClient::new(config.agent_base_url.clone()));
    let sessions = Arc::new(SessionManager::new(store, client.clone()));

    let mut context = AppContext::new(client.clone(), sessions.clone());
    context.init(config.default_app.as_deref()).await;

    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let controller = ChatController::new(client, sessions.clone(), notice_tx);

    let renderer = spawn_renderer(controller.messages().clone());
    let notices = spawn_notice_printer(notice_rx);

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== ADKChat ===".bright_magenta().bold());
    println!("Backend: {}", config.agent_base_url.bright_black());
    print_apps(&context);
    println!("Type {} for commands.", "/help".bright_cyan());

    loop {
        let prompt = format!("{}> ", context.selected_app().unwrap_or("no app"));
        match rl.readline(&prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                match ReplCommand::parse(&line) {
                    ReplCommand::Quit => {
                        controller.shutdown();
                        println!("Goodbye!");
                        break;
                    }
                    ReplCommand::Prompt(text) => {
                        let Some(app) = context.selected_app().map(String::from) else {
                            println!("{}", "No app selected. Use /apps and /app <name>.".red());
                            continue;
                        };
                        if let Some(stream) = controller.submit(&app, &text).await {
                            if let Ok(session_id) = sessions.session_id(&app).await {
                                context.note_current_session(&session_id);
                            }
                            tokio::spawn(async move {
                                if let Ok(status) = stream.await {
                                    report_stream_end(&status);
                                }
                            });
                        }
                    }
                    ReplCommand::Apps => print_apps(&context),
                    ReplCommand::SelectApp(app) => {
                        if controller.switch_app(&mut context, &app).await {
                            println!("{}", format!("Switched to {}", app).green());
                        } else if context.apps().iter().any(|a| a == &app) {
                            println!("Already using {}", app);
                        } else {
                            println!("{}", format!("Unknown app: {}", app).red());
                        }
                    }
                    ReplCommand::Sessions => match context.refresh_recent_sessions().await {
                        Ok(list) if list.is_empty() => println!("No sessions yet."),
                        Ok(list) => {
                            for info in list {
                                let updated = info
                                    .last_updated()
                                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                                    .unwrap_or_default();
                                println!(
                                    "  {}  {}  {}",
                                    info.id.bright_black(),
                                    updated,
                                    info.title()
                                );
                            }
                        }
                        Err(e) => println!("{}", e.user_message().red()),
                    },
                    ReplCommand::Load(session_id) => {
                        let app = context.selected_app().map(String::from);
                        // Failures are reported through the notice channel.
                        let _ = controller
                            .load_session(&mut context, &session_id, app.as_deref())
                            .await;
                    }
                    ReplCommand::New => {
                        let _ = controller.start_new_session(&mut context).await;
                    }
                    ReplCommand::Cancel => {
                        if !controller.cancel(REASON_USER_CANCEL) {
                            println!("Nothing to cancel.");
                        }
                    }
                    ReplCommand::Logs => drain_diagnostics(&mut diagnostic_rx),
                    ReplCommand::Help => {
                        for (usage, text) in HELP {
                            println!("  {:<14} {}", usage.bright_cyan(), text);
                        }
                    }
                    ReplCommand::Invalid(message) => println!("{}", message.yellow()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                if controller.cancel(REASON_USER_CANCEL) {
                    println!("{}", "Response cancelled.".yellow());
                } else {
                    println!("CTRL-C detected. Type 'quit' or 'exit' to leave.");
                }
            }
            Err(ReadlineError::Eof) => {
                controller.shutdown();
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    renderer.abort();
    notices.abort();
    Ok(())
}

/// Prints the parts of the transcript that changed since the last revision.
fn spawn_renderer(store: MessageStore) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut revisions = store.subscribe();
        let mut renderer = TranscriptRenderer::new();
        loop {
            let snapshot = store.snapshot().await;
            let output: String = renderer
                .render(&snapshot)
                .iter()
                .map(Segment::paint)
                .collect();
            if !output.is_empty() {
                print!("{}", output);
                let _ = std::io::stdout().flush();
            }
            if revisions.changed().await.is_err() {
                break;
            }
        }
    })
}

fn spawn_notice_printer(
    mut notices: mpsc::UnboundedReceiver<ChatNotice>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            let line = match &notice {
                ChatNotice::Error(text) => text.red(),
                ChatNotice::Success(text) => text.green(),
                ChatNotice::Info(text) => text.yellow(),
            };
            println!("\n{}", line);
        }
    })
}

fn report_stream_end(status: &StreamStatus) {
    match status {
        StreamStatus::Cancelled(reason) => {
            println!("\n{}", format!("(stopped: {})", reason).bright_black())
        }
        _ => println!(),
    }
}

fn print_apps(context: &AppContext) {
    if let Some(error) = context.app_list_error() {
        println!("{}", format!("Could not load apps: {}", error).red());
        return;
    }
    if context.apps().is_empty() {
        println!("No apps available.");
        return;
    }
    for app in context.apps() {
        if Some(app.as_str()) == context.selected_app() {
            println!("  {} {}", "*".green(), app.green());
        } else {
            println!("    {}", app);
        }
    }
}

fn drain_diagnostics(diagnostics: &mut mpsc::UnboundedReceiver<Diagnostic>) {
    let mut shown = 0;
    while let Ok(record) = diagnostics.try_recv() {
        let level = if record.level == "ERROR" {
            record.level.red()
        } else {
            record.level.yellow()
        };
        println!(
            "{} {} {} {}",
            record.timestamp.bright_black(),
            level,
            record.target.bright_black(),
            record.message
        );
        for (key, value) in &record.fields {
            println!("    {} = {}", key, value);
        }
        shown += 1;
    }
    if shown == 0 {
        println!("No warnings or errors logged.");
    }
}
