//! Interactive terminal client for the Bolt chat backend.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a backend on localhost:8000, resuming the last chat
//! boltchat
//!
//! # Point at another backend and start fresh
//! boltchat --base-url http://chat.internal:9000 --fresh
//!
//! # Disable colors (useful for piping output)
//! boltchat --no-color
//! ```
//!
//! Set `RUST_LOG=boltchat=debug` to see request logs on stderr.
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/new` - Start a new chat
//! - `/sessions` - List chats
//! - `/switch <id>` - Switch to another chat
//! - `/audio <file> <prompt>` - Ask about an audio file
//! - `/quit` - Exit the application

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use boltchat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatController, HistoryOutcome, PlainTextRenderer,
    Renderer, help_text, parse_command,
};
use boltchat::{BoltClient, FileSessionStore, MemorySessionStore, SessionStore};

type Controller = ChatController<BoltClient, Arc<dyn SessionStore>, PlainTextRenderer>;

/// Main entry point for the boltchat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("boltchat [OPTIONS]");
    let config = ChatConfig::from(args);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(config.use_color)
        .init();

    let client = BoltClient::with_options(config.base_url.clone(), Some(config.timeout))?;
    let store: Arc<dyn SessionStore> = match &config.session_file {
        Some(path) => Arc::new(FileSessionStore::new(path.clone())),
        None => Arc::new(MemorySessionStore::new()),
    };
    tracing::info!(base_url = %client.base_url(), "starting boltchat");

    let controller: Arc<Controller> = Arc::new(
        ChatController::new(client, store, PlainTextRenderer::with_color(config.use_color))
            .with_restore_session(config.restore_session),
    );

    // Ctrl+C while a request is pending abandons it.
    let interrupted = Arc::clone(&controller);
    ctrlc::set_handler(move || {
        if interrupted.cancel() {
            tracing::info!("request cancelled by user");
        }
    })?;

    let mut rl = DefaultEditor::new()?;

    println!("Bolt Chat ({})", controller.backend().base_url());
    println!("Type /help for commands, /quit to exit\n");
    controller.start().await;

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    if !run_command(&controller, cmd).await {
                        println!("Goodbye!");
                        break;
                    }
                    continue;
                }

                controller.send_message(line).await;
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                controller.with_renderer(|r| r.print_error(&format!("Input error: {}", err)));
                break;
            }
        }
    }

    Ok(())
}

/// Runs one slash command. Returns false when the REPL should exit.
async fn run_command(controller: &Controller, cmd: ChatCommand) -> bool {
    match cmd {
        ChatCommand::Quit => return false,
        ChatCommand::New => {
            controller.create_session().await;
        }
        ChatCommand::Sessions => {
            controller.list_sessions().await;
        }
        ChatCommand::Switch(session_id) => {
            report_history(controller, controller.switch_session(session_id).await);
        }
        ChatCommand::History => {
            let outcome = controller.load_history().await;
            report_history(controller, outcome);
        }
        ChatCommand::Clear => {
            if controller.clear_history().await {
                controller.with_renderer(|r| r.print_info("Chat cleared."));
            }
        }
        ChatCommand::Audio { path, prompt } => {
            controller.submit_audio_file(&path, &prompt).await;
        }
        ChatCommand::Session => {
            let info = match controller.session_id() {
                Some(id) => format!("Current chat: {id}"),
                None => "No chat yet; send a message to start one.".to_string(),
            };
            controller.with_renderer(|r| r.print_info(&info));
        }
        ChatCommand::Health => match controller.health().await {
            Ok(status) if status.is_healthy() => {
                controller.with_renderer(|r| r.print_info("Backend is healthy."));
            }
            Ok(status) => {
                let info = format!("Backend reports status {:?}", status.status);
                controller.with_renderer(|r| r.print_error(&info));
            }
            Err(err) => {
                let info = format!("Backend unreachable: {err}");
                controller.with_renderer(|r| r.print_error(&info));
            }
        },
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {}", line);
            }
        }
        ChatCommand::Invalid(message) => {
            controller.with_renderer(|r| r.print_error(&message));
        }
    }
    true
}

fn report_history(controller: &Controller, outcome: HistoryOutcome) {
    let info = match outcome {
        HistoryOutcome::Loaded(0) => Some("This chat has no messages yet.".to_string()),
        HistoryOutcome::SessionMissing { replacement: Some(id) } => {
            Some(format!("That chat no longer exists; started {}.", id.short()))
        }
        HistoryOutcome::Unavailable(err) => Some(format!("Could not load history: {err}")),
        _ => None,
    };
    if let Some(info) = info {
        controller.with_renderer(|r| r.print_info(&info));
    }
}
