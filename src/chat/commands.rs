//! Slash command parsing for the chat REPL.
//!
//! Input starting with `/` controls the session instead of being sent to the
//! backend as a chat message.

use crate::types::SessionId;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Start a new session.
    New,

    /// List the backend's sessions.
    Sessions,

    /// Switch to another session.
    Switch(SessionId),

    /// Reload the current session's history.
    History,

    /// Delete the current session's history.
    Clear,

    /// Ask a question about an audio file.
    Audio {
        /// Path to the audio file.
        path: String,
        /// The question; may be empty, which the controller rejects.
        prompt: String,
    },

    /// Show the current session id.
    Session,

    /// Check backend health.
    Health,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a regular message.
///
/// # Examples
///
/// ```
/// # use boltchat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/switch 5f0c1c1e").is_some());
/// assert!(parse_command("Hello!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" => ChatCommand::New,
        "sessions" | "chats" => ChatCommand::Sessions,
        "switch" => match argument {
            Some(id) if !id.contains(char::is_whitespace) => {
                ChatCommand::Switch(SessionId::new(id))
            }
            Some(_) => ChatCommand::Invalid("/switch takes a single session id".to_string()),
            None => ChatCommand::Invalid("/switch requires a session id".to_string()),
        },
        "history" | "reload" => ChatCommand::History,
        "clear" => ChatCommand::Clear,
        "audio" => parse_audio_command(argument),
        "session" => ChatCommand::Session,
        "health" => ChatCommand::Health,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_audio_command(argument: Option<&str>) -> ChatCommand {
    let Some(arg) = argument else {
        return ChatCommand::Invalid("/audio requires a file path".to_string());
    };

    let (path, rest) = match arg.strip_prefix('"') {
        Some(quoted) => match quoted.split_once('"') {
            Some((path, rest)) => (path, rest),
            None => return ChatCommand::Invalid("/audio path has an unclosed quote".to_string()),
        },
        None => arg.split_once(' ').unwrap_or((arg, "")),
    };
    if path.is_empty() {
        return ChatCommand::Invalid("/audio requires a file path".to_string());
    }

    ChatCommand::Audio {
        path: path.to_string(),
        prompt: rest.trim().to_string(),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a new chat
  /sessions              List chats known to the backend
  /switch <id>           Switch to another chat
  /history               Reload the current chat's history
  /clear                 Delete the current chat's history
  /audio <file> <prompt> Ask a question about an audio file
  /session               Show the current chat id
  /health                Check that the backend is up
  /help                  Show this help message
  /quit                  Exit the chat"#
}
