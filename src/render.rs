//! Output rendering for the chat controller.
//!
//! The controller never prints. It reports every visible change through the
//! [`Renderer`] trait so the same state machine can drive a terminal, a GUI,
//! or a test harness.

use std::io::{self, Stdout, Write};
use std::sync::{Arc, Mutex};

use crate::types::{Message, SessionEntry};
use crate::utils::time::clock;

/// ANSI escape code for dim text (used for timestamps and the typing line).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for the welcome banner).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the user label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for the bot label).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for the current session).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for alerts and errors).
const ANSI_RED: &str = "\x1b[31m";

/// Text of the placeholder shown when sessions cannot be listed.
pub const NO_CHATS: &str = "No chats";

/// Welcome banner shown for an empty conversation.
pub const WELCOME_TITLE: &str = "Welcome to Bolt AI";

/// Body of the welcome banner.
pub const WELCOME_BODY: &str = "I'm here to help you with coding, development, and technical questions. What would you like to work on today?";

/// Trait for rendering controller state changes.
pub trait Renderer: Send {
    /// The visible message list was emptied.
    fn clear_messages(&mut self);

    /// Show the welcome banner for an empty conversation.
    fn show_welcome(&mut self);

    /// Append one message to the visible list.
    fn render_message(&mut self, message: &Message);

    /// Replace the session list.
    fn render_sessions(&mut self, sessions: &[SessionEntry]);

    /// Replace the session list with the "no chats" placeholder.
    fn render_no_sessions(&mut self);

    /// A request started; show the in-flight indicator.
    fn show_typing(&mut self);

    /// All requests settled; hide the in-flight indicator.
    fn hide_typing(&mut self);

    /// A blocking notice the user must see (failed audio, bad input).
    fn alert(&mut self, message: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    typing_shown: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            typing_shown: false,
        }
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn style(&self, code: &str, text: &str) -> String {
        if self.use_color {
            format!("{code}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    /// Formats a message the way [`Renderer::render_message`] prints it.
    pub fn format_message(&self, message: &Message) -> String {
        let (label, color) = if message.is_user() {
            ("You", ANSI_CYAN)
        } else {
            ("Bolt", ANSI_YELLOW)
        };
        let time = self.style(ANSI_DIM, &format!("[{}]", clock(message.timestamp)));
        let label = self.style(color, label);
        format!("{time} {label}: {}", message.text)
    }

    /// Formats the session list the way [`Renderer::render_sessions`] prints it.
    pub fn format_sessions(&self, sessions: &[SessionEntry]) -> Vec<String> {
        sessions
            .iter()
            .map(|entry| {
                let label = entry.label();
                if entry.is_current {
                    format!("  * {}  {}", self.style(ANSI_GREEN, &label), entry.id)
                } else {
                    format!("    {label}  {}", entry.id)
                }
            })
            .collect()
    }

    fn clear_typing_line(&mut self) {
        if self.typing_shown {
            if self.use_color {
                print!("\r\x1b[2K");
            } else {
                println!();
            }
            self.typing_shown = false;
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn clear_messages(&mut self) {
        self.clear_typing_line();
        if self.use_color {
            print!("\x1b[2J\x1b[H");
        } else {
            println!("----");
        }
        self.flush();
    }

    fn show_welcome(&mut self) {
        self.clear_typing_line();
        println!("{}", self.style(ANSI_BOLD, WELCOME_TITLE));
        println!("{WELCOME_BODY}\n");
        self.flush();
    }

    fn render_message(&mut self, message: &Message) {
        self.clear_typing_line();
        println!("{}", self.format_message(message));
        self.flush();
    }

    fn render_sessions(&mut self, sessions: &[SessionEntry]) {
        self.clear_typing_line();
        if sessions.is_empty() {
            println!("    (no sessions yet)");
        }
        for line in self.format_sessions(sessions) {
            println!("{line}");
        }
        self.flush();
    }

    fn render_no_sessions(&mut self) {
        self.clear_typing_line();
        println!("    {NO_CHATS}");
        self.flush();
    }

    fn show_typing(&mut self) {
        if !self.typing_shown {
            print!("{}", self.style(ANSI_DIM, "Bolt is typing..."));
            self.typing_shown = true;
            self.flush();
        }
    }

    fn hide_typing(&mut self) {
        self.clear_typing_line();
        self.flush();
    }

    fn alert(&mut self, message: &str) {
        self.clear_typing_line();
        eprintln!("{}", self.style(ANSI_RED, &format!("! {message}")));
    }

    fn print_info(&mut self, info: &str) {
        self.clear_typing_line();
        println!("{info}");
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.clear_typing_line();
        eprintln!("{}", self.style(ANSI_RED, &format!("Error: {error}")));
    }
}

/// One call observed by a [`RecordingRenderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    /// [`Renderer::clear_messages`]
    ClearMessages,
    /// [`Renderer::show_welcome`]
    Welcome,
    /// [`Renderer::render_message`]
    Message(Message),
    /// [`Renderer::render_sessions`]
    Sessions(Vec<SessionEntry>),
    /// [`Renderer::render_no_sessions`]
    NoSessions,
    /// [`Renderer::show_typing`]
    TypingShown,
    /// [`Renderer::hide_typing`]
    TypingHidden,
    /// [`Renderer::alert`]
    Alert(String),
    /// [`Renderer::print_info`]
    Info(String),
    /// [`Renderer::print_error`]
    Error(String),
}

/// Renderer that records every call instead of drawing anything.
///
/// Clones share the same log, so a handle kept outside the controller sees
/// everything the controller rendered. Useful for headless embedding.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    events: Arc<Mutex<Vec<RenderEvent>>>,
}

impl RecordingRenderer {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events.
    pub fn events(&self) -> Vec<RenderEvent> {
        self.lock().clone()
    }

    /// Removes and returns the recorded events.
    pub fn take(&self) -> Vec<RenderEvent> {
        std::mem::take(&mut *self.lock())
    }

    /// Returns the alerts recorded so far.
    pub fn alerts(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                RenderEvent::Alert(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the most recent session list, if one was rendered.
    pub fn last_sessions(&self) -> Option<RenderEvent> {
        self.lock()
            .iter()
            .rev()
            .find(|event| matches!(event, RenderEvent::Sessions(_) | RenderEvent::NoSessions))
            .cloned()
    }

    fn record(&self, event: RenderEvent) {
        self.lock().push(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RenderEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Renderer for RecordingRenderer {
    fn clear_messages(&mut self) {
        self.record(RenderEvent::ClearMessages);
    }

    fn show_welcome(&mut self) {
        self.record(RenderEvent::Welcome);
    }

    fn render_message(&mut self, message: &Message) {
        self.record(RenderEvent::Message(message.clone()));
    }

    fn render_sessions(&mut self, sessions: &[SessionEntry]) {
        self.record(RenderEvent::Sessions(sessions.to_vec()));
    }

    fn render_no_sessions(&mut self) {
        self.record(RenderEvent::NoSessions);
    }

    fn show_typing(&mut self) {
        self.record(RenderEvent::TypingShown);
    }

    fn hide_typing(&mut self) {
        self.record(RenderEvent::TypingHidden);
    }

    fn alert(&mut self, message: &str) {
        self.record(RenderEvent::Alert(message.to_string()));
    }

    fn print_info(&mut self, info: &str) {
        self.record(RenderEvent::Info(info.to_string()));
    }

    fn print_error(&mut self, error: &str) {
        self.record(RenderEvent::Error(error.to_string()));
    }
}
