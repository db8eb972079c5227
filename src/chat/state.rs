//! Pure chat state transitions.
//!
//! [`ChatState`] holds the message list and current session id. It changes
//! only through [`ChatState::apply`], which consumes the old state and an
//! event and returns the new state. Nothing here performs I/O.

use time::OffsetDateTime;

use crate::types::{HistoryEntry, Message, Sender, SessionId};

/// A change to the chat state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// The user sent a message.
    UserMessage {
        /// Message body.
        text: String,
        /// Send time.
        at: OffsetDateTime,
    },

    /// A bot-authored message arrived (a reply, an audio answer, or a fallback).
    BotMessage {
        /// Message body.
        text: String,
        /// Receive time.
        at: OffsetDateTime,
    },

    /// The backend confirmed or assigned the session; messages are kept.
    SessionAdopted(SessionId),

    /// The conversation changed; messages are dropped and the id replaced.
    SessionReset(Option<SessionId>),

    /// History for the current session arrived and replaces every message.
    HistoryLoaded(Vec<HistoryEntry>),

    /// The current session's messages were cleared.
    MessagesCleared,
}

/// Message list plus current session id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    messages: Vec<Message>,
    session_id: Option<SessionId>,
    message_counter: u64,
}

impl ChatState {
    /// Creates an empty state with no session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty state bound to `session_id`.
    pub fn with_session(session_id: SessionId) -> Self {
        Self {
            session_id: Some(session_id),
            ..Self::default()
        }
    }

    /// Messages in insertion order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recently added message.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The current session, if one exists.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Returns the state that results from `event`.
    pub fn apply(mut self, event: StateEvent) -> Self {
        match event {
            StateEvent::UserMessage { text, at } => {
                self.push(text, Sender::User, at);
            }
            StateEvent::BotMessage { text, at } => {
                self.push(text, Sender::Bot, at);
            }
            StateEvent::SessionAdopted(session_id) => {
                self.session_id = Some(session_id);
            }
            StateEvent::SessionReset(session_id) => {
                self.session_id = session_id;
                self.messages.clear();
            }
            StateEvent::HistoryLoaded(entries) => {
                self.messages.clear();
                for entry in entries {
                    let id = self.next_id(entry.timestamp);
                    self.messages.push(entry.into_message(id));
                }
            }
            StateEvent::MessagesCleared => {
                self.messages.clear();
            }
        }
        self
    }

    fn push(&mut self, text: String, sender: Sender, at: OffsetDateTime) {
        let id = self.next_id(at);
        self.messages.push(Message::new(id, text, sender, at));
    }

    // Ids keep counting across resets so they stay unique for the
    // controller's lifetime.
    fn next_id(&mut self, at: OffsetDateTime) -> String {
        self.message_counter += 1;
        let millis = at.unix_timestamp_nanos() / 1_000_000;
        format!("msg_{}_{}", self.message_counter, millis)
    }
}
