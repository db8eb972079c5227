use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::Sender;

/// A single rendered chat message.
///
/// Messages are created locally, either from user input, from a backend
/// reply, or from fetched history, and are never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Client-generated identifier, unique within one controller.
    pub id: String,

    /// Message body.
    pub text: String,

    /// Author of the message.
    pub sender: Sender,

    /// When the message was sent or received.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,
}

impl Message {
    /// Creates a new message.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        sender: Sender,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            sender,
            timestamp,
        }
    }

    /// Returns true if the user authored this message.
    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}
