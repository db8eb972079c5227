use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::SessionId;

/// Body returned by `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The session the reply belongs to; newly assigned on a first message.
    pub session_id: SessionId,

    /// The model's reply.
    pub response: String,

    /// When the backend produced the reply.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,
}
