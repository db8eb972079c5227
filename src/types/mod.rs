// Public modules
pub mod audio_query;
pub mod chat_request;
pub mod chat_response;
pub mod health;
pub mod history;
pub mod message;
pub mod sender;
pub mod session_id;
pub mod sessions;

// Re-exports
pub use audio_query::{AudioQuery, AudioQueryResponse};
pub use chat_request::ChatRequest;
pub use chat_response::ChatResponse;
pub use health::HealthStatus;
pub use history::{ChatHistory, ClearHistoryResponse, HistoryEntry};
pub use message::Message;
pub use sender::Sender;
pub use session_id::SessionId;
pub use sessions::{ActiveSessions, NewSession, SessionEntry};
