//! HTTP API for the chat UI shell
//!
//! Sessions:
//! - POST /sessions, GET|DELETE /sessions/:id
//! - PUT /sessions/:id/{credentials,model,draft}
//!
//! Chats:
//! - POST /sessions/:id/chats, POST /sessions/:id/chats/new
//! - POST /sessions/:id/chats/:chat_id/select, DELETE /sessions/:id/chats/:chat_id
//!
//! Turns and voice input:
//! - POST /sessions/:id/prompt (server-sent events)
//! - POST /sessions/:id/recording/{start,stop,transcribe,submit}
//!
//! Misc: GET /health, GET /models

mod handlers;
mod routes;
mod state;

pub use handlers::{ErrorResponse, ModelInfo, TranscribeResponse};
pub use routes::create_router;
pub use state::AppState;
