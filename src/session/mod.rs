//! Per-user session state
//!
//! This module provides the `Session` context object that every handler works on:
//! - Chat records (model history + bilingual display history)
//! - Chat CRUD: create, delete, select, append turns
//! - Draft prompt and voice-recording flags
//! - The `SessionStore` holding one lock per live user session
//! - The render step producing a `SessionView` for the UI shell

mod chat;
mod registry;
mod session;
mod store;
mod view;

pub use chat::{
    derive_title, Chat, ChatMessage, DisplayContent, DisplayEntry, Role, TITLE_ELLIPSIS,
    TITLE_MAX_CHARS,
};
pub use session::Session;
pub use store::{SessionHandle, SessionStore};
pub use view::{render, ActiveChatView, ChatSummary, Greeting, SessionView};
