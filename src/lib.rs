pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod relay;
pub mod session;
pub mod turn;
pub mod voice;

pub use config::Config;
pub use credentials::Credentials;
pub use error::{ChatError, Result};
pub use http::{create_router, AppState};
pub use relay::{
    AudioClip, CompletionProvider, CompletionRequest, FragmentStream, ModelName, Provider, Relay,
    Transcriber, Translator,
};
pub use session::{
    render, Chat, ChatMessage, DisplayContent, DisplayEntry, Role, Session, SessionStore,
    SessionView,
};
pub use turn::{prepare_turn, run_turn, PreparedTurn, TurnEvent, TurnOutcome};
