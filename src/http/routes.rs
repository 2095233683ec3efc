use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/models", get(handlers::list_models))
        // Session lifecycle
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/:session_id",
            get(handlers::get_session).delete(handlers::end_session),
        )
        // Session settings
        .route(
            "/sessions/:session_id/credentials",
            put(handlers::set_credentials),
        )
        .route("/sessions/:session_id/model", put(handlers::set_model))
        .route("/sessions/:session_id/draft", put(handlers::set_draft))
        // Chat registry
        .route("/sessions/:session_id/chats", post(handlers::create_chat))
        .route("/sessions/:session_id/chats/new", post(handlers::new_chat))
        .route(
            "/sessions/:session_id/chats/:chat_id/select",
            post(handlers::select_chat),
        )
        .route(
            "/sessions/:session_id/chats/:chat_id",
            delete(handlers::delete_chat),
        )
        // Turns
        .route("/sessions/:session_id/prompt", post(handlers::submit_prompt))
        // Voice input
        .route(
            "/sessions/:session_id/recording/start",
            post(handlers::start_recording),
        )
        .route(
            "/sessions/:session_id/recording/stop",
            post(handlers::stop_recording),
        )
        .route(
            "/sessions/:session_id/recording/transcribe",
            post(handlers::transcribe_recording),
        )
        .route(
            "/sessions/:session_id/recording/submit",
            post(handlers::submit_transcript),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
