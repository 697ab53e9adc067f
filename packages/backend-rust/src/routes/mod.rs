mod capabilities;
mod chat;
mod health;
mod progress;
mod vocabulary;
pub mod webhooks;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;

use crate::response::json_error;
use crate::state::AppState;

pub use chat::GREETING;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat::send_message).fallback(fallback_handler))
        .route("/api/chat/messages", get(chat::messages).fallback(fallback_handler))
        .route(
            "/api/chat/history",
            get(chat::history)
                .delete(chat::clear_history)
                .fallback(fallback_handler),
        )
        .route(
            "/api/settings",
            get(chat::get_settings)
                .put(chat::update_settings)
                .fallback(fallback_handler),
        )
        .route("/api/progress", get(progress::get_progress).fallback(fallback_handler))
        .route("/api/progress/reset", post(progress::reset).fallback(fallback_handler))
        .route(
            "/api/vocabulary",
            get(vocabulary::list)
                .post(vocabulary::add)
                .fallback(fallback_handler),
        )
        .route(
            "/api/vocabulary/definition",
            post(vocabulary::definition).fallback(fallback_handler),
        )
        .route(
            "/api/vocabulary/study",
            post(vocabulary::start_study).fallback(fallback_handler),
        )
        .route(
            "/api/vocabulary/study/mark",
            post(vocabulary::mark).fallback(fallback_handler),
        )
        .route(
            "/api/vocabulary/study/previous",
            post(vocabulary::previous).fallback(fallback_handler),
        )
        .route(
            "/api/vocabulary/study/complete",
            post(vocabulary::complete).fallback(fallback_handler),
        )
        .route(
            "/api/vocabulary/:id",
            delete(vocabulary::remove).fallback(fallback_handler),
        )
        .route(
            "/api/webhooks/identity",
            post(webhooks::identity).fallback(fallback_handler),
        )
        .route("/api/capabilities", get(capabilities::get).fallback(fallback_handler))
        .nest("/health", health::router())
        .nest("/api/health", health::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found").into_response()
}
