pub mod handlers;
pub mod pages;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeFile, trace::TraceLayer};

pub use handlers::{analyze_handler, restart_handler, review_handler, show_page, submit_handler};
pub use state::AppState;

/// Builds the complete router for the three-page flow and the prompt image.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(show_page))
        .route("/analyze", post(analyze_handler))
        .route("/review", post(review_handler))
        .route("/submit", post(submit_handler))
        .route("/restart", post(restart_handler))
        .route_service("/prompt.png", ServeFile::new(&state.prompt_image_path))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
