//! Mock Interview API
//!
//! HTTP + WebSocket service around the answer-analysis engine: sessions and
//! generated questions, scored text and audio answers, live feedback, and
//! final reports.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod feedback;
pub mod handlers;
pub mod questions;
pub mod report;
pub mod state;
pub mod store;
pub mod transcribe;
pub mod types;

use std::sync::Arc;

use axum::{
  extract::DefaultBodyLimit,
  http::HeaderValue,
  routing::{get, post},
  Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use state::AppState;

fn cors(origins: &[String]) -> CorsLayer {
  let origins: Vec<HeaderValue> = origins
    .iter()
    .filter_map(|o| match HeaderValue::from_str(o) {
      Ok(v) => Some(v),
      Err(_) => {
        tracing::warn!(origin = %o, "ignoring invalid CORS origin");
        None
      }
    })
    .collect();
  CorsLayer::new()
    .allow_origin(origins)
    .allow_methods(AllowMethods::mirror_request())
    .allow_headers(AllowHeaders::mirror_request())
    .allow_credentials(true)
}

pub fn router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/health", get(handlers::health))
    .route("/api/auth/signup", post(handlers::signup))
    .route("/api/auth/login", post(handlers::login))
    .route("/api/auth/refresh", post(handlers::refresh))
    .route("/api/auth/logout", post(handlers::logout))
    .route("/api/me", get(handlers::me))
    .route("/api/sessions", post(handlers::create_session))
    .route("/api/sessions/mine", get(handlers::list_my_sessions))
    .route("/api/sessions/:id", get(handlers::get_session).delete(handlers::delete_session))
    .route(
      "/api/sessions/:id/report",
      post(handlers::create_report).get(handlers::get_report),
    )
    .route("/api/answers", post(handlers::create_answer))
    .route("/api/answers/:id/analytics", get(handlers::get_analytics))
    .route(
      "/api/uploads/audio",
      post(handlers::upload_audio).layer(DefaultBodyLimit::max(handlers::MAX_AUDIO_BYTES)),
    )
    .route("/api/realtime/:session_id", get(handlers::realtime))
    .layer(cors(&state.config.cors_origins))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
