//! Structured error types for the API and how they map onto HTTP responses.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;
use crate::transcribe::TranscribeError;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0} not found")]
  NotFound(&'static str),

  #[error("{0}")]
  BadRequest(String),

  #[error("unauthorized")]
  Unauthorized,

  #[error("이메일 또는 비밀번호가 올바르지 않습니다")]
  BadCredentials,

  #[error("{0}")]
  Conflict(String),

  #[error("forbidden")]
  Forbidden,

  /// An external collaborator the request depends on failed.
  #[error("{context}: {source}")]
  Upstream {
    context: &'static str,
    #[source]
    source: TranscribeError,
  },

  #[error("store: {0}")]
  Store(#[from] StoreError),

  #[error("io: {0}")]
  Io(#[from] std::io::Error),

  #[error("password hashing: {0}")]
  Password(String),
}

impl ApiError {
  pub fn bad_request(msg: impl Into<String>) -> Self {
    Self::BadRequest(msg.into())
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Unauthorized | Self::BadCredentials => StatusCode::UNAUTHORIZED,
      Self::Forbidden => StatusCode::FORBIDDEN,
      Self::Conflict(_) => StatusCode::CONFLICT,
      Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
      Self::Store(_) | Self::Io(_) | Self::Password(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<TranscribeError> for ApiError {
  fn from(source: TranscribeError) -> Self {
    Self::Upstream {
      context: "STT failed",
      source,
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::BadRequest(rejection.body_text())
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    Self::BadRequest(rejection.body_text())
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    Self::BadRequest(rejection.body_text())
  }
}

impl From<MultipartRejection> for ApiError {
  fn from(rejection: MultipartRejection) -> Self {
    Self::BadRequest(rejection.body_text())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    // Internal details stay in the log, not in the response body.
    let detail = if status.is_server_error() && !matches!(self, Self::Upstream { .. }) {
      tracing::error!(error = %self, "request failed");
      "internal error".to_string()
    } else {
      if let Self::Upstream { .. } = self {
        tracing::warn!(error = %self, "upstream collaborator failed");
      }
      self.to_string()
    };
    (status, Json(json!({ "detail": detail }))).into_response()
  }
}
