use std::sync::Arc;

use axum::{
  extract::State,
  http::{header, HeaderMap, StatusCode},
  response::{IntoResponse, Response},
  Json,
};

use crate::auth::{
  auth_cookies, clear_cookies, cookie, hash_password, verify_password, AuthUser, TokenKind, REFRESH_COOKIE,
};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;
use crate::store::{NewUser, StoreError};
use crate::types::{Credentials, Me, OkBody};

fn with_cookies(response: impl IntoResponse, cookies: Vec<header::HeaderValue>) -> Response {
  let mut response = response.into_response();
  for value in cookies {
    response.headers_mut().append(header::SET_COOKIE, value);
  }
  response
}

/// Argon2 work runs off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
  F: FnOnce() -> T + Send + 'static,
  T: Send + 'static,
{
  tokio::task::spawn_blocking(work)
    .await
    .map_err(|e| ApiError::Password(e.to_string()))
}

pub async fn signup(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<Credentials>,
) -> Result<Json<OkBody>, ApiError> {
  let email = body.normalized_email();
  if email.is_empty() || body.password.is_empty() {
    return Err(ApiError::bad_request("email/password required"));
  }
  if state.store.find_user_by_email(&email).await?.is_some() {
    return Err(ApiError::Conflict("email already exists".into()));
  }

  let password = body.password;
  let password_hash = blocking(move || hash_password(&password))
    .await?
    .map_err(|e| ApiError::Password(e.to_string()))?;
  let user = match state.store.create_user(NewUser { email, password_hash }).await {
    Ok(user) => user,
    // Lost a race with a concurrent signup for the same email.
    Err(StoreError::Duplicate { .. }) => return Err(ApiError::Conflict("email already exists".into())),
    Err(err) => return Err(err.into()),
  };

  tracing::info!(user_id = user.id, "user signed up");
  Ok(Json(OkBody { ok: true }))
}

/// Check credentials and set a fresh token pair.
pub async fn login(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<Credentials>,
) -> Result<Response, ApiError> {
  let email = body.normalized_email();
  let user = state
    .store
    .find_user_by_email(&email)
    .await?
    .ok_or(ApiError::BadCredentials)?;

  let password = body.password;
  let stored = user.password_hash.clone();
  if !blocking(move || verify_password(&password, &stored)).await? {
    tracing::debug!(user_id = user.id, "password mismatch");
    return Err(ApiError::BadCredentials);
  }

  let (access, refresh) = state.tokens.pair(user.id);
  Ok(with_cookies(Json(OkBody { ok: true }), auth_cookies(&access, &refresh)))
}

/// Trade a valid refresh cookie for a fresh token pair.
pub async fn refresh(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Response, ApiError> {
  let token = cookie(&headers, REFRESH_COOKIE).ok_or(ApiError::Unauthorized)?;
  let user_id = state
    .tokens
    .verify(TokenKind::Refresh, token)
    .ok_or(ApiError::Unauthorized)?;
  let (access, refresh) = state.tokens.pair(user_id);
  Ok(with_cookies(StatusCode::NO_CONTENT, auth_cookies(&access, &refresh)))
}

pub async fn logout() -> Response {
  with_cookies(StatusCode::NO_CONTENT, clear_cookies())
}

/// A valid token for a user that no longer exists is unauthorized.
pub async fn me(State(state): State<Arc<AppState>>, user: AuthUser) -> Result<Json<Me>, ApiError> {
  let record = state.store.get_user(user.id).await?.ok_or(ApiError::Unauthorized)?;
  Ok(Json(Me {
    id: record.id,
    email: record.email,
  }))
}
