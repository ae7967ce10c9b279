//! Passwords, tokens and the cookies that carry them.
//!
//! Passwords are stored as Argon2id PHC strings. Tokens are
//! `kind.user_id.expires_at.mac`, where `mac` is a keyed BLAKE3 hash of the
//! first three fields under a key derived from the shared secret.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
  async_trait,
  extract::{FromRef, FromRequestParts},
  http::{header, request::Parts, HeaderMap, HeaderValue},
};
use chrono::Utc;

use crate::error::ApiError;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Access token lifetime: 15 minutes.
pub const ACCESS_TTL_SECS: i64 = 15 * 60;
/// Refresh token lifetime: 7 days.
pub const REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

const KEY_CONTEXT: &str = "interview-api 2024 session token mac";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Access,
  Refresh,
}

impl TokenKind {
  fn tag(self) -> &'static str {
    match self {
      Self::Access => "a",
      Self::Refresh => "r",
    }
  }

  fn ttl(self) -> i64 {
    match self {
      Self::Access => ACCESS_TTL_SECS,
      Self::Refresh => REFRESH_TTL_SECS,
    }
  }
}

#[derive(Clone)]
pub struct TokenSigner {
  key: [u8; 32],
}

impl std::fmt::Debug for TokenSigner {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("TokenSigner(..)")
  }
}

impl TokenSigner {
  pub fn new(secret: &str) -> Self {
    Self {
      key: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()),
    }
  }

  pub fn issue(&self, kind: TokenKind, user_id: i64) -> String {
    self.issue_at(kind, user_id, Utc::now().timestamp())
  }

  pub fn issue_at(&self, kind: TokenKind, user_id: i64, now: i64) -> String {
    let body = format!("{}.{}.{}", kind.tag(), user_id, now + kind.ttl());
    let mac = blake3::keyed_hash(&self.key, body.as_bytes());
    format!("{}.{}", body, mac.to_hex())
  }

  /// User id carried by a valid, unexpired token of the given kind.
  pub fn verify(&self, kind: TokenKind, token: &str) -> Option<i64> {
    self.verify_at(kind, token, Utc::now().timestamp())
  }

  pub fn verify_at(&self, kind: TokenKind, token: &str, now: i64) -> Option<i64> {
    let (body, mac_hex) = token.rsplit_once('.')?;
    let given = blake3::Hash::from_hex(mac_hex).ok()?;
    // blake3::Hash equality is constant-time.
    if blake3::keyed_hash(&self.key, body.as_bytes()) != given {
      return None;
    }

    let mut parts = body.splitn(3, '.');
    let tag = parts.next()?;
    let user_id: i64 = parts.next()?.parse().ok()?;
    let expires_at: i64 = parts.next()?.parse().ok()?;
    if tag != kind.tag() || expires_at <= now {
      return None;
    }
    Some(user_id)
  }

  /// Fresh access and refresh tokens for a user.
  pub fn pair(&self, user_id: i64) -> (String, String) {
    (self.issue(TokenKind::Access, user_id), self.issue(TokenKind::Refresh, user_id))
  }
}

/// Argon2id PHC string for a new password.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Whether `password` matches a stored PHC string. Unparseable hashes never
/// match.
pub fn verify_password(password: &str, stored: &str) -> bool {
  match PasswordHash::new(stored) {
    Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
    Err(err) => {
      tracing::warn!(error = %err, "stored password hash is unreadable");
      false
    }
  }
}

/// Value of the named cookie in the request headers.
pub fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(k, _)| *k == name)
    .map(|(_, v)| v.trim())
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = value.split_once(' ')?;
  scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

fn set_cookie(name: &str, value: &str, max_age: i64) -> Option<HeaderValue> {
  HeaderValue::from_str(&format!(
    "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
    name, value, max_age
  ))
  .ok()
}

/// `Set-Cookie` values for a fresh token pair.
pub fn auth_cookies(access: &str, refresh: &str) -> Vec<HeaderValue> {
  [
    set_cookie(ACCESS_COOKIE, access, ACCESS_TTL_SECS),
    set_cookie(REFRESH_COOKIE, refresh, REFRESH_TTL_SECS),
  ]
  .into_iter()
  .flatten()
  .collect()
}

/// `Set-Cookie` values that expire both auth cookies.
pub fn clear_cookies() -> Vec<HeaderValue> {
  [set_cookie(ACCESS_COOKIE, "", 0), set_cookie(REFRESH_COOKIE, "", 0)]
    .into_iter()
    .flatten()
    .collect()
}

/// The authenticated caller, from the `access_token` cookie or a bearer
/// header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
  pub id: i64,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
  S: Send + Sync,
  TokenSigner: FromRef<S>,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
    let signer = TokenSigner::from_ref(state);
    let token = cookie(&parts.headers, ACCESS_COOKIE)
      .or_else(|| bearer(&parts.headers))
      .ok_or(ApiError::Unauthorized)?;
    match signer.verify(TokenKind::Access, token) {
      Some(id) => Ok(AuthUser { id }),
      None => {
        tracing::debug!("rejected access token");
        Err(ApiError::Unauthorized)
      }
    }
  }
}
