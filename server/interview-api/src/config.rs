//! Service configuration with sane defaults, overridable from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("{var}: {reason}")]
  Invalid { var: &'static str, reason: String },

  #[error("{0} must be set")]
  Missing(&'static str),
}

/// External report generator settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
  /// Only "openai" enables the external generator; anything else means fallback only.
  pub provider: String,
  pub api_key: Option<String>,
  pub model: String,
  /// Base URL of an OpenAI-compatible API (no trailing slash).
  pub base_url: String,
  pub timeout: Duration,
}

impl LlmSettings {
  /// True when the external generator should be attempted at all.
  pub fn enabled(&self) -> bool {
    self.provider.eq_ignore_ascii_case("openai") && self.api_key.as_deref().is_some_and(|k| !k.is_empty())
  }
}

/// Speech-to-text server settings.
#[derive(Debug, Clone)]
pub struct SttSettings {
  /// Base URL of an OpenAI-compatible transcription server.
  pub base_url: String,
  pub model: String,
  pub api_key: Option<String>,
  pub timeout: Duration,
}

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct Config {
  pub bind_addr: SocketAddr,
  /// Postgres URL; `None` until loaded from the environment.
  pub database_url: Option<String>,
  /// Directory where uploaded audio files are stored.
  pub upload_dir: PathBuf,
  /// Browser origins allowed to call the API with credentials.
  pub cors_origins: Vec<String>,
  /// Secret used to sign access and refresh tokens.
  pub token_secret: String,
  pub llm: LlmSettings,
  pub stt: SttSettings,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
      database_url: None,
      upload_dir: PathBuf::from("uploads/audio"),
      cors_origins: vec![
        "http://localhost:5173".to_string(),
        "http://127.0.0.1:5173".to_string(),
      ],
      token_secret: "dev-secret".to_string(),
      llm: LlmSettings {
        provider: "none".to_string(),
        api_key: None,
        model: "gpt-4o-mini".to_string(),
        base_url: "https://api.openai.com/v1".to_string(),
        timeout: Duration::from_secs(60),
      },
      stt: SttSettings {
        base_url: "http://127.0.0.1:9000/v1".to_string(),
        model: "small".to_string(),
        api_key: None,
        timeout: Duration::from_secs(300),
      },
    }
  }
}

impl Config {
  /// Load from process environment variables.
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Load using an arbitrary variable lookup; unset or blank variables keep defaults.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let mut cfg = Config::default();

    if let Some(v) = get("BIND_ADDR") {
      cfg.bind_addr = v.parse().map_err(|e| ConfigError::Invalid {
        var: "BIND_ADDR",
        reason: format!("{}", e),
      })?;
    }
    cfg.database_url = get("DATABASE_URL");
    if let Some(v) = get("UPLOAD_DIR") {
      cfg.upload_dir = PathBuf::from(v);
    }
    if let Some(v) = get("CORS_ORIGINS") {
      cfg.cors_origins = v
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    }
    if let Some(v) = get("JWT_SECRET") {
      cfg.token_secret = v;
    }

    if let Some(v) = get("LLM_PROVIDER") {
      cfg.llm.provider = v;
    }
    cfg.llm.api_key = get("OPENAI_API_KEY");
    if let Some(v) = get("LLM_MODEL") {
      cfg.llm.model = v;
    }
    if let Some(v) = get("LLM_BASE_URL") {
      cfg.llm.base_url = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = get("LLM_TIMEOUT_SECS") {
      cfg.llm.timeout = parse_secs("LLM_TIMEOUT_SECS", &v)?;
    }

    if let Some(v) = get("STT_BASE_URL") {
      cfg.stt.base_url = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = get("STT_MODEL") {
      cfg.stt.model = v;
    }
    cfg.stt.api_key = get("STT_API_KEY");
    if let Some(v) = get("STT_TIMEOUT_SECS") {
      cfg.stt.timeout = parse_secs("STT_TIMEOUT_SECS", &v)?;
    }

    Ok(cfg)
  }

  pub fn require_database_url(&self) -> Result<&str, ConfigError> {
    self
      .database_url
      .as_deref()
      .ok_or(ConfigError::Missing("DATABASE_URL"))
  }
}

fn parse_secs(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
  let secs: u64 = raw.parse().map_err(|_| ConfigError::Invalid {
    var,
    reason: format!("expected whole seconds, got {:?}", raw),
  })?;
  if secs == 0 {
    return Err(ConfigError::Invalid {
      var,
      reason: "must be greater than zero".to_string(),
    });
  }
  Ok(Duration::from_secs(secs))
}
