//! Speech-to-text collaborator.
//!
//! The speech engine is a heavyweight, process-wide resource. It lives behind
//! [`SpeechEngineHandle`], which creates it on first use and never recreates
//! it; transcribers receive the handle instead of reaching for global state.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::config::SttSettings;

#[derive(Debug, Error)]
pub enum TranscribeError {
  #[error("read audio: {0}")]
  Io(#[from] std::io::Error),

  #[error("engine init: {0}")]
  Init(String),

  #[error("engine: {0}")]
  Engine(String),

  #[error("request: {0}")]
  Request(#[from] reqwest::Error),
}

/// Transcribed text plus the audio duration the engine measured.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
  pub text: String,
  pub duration_sec: f64,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
  async fn transcribe(&self, path: &Path, language: &str) -> Result<Transcript, TranscribeError>;
}

/// Connected speech engine: an OpenAI-compatible `/audio/transcriptions` server.
#[derive(Debug)]
pub struct SpeechEngine {
  http: reqwest::Client,
  endpoint: String,
  model: String,
  api_key: Option<String>,
}

impl SpeechEngine {
  fn connect(settings: &SttSettings) -> Result<Self, TranscribeError> {
    let base = settings.base_url.trim_end_matches('/');
    if !(base.starts_with("http://") || base.starts_with("https://")) {
      return Err(TranscribeError::Init(format!("STT_BASE_URL must be http(s), got {:?}", base)));
    }
    let http = reqwest::Client::builder()
      .timeout(settings.timeout)
      .build()
      .map_err(|e| TranscribeError::Init(e.to_string()))?;
    tracing::info!(endpoint = %base, model = %settings.model, "speech engine ready");
    Ok(Self {
      http,
      endpoint: format!("{}/audio/transcriptions", base),
      model: settings.model.clone(),
      api_key: settings.api_key.clone(),
    })
  }
}

/// Lazily-initialized, never-reinitialized owner of the speech engine.
pub struct SpeechEngineHandle {
  settings: SttSettings,
  engine: OnceCell<SpeechEngine>,
}

impl SpeechEngineHandle {
  pub fn new(settings: SttSettings) -> Self {
    Self {
      settings,
      engine: OnceCell::new(),
    }
  }

  /// The engine, created on the first call. A failed creation is retried on
  /// the next call; a successful one is kept for the life of the process.
  pub async fn get(&self) -> Result<&SpeechEngine, TranscribeError> {
    self
      .engine
      .get_or_try_init(|| async { SpeechEngine::connect(&self.settings) })
      .await
  }

  pub fn is_initialized(&self) -> bool {
    self.engine.initialized()
  }
}

#[derive(Debug, Deserialize)]
struct VerboseSegment {
  #[serde(default)]
  text: String,
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
  #[serde(default)]
  text: String,
  #[serde(default)]
  duration: Option<f64>,
  #[serde(default)]
  segments: Vec<VerboseSegment>,
}

impl VerboseTranscription {
  /// Joined trimmed segment texts when segments are present, else `text`.
  fn into_transcript(self) -> Transcript {
    let text = if self.segments.is_empty() {
      self.text.trim().to_string()
    } else {
      self
        .segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    };
    Transcript {
      text,
      duration_sec: self.duration.filter(|d| d.is_finite() && *d > 0.0).unwrap_or(0.0),
    }
  }
}

/// Transcriber backed by the shared [`SpeechEngineHandle`].
pub struct HttpTranscriber {
  engine: Arc<SpeechEngineHandle>,
}

impl HttpTranscriber {
  pub fn new(engine: Arc<SpeechEngineHandle>) -> Self {
    Self { engine }
  }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
  async fn transcribe(&self, path: &Path, language: &str) -> Result<Transcript, TranscribeError> {
    let engine = self.engine.get().await?;
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "audio.wav".to_string());

    let form = reqwest::multipart::Form::new()
      .text("model", engine.model.clone())
      .text("language", language.to_string())
      .text("response_format", "verbose_json")
      .part("file", reqwest::multipart::Part::bytes(bytes).file_name(file_name));

    let mut request = engine.http.post(&engine.endpoint).multipart(form);
    if let Some(key) = &engine.api_key {
      request = request.bearer_auth(key);
    }
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(TranscribeError::Engine(format!("status {}: {}", status.as_u16(), body)));
    }
    let parsed: VerboseTranscription = response.json().await?;
    Ok(parsed.into_transcript())
  }
}
