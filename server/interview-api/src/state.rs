//! Process-wide context shared by every handler.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::TokenSigner;
use crate::config::Config;
use crate::questions::{QuestionSource, TemplateQuestions};
use crate::report::ReportGenerator;
use crate::store::Store;
use crate::transcribe::{HttpTranscriber, SpeechEngineHandle, Transcriber};

pub struct AppState {
  pub config: Config,
  pub store: Arc<dyn Store>,
  pub transcriber: Arc<dyn Transcriber>,
  pub reports: ReportGenerator,
  pub questions: Arc<dyn QuestionSource>,
  pub tokens: TokenSigner,
}

impl AppState {
  /// Production wiring: template questions, the HTTP transcriber over a
  /// lazily created speech engine, and the configured report generator.
  pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
    let speech = Arc::new(SpeechEngineHandle::new(config.stt.clone()));
    Self {
      transcriber: Arc::new(HttpTranscriber::new(speech)),
      reports: ReportGenerator::from_settings(&config.llm),
      questions: Arc::new(TemplateQuestions),
      tokens: TokenSigner::new(&config.token_secret),
      store,
      config,
    }
  }
}

impl FromRef<Arc<AppState>> for TokenSigner {
  fn from_ref(state: &Arc<AppState>) -> Self {
    state.tokens.clone()
  }
}
