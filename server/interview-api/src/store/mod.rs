//! Persistence collaborator: users, sessions, questions, answers, analytics,
//! reports.
//!
//! Ownership cascades: deleting a user leaves their sessions ownerless,
//! deleting a session removes its questions and report,
//! deleting a question removes its answers, deleting an answer removes its
//! analytics.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use answer_analysis::AnalysisResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::report::ReportResult;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("database: {0}")]
  Database(#[from] sqlx::Error),

  #[error("{entity} {id} does not exist")]
  MissingParent { entity: &'static str, id: i64 },

  #[error("{entity} {key} already exists")]
  Duplicate { entity: &'static str, key: String },

  #[error("corrupt row: {0}")]
  Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewUser {
  /// Already normalized by the caller.
  pub email: String,
  pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct UserRecord {
  pub id: i64,
  pub email: String,
  pub password_hash: String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSession {
  pub user_id: Option<i64>,
  pub company: String,
  pub role: String,
  pub job_title: String,
  pub level: String,
  pub difficulty: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
  pub id: i64,
  pub user_id: Option<i64>,
  pub company: String,
  pub role: String,
  pub job_title: String,
  pub level: String,
  pub difficulty: String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewQuestion {
  pub text: String,
  pub rubric_keywords: Vec<String>,
  pub difficulty: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionRecord {
  pub id: i64,
  pub session_id: i64,
  pub text: String,
  /// Comma-joined, as stored.
  pub rubric_keywords: String,
  pub difficulty: String,
}

impl QuestionRecord {
  pub fn keywords(&self) -> Vec<String> {
    parse_rubric(&self.rubric_keywords)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerKind {
  Text,
  Audio,
}

impl AnswerKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Text => "text",
      Self::Audio => "audio",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "text" => Some(Self::Text),
      "audio" => Some(Self::Audio),
      _ => None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct NewAnswer {
  pub question_id: i64,
  pub kind: AnswerKind,
  pub transcript: String,
  pub audio_url: String,
  pub duration_sec: f64,
}

#[derive(Debug, Clone)]
pub struct AnswerRecord {
  pub id: i64,
  pub question_id: i64,
  pub kind: AnswerKind,
  pub transcript: String,
  pub audio_url: String,
  pub duration_sec: f64,
  pub created_at: DateTime<Utc>,
}

/// Stored engine output, 1:1 with an answer.
#[derive(Debug, Clone)]
pub struct AnalyticsRecord {
  pub id: i64,
  pub answer_id: i64,
  pub metrics: AnalysisResult,
  pub created_at: DateTime<Utc>,
}

/// Final report, at most one per session.
#[derive(Debug, Clone)]
pub struct ReportRecord {
  pub id: i64,
  pub session_id: i64,
  pub total_score: f64,
  pub summary_md: String,
  pub suggestions_md: String,
  pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Store: Send + Sync {
  /// Fails with [`StoreError::Duplicate`] when the email is taken.
  async fn create_user(&self, new: NewUser) -> StoreResult<UserRecord>;
  async fn get_user(&self, id: i64) -> StoreResult<Option<UserRecord>>;
  async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

  async fn create_session(&self, new: NewSession) -> StoreResult<SessionRecord>;
  async fn get_session(&self, id: i64) -> StoreResult<Option<SessionRecord>>;
  /// Newest first; `company` filters by exact match when given.
  async fn list_sessions_for_user(&self, user_id: i64, company: Option<&str>) -> StoreResult<Vec<SessionRecord>>;
  async fn delete_session(&self, id: i64) -> StoreResult<bool>;

  async fn add_questions(&self, session_id: i64, questions: &[NewQuestion]) -> StoreResult<Vec<QuestionRecord>>;
  async fn get_question(&self, id: i64) -> StoreResult<Option<QuestionRecord>>;
  /// In id order.
  async fn list_questions(&self, session_id: i64) -> StoreResult<Vec<QuestionRecord>>;
  async fn delete_question(&self, id: i64) -> StoreResult<bool>;

  async fn create_answer(&self, new: NewAnswer) -> StoreResult<AnswerRecord>;
  /// In id order.
  async fn list_answers_for_questions(&self, question_ids: &[i64]) -> StoreResult<Vec<AnswerRecord>>;
  async fn delete_answer(&self, id: i64) -> StoreResult<bool>;

  async fn save_analytics(&self, answer_id: i64, metrics: &AnalysisResult) -> StoreResult<AnalyticsRecord>;
  async fn get_analytics(&self, answer_id: i64) -> StoreResult<Option<AnalyticsRecord>>;

  /// Insert or replace the session's report.
  async fn upsert_report(&self, session_id: i64, report: &ReportResult) -> StoreResult<ReportRecord>;
  async fn get_report(&self, session_id: i64) -> StoreResult<Option<ReportRecord>>;
}

/// Split a stored comma-joined rubric into trimmed, non-empty keywords.
pub fn parse_rubric(raw: &str) -> Vec<String> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
    .collect()
}

/// Inverse of [`parse_rubric`] for storage.
pub fn join_rubric(keywords: &[String]) -> String {
  keywords.join(",")
}
