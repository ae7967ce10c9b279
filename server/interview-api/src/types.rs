//! Request/response bodies for the HTTP surface.

use answer_analysis::AnalysisResult;
use serde::{Deserialize, Serialize};

use crate::store::{AnalyticsRecord, QuestionRecord, ReportRecord, SessionRecord};

#[derive(Debug, Serialize)]
pub struct QuestionOut {
  pub id: i64,
  pub text: String,
  pub rubric_keywords: Vec<String>,
  pub difficulty: String,
}

impl From<QuestionRecord> for QuestionOut {
  fn from(q: QuestionRecord) -> Self {
    Self {
      rubric_keywords: q.keywords(),
      id: q.id,
      text: q.text,
      difficulty: q.difficulty,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct CreatedSession {
  pub session_id: i64,
  pub questions: Vec<QuestionOut>,
}

#[derive(Debug, Serialize)]
pub struct SessionDetail {
  #[serde(flatten)]
  pub session: SessionRecord,
  pub questions: Vec<QuestionOut>,
}

#[derive(Debug, Deserialize)]
pub struct MineQuery {
  pub company: Option<String>,
}

/// `type` defaults to `"text"`; a missing or null `duration_sec` counts as 0.
#[derive(Debug, Deserialize)]
pub struct AnswerCreate {
  pub question_id: i64,
  #[serde(rename = "type", default = "default_kind")]
  pub kind: String,
  #[serde(default)]
  pub transcript: String,
  #[serde(default)]
  pub audio_url: String,
  #[serde(default)]
  pub duration_sec: Option<f64>,
}

fn default_kind() -> String {
  "text".to_string()
}

impl AnswerCreate {
  pub fn duration(&self) -> f64 {
    self.duration_sec.unwrap_or(0.0)
  }
}

#[derive(Debug, Serialize)]
pub struct AnswerScored {
  pub answer_id: i64,
  pub analytics: AnalysisResult,
}

#[derive(Debug, Serialize)]
pub struct AudioScored {
  pub answer_id: i64,
  pub transcript: String,
  pub duration_sec: f64,
  pub audio_url: String,
  pub analytics: AnalysisResult,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsOut {
  pub answer_id: i64,
  #[serde(flatten)]
  pub metrics: AnalysisResult,
  pub created_at: String,
}

impl From<AnalyticsRecord> for AnalyticsOut {
  fn from(a: AnalyticsRecord) -> Self {
    Self {
      answer_id: a.answer_id,
      metrics: a.metrics,
      created_at: a.created_at.to_rfc3339(),
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ReportCreated {
  pub session_id: i64,
  pub report_id: i64,
  pub total_score: f64,
}

#[derive(Debug, Serialize)]
pub struct ReportOut {
  pub session_id: i64,
  pub total_score: f64,
  pub summary_md: String,
  pub suggestions_md: String,
  pub created_at: String,
}

impl From<ReportRecord> for ReportOut {
  fn from(r: ReportRecord) -> Self {
    Self {
      session_id: r.session_id,
      total_score: r.total_score,
      summary_md: r.summary_md,
      suggestions_md: r.suggestions_md,
      created_at: r.created_at.to_rfc3339(),
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub password: String,
}

impl Credentials {
  /// Emails compare trimmed and lowercased.
  pub fn normalized_email(&self) -> String {
    self.email.trim().to_lowercase()
  }
}

#[derive(Debug, Serialize)]
pub struct OkBody {
  pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct Me {
  pub id: i64,
  pub email: String,
}
