//! Final report generation: external text generator first, deterministic
//! rule-based fallback on any failure.
//!
//! Reports aggregate stored per-answer metrics; the analysis engine is not
//! re-run here.

use std::collections::BTreeMap;

use answer_analysis::{round_to, AnalysisResult, Sentiment};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::LlmSettings;
use crate::store::{SessionRecord, Store, StoreResult};

/// Strength/improvement lines quote at most this many characters of a question.
const QUESTION_EXCERPT_CHARS: usize = 28;
const STRONG_COVERAGE: f64 = 0.6;
const FILLER_WARNING: f64 = 0.08;
const NO_DATA_LINE: &str = "- (분석 데이터 부족)";

// ---------------------------------------------------------------------------
// Payload / result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SessionMeta {
  pub id: i64,
  pub role: String,
  pub job_title: String,
  pub level: String,
  pub difficulty: String,
  pub created_at: String,
}

/// One question with the answer chosen for the report and its stored metrics.
#[derive(Debug, Clone, Serialize)]
pub struct QaEntry {
  pub question: String,
  /// Comma-joined, as stored.
  pub rubric_keywords: String,
  pub answer: String,
  pub analytics: AnalysisResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportPayload {
  pub session: SessionMeta,
  pub qas: Vec<QaEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
  pub total_score: f64,
  pub summary_md: String,
  pub suggestions_md: String,
}

/// Metrics assumed for an answer whose analytics row is missing.
fn placeholder_metrics() -> AnalysisResult {
  AnalysisResult {
    filler_ratio: 0.0,
    words_per_minute: 0.0,
    keyword_hit_rate: 0.0,
    sentiment: Sentiment::Neutral,
    clarity_score: 2.5,
    coherence_score: 2.5,
  }
}

/// Gather questions (id order) with the last answer by id for each; questions
/// without an answer are skipped.
pub async fn collect_payload(store: &dyn Store, session: &SessionRecord) -> StoreResult<ReportPayload> {
  let questions = store.list_questions(session.id).await?;
  let question_ids: Vec<i64> = questions.iter().map(|q| q.id).collect();

  let mut answers = store.list_answers_for_questions(&question_ids).await?;
  answers.sort_by_key(|a| a.id);
  let mut latest = BTreeMap::new();
  for a in answers {
    latest.insert(a.question_id, a);
  }

  let mut qas = Vec::new();
  for q in &questions {
    let Some(answer) = latest.remove(&q.id) else {
      continue;
    };
    let analytics = store
      .get_analytics(answer.id)
      .await?
      .map(|r| r.metrics)
      .unwrap_or_else(placeholder_metrics);
    qas.push(QaEntry {
      question: q.text.clone(),
      rubric_keywords: q.rubric_keywords.clone(),
      answer: answer.transcript,
      analytics,
    });
  }

  Ok(ReportPayload {
    session: SessionMeta {
      id: session.id,
      role: session.role.clone(),
      job_title: session.job_title.clone(),
      level: session.level.clone(),
      difficulty: session.difficulty.clone(),
      created_at: session.created_at.to_rfc3339(),
    },
    qas,
  })
}

// ---------------------------------------------------------------------------
// Deterministic fallback
// ---------------------------------------------------------------------------

fn excerpt(text: &str) -> String {
  text.chars().take(QUESTION_EXCERPT_CHARS).collect()
}

fn section(lines: &[String]) -> String {
  if lines.is_empty() {
    NO_DATA_LINE.to_string()
  } else {
    lines.join("\n")
  }
}

/// Rule-based report from stored metrics; same payload, same report.
pub fn fallback_report(payload: &ReportPayload) -> ReportResult {
  let mut total = 0.0;
  let mut strengths = Vec::new();
  let mut improvements = Vec::new();

  for qa in &payload.qas {
    let an = &qa.analytics;
    total += (an.clarity_score + an.coherence_score) * 10.0;
    if an.keyword_hit_rate >= STRONG_COVERAGE {
      strengths.push(format!("- `{}...`: 키워드 충족률 양호", excerpt(&qa.question)));
    } else {
      improvements.push(format!("- `{}...`: 핵심 키워드 언급 강화 필요", excerpt(&qa.question)));
    }
    if an.filler_ratio > FILLER_WARNING {
      improvements.push("- 충전어(음/어) 줄이기".to_string());
    }
  }

  let answered = payload.qas.len().max(1) as f64;
  let total_score = round_to((total / answered).clamp(0.0, 100.0), 1);

  let summary_md = format!(
    "## 요약\n\
     - 총평: **{:.1}/100**\n\
     - 강점: 키워드 중심 설명, 사례 기반 답변(일부)\n\
     - 개선: 불필요한 완충어 축소, 질문 의도에 맞춘 키워드 가시화\n\
     \n### 강점\n{}\n\n### 개선점\n{}",
    total_score,
    section(&strengths),
    section(&improvements),
  );
  let suggestions_md = "## 다음 연습 질문\n\
     - 최근 장애 원인 분석 과정을 1분 내로 요약해 보세요.\n\
     - 서비스 확장성 개선 사례를 지표와 함께 설명해 보세요.\n\
     - 협업 갈등 상황을 STAR 기법으로 정리해 보세요.\n"
    .to_string();

  ReportResult {
    total_score,
    summary_md,
    suggestions_md,
  }
}

// ---------------------------------------------------------------------------
// External generator
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LlmError {
  #[error("request: {0}")]
  Request(#[from] reqwest::Error),

  #[error("status {status}: {body}")]
  Status { status: u16, body: String },

  #[error("response has no message content")]
  MissingContent,

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),

  #[error("invalid report: {0}")]
  Invalid(&'static str),
}

const SYSTEM_PROMPT: &str = "You are a Korean interview coach. Write concise, actionable Markdown. \
Use STAR when helpful. Return ONLY JSON with keys: total_score(number), summary_md(string), suggestions_md(string).";

/// OpenAI-compatible chat completions client in JSON-object mode.
#[derive(Debug, Clone)]
pub struct LlmClient {
  http: reqwest::Client,
  endpoint: String,
  api_key: String,
  model: String,
}

impl LlmClient {
  pub fn new(settings: &LlmSettings, api_key: String) -> Result<Self, LlmError> {
    let http = reqwest::Client::builder().timeout(settings.timeout).build()?;
    Ok(Self {
      http,
      endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
      api_key,
      model: settings.model.clone(),
    })
  }

  pub async fn generate(&self, payload: &ReportPayload) -> Result<ReportResult, LlmError> {
    let user = format!(
      "세션 메타와 Q/A+분석 데이터를 바탕으로 최종 리포트를 생성하세요.\n\
       반드시 JSON만 반환하세요. 마크다운은 값 내부에서만 사용하세요.\n\n[입력 데이터]\n{}",
      serde_json::to_string(payload)?
    );
    let body = json!({
      "model": self.model,
      "messages": [
        { "role": "system", "content": SYSTEM_PROMPT },
        { "role": "user", "content": user },
      ],
      "temperature": 0.2,
      "response_format": { "type": "json_object" },
    });

    let response = self
      .http
      .post(&self.endpoint)
      .bearer_auth(&self.api_key)
      .json(&body)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(LlmError::Status {
        status: status.as_u16(),
        body,
      });
    }

    let value: serde_json::Value = response.json().await?;
    let content = value["choices"][0]["message"]["content"]
      .as_str()
      .ok_or(LlmError::MissingContent)?;
    let report: ReportResult = serde_json::from_str(content)?;
    if !report.total_score.is_finite() {
      return Err(LlmError::Invalid("total_score is not a finite number"));
    }
    Ok(ReportResult {
      total_score: report.total_score.clamp(0.0, 100.0),
      ..report
    })
  }
}

/// The one report strategy: configured generator if any, fallback otherwise.
#[derive(Debug, Clone, Default)]
pub struct ReportGenerator {
  llm: Option<LlmClient>,
}

impl ReportGenerator {
  pub fn from_settings(settings: &LlmSettings) -> Self {
    if !settings.enabled() {
      return Self::fallback_only();
    }
    let key = settings.api_key.clone().unwrap_or_default();
    match LlmClient::new(settings, key) {
      Ok(client) => Self { llm: Some(client) },
      Err(e) => {
        tracing::warn!(error = %e, "report generator unavailable; using fallback reports");
        Self::fallback_only()
      }
    }
  }

  pub fn fallback_only() -> Self {
    Self { llm: None }
  }

  /// Never fails: any generator error degrades to [`fallback_report`].
  pub async fn generate(&self, payload: &ReportPayload) -> ReportResult {
    let Some(client) = &self.llm else {
      return fallback_report(payload);
    };
    match client.generate(payload).await {
      Ok(report) => report,
      Err(e) => {
        tracing::warn!(error = %e, session_id = payload.session.id, "report generation failed; using fallback");
        fallback_report(payload)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::{http::StatusCode, routing::post, Json, Router};
  use std::time::Duration;

  fn metrics(clarity: f64, coherence: f64, hit_rate: f64, filler: f64) -> AnalysisResult {
    AnalysisResult {
      filler_ratio: filler,
      words_per_minute: 120.0,
      keyword_hit_rate: hit_rate,
      sentiment: Sentiment::Neutral,
      clarity_score: clarity,
      coherence_score: coherence,
    }
  }

  fn payload(qas: Vec<QaEntry>) -> ReportPayload {
    ReportPayload {
      session: SessionMeta {
        id: 1,
        role: "backend".into(),
        job_title: "Backend Engineer".into(),
        level: "junior".into(),
        difficulty: "medium".into(),
        created_at: "2025-01-15T10:00:00+00:00".into(),
      },
      qas,
    }
  }

  fn qa(question: &str, analytics: AnalysisResult) -> QaEntry {
    QaEntry {
      question: question.into(),
      rubric_keywords: "원인,해결".into(),
      answer: "답변".into(),
      analytics,
    }
  }

  #[test]
  fn fallback_averages_quality_scores() {
    let p = payload(vec![
      qa("첫 번째 질문", metrics(4.0, 5.0, 1.0, 0.0)),
      qa("두 번째 질문", metrics(3.0, 2.0, 0.0, 0.1)),
    ]);
    let r = fallback_report(&p);
    // ((4+5)*10 + (3+2)*10) / 2
    assert_eq!(r.total_score, 70.0);
    assert!(r.summary_md.contains("**70.0/100**"));
    assert!(r.summary_md.contains("`첫 번째 질문...`: 키워드 충족률 양호"));
    assert!(r.summary_md.contains("`두 번째 질문...`: 핵심 키워드 언급 강화 필요"));
    assert!(r.summary_md.contains("- 충전어(음/어) 줄이기"));
    assert!(r.suggestions_md.starts_with("## 다음 연습 질문"));
  }

  #[test]
  fn fallback_with_no_answers_is_zero_with_placeholders() {
    let r = fallback_report(&payload(vec![]));
    assert_eq!(r.total_score, 0.0);
    assert_eq!(r.summary_md.matches(NO_DATA_LINE).count(), 2);
  }

  #[test]
  fn fallback_excerpt_counts_characters_not_bytes() {
    let long = "가".repeat(40);
    let r = fallback_report(&payload(vec![qa(&long, metrics(5.0, 5.0, 1.0, 0.0))]));
    assert!(r.summary_md.contains(&format!("`{}...`", "가".repeat(28))));
    assert_eq!(r.total_score, 100.0);
  }

  #[test]
  fn fallback_is_deterministic() {
    let p = payload(vec![qa("질문", metrics(3.3, 2.7, 0.5, 0.09))]);
    assert_eq!(fallback_report(&p), fallback_report(&p));
  }

  async fn fake_llm(app: Router) -> LlmSettings {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    LlmSettings {
      provider: "openai".into(),
      api_key: Some("sk-test".into()),
      model: "test-model".into(),
      base_url: format!("http://{}/v1", addr),
      timeout: Duration::from_secs(5),
    }
  }

  #[tokio::test]
  async fn generator_uses_external_report_when_valid() {
    let app = Router::new().route(
      "/v1/chat/completions",
      post(|Json(req): Json<serde_json::Value>| async move {
        assert_eq!(req["response_format"]["type"], "json_object");
        let content = json!({
          "total_score": 82.5,
          "summary_md": "## 요약\n좋아요",
          "suggestions_md": "## 다음\n- 연습",
        })
        .to_string();
        Json(json!({ "choices": [{ "message": { "content": content } }] }))
      }),
    );
    let generator = ReportGenerator::from_settings(&fake_llm(app).await);
    let r = generator.generate(&payload(vec![])).await;
    assert_eq!(r.total_score, 82.5);
    assert_eq!(r.summary_md, "## 요약\n좋아요");
  }

  #[tokio::test]
  async fn generator_falls_back_on_upstream_error() {
    let app = Router::new().route(
      "/v1/chat/completions",
      post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let generator = ReportGenerator::from_settings(&fake_llm(app).await);
    let p = payload(vec![qa("질문", metrics(4.0, 4.0, 0.7, 0.0))]);
    assert_eq!(generator.generate(&p).await, fallback_report(&p));
  }

  #[tokio::test]
  async fn generator_falls_back_on_malformed_content() {
    let app = Router::new().route(
      "/v1/chat/completions",
      post(|| async { Json(json!({ "choices": [{ "message": { "content": "not json" } }] })) }),
    );
    let generator = ReportGenerator::from_settings(&fake_llm(app).await);
    let p = payload(vec![]);
    assert_eq!(generator.generate(&p).await, fallback_report(&p));
  }

  #[tokio::test]
  async fn disabled_provider_never_calls_out() {
    let settings = LlmSettings {
      provider: "none".into(),
      api_key: Some("sk-test".into()),
      model: "m".into(),
      base_url: "http://127.0.0.1:1/v1".into(),
      timeout: Duration::from_secs(1),
    };
    let p = payload(vec![]);
    assert_eq!(ReportGenerator::from_settings(&settings).generate(&p).await, fallback_report(&p));
  }
}
