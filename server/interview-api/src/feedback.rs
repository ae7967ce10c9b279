//! Live feedback over a duplex channel.
//!
//! Each connection owns a [`FeedbackSession`]. Clients send the cumulative
//! transcript so far; every message is re-scored from scratch and answered
//! with the metrics and a short coaching tip.

use std::collections::HashMap;

use answer_analysis::{analyze, AnalysisResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::store::Store;

const TIP_FILLER: &str = "충전어(음, 어)를 줄여 보세요.";
const TIP_SLOW: &str = "조금 더 또박또박, 핵심 키워드 중심으로 말해보세요.";
const TIP_FAST: &str = "속도가 빨라요. 문장 사이 짧은 멈춤을 줘보세요.";
const TIP_KEYWORDS: &str = "질문 핵심 키워드를 더 포함하세요.";
const TIP_DEFAULT: &str = "좋아요! 이 흐름을 유지하세요.";

/// At most this many tips are sent per message.
const MAX_TIPS: usize = 2;

/// Coaching line derived from threshold rules over the metrics.
pub fn make_tip(metrics: &AnalysisResult) -> String {
  let rules = [
    (metrics.filler_ratio > 0.05, TIP_FILLER),
    (metrics.words_per_minute < 80.0, TIP_SLOW),
    (metrics.words_per_minute > 220.0, TIP_FAST),
    (metrics.keyword_hit_rate < 0.5, TIP_KEYWORDS),
  ];
  let tips: Vec<&str> = rules
    .iter()
    .filter(|(hit, _)| *hit)
    .map(|(_, tip)| *tip)
    .take(MAX_TIPS)
    .collect();
  if tips.is_empty() {
    TIP_DEFAULT.to_string()
  } else {
    tips.join(" ")
  }
}

#[derive(Debug, Deserialize)]
struct Inbound {
  question_id: i64,
  #[serde(default)]
  text: Option<String>,
  #[serde(default)]
  elapsed_sec: Option<f64>,
}

#[derive(Debug, Serialize)]
struct Outbound<'a> {
  question_id: i64,
  elapsed_sec: f64,
  metrics: &'a AnalysisResult,
  tip: String,
}

/// Per-connection state: the session id and the rubric keywords of every
/// question seen so far. Entries are never evicted; a session only has a
/// handful of questions.
pub struct FeedbackSession {
  session_id: i64,
  rubrics: HashMap<i64, Vec<String>>,
}

impl FeedbackSession {
  pub fn new(session_id: i64) -> Self {
    Self {
      session_id,
      rubrics: HashMap::new(),
    }
  }

  pub fn session_id(&self) -> i64 {
    self.session_id
  }

  pub fn cached_questions(&self) -> usize {
    self.rubrics.len()
  }

  async fn rubric(&mut self, store: &dyn Store, question_id: i64) -> Result<Option<&[String]>, Value> {
    if !self.rubrics.contains_key(&question_id) {
      let question = store.get_question(question_id).await.map_err(|e| {
        tracing::warn!(session_id = self.session_id, question_id, error = %e, "rubric lookup failed");
        json!({ "error": "storage unavailable" })
      })?;
      let Some(question) = question else {
        return Ok(None);
      };
      self.rubrics.insert(question_id, question.keywords());
    }
    Ok(self.rubrics.get(&question_id).map(Vec::as_slice))
  }

  /// Score one inbound text frame. Always produces a reply; problems with the
  /// message become `{"error": ..}` replies and the connection stays usable.
  pub async fn handle_text(&mut self, store: &dyn Store, raw: &str) -> Value {
    let msg: Inbound = match serde_json::from_str(raw) {
      Ok(m) => m,
      Err(e) => return json!({ "error": format!("invalid message: {}", e) }),
    };
    let text = msg.text.unwrap_or_default();
    let elapsed_sec = msg.elapsed_sec.unwrap_or(0.0);

    let keywords = match self.rubric(store, msg.question_id).await {
      Ok(Some(k)) => k,
      Ok(None) => return json!({ "error": "Question not found" }),
      Err(reply) => return reply,
    };

    let metrics = analyze(&text, keywords, elapsed_sec);
    let out = Outbound {
      question_id: msg.question_id,
      elapsed_sec,
      metrics: &metrics,
      tip: make_tip(&metrics),
    };
    serde_json::to_value(out).unwrap_or_else(|e| json!({ "error": e.to_string() }))
  }
}
