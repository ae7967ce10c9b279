//! Input/output types for the analysis engine (JSON contract with callers).

use serde::{Deserialize, Serialize};

/// Input: one answer to score. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Input {
  #[serde(default)]
  pub transcript: String,
  /// Positional list; duplicates each count toward the denominator.
  #[serde(default)]
  pub rubric_keywords: Vec<String>,
  /// Seconds spoken so far. `<= 0` means the duration is unknown.
  #[serde(default)]
  pub elapsed_sec: f64,
}

/// Coarse sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
  #[serde(rename = "pos")]
  Positive,
  #[serde(rename = "neu")]
  Neutral,
  #[serde(rename = "neg")]
  Negative,
}

impl Sentiment {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Positive => "pos",
      Self::Neutral => "neu",
      Self::Negative => "neg",
    }
  }

  /// Parse a stored label; anything unrecognized reads as neutral.
  pub fn from_str_loose(s: &str) -> Self {
    match s.trim() {
      "pos" => Self::Positive,
      "neg" => Self::Negative,
      _ => Self::Neutral,
    }
  }
}

/// Output: the engine's fixed-shape metrics record, already rounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
  /// 0..=1, 3 decimals.
  pub filler_ratio: f64,
  /// >= 0, 1 decimal.
  #[serde(rename = "wpm")]
  pub words_per_minute: f64,
  /// 0..=1, 3 decimals.
  pub keyword_hit_rate: f64,
  pub sentiment: Sentiment,
  /// 0..=5, 2 decimals.
  pub clarity_score: f64,
  /// 0..=5, 2 decimals.
  pub coherence_score: f64,
}
