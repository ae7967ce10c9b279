//! Answer analysis engine: rule-based scoring of interview answers; no model,
//! no DB, no network. Pure and stateless, so it can run inline on a request path
//! or inside a streaming message handler.
//! Used by interview-api as a library and by the binary for stdin/stdout.

mod coverage;
mod filler;
mod quality;
mod rate;
mod sentiment;
mod tokenize;
mod types;

pub use coverage::keyword_hit_rate;
pub use filler::{filler_ratio, FILLERS};
pub use quality::{quality_scores, QualityScores, MAX_PACE_WPM, MIN_PACE_WPM};
pub use rate::words_per_minute;
pub use sentiment::{classify_sentiment, NEGATIVE_MARKERS, POSITIVE_MARKERS};
pub use tokenize::tokenize;
pub use types::{AnalysisResult, Input, Sentiment};

/// Score one transcript. Total: never panics, never returns NaN.
///
/// Every sub-score is computed from unrounded intermediates; rounding happens
/// once, at assembly.
pub fn analyze(transcript: &str, rubric_keywords: &[String], elapsed_sec: f64) -> AnalysisResult {
  let tokens = tokenize(transcript);
  let filler = filler_ratio(&tokens);
  let wpm = words_per_minute(tokens.len(), elapsed_sec);
  let hit_rate = keyword_hit_rate(transcript, rubric_keywords);
  let sentiment = classify_sentiment(transcript);
  let quality = quality_scores(filler, wpm, hit_rate);

  AnalysisResult {
    filler_ratio: round_to(filler, 3),
    words_per_minute: round_to(wpm, 1),
    keyword_hit_rate: round_to(hit_rate, 3),
    sentiment,
    clarity_score: round_to(quality.clarity, 2),
    coherence_score: round_to(quality.coherence, 2),
  }
}

/// Run the engine on parsed input (no I/O).
pub fn run(input: &Input) -> AnalysisResult {
  analyze(&input.transcript, &input.rubric_keywords, input.elapsed_sec)
}

/// Round to `places` decimals. Rounds the exact binary value, not its
/// shortest decimal spelling: `2.675` is stored as `2.67499..` and rounds
/// to `2.67`.
pub fn round_to(value: f64, places: usize) -> f64 {
  if !value.is_finite() {
    return value;
  }
  format!("{:.*}", places, value).parse().unwrap_or(value)
}
