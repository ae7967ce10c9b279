//! Clarity and coherence synthesis from the lower-level metrics.

/// Lower bound of a comfortable speaking pace (words per minute).
pub const MIN_PACE_WPM: f64 = 60.0;
/// Upper bound of a comfortable speaking pace (words per minute).
pub const MAX_PACE_WPM: f64 = 220.0;

const SCORE_MAX: f64 = 5.0;
const FILLER_WEIGHT: f64 = 3.0;
const PACE_PENALTY: f64 = 1.0;
const COHERENCE_BASE: f64 = 2.0;
const COVERAGE_WEIGHT: f64 = 3.0;

/// Heuristic quality scores, each in 0..=5 (unrounded).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityScores {
  pub clarity: f64,
  pub coherence: f64,
}

/// Linear heuristics: fillers and an off-pace delivery cost clarity, rubric
/// coverage earns coherence.
///
/// A rate of exactly 0.0 carries no pace penalty. That covers an unknown
/// duration and also an empty transcript with a known duration.
pub fn quality_scores(filler_ratio: f64, words_per_minute: f64, keyword_hit_rate: f64) -> QualityScores {
  let mut clarity = SCORE_MAX - filler_ratio * FILLER_WEIGHT;
  let pace_known = words_per_minute > 0.0;
  if pace_known && (words_per_minute > MAX_PACE_WPM || words_per_minute < MIN_PACE_WPM) {
    clarity -= PACE_PENALTY;
  }

  let coherence = COHERENCE_BASE + keyword_hit_rate * COVERAGE_WEIGHT;

  QualityScores {
    clarity: clamp_score(clarity),
    coherence: clamp_score(coherence),
  }
}

fn clamp_score(v: f64) -> f64 {
  v.clamp(0.0, SCORE_MAX)
}
