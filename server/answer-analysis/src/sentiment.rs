//! Placeholder rule-based sentiment. Replaceable by a real classifier; callers
//! only depend on the three-way label.

use crate::types::Sentiment;

pub const POSITIVE_MARKERS: [&str; 6] = ["성공", "해결", "개선", "달성", "최적화", "확장"];
pub const NEGATIVE_MARKERS: [&str; 5] = ["문제", "실패", "어려움", "이슈", "장애"];

/// Each marker present contributes +1 or -1 once, regardless of repetition.
pub fn classify_sentiment(transcript: &str) -> Sentiment {
  let text = transcript.to_lowercase();
  let present = |markers: &[&str]| markers.iter().filter(|m| text.contains(*m)).count() as i32;
  let score = present(&POSITIVE_MARKERS) - present(&NEGATIVE_MARKERS);

  match score {
    s if s > 0 => Sentiment::Positive,
    s if s < 0 => Sentiment::Negative,
    _ => Sentiment::Neutral,
  }
}
