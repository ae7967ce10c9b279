//! Rubric keyword coverage.

/// Fraction of rubric keywords that appear in the transcript.
///
/// The keyword list is positional: duplicates each count, and blank entries
/// never hit but still count toward the denominator. An empty list is 0.0.
pub fn keyword_hit_rate(transcript: &str, rubric_keywords: &[String]) -> f64 {
  if rubric_keywords.is_empty() {
    return 0.0;
  }
  let text = transcript.to_lowercase();
  let hits = rubric_keywords
    .iter()
    .map(|kw| kw.trim().to_lowercase())
    .filter(|kw| !kw.is_empty() && text.contains(kw.as_str()))
    .count();
  hits as f64 / rubric_keywords.len() as f64
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kws(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn empty_rubric_is_zero() {
    assert_eq!(keyword_hit_rate("anything at all", &[]), 0.0);
  }

  #[test]
  fn case_insensitive_trimmed_substring() {
    let rate = keyword_hit_rate("We used Redis as a cache", &kws(&["  redis ", "CACHE", "kafka"]));
    assert!((rate - 2.0 / 3.0).abs() < 1e-12);
  }

  #[test]
  fn duplicates_count_independently() {
    assert_eq!(keyword_hit_rate("원인 분석", &kws(&["원인", "원인"])), 1.0);
    assert_eq!(keyword_hit_rate("원인 분석", &kws(&["원인", "원인", "해결"])), 2.0 / 3.0);
  }

  #[test]
  fn blank_keywords_count_in_denominator() {
    assert_eq!(keyword_hit_rate("구체성", &kws(&["구체성", "   "])), 0.5);
  }

  #[test]
  fn substring_inside_a_word_is_a_hit() {
    assert_eq!(keyword_hit_rate("구체성을 높였습니다", &kws(&["구체"])), 1.0);
  }
}
