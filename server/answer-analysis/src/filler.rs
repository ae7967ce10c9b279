//! Filler-word ratio over the token sequence.

/// Hesitation markers and discourse fillers, including elongated variants.
/// Matched exactly against tokens (case-sensitive, no normalization).
pub const FILLERS: [&str; 8] = ["음", "어", "그", "음...", "어...", "약간", "뭐랄까", "그러니까"];

/// Share of tokens that are fillers, capped at 1.0. Empty input is 0.0.
pub fn filler_ratio(tokens: &[&str]) -> f64 {
  if tokens.is_empty() {
    return 0.0;
  }
  let fillers = tokens.iter().filter(|t| FILLERS.contains(*t)).count();
  (fillers as f64 / tokens.len() as f64).min(1.0)
}
