//! Speaking rate in words per minute.

/// Tokens per minute of elapsed time.
///
/// Unknown duration (`elapsed_sec <= 0`, or NaN) is an explicit 0.0; the rate is
/// never estimated. A duration so small that it rounds to zero minutes is
/// guarded the same way.
pub fn words_per_minute(token_count: usize, elapsed_sec: f64) -> f64 {
  if !(elapsed_sec > 0.0) {
    return 0.0;
  }
  let minutes = elapsed_sec / 60.0;
  if minutes > 0.0 {
    token_count as f64 / minutes
  } else {
    0.0
  }
}
