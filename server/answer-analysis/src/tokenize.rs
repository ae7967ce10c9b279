//! Naive whitespace/punctuation tokenizer the scoring formulas are calibrated against.

/// Punctuation that separates tokens in addition to whitespace.
const SEPARATORS: [char; 13] = [',', '.', '!', '?', '-', ':', ';', '(', ')', '[', ']', '{', '}'];

fn is_separator(c: char) -> bool {
  c.is_whitespace() || SEPARATORS.contains(&c)
}

/// Split on runs of whitespace and separator punctuation, dropping empty fragments.
/// No case or Unicode normalization is applied.
pub fn tokenize(text: &str) -> Vec<&str> {
  text.split(is_separator).filter(|t| !t.is_empty()).collect()
}
