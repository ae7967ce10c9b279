//! Binary entrypoint: read one answer as JSON from stdin, write its metrics to stdout.
//!
//! Usage: `answer-analysis [--pretty] < answer.json`

use answer_analysis::{run, Input};
use std::io::{self, Read, Write};

fn main() {
  let pretty = std::env::args().skip(1).any(|a| a == "--pretty");
  if let Err(e) = score_stdin(pretty) {
    let _ = writeln!(io::stderr(), "answer-analysis error: {}", e);
    std::process::exit(1);
  }
}

fn score_stdin(pretty: bool) -> Result<(), Box<dyn std::error::Error>> {
  let mut raw = String::new();
  io::stdin().lock().read_to_string(&mut raw)?;
  let input: Input = serde_json::from_str(&raw)?;

  let metrics = run(&input);
  let mut stdout = io::stdout().lock();
  if pretty {
    serde_json::to_writer_pretty(&mut stdout, &metrics)?;
  } else {
    serde_json::to_writer(&mut stdout, &metrics)?;
  }
  writeln!(stdout)?;
  Ok(())
}
