//! CLI output formatting utilities.
//!
//! Provides consistent formatting for terminal output including colored status
//! messages, hash and timestamp formatting, and Unicode symbols.

use std::io::{self, Write};
use std::time::{Duration, UNIX_EPOCH};

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{AnsiColors, OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

/// Spack shows hashes abbreviated to 7 characters.
pub fn truncate_hash(hash: &str) -> &str {
  hash.char_indices().nth(7).map_or(hash, |(end, _)| &hash[..end])
}

/// First second RFC 3339 cannot write (year 10000).
const RFC3339_LIMIT_SECS: u64 = 253_402_300_800;

/// Render a Unix timestamp in seconds as RFC 3339, or `unknown`.
pub fn format_timestamp(secs: f64) -> String {
  Duration::try_from_secs_f64(secs)
    .ok()
    .filter(|since_epoch| since_epoch.as_secs() < RFC3339_LIMIT_SECS)
    .and_then(|since_epoch| UNIX_EPOCH.checked_add(since_epoch))
    .map(|time| humantime::format_rfc3339_seconds(time).to_string())
    .unwrap_or_else(|| "unknown".to_string())
}

/// Kind of one-line status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
  Success,
  Error,
  Warning,
  Info,
}

impl Status {
  fn symbol(self) -> &'static str {
    match self {
      Status::Success => symbols::SUCCESS,
      Status::Error => symbols::ERROR,
      Status::Warning => symbols::WARNING,
      Status::Info => symbols::INFO,
    }
  }

  fn color(self) -> AnsiColors {
    match self {
      Status::Success => AnsiColors::Green,
      Status::Error => AnsiColors::Red,
      Status::Warning => AnsiColors::Yellow,
      Status::Info => AnsiColors::Blue,
    }
  }

  /// Problems go to stderr with the message colored too.
  fn is_problem(self) -> bool {
    matches!(self, Status::Error | Status::Warning)
  }
}

fn print_status(status: Status, message: &str) {
  let color = status.color();
  if status.is_problem() {
    eprintln!(
      "{} {}",
      status.symbol().if_supports_color(Stream::Stderr, |s| s.color(color)),
      message.if_supports_color(Stream::Stderr, |s| s.color(color))
    );
  } else {
    println!(
      "{} {}",
      status.symbol().if_supports_color(Stream::Stdout, |s| s.color(color)),
      message
    );
  }
}

pub fn print_success(message: &str) {
  print_status(Status::Success, message);
}

pub fn print_error(message: &str) {
  print_status(Status::Error, message);
}

pub fn print_warning(message: &str) {
  print_status(Status::Warning, message);
}

pub fn print_info(message: &str) {
  print_status(Status::Info, message);
}

/// Indented `label: value` line under a status message.
pub fn print_stat(label: &str, value: &str) {
  let label = format!("{}:", label);
  println!("  {} {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

/// One install per line: name, version, short hash, then a detail column.
pub fn print_install(name: &str, version: &str, hash: &str, detail: &str) {
  println!(
    "  {} {} {} {}",
    name.if_supports_color(Stream::Stdout, |s| s.bold()),
    version,
    truncate_hash(hash).if_supports_color(Stream::Stdout, |s| s.dimmed()),
    detail
  );
}

/// Pretty-print `value` to stdout as one JSON document.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let mut stdout = io::stdout().lock();
  serde_json::to_writer_pretty(&mut stdout, value).context("Failed to serialize to JSON")?;
  writeln!(stdout).context("Failed to write JSON output")?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truncate_hash_keeps_short_hashes() {
    assert_eq!(truncate_hash("uq2wcnnb4zbphgu6"), "uq2wcnn");
    assert_eq!(truncate_hash("abc"), "abc");
  }

  #[test]
  fn truncate_hash_cuts_at_char_boundary() {
    assert_eq!(truncate_hash("abcdefé12"), "abcdefé");
    assert_eq!(truncate_hash("ééééééééé"), "ééééééé");
  }

  #[test]
  fn problems_are_routed_to_stderr() {
    assert!(Status::Error.is_problem());
    assert!(Status::Warning.is_problem());
    assert!(!Status::Success.is_problem());
    assert!(!Status::Info.is_problem());
    assert_eq!(Status::Warning.symbol(), symbols::WARNING);
  }

  #[test]
  fn format_timestamp_renders_rfc3339() {
    assert_eq!(format_timestamp(0.0), "1970-01-01T00:00:00Z");
    assert_eq!(format_timestamp(1697040000.9), "2023-10-11T16:00:00Z");
    assert_eq!(format_timestamp(-1.0), "unknown");
    assert_eq!(format_timestamp(f64::NAN), "unknown");
    assert_eq!(format_timestamp(1e19), "unknown");
    assert_eq!(format_timestamp(1e12), "unknown");
    assert_eq!(format_timestamp(253_402_300_799.0), "9999-12-31T23:59:59Z");
  }
}
