//! CLI smoke tests for spackle.
//!
//! These tests verify that commands not needing spack run without panicking
//! and return appropriate exit codes.

mod common;

use common::spackle_cmd;
use predicates::prelude::*;

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  spackle_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  spackle_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("spackle"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &[
    "root",
    "stage",
    "config",
    "resolve",
    "list",
    "installed",
    "outdated",
    "deps",
    "install",
    "clean",
    "env",
    "compare",
  ] {
    spackle_cmd()
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

#[test]
fn missing_subcommand_fails() {
  spackle_cmd().assert().failure();
}

// =============================================================================
// Compare
// =============================================================================

#[test]
fn compare_orders_versions() {
  spackle_cmd()
    .args(["compare", "1.10", "1.9"])
    .assert()
    .success()
    .stdout("greater\n");

  spackle_cmd()
    .args(["compare", "2.0.0rc1", "2.0.0"])
    .assert()
    .success()
    .stdout("less\n");

  spackle_cmd()
    .args(["compare", "1.2", "1.2"])
    .assert()
    .success()
    .stdout("equal\n");
}

#[test]
fn compare_json_output() {
  spackle_cmd()
    .args(["--output", "json", "compare", "1.a", "1.1"])
    .assert()
    .success()
    .stdout(predicate::str::contains(r#""result": "less""#));
}

// =============================================================================
// Resolve
// =============================================================================

#[test]
fn resolve_drops_platform_placeholders() {
  spackle_cmd()
    .args(["resolve", "/a/$arch/b", "/x/./y/../z"])
    .assert()
    .success()
    .stdout("/a/b\n/x/z\n");
}

#[test]
fn resolve_empty_path_prints_empty_line() {
  spackle_cmd().args(["resolve", ""]).assert().success().stdout("\n");
}

#[test]
fn resolve_requires_a_path() {
  spackle_cmd().arg("resolve").assert().failure();
}

// =============================================================================
// Spack unavailable
// =============================================================================

#[test]
fn missing_spack_fails_with_message() {
  spackle_cmd()
    .env_remove("SPACKLE_SPACK")
    .args(["--spack", "/nonexistent/bin/spack", "root"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to read spack configuration"));
}

#[test]
fn invalid_timeout_is_rejected() {
  spackle_cmd()
    .args(["--timeout", "soon", "root"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--timeout"));
}
