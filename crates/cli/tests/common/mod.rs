//! Shared test helpers for CLI tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get a Command for the spackle binary.
pub fn spackle_cmd() -> Command {
  cargo_bin_cmd!("spackle")
}

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Isolated stand-in for a Spack installation.
///
/// Holds a shell script answering the commands spackle issues and an install
/// root below the temporary directory. Invocations are logged to
/// `<root>/calls.log`.
pub struct FakeSpack {
  pub temp: TempDir,
}

impl FakeSpack {
  pub fn new() -> Self {
    Self::with_exit_codes(0, 0)
  }

  /// `install_exit` and `clean_exit` control the exit status of those commands.
  pub fn with_exit_codes(install_exit: i32, clean_exit: i32) -> Self {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_string_lossy().into_owned();

    let script = format!(
      r#"#!/bin/sh
echo "$@" >> {root}/calls.log
case "$1" in
  config)
    cat <<'YAML'
config:
  install_tree:
    root: {root}/opt/$arch/spack
  build_stage: {root}/stage/$user/
YAML
    ;;
  list)
    printf '[{{"name":"zlib","latest_version":"1.3.1"}},{{"name":"openssl","latest_version":"3.1.3"}}]'
    ;;
  install)
    exit {install_exit}
    ;;
  clean)
    exit {clean_exit}
    ;;
  load)
    shift 2
    echo "export LOADED=\"$*\""
    ;;
  *)
    exit 2
    ;;
esac
"#
    );

    std::fs::write(temp.path().join("spack"), script).unwrap();
    Self { temp }
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  pub fn install_root(&self) -> PathBuf {
    self.root().join("opt/spack")
  }

  /// Copy the fixture install database into the install root.
  pub fn with_database(self) -> Self {
    let db_dir = self.install_root().join(".spack-db");
    std::fs::create_dir_all(&db_dir).unwrap();
    std::fs::copy(fixture_path("index.json"), db_dir.join("index.json")).unwrap();
    self
  }

  /// A spackle command pointed at this installation.
  pub fn cmd(&self) -> Command {
    let mut cmd = spackle_cmd();
    cmd
      .env_remove("SPACKLE_SPACK")
      .env_remove("SPACKLE_TIMEOUT")
      .arg("--spack")
      .arg("/bin/sh")
      .arg("--spack-arg")
      .arg(self.root().join("spack"));
    cmd
  }

  /// Lines of `calls.log`, one per spack invocation.
  pub fn calls(&self) -> Vec<String> {
    std::fs::read_to_string(self.root().join("calls.log"))
      .unwrap_or_default()
      .lines()
      .map(str::to_string)
      .collect()
  }
}
