//! Child process plumbing for the `spack` executable.
//!
//! Every invocation is `<program> <leading args...> <command args...>`. The
//! leading arguments let Spack run behind a wrapper, for example a container
//! runtime:
//!
//! ```text
//! singularity run --bind /software spack.sif <command args...>
//! ```
//!
//! Output can be inherited, captured, or decoded while the process is still
//! running. In every mode a non-zero exit status is an error, and an optional
//! timeout bounds the whole invocation. Timed-out processes are killed.

use std::error::Error as StdError;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::process::{ChildStdout, Command};
use tokio_util::io::SyncIoBridge;
use tracing::{debug, info};

/// How to invoke Spack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
  /// Executable to run.
  pub program: PathBuf,
  /// Arguments placed before every command.
  pub args: Vec<String>,
  /// Upper bound for a single invocation; `None` waits forever.
  pub timeout: Option<Duration>,
}

impl Default for DriverConfig {
  fn default() -> Self {
    Self::new("spack")
  }
}

impl DriverConfig {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      timeout: None,
    }
  }

  pub fn with_args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args = args.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }
}

/// Errors from running Spack.
#[derive(Debug, Error)]
pub enum DriverError {
  #[error("failed to start {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("io error while running {cmd}: {source}")]
  Io {
    cmd: String,
    #[source]
    source: io::Error,
  },

  #[error("command failed with exit code {code:?}: {cmd}")]
  Exit { cmd: String, code: Option<i32> },

  #[error("failed to decode output of {cmd}: {source}")]
  Decode {
    cmd: String,
    #[source]
    source: Box<dyn StdError + Send + Sync>,
  },

  #[error("command timed out after {timeout:?}: {cmd}")]
  TimedOut { cmd: String, timeout: Duration },

  #[error("output decoder task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

/// Runs Spack commands.
#[derive(Debug, Clone)]
pub struct Driver {
  config: DriverConfig,
}

impl Driver {
  pub fn new(config: DriverConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &DriverConfig {
    &self.config
  }

  /// Human readable command line, for logs and errors.
  pub fn command_line(&self, args: &[&str]) -> String {
    let mut parts = vec![self.config.program.to_string_lossy().into_owned()];
    parts.extend(self.config.args.iter().cloned());
    parts.extend(args.iter().map(|arg| arg.to_string()));
    parts.join(" ")
  }

  fn command(&self, args: &[&str]) -> Command {
    let mut command = Command::new(&self.config.program);
    command.args(&self.config.args).args(args).kill_on_drop(true);
    command
  }

  fn spawn_error(&self, source: io::Error) -> DriverError {
    DriverError::Spawn {
      program: self.config.program.to_string_lossy().into_owned(),
      source,
    }
  }

  /// Run `fut` under the configured timeout.
  async fn bounded<T>(&self, cmd: &str, fut: impl Future<Output = Result<T, DriverError>>) -> Result<T, DriverError> {
    match self.config.timeout {
      Some(timeout) => tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| DriverError::TimedOut {
          cmd: cmd.to_string(),
          timeout,
        })?,
      None => fut.await,
    }
  }

  /// Run a command with stdout and stderr inherited.
  pub async fn run(&self, args: &[&str]) -> Result<(), DriverError> {
    let cmd = self.command_line(args);
    info!(cmd = %cmd, "running spack");

    self
      .bounded(&cmd, async {
        let status = self.command(args).status().await.map_err(|e| self.spawn_error(e))?;
        check_status(&cmd, status)
      })
      .await
  }

  /// Run a command to completion and return its stdout.
  pub async fn capture(&self, args: &[&str]) -> Result<Vec<u8>, DriverError> {
    let cmd = self.command_line(args);
    info!(cmd = %cmd, "running spack");

    self
      .bounded(&cmd, async {
        let output = self
          .command(args)
          .stdout(Stdio::piped())
          .stderr(Stdio::inherit())
          .output()
          .await
          .map_err(|e| self.spawn_error(e))?;
        check_status(&cmd, output.status)?;
        debug!(cmd = %cmd, bytes = output.stdout.len(), "captured output");
        Ok(output.stdout)
      })
      .await
  }

  /// Run a command and decode its stdout while it is still being written.
  ///
  /// `decode` runs on a blocking worker reading straight from the pipe. The
  /// process is joined after decoding finishes; a decode error is reported
  /// first, otherwise a non-zero exit fails the call even though decoding
  /// succeeded.
  pub async fn stream<T, E, F>(&self, args: &[&str], decode: F) -> Result<T, DriverError>
  where
    T: Send + 'static,
    E: StdError + Send + Sync + 'static,
    F: FnOnce(SyncIoBridge<ChildStdout>) -> Result<T, E> + Send + 'static,
  {
    let cmd = self.command_line(args);
    info!(cmd = %cmd, "streaming spack output");

    self
      .bounded(&cmd, async {
        let mut child = self
          .command(args)
          .stdout(Stdio::piped())
          .stderr(Stdio::inherit())
          .spawn()
          .map_err(|e| self.spawn_error(e))?;

        let stdout = child.stdout.take().ok_or_else(|| DriverError::Io {
          cmd: cmd.clone(),
          source: io::Error::other("stdout was not captured"),
        })?;
        let reader = SyncIoBridge::new(stdout);

        let decoded = tokio::task::spawn_blocking(move || decode(reader)).await?;

        let status = child.wait().await.map_err(|source| DriverError::Io {
          cmd: cmd.clone(),
          source,
        })?;

        let value = decoded.map_err(|e| DriverError::Decode {
          cmd: cmd.clone(),
          source: Box::new(e),
        })?;
        check_status(&cmd, status)?;
        Ok(value)
      })
      .await
  }

  /// Run a command whose stdout is a single JSON document.
  pub async fn stream_json<T>(&self, args: &[&str]) -> Result<T, DriverError>
  where
    T: DeserializeOwned + Send + 'static,
  {
    // `from_reader` insists on EOF after the value, so the pipe is drained.
    self.stream(args, |reader| serde_json::from_reader::<_, T>(reader)).await
  }

  /// Run a command whose stdout is a single YAML document.
  pub async fn stream_yaml<T>(&self, args: &[&str]) -> Result<T, DriverError>
  where
    T: DeserializeOwned + Send + 'static,
  {
    self.stream(args, |reader| serde_yaml::from_reader::<_, T>(reader)).await
  }

  /// Run a command and read its stdout as text.
  pub async fn capture_text(&self, args: &[&str]) -> Result<String, DriverError> {
    let cmd = self.command_line(args);
    let bytes = self.capture(args).await?;
    String::from_utf8(bytes).map_err(|e| DriverError::Decode {
      cmd,
      source: Box::new(e),
    })
  }
}

fn check_status(cmd: &str, status: ExitStatus) -> Result<(), DriverError> {
  debug!(cmd = %cmd, status = %status, "spack exited");
  if status.success() {
    Ok(())
  } else {
    Err(DriverError::Exit {
      cmd: cmd.to_string(),
      code: status.code(),
    })
  }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
  use super::*;
  use crate::install::Package;

  fn sh(script: &str) -> Driver {
    Driver::new(DriverConfig::new("/bin/sh").with_args(["-c", script, "spack"]))
  }

  #[tokio::test]
  async fn run_succeeds_on_zero_exit() {
    sh("exit 0").run(&[]).await.unwrap();
  }

  #[tokio::test]
  async fn run_reports_exit_code() {
    let err = sh("exit 3").run(&[]).await.unwrap_err();
    assert!(matches!(err, DriverError::Exit { code: Some(3), .. }));
  }

  #[tokio::test]
  async fn arguments_follow_leading_args() {
    // $0 is "spack", the command args land in $1..
    let out = sh("echo \"$1-$2\"").capture_text(&["list", "x"]).await.unwrap();
    assert_eq!(out.trim(), "list-x");
  }

  #[tokio::test]
  async fn missing_program_is_spawn_error() {
    let driver = Driver::new(DriverConfig::new("/nonexistent/spack"));
    let err = driver.run(&["list"]).await.unwrap_err();
    assert!(matches!(err, DriverError::Spawn { .. }));
  }

  #[tokio::test]
  async fn stream_json_decodes_output() {
    let driver = sh(r#"printf '[{"name":"zlib","latest_version":"1.3.1"}]'"#);
    let packages: Vec<Package> = driver.stream_json(&[]).await.unwrap();
    assert_eq!(packages.len(), 1);
    assert_eq!(packages[0].version, "1.3.1");
  }

  #[tokio::test]
  async fn stream_json_fails_on_exit_after_valid_output() {
    let driver = sh("printf '[]'; exit 2");
    let err = driver.stream_json::<Vec<Package>>(&[]).await.unwrap_err();
    assert!(matches!(err, DriverError::Exit { code: Some(2), .. }));
  }

  #[tokio::test]
  async fn stream_json_reports_malformed_output() {
    let driver = sh("printf '[{\"name\":'");
    let err = driver.stream_json::<Vec<Package>>(&[]).await.unwrap_err();
    assert!(matches!(err, DriverError::Decode { .. }));
  }

  #[tokio::test]
  async fn stream_decodes_large_output_before_exit() {
    // larger than a pipe buffer, so the child blocks until the decoder reads
    let driver = sh(
      r#"printf '['; i=0; while [ $i -lt 20000 ]; do printf '{"name":"p%d","latest_version":"1.0"},' $i; i=$((i+1)); done; printf '{"name":"last","latest_version":"2.0"}]'"#,
    );
    let packages: Vec<Package> = driver.stream_json(&[]).await.unwrap();
    assert_eq!(packages.len(), 20001);
    assert_eq!(packages[20000].name, "last");
  }

  #[tokio::test]
  async fn stream_yaml_decodes_output() {
    let driver = sh("printf 'config:\\n  build_stage: /scratch\\n'");
    let config: crate::config::SpackConfig = driver.stream_yaml(&[]).await.unwrap();
    assert_eq!(config.build_stage, vec!["/scratch".to_string()]);
  }

  #[tokio::test]
  async fn timeout_kills_long_running_command() {
    let driver = Driver::new(
      DriverConfig::new("/bin/sh")
        .with_args(["-c", "sleep 10", "spack"])
        .with_timeout(Some(Duration::from_millis(100))),
    );
    let err = driver.run(&[]).await.unwrap_err();
    assert!(matches!(err, DriverError::TimedOut { .. }));
    assert!(err.to_string().contains("100ms"));
  }

  #[test]
  fn command_line_joins_all_parts() {
    let driver = Driver::new(DriverConfig::new("singularity").with_args(["run", "spack.sif"]));
    assert_eq!(driver.command_line(&["clean", "-s"]), "singularity run spack.sif clean -s");
  }
}
