//! Placeholder substitution for configured filesystem paths.
//!
//! Spack configuration values such as `install_tree.root` or `build_stage`
//! may contain reserved path segments that are only meaningful on the machine
//! reading them:
//!
//! | Segment                           | Value                                  |
//! |-----------------------------------|----------------------------------------|
//! | `$tempdir`                        | first writable temporary directory     |
//! | `$user`                           | current user name                      |
//! | `$date`                           | today's date as `YYYY-MM-DD`           |
//! | `$architecture`, `$arch`          | empty (not probed)                     |
//! | `$platform`                       | empty (not probed)                     |
//! | `$os`, `$operating_system`        | empty (not probed)                     |
//! | `$target`, `$target_family`       | empty (not probed)                     |
//!
//! A placeholder is only recognized when it makes up a whole segment:
//! `/scratch/$user/stage` is substituted, `/scratch/$user-stage` is not.
//! Segments that resolve to an empty string are dropped from the result.
//!
//! Resolution never fails. Ambient state (environment variables, clock, user,
//! filesystem) is read through the [`Environment`] trait so that callers and
//! tests can supply their own.
//!
//! # Example
//!
//! ```
//! use spackle_lib::placeholder::PathResolver;
//! use std::path::PathBuf;
//!
//! let resolver = PathResolver::system();
//! assert_eq!(resolver.resolve("/opt/spack/opt"), PathBuf::from("/opt/spack/opt"));
//! assert_eq!(resolver.resolve("/"), PathBuf::new());
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{debug, trace};

/// Environment variables consulted for `$tempdir`, in order.
pub const TEMP_ENV_VARS: [&str; 3] = ["TMPDIR", "TEMP", "TMP"];

/// Conventional temporary directories tried after [`TEMP_ENV_VARS`].
#[cfg(not(windows))]
pub const PLATFORM_TEMP_DIRS: &[&str] = &["/tmp", "/var/tmp", "/usr/tmp"];

/// Conventional temporary directories tried after [`TEMP_ENV_VARS`].
#[cfg(windows)]
pub const PLATFORM_TEMP_DIRS: &[&str] = &[r"C:\TEMP", r"C:\TMP", r"\TEMP", r"\TMP"];

/// A reserved path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
  TempDir,
  User,
  Architecture,
  Platform,
  OperatingSystem,
  Target,
  TargetFamily,
  Date,
}

impl Placeholder {
  /// Match a complete path segment against the reserved tokens.
  ///
  /// Matching is exact and case-sensitive.
  pub fn from_segment(segment: &str) -> Option<Self> {
    match segment {
      "$tempdir" => Some(Self::TempDir),
      "$user" => Some(Self::User),
      "$architecture" | "$arch" => Some(Self::Architecture),
      "$platform" => Some(Self::Platform),
      "$os" | "$operating_system" => Some(Self::OperatingSystem),
      "$target" => Some(Self::Target),
      "$target_family" => Some(Self::TargetFamily),
      "$date" => Some(Self::Date),
      _ => None,
    }
  }

  /// The canonical token for this placeholder.
  pub fn token(&self) -> &'static str {
    match self {
      Self::TempDir => "$tempdir",
      Self::User => "$user",
      Self::Architecture => "$architecture",
      Self::Platform => "$platform",
      Self::OperatingSystem => "$operating_system",
      Self::Target => "$target",
      Self::TargetFamily => "$target_family",
      Self::Date => "$date",
    }
  }
}

impl fmt::Display for Placeholder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.token())
  }
}

/// Ambient state read during placeholder resolution.
pub trait Environment: Send + Sync {
  /// Value of an environment variable, `None` if unset or not unicode.
  fn var(&self, name: &str) -> Option<String>;

  /// The current local time.
  fn now(&self) -> DateTime<Local>;

  /// Name of the user running the process.
  fn current_user(&self) -> Option<String>;

  /// Whether a file can be created inside `dir`.
  ///
  /// Implementations must not leave anything behind.
  fn is_writable(&self, dir: &Path) -> bool;

  /// The process working directory.
  fn current_dir(&self) -> Option<PathBuf>;
}

/// [`Environment`] backed by the running process and the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
  fn var(&self, name: &str) -> Option<String> {
    std::env::var(name).ok()
  }

  fn now(&self) -> DateTime<Local> {
    Local::now()
  }

  fn current_user(&self) -> Option<String> {
    whoami::fallible::username().ok()
  }

  fn is_writable(&self, dir: &Path) -> bool {
    // The probe file is unlinked when the handle drops, on every path out.
    match tempfile::Builder::new().prefix(".spackle-probe").tempfile_in(dir) {
      Ok(probe) => {
        if let Err(e) = probe.close() {
          debug!(dir = ?dir, error = %e, "failed to remove write probe");
        }
        true
      }
      Err(e) => {
        trace!(dir = ?dir, error = %e, "directory not writable");
        false
      }
    }
  }

  fn current_dir(&self) -> Option<PathBuf> {
    std::env::current_dir().ok()
  }
}

/// Rewrites configured paths by substituting reserved segments.
#[derive(Clone)]
pub struct PathResolver {
  env: Arc<dyn Environment>,
}

impl fmt::Debug for PathResolver {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PathResolver").finish_non_exhaustive()
  }
}

impl Default for PathResolver {
  fn default() -> Self {
    Self::system()
  }
}

impl PathResolver {
  /// Create a resolver reading from the given environment.
  pub fn new(env: Arc<dyn Environment>) -> Self {
    Self { env }
  }

  /// Create a resolver reading from the running process.
  pub fn system() -> Self {
    Self::new(Arc::new(SystemEnvironment))
  }

  /// Resolve every reserved segment in `path`.
  ///
  /// `""`, `"/"` and `"."` resolve to the empty path. Otherwise segments are
  /// substituted from the leaf towards the root, empty results are dropped,
  /// and the joined path is lexically cleaned. An absolute input stays
  /// absolute.
  pub fn resolve(&self, path: &str) -> PathBuf {
    if matches!(path, "" | "/" | ".") {
      return PathBuf::new();
    }

    let mut segments: Vec<String> = path
      .rsplit('/')
      .filter(|segment| !segment.is_empty())
      .map(|segment| match Placeholder::from_segment(segment) {
        Some(placeholder) => self.expand(placeholder),
        None => segment.to_string(),
      })
      .filter(|segment| !segment.is_empty())
      .collect();
    if segments.is_empty() {
      return PathBuf::new();
    }
    segments.reverse();

    let mut joined = segments.join("/");
    if path.starts_with('/') {
      joined.insert(0, '/');
    }

    let resolved = clean(&joined);
    trace!(input = %path, resolved = ?resolved, "resolved path");
    resolved
  }

  /// Compute the value of a single placeholder.
  pub fn expand(&self, placeholder: Placeholder) -> String {
    match placeholder {
      Placeholder::TempDir => self.temp_dir(),
      Placeholder::User => self.env.current_user().unwrap_or_default(),
      Placeholder::Date => self.env.now().format("%Y-%m-%d").to_string(),
      Placeholder::Architecture
      | Placeholder::Platform
      | Placeholder::OperatingSystem
      | Placeholder::Target
      | Placeholder::TargetFamily => String::new(),
    }
  }

  /// Find a writable temporary directory.
  ///
  /// Tries [`TEMP_ENV_VARS`], then [`PLATFORM_TEMP_DIRS`], then the working
  /// directory, and finally `"."`.
  fn temp_dir(&self) -> String {
    let from_env = TEMP_ENV_VARS
      .iter()
      .filter_map(|name| self.env.var(name))
      .filter(|value| !value.is_empty());
    let conventional = PLATFORM_TEMP_DIRS.iter().map(|dir| dir.to_string());

    for candidate in from_env.chain(conventional) {
      if self.env.is_writable(Path::new(&candidate)) {
        debug!(dir = %candidate, "selected temporary directory");
        return candidate;
      }
    }

    match self.env.current_dir() {
      Some(cwd) => {
        debug!(dir = ?cwd, "no writable temporary directory, using working directory");
        cwd.to_string_lossy().into_owned()
      }
      None => ".".to_string(),
    }
  }
}

/// Resolve `path` against the running process environment.
pub fn resolve(path: &str) -> PathBuf {
  PathResolver::system().resolve(path)
}

/// Lexically clean a `/`-separated path: collapse repeated separators, drop
/// `.` segments and fold `..` into its parent.
fn clean(path: &str) -> PathBuf {
  if path.is_empty() {
    return PathBuf::new();
  }

  let rooted = path.starts_with('/');
  let mut parts: Vec<&str> = Vec::new();

  for part in path.split('/') {
    match part {
      "" | "." => {}
      ".." => match parts.last() {
        Some(last) if *last != ".." => {
          parts.pop();
        }
        // `/..` is `/`
        _ if rooted => {}
        _ => parts.push(".."),
      },
      other => parts.push(other),
    }
  }

  let body = parts.join("/");
  match (rooted, body.is_empty()) {
    (true, _) => PathBuf::from(format!("/{body}")),
    (false, true) => PathBuf::from("."),
    (false, false) => PathBuf::from(body),
  }
}
