mod compare;
mod env;
mod install;
mod packages;
mod paths;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::runtime::Runtime;
use tracing::debug;

use spackle_lib::{DriverConfig, Spack};

pub use compare::cmd_compare;
pub use env::cmd_env;
pub use install::{cmd_clean, cmd_install};
pub use packages::{cmd_deps, cmd_installed, cmd_list, cmd_outdated};
pub use paths::{cmd_config, cmd_resolve, cmd_root, cmd_stage};

/// How to reach Spack.
#[derive(Debug, Clone, Args)]
pub struct SpackArgs {
  /// Spack executable (or wrapper) to run
  #[arg(long = "spack", global = true, env = "SPACKLE_SPACK", default_value = "spack")]
  pub program: PathBuf,

  /// Argument placed before every spack command; repeatable
  #[arg(long = "spack-arg", global = true, value_name = "ARG", allow_hyphen_values = true)]
  pub args: Vec<String>,

  /// Give up on a spack command after this long (e.g. 30s, 5m)
  #[arg(long, global = true, env = "SPACKLE_TIMEOUT", value_parser = humantime::parse_duration)]
  pub timeout: Option<Duration>,
}

impl SpackArgs {
  pub fn driver_config(&self) -> DriverConfig {
    DriverConfig::new(&self.program)
      .with_args(self.args.iter().cloned())
      .with_timeout(self.timeout)
  }
}

fn runtime() -> Result<Runtime> {
  Runtime::new().context("Failed to create async runtime")
}

/// Read Spack's configuration and return the connected facade.
fn connect(rt: &Runtime, args: &SpackArgs) -> Result<Spack> {
  debug!(program = %args.program.display(), args = ?args.args, "connecting to spack");
  rt.block_on(Spack::new(args.driver_config()))
    .context("Failed to read spack configuration")
}
