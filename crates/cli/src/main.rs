mod cmd;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use spackle_lib::{DriverError, SpackError};

use cmd::{
  SpackArgs, cmd_clean, cmd_compare, cmd_config, cmd_deps, cmd_env, cmd_install, cmd_installed, cmd_list,
  cmd_outdated, cmd_resolve, cmd_root, cmd_stage,
};
use output::{OutputFormat, print_error};

/// spackle - inspect and drive a Spack installation
#[derive(Parser)]
#[command(name = "spackle")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(flatten)]
  spack: SpackArgs,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Print the resolved install tree root
  Root,

  /// Print the resolved active build stage
  Stage,

  /// Show the configuration read from spack
  Config,

  /// Resolve placeholders such as $tempdir and $user in paths
  Resolve {
    /// Paths to resolve
    #[arg(required = true)]
    paths: Vec<String>,
  },

  /// List the newest known version of every package
  List,

  /// Show installed packages
  Installed {
    /// Show every install, not only the current one per package
    #[arg(short, long)]
    all: bool,
  },

  /// Show installed packages with a newer version available
  Outdated,

  /// Show the dependencies of an install
  Deps {
    /// Full hash of the install
    hash: String,
  },

  /// Install a package spec
  Install {
    /// Spec to install (e.g. zlib@1.3)
    spec: String,

    /// Extra arguments passed to `spack install`
    #[arg(last = true)]
    extra: Vec<String>,
  },

  /// Remove all build stages
  Clean,

  /// Print shell commands loading the current install of packages
  Env {
    /// Package names
    #[arg(required = true)]
    names: Vec<String>,
  },

  /// Compare two version strings
  Compare { a: String, b: String },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let output = cli.output;
  let spack = &cli.spack;
  let result = match cli.command {
    Commands::Root => cmd_root(spack, output),
    Commands::Stage => cmd_stage(spack, output),
    Commands::Config => cmd_config(spack, output),
    Commands::Resolve { paths } => cmd_resolve(&paths, output),
    Commands::List => cmd_list(spack, output),
    Commands::Installed { all } => cmd_installed(spack, all, output),
    Commands::Outdated => cmd_outdated(spack, output),
    Commands::Deps { hash } => cmd_deps(spack, &hash, output),
    Commands::Install { spec, extra } => cmd_install(spack, &spec, &extra, output),
    Commands::Clean => cmd_clean(spack, output),
    Commands::Env { names } => cmd_env(spack, &names, output),
    Commands::Compare { a, b } => cmd_compare(&a, &b, output),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      exit_code(&e)
    }
  }
}

/// Install and clean failures exit with spack's own status.
fn exit_code(err: &anyhow::Error) -> ExitCode {
  let code = match err.downcast_ref::<SpackError>() {
    Some(SpackError::InstallFailed {
      source: DriverError::Exit { code, .. },
      ..
    })
    | Some(SpackError::CleanupFailed(DriverError::Exit { code, .. })) => *code,
    _ => None,
  };

  code
    .and_then(|code| u8::try_from(code).ok())
    .filter(|&code| code != 0)
    .map(ExitCode::from)
    .unwrap_or(ExitCode::FAILURE)
}
