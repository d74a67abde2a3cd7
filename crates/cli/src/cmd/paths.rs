//! Commands that report where Spack keeps things.

use anyhow::Result;

use spackle_lib::placeholder::PathResolver;

use super::{SpackArgs, connect, runtime};
use crate::output::{OutputFormat, print_json, print_stat};

/// Print the resolved install tree root.
pub fn cmd_root(args: &SpackArgs, output: OutputFormat) -> Result<()> {
  let spack = connect(&runtime()?, args)?;
  let root = spack.install_root();

  if output.is_json() {
    print_json(&serde_json::json!({ "install_root": root }))?;
  } else {
    println!("{}", root.display());
  }

  Ok(())
}

/// Print the resolved active build stage.
pub fn cmd_stage(args: &SpackArgs, output: OutputFormat) -> Result<()> {
  let spack = connect(&runtime()?, args)?;
  let stage = spack.stage_dir();

  if output.is_json() {
    print_json(&serde_json::json!({ "build_stage": stage }))?;
  } else {
    println!("{}", stage.display());
  }

  Ok(())
}

/// Print the configuration as read from Spack alongside the resolved paths.
pub fn cmd_config(args: &SpackArgs, output: OutputFormat) -> Result<()> {
  let spack = connect(&runtime()?, args)?;
  let config = spack.config();
  let root = spack.install_root();
  let stage = spack.stage_dir();

  if output.is_json() {
    print_json(&serde_json::json!({
      "config": {
        "install_root": config.install_root,
        "build_stage": config.build_stage,
      },
      "resolved": { "install_root": root, "build_stage": stage },
    }))?;
  } else {
    print_stat("Install root", &config.install_root);
    print_stat("  resolved", &root.display().to_string());
    for (i, entry) in config.build_stage.iter().enumerate() {
      print_stat(&format!("Build stage {}", i), entry);
    }
    print_stat("  active", &stage.display().to_string());
  }

  Ok(())
}

/// Resolve placeholders in paths without asking Spack.
pub fn cmd_resolve(paths: &[String], output: OutputFormat) -> Result<()> {
  let resolver = PathResolver::system();
  let resolved: Vec<_> = paths.iter().map(|path| (path, resolver.resolve(path))).collect();

  if output.is_json() {
    let items: Vec<_> = resolved
      .iter()
      .map(|(path, resolved)| serde_json::json!({ "path": path, "resolved": resolved }))
      .collect();
    print_json(&items)?;
  } else {
    for (_, resolved) in &resolved {
      println!("{}", resolved.display());
    }
  }

  Ok(())
}
