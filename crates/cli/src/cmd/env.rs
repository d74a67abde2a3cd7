//! Environment script for the current installs of named packages.

use anyhow::{Context, Result, bail};

use super::{SpackArgs, connect, runtime};
use crate::output::{OutputFormat, print_json, print_warning};

pub fn cmd_env(args: &SpackArgs, names: &[String], output: OutputFormat) -> Result<()> {
  let rt = runtime()?;
  let spack = connect(&rt, args)?;
  let db = spack.load_installed_packages().context("Failed to load install database")?;

  let mut records = Vec::new();
  for name in names {
    match db.current(name) {
      Some(record) => records.push(record),
      None => print_warning(&format!("{} is not installed", name)),
    }
  }
  if records.is_empty() {
    bail!("None of the requested packages are installed");
  }

  let script = rt.block_on(spack.load_env(records.iter().copied()))?;

  if output.is_json() {
    let loaded: Vec<_> = records.iter().map(|record| record.spec_ref()).collect();
    print_json(&serde_json::json!({ "loaded": loaded, "script": script }))?;
  } else {
    print!("{}", script);
  }

  Ok(())
}
