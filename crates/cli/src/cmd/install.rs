use anyhow::Result;

use super::{SpackArgs, connect, runtime};
use crate::output::{OutputFormat, print_json, print_success};

/// Install a spec, passing `extra` through to `spack install`.
pub fn cmd_install(args: &SpackArgs, spec: &str, extra: &[String], output: OutputFormat) -> Result<()> {
  let rt = runtime()?;
  let spack = connect(&rt, args)?;
  let extra: Vec<&str> = extra.iter().map(String::as_str).collect();

  rt.block_on(spack.install(spec, &extra))?;

  if output.is_json() {
    print_json(&serde_json::json!({ "installed": spec }))?;
  } else {
    print_success(&format!("Installed {}", spec));
  }

  Ok(())
}

/// Remove all build stages.
pub fn cmd_clean(args: &SpackArgs, output: OutputFormat) -> Result<()> {
  let rt = runtime()?;
  let spack = connect(&rt, args)?;

  rt.block_on(spack.cleanup_builds())?;

  if output.is_json() {
    print_json(&serde_json::json!({ "cleaned": spack.stage_dir() }))?;
  } else {
    print_success("Build stages cleaned");
  }

  Ok(())
}
