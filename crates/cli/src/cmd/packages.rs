//! Commands that report installed and available packages.

use anyhow::{Context, Result, bail};

use spackle_lib::{InstallDatabase, InstallRecord, Spack};

use super::{SpackArgs, connect, runtime};
use crate::output::{
  OutputFormat, format_timestamp, print_info, print_install, print_json, print_stat, print_success, symbols,
};

fn load_database(spack: &Spack) -> Result<InstallDatabase> {
  spack.load_installed_packages().context("Failed to load install database")
}

fn record_json(record: &InstallRecord) -> serde_json::Value {
  serde_json::json!({
    "name": record.name,
    "version": record.version,
    "hash": record.hash,
    "path": record.path,
    "installed_at": record.installed_at,
  })
}

/// Print the newest version Spack knows for every package.
pub fn cmd_list(args: &SpackArgs, output: OutputFormat) -> Result<()> {
  let rt = runtime()?;
  let spack = connect(&rt, args)?;
  let packages = rt.block_on(spack.list_latest_packages())?;

  if output.is_json() {
    print_json(&packages)?;
  } else {
    for package in &packages {
      println!("{} {}", package.name, package.version);
    }
  }

  Ok(())
}

/// Print installs. Only the current install of each package unless `all`.
pub fn cmd_installed(args: &SpackArgs, all: bool, output: OutputFormat) -> Result<()> {
  let spack = connect(&runtime()?, args)?;
  let db = load_database(&spack)?;

  let records: Vec<&InstallRecord> = if all {
    db.iter().map(|(_, record)| record).collect()
  } else {
    db.current_installs().into_values().collect()
  };

  if output.is_json() {
    let items: Vec<_> = records.iter().map(|record| record_json(record)).collect();
    print_json(&items)?;
    return Ok(());
  }

  if records.is_empty() {
    print_info("No packages installed");
    return Ok(());
  }

  for record in &records {
    print_install(
      &record.name,
      &record.version,
      &record.hash,
      &format!("{} ({})", record.path.display(), format_timestamp(record.installed_at)),
    );
  }
  println!();
  print_stat("Installs", &records.len().to_string());
  if !all {
    print_stat("Total", &db.len().to_string());
  }

  Ok(())
}

/// Print current installs for which Spack knows a newer version.
pub fn cmd_outdated(args: &SpackArgs, output: OutputFormat) -> Result<()> {
  let rt = runtime()?;
  let spack = connect(&rt, args)?;
  let db = load_database(&spack)?;
  let latest = rt.block_on(spack.list_latest_packages())?;
  let outdated = db.outdated(&latest);

  if output.is_json() {
    let items: Vec<_> = outdated
      .iter()
      .map(|(record, latest)| {
        serde_json::json!({
          "name": record.name,
          "installed": record.version,
          "hash": record.hash,
          "latest": latest,
        })
      })
      .collect();
    print_json(&items)?;
    return Ok(());
  }

  if outdated.is_empty() {
    print_success("All packages are up to date");
    return Ok(());
  }

  for (record, latest) in &outdated {
    print_install(
      &record.name,
      &record.version,
      &record.hash,
      &format!("{} {}", symbols::ARROW, latest),
    );
  }

  Ok(())
}

/// Print the dependencies of one install, resolved against the database.
pub fn cmd_deps(args: &SpackArgs, hash: &str, output: OutputFormat) -> Result<()> {
  let spack = connect(&runtime()?, args)?;
  let db = load_database(&spack)?;

  let Some(record) = db.get(hash) else {
    bail!("No install with hash {}", hash);
  };
  let Some(deps) = db.dependencies(hash) else {
    bail!("No install with hash {}", hash);
  };
  let missing: Vec<_> = record
    .dependencies
    .iter()
    .filter(|dep| db.get(&dep.hash).is_none())
    .collect();

  if output.is_json() {
    let installed: Vec<_> = deps
      .iter()
      .map(|(dep, record)| {
        let mut value = record_json(record);
        value["types"] = serde_json::json!(dep.types);
        value
      })
      .collect();
    print_json(&serde_json::json!({
      "install": record_json(record),
      "dependencies": installed,
      "missing": missing,
    }))?;
    return Ok(());
  }

  print_info(&format!("{} {}", record.name, record.version));
  for (dep, dep_record) in &deps {
    print_install(
      &dep_record.name,
      &dep_record.version,
      &dep_record.hash,
      &format!("({})", dep.types.join(", ")),
    );
  }
  for dep in &missing {
    print_install(&dep.name, "", &dep.hash, &format!("{} not installed", symbols::WARNING));
  }

  Ok(())
}
