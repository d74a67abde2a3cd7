//! High level access to a Spack installation through its command line.
//!
//! [`Spack`] reads the configuration once when constructed and answers
//! questions about the installation from it:
//!
//! - where packages are installed and staged ([`Spack::install_root`],
//!   [`Spack::stage_dir`])
//! - what is installed ([`Spack::load_installed_packages`])
//! - what is available ([`Spack::list_latest_packages`])
//!
//! It can also install packages, clean build stages and export the shell
//! environment of installs. Nothing is retried; failures carry the exit
//! status or decode error of the underlying command.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::SpackConfig;
use crate::driver::{Driver, DriverConfig, DriverError};
use crate::install::{DatabaseError, InstallDatabase, InstallRecord, Package};
use crate::placeholder::PathResolver;

const CONFIG_ARGS: &[&str] = &["config", "get", "config"];
const LIST_ARGS: &[&str] = &["list", "--format", "version_json"];
const INSTALL_ARGS: &[&str] = &["install", "-U", "--deprecated", "--fail-fast"];
const CLEAN_ARGS: &[&str] = &["clean", "-s"];
const LOAD_ARGS: &[&str] = &["load", "--sh"];

/// Errors from [`Spack`] operations.
#[derive(Debug, Error)]
pub enum SpackError {
  #[error("spack configuration unavailable: {0}")]
  ConfigUnavailable(#[source] DriverError),

  #[error("package list unavailable: {0}")]
  ListUnavailable(#[source] DriverError),

  #[error("install database unavailable at {path}: {source}")]
  DatabaseUnavailable {
    path: PathBuf,
    #[source]
    source: DatabaseError,
  },

  #[error("install of {spec} failed: {source}")]
  InstallFailed {
    spec: String,
    #[source]
    source: DriverError,
  },

  #[error("build stage cleanup failed: {0}")]
  CleanupFailed(#[source] DriverError),

  #[error("failed to load environment: {0}")]
  LoadFailed(#[source] DriverError),
}

/// A Spack installation driven through its command line.
#[derive(Debug)]
pub struct Spack {
  driver: Driver,
  config: SpackConfig,
  resolver: PathResolver,
}

impl Spack {
  /// Connect to Spack and read its configuration.
  pub async fn new(config: DriverConfig) -> Result<Self, SpackError> {
    Self::with_resolver(config, PathResolver::system()).await
  }

  /// Like [`Spack::new`], resolving configured paths with `resolver`.
  pub async fn with_resolver(config: DriverConfig, resolver: PathResolver) -> Result<Self, SpackError> {
    let driver = Driver::new(config);
    let config = load_config(&driver).await?;
    Ok(Self {
      driver,
      config,
      resolver,
    })
  }

  /// Re-read the configuration from Spack.
  pub async fn reload_config(&mut self) -> Result<&SpackConfig, SpackError> {
    self.config = load_config(&self.driver).await?;
    Ok(&self.config)
  }

  pub fn config(&self) -> &SpackConfig {
    &self.config
  }

  pub fn driver(&self) -> &Driver {
    &self.driver
  }

  pub fn resolver(&self) -> &PathResolver {
    &self.resolver
  }

  /// The resolved install tree root. Empty if none is configured.
  pub fn install_root(&self) -> PathBuf {
    self.resolver.resolve(&self.config.install_root)
  }

  /// The resolved active build stage: the first configured entry only.
  /// Empty if none is configured.
  pub fn stage_dir(&self) -> PathBuf {
    self
      .config
      .active_build_stage()
      .map(|stage| self.resolver.resolve(stage))
      .unwrap_or_default()
  }

  /// The newest known version of every package Spack can build.
  pub async fn list_latest_packages(&self) -> Result<Vec<Package>, SpackError> {
    let packages: Vec<Package> = self
      .driver
      .stream_json(LIST_ARGS)
      .await
      .map_err(SpackError::ListUnavailable)?;
    debug!(count = packages.len(), "listed packages");
    Ok(packages)
  }

  /// Load the install database from the install root.
  pub fn load_installed_packages(&self) -> Result<InstallDatabase, SpackError> {
    let path = InstallDatabase::path_for_root(&self.install_root());
    InstallDatabase::from_path(&path).map_err(|source| SpackError::DatabaseUnavailable { path, source })
  }

  /// Install `spec`, forcing updates, allowing deprecated versions and
  /// stopping at the first failure. `extra` is appended verbatim.
  pub async fn install(&self, spec: &str, extra: &[&str]) -> Result<(), SpackError> {
    let mut args: Vec<&str> = INSTALL_ARGS.to_vec();
    args.push(spec);
    args.extend_from_slice(extra);

    info!(spec = %spec, "installing");
    self.driver.run(&args).await.map_err(|source| SpackError::InstallFailed {
      spec: spec.to_string(),
      source,
    })
  }

  /// Remove all build stage directories.
  pub async fn cleanup_builds(&self) -> Result<(), SpackError> {
    self.driver.run(CLEAN_ARGS).await.map_err(SpackError::CleanupFailed)
  }

  /// Shell commands that load the given installs into an environment.
  pub async fn load_env<'a>(&self, records: impl IntoIterator<Item = &'a InstallRecord>) -> Result<String, SpackError> {
    let refs: Vec<String> = records.into_iter().map(InstallRecord::spec_ref).collect();
    let mut args: Vec<&str> = LOAD_ARGS.to_vec();
    args.extend(refs.iter().map(String::as_str));

    self.driver.capture_text(&args).await.map_err(SpackError::LoadFailed)
  }
}

async fn load_config(driver: &Driver) -> Result<SpackConfig, SpackError> {
  let config: SpackConfig = driver
    .stream_yaml(CONFIG_ARGS)
    .await
    .map_err(SpackError::ConfigUnavailable)?;
  debug!(install_root = %config.install_root, build_stage = ?config.build_stage, "read spack configuration");
  Ok(config)
}
