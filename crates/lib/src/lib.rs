//! spackle-lib: installed-package state and path resolution for Spack
//!
//! This crate reads the state of a Spack installation through its command
//! line:
//! - `version`: ordering of release versions
//! - `placeholder`: substitution of `$tempdir`, `$user`, ... in configured paths
//! - `install`: the install database and selection of the current install
//! - `config`: the subset of Spack's configuration needed to find installs
//! - `driver`: running the `spack` executable
//! - `spack`: the facade tying them together

pub mod config;
pub mod driver;
pub mod install;
pub mod placeholder;
pub mod spack;
pub mod version;

pub use config::SpackConfig;
pub use driver::{Driver, DriverConfig, DriverError};
pub use install::{Dependency, InstallDatabase, InstallRecord, Package};
pub use placeholder::{Environment, PathResolver, SystemEnvironment};
pub use spack::{Spack, SpackError};
