//! Installed package state.
//!
//! Spack records every concrete install in `<root>/.spack-db/index.json`:
//!
//! ```json
//! {
//!   "database": {
//!     "installs": {
//!       "<hash>": {
//!         "spec": {
//!           "name": "zlib",
//!           "version": "1.3",
//!           "hash": "<hash>",
//!           "dependencies": [
//!             { "name": "gmake", "hash": "<hash>", "parameters": { "deptypes": ["build"] } }
//!           ]
//!         },
//!         "path": "/opt/spack/linux-x86_64/zlib-1.3-<hash>",
//!         "installation_time": 1700000000.5
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Several installs may share a name and version; each is a distinct build
//! variant identified by its hash. [`InstallDatabase`] is a read-only snapshot
//! of that file keyed by hash.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::version;

/// Location of the install database relative to the install root.
pub const DATABASE_DIR: &str = ".spack-db";

/// File name of the install database.
pub const DATABASE_FILENAME: &str = "index.json";

/// Errors raised while loading an install database.
#[derive(Debug, Error)]
pub enum DatabaseError {
  #[error("failed to read install database {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse install database: {0}")]
  Parse(#[from] serde_json::Error),
}

/// The newest known version of a package, as listed by Spack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
  pub name: String,
  #[serde(rename = "latest_version")]
  pub version: String,
}

/// A dependency edge of an install.
///
/// Dependencies are identified by name and hash, since several variants of
/// the same dependency may be installed side by side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
  pub name: String,
  pub hash: String,
  #[serde(default)]
  pub types: Vec<String>,
}

impl Dependency {
  /// Whether this edge carries the given dependency type (`build`, `link`, ...).
  pub fn has_type(&self, dep_type: &str) -> bool {
    self.types.iter().any(|t| t == dep_type)
  }
}

/// One concrete install of a package.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "wire::Install")]
pub struct InstallRecord {
  pub name: String,
  pub version: String,
  pub hash: String,
  pub dependencies: Vec<Dependency>,
  pub path: PathBuf,
  /// Seconds since the Unix epoch.
  pub installed_at: f64,
}

impl InstallRecord {
  /// Whether this install should be preferred over `other`.
  ///
  /// A higher version wins. With equal versions this record wins unless
  /// `other` was installed strictly later.
  pub fn newer_than(&self, other: &InstallRecord) -> bool {
    match version::compare(&self.version, &other.version) {
      Ordering::Less => false,
      Ordering::Greater => true,
      Ordering::Equal => other.installed_at.partial_cmp(&self.installed_at) != Some(Ordering::Greater),
    }
  }

  /// Spack's install directory name: `<name>-<version>-<hash>`.
  pub fn dir_name(&self) -> String {
    format!("{}-{}-{}", self.name, self.version, self.hash)
  }

  /// An unambiguous spec reference: `<name>/<hash>`.
  pub fn spec_ref(&self) -> String {
    format!("{}/{}", self.name, self.hash)
  }
}

/// Read-only snapshot of Spack's install database, keyed by hash.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallDatabase {
  installs: BTreeMap<String, InstallRecord>,
}

impl InstallDatabase {
  /// Build a database from records, keyed by each record's hash.
  pub fn from_records(records: impl IntoIterator<Item = InstallRecord>) -> Self {
    let installs = records.into_iter().map(|r| (r.hash.clone(), r)).collect();
    Self { installs }
  }

  /// Load the database stored under an install root.
  pub fn load(root: &Path) -> Result<Self, DatabaseError> {
    Self::from_path(&Self::path_for_root(root))
  }

  /// Path of the database file for an install root.
  pub fn path_for_root(root: &Path) -> PathBuf {
    root.join(DATABASE_DIR).join(DATABASE_FILENAME)
  }

  /// Load a database file.
  pub fn from_path(path: &Path) -> Result<Self, DatabaseError> {
    let file = File::open(path).map_err(|source| DatabaseError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let db = Self::from_reader(BufReader::new(file))?;
    debug!(path = ?path, installs = db.len(), "loaded install database");
    Ok(db)
  }

  /// Parse a database document.
  pub fn from_reader(reader: impl Read) -> Result<Self, DatabaseError> {
    let doc: wire::Document = serde_json::from_reader(reader)?;
    Ok(Self::from_installs(doc.database.installs))
  }

  /// Parse a database document held in memory.
  pub fn from_json(json: &str) -> Result<Self, DatabaseError> {
    let doc: wire::Document = serde_json::from_str(json)?;
    Ok(Self::from_installs(doc.database.installs))
  }

  fn from_installs(installs: BTreeMap<String, InstallRecord>) -> Self {
    for (key, record) in &installs {
      if *key != record.hash {
        warn!(key = %key, hash = %record.hash, name = %record.name, "install keyed under a different hash");
      }
    }
    Self { installs }
  }

  pub fn len(&self) -> usize {
    self.installs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.installs.is_empty()
  }

  /// Look up an install by hash.
  pub fn get(&self, hash: &str) -> Option<&InstallRecord> {
    self.installs.get(hash)
  }

  /// All installs in hash order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &InstallRecord)> {
    self.installs.iter().map(|(hash, record)| (hash.as_str(), record))
  }

  pub fn hashes(&self) -> impl Iterator<Item = &str> {
    self.installs.keys().map(String::as_str)
  }

  /// Every installed variant of a package.
  pub fn variants<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a InstallRecord> + use<'a, 'n> {
    self.installs.values().filter(move |record| record.name == name)
  }

  /// The install of `name` that [`InstallRecord::newer_than`] every other.
  ///
  /// On an exact tie the first variant in hash order is kept.
  pub fn current(&self, name: &str) -> Option<&InstallRecord> {
    self.variants(name).fold(None, |best, candidate| match best {
      Some(best) if !candidate_wins(candidate, best) => Some(best),
      _ => Some(candidate),
    })
  }

  /// The current install of every installed package, by name.
  pub fn current_installs(&self) -> BTreeMap<&str, &InstallRecord> {
    let mut current: BTreeMap<&str, &InstallRecord> = BTreeMap::new();
    for record in self.installs.values() {
      match current.get(record.name.as_str()) {
        Some(best) if !candidate_wins(record, best) => {}
        _ => {
          current.insert(record.name.as_str(), record);
        }
      }
    }
    current
  }

  /// Resolve the dependency edges of an install to installed records.
  ///
  /// Returns `None` if `hash` is not installed. Edges to hashes missing from
  /// the database are skipped.
  pub fn dependencies(&self, hash: &str) -> Option<Vec<(&Dependency, &InstallRecord)>> {
    let record = self.installs.get(hash)?;
    let resolved = record
      .dependencies
      .iter()
      .filter_map(|dep| match self.installs.get(&dep.hash) {
        Some(target) => Some((dep, target)),
        None => {
          debug!(from = %record.spec_ref(), name = %dep.name, hash = %dep.hash, "dependency not installed");
          None
        }
      })
      .collect();
    Some(resolved)
  }

  /// Current installs whose version is older than the latest listed one.
  pub fn outdated<'a>(&'a self, latest: &'a [Package]) -> Vec<(&'a InstallRecord, &'a str)> {
    let current = self.current_installs();
    latest
      .iter()
      .filter_map(|package| {
        let record = current.get(package.name.as_str())?;
        version::is_newer(&record.version, &package.version).then_some((*record, package.version.as_str()))
      })
      .collect()
  }
}

/// `candidate` replaces `best` only when it is strictly preferred, so the
/// first of two indistinguishable installs is kept.
fn candidate_wins(candidate: &InstallRecord, best: &InstallRecord) -> bool {
  candidate.newer_than(best) && !best.newer_than(candidate)
}

/// On-disk layout of the install database.
mod wire {
  use std::collections::BTreeMap;
  use std::path::PathBuf;

  use serde::Deserialize;

  use super::{Dependency, InstallRecord};

  #[derive(Deserialize)]
  pub(super) struct Document {
    pub database: Database,
  }

  #[derive(Deserialize)]
  pub(super) struct Database {
    #[serde(default)]
    pub installs: BTreeMap<String, InstallRecord>,
  }

  #[derive(Deserialize)]
  pub(super) struct Install {
    spec: Spec,
    path: PathBuf,
    #[serde(rename = "installation_time")]
    installed_at: f64,
  }

  #[derive(Deserialize)]
  struct Spec {
    name: String,
    version: String,
    hash: String,
    #[serde(default)]
    dependencies: Vec<Edge>,
  }

  #[derive(Deserialize)]
  struct Edge {
    name: String,
    hash: String,
    #[serde(default)]
    parameters: Parameters,
  }

  #[derive(Default, Deserialize)]
  struct Parameters {
    #[serde(default)]
    deptypes: Vec<String>,
  }

  impl From<Install> for InstallRecord {
    fn from(install: Install) -> Self {
      InstallRecord {
        name: install.spec.name,
        version: install.spec.version,
        hash: install.spec.hash,
        dependencies: install
          .spec
          .dependencies
          .into_iter()
          .map(|edge| Dependency {
            name: edge.name,
            hash: edge.hash,
            types: edge.parameters.deptypes,
          })
          .collect(),
        path: install.path,
        installed_at: install.installed_at,
      }
    }
  }
}
