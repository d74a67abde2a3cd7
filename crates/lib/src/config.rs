//! Spack configuration snapshot.
//!
//! Parsed from the YAML printed by `spack config get config`. Only the keys
//! needed to locate installs and build stages are kept; paths are stored as
//! written, placeholders included, and resolved on demand.

use std::io::Read;

use serde::Deserialize;

/// The subset of Spack's `config` section read by this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "wire::Document")]
pub struct SpackConfig {
  /// `config:install_tree:root`, unresolved.
  pub install_root: String,
  /// `config:build_stage`, unresolved and in priority order.
  pub build_stage: Vec<String>,
}

impl SpackConfig {
  /// Parse the output of `spack config get config`.
  pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
  }

  /// Parse the output of `spack config get config` from a reader.
  pub fn from_reader(reader: impl Read) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_reader(reader)
  }

  /// The authoritative build stage entry.
  ///
  /// Only the first listed entry is used; later entries are not searched.
  pub fn active_build_stage(&self) -> Option<&str> {
    self.build_stage.first().map(String::as_str)
  }
}

mod wire {
  use serde::Deserialize;

  use super::SpackConfig;

  #[derive(Deserialize)]
  pub(super) struct Document {
    #[serde(default)]
    config: Section,
  }

  #[derive(Default, Deserialize)]
  struct Section {
    #[serde(default)]
    install_tree: InstallTree,
    #[serde(default)]
    build_stage: Option<OneOrMany>,
  }

  #[derive(Default, Deserialize)]
  struct InstallTree {
    #[serde(default)]
    root: Option<String>,
  }

  /// Older releases write `build_stage` as a single string.
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum OneOrMany {
    One(String),
    Many(Vec<String>),
  }

  impl From<Document> for SpackConfig {
    fn from(doc: Document) -> Self {
      let build_stage = match doc.config.build_stage {
        Some(OneOrMany::One(path)) => vec![path],
        Some(OneOrMany::Many(paths)) => paths,
        None => Vec::new(),
      };
      SpackConfig {
        install_root: doc.config.install_tree.root.unwrap_or_default(),
        build_stage,
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const CONFIG: &str = r#"config:
  install_tree:
    root: /software/spack/opt
    projections:
      all: '{architecture}/{compiler.name}-{compiler.version}/{name}-{version}-{hash}'
    padded_length: false
  build_stage:
  - $tempdir/$user/spack-stage
  - $user_cache_path/stage
  source_cache: $spack/var/spack/cache
  build_jobs: 16
"#;

  #[test]
  fn parses_install_root_and_build_stage() {
    let config = SpackConfig::from_yaml(CONFIG).unwrap();

    assert_eq!(config.install_root, "/software/spack/opt");
    assert_eq!(
      config.build_stage,
      vec!["$tempdir/$user/spack-stage".to_string(), "$user_cache_path/stage".to_string()]
    );
    assert_eq!(config.active_build_stage(), Some("$tempdir/$user/spack-stage"));
  }

  #[test]
  fn accepts_scalar_build_stage() {
    let config = SpackConfig::from_yaml("config:\n  build_stage: /scratch/stage\n").unwrap();
    assert_eq!(config.build_stage, vec!["/scratch/stage".to_string()]);
  }

  #[test]
  fn missing_keys_default_to_empty() {
    let config = SpackConfig::from_yaml("config:\n  build_jobs: 4\n").unwrap();
    assert_eq!(config, SpackConfig::default());
    assert_eq!(config.active_build_stage(), None);

    let config = SpackConfig::from_yaml("config:\n  install_tree:\n    root: null\n").unwrap();
    assert_eq!(config.install_root, "");
  }

  #[test]
  fn rejects_unexpected_shapes() {
    assert!(SpackConfig::from_yaml("config:\n  install_tree: 5\n").is_err());
    assert!(SpackConfig::from_yaml("- just\n- a list\n").is_err());
  }

  #[test]
  fn reads_from_reader() {
    let config = SpackConfig::from_reader(CONFIG.as_bytes()).unwrap();
    assert_eq!(config.install_root, "/software/spack/opt");
  }
}
