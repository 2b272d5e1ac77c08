//! Typed view of `dmark.config.yaml`.
//!
//! ```yaml
//! globals:
//!   local: false
//!   labels: [infra]
//!   stages:
//!     __all__:
//!       vars: { project: acme }
//!     dev:
//!       backendConfig: { bucket: acme-dev-state }
//! stacks:
//!   network:
//!     path: ./stacks/network
//!     order: 1
//!   compute:
//!     path: ./stacks/compute
//!     ignoreStages: [prod]
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Reserved stage key that applies to every stage.
pub const ALL_STAGES: &str = "__all__";

/// Root of the config file.
///
/// A `Config` is only handed out by [`Config::load`](crate::Config::load) or
/// [`Config::from_yaml_str`](crate::Config::from_yaml_str), both of which
/// validate the document first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Defaults shared by every stack
    #[serde(default)]
    pub globals: Globals,

    /// Stacks keyed by name
    pub stacks: BTreeMap<String, StackConfig>,

    /// Directory relative stack paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Shared defaults under `globals`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Globals {
    #[serde(default)]
    pub local: Option<LocalSetting>,

    #[serde(default)]
    pub stages: BTreeMap<String, StageConfig>,

    #[serde(default)]
    pub labels: Vec<String>,
}

/// A single deployment unit.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackConfig {
    /// Folder holding the stack's infrastructure definitions
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Explicit ordering priority, lower runs first
    #[serde(default)]
    pub order: Option<f64>,

    #[serde(default)]
    pub local: Option<LocalSetting>,

    #[serde(default)]
    pub stages: BTreeMap<String, StageConfig>,

    #[serde(default)]
    pub labels: Vec<String>,

    /// Stages this stack never runs in
    #[serde(default)]
    pub ignore_stages: Vec<String>,
}

impl StackConfig {
    /// Explicit order, if it is set and non-zero.
    pub fn explicit_order(&self) -> Option<f64> {
        self.order.filter(|order| *order != 0.0)
    }
}

/// Per-stage values. A missing category is distinct from an empty one:
/// an empty `vars: {}` under `__all__` still shadows the stage entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageConfig {
    #[serde(default)]
    pub vars: Option<BTreeMap<String, String>>,

    #[serde(default)]
    pub backend_config: Option<BTreeMap<String, String>>,
}

/// `local: true | false | { path: ... }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LocalSetting {
    Flag(bool),
    Dir { path: String },
}

impl LocalSetting {
    /// Whether this setting turns local state on.
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Flag(enabled) => *enabled,
            Self::Dir { .. } => true,
        }
    }

    /// Backup directory, when one is configured.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Flag(_) => None,
            Self::Dir { path } => Some(path),
        }
    }
}

impl Config {
    /// Look up a stack by name.
    pub fn stack(&self, name: &str) -> Option<&StackConfig> {
        self.stacks.get(name)
    }

    /// Whether `name` is a declared stack.
    pub fn has_stack(&self, name: &str) -> bool {
        self.stacks.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_order_treats_zero_as_unset() {
        let mut stack = StackConfig {
            path: ".".to_string(),
            ..Default::default()
        };
        assert_eq!(stack.explicit_order(), None);

        stack.order = Some(0.0);
        assert_eq!(stack.explicit_order(), None);

        stack.order = Some(2.0);
        assert_eq!(stack.explicit_order(), Some(2.0));
    }

    #[test]
    fn test_local_setting_shapes() {
        let flag: LocalSetting = serde_yaml::from_str("true").unwrap();
        assert_eq!(flag, LocalSetting::Flag(true));
        assert!(flag.is_enabled());
        assert_eq!(flag.path(), None);

        let dir: LocalSetting = serde_yaml::from_str("path: ./states").unwrap();
        assert!(dir.is_enabled());
        assert_eq!(dir.path(), Some("./states"));

        assert!(!LocalSetting::Flag(false).is_enabled());
    }

    #[test]
    fn test_stage_config_keeps_empty_category() {
        let stage: StageConfig = serde_yaml::from_str("vars: {}").unwrap();
        assert_eq!(stage.vars, Some(BTreeMap::new()));
        assert_eq!(stage.backend_config, None);
    }
}
