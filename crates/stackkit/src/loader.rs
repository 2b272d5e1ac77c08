//! Config loading: read, validate, normalize, deserialize.

use crate::error::{Error, Result};
use crate::model::Config;
use crate::schema;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "dmark.config.yaml";

/// Load the config at `path`, or `./dmark.config.yaml` when `path` is `None`.
///
/// Relative stack paths are later resolved against the current working
/// directory, not the config file's directory.
pub fn get_config(path: Option<&Path>) -> Result<Config> {
    let cwd = std::env::current_dir()
        .map_err(|e| Error::io("Could not determine working directory", e))?;

    let config_path = match path {
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => cwd.join(p),
        None => cwd.join(DEFAULT_CONFIG_FILE),
    };

    Config::load(&config_path, &cwd)
}

impl Config {
    /// Load and validate a config file, resolving stack paths against `base_dir`.
    pub fn load(path: &Path, base_dir: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ConfigFileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;

        log::debug!("Loaded config from {}", path.display());
        parse(&content, path, base_dir)
    }

    /// Parse and validate an in-memory YAML document.
    pub fn from_yaml_str(yaml: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        parse(yaml, Path::new("<inline>"), &base_dir.into())
    }
}

fn parse(content: &str, path: &Path, base_dir: &Path) -> Result<Config> {
    let yaml_error = |source| Error::Yaml {
        path: path.to_path_buf(),
        source,
    };

    if content.trim().is_empty() {
        return Err(Error::NoConfigProvided {
            path: path.to_path_buf(),
        });
    }

    let doc: Value = serde_yaml::from_str(content).map_err(yaml_error)?;
    if doc.is_null() {
        return Err(Error::NoConfigProvided {
            path: path.to_path_buf(),
        });
    }

    schema::validate(&doc)?;

    let mut config: Config = serde_yaml::from_value(schema::normalize(doc)).map_err(yaml_error)?;
    config.base_dir = base_dir.to_path_buf();

    log::debug!(
        "Config declares {} stack(s), {} global stage(s)",
        config.stacks.len(),
        config.globals.stages.len()
    );

    Ok(config)
}
