//! Per-(stack, stage) parameter resolution.
//!
//! Globals are layered first, then the stack's own settings. Functions take
//! a stack name that has already been checked against the config; an unknown
//! name resolves to globals only.

use crate::error::{Error, Result};
use crate::model::{ALL_STAGES, Config, LocalSetting, StageConfig};
use crate::select::dedup;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Whether a stack keeps its state in a remote backend or in local files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalMode {
    Remote,
    /// Local state, swapped per stage. `path` is the stack's own backup
    /// directory setting, if any.
    Local { path: Option<String> },
}

impl LocalMode {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }
}

/// Everything the queue builder needs for one (stack, stage) pair.
#[derive(Debug, Clone)]
pub struct StageParams {
    pub folder: PathBuf,
    /// `export TF_VAR_<key>=<value>` prefixes
    pub vars: Vec<String>,
    /// `-backend-config="<key>=<value>"` flags
    pub backend_config: Vec<String>,
    pub local: LocalMode,
}

impl StageParams {
    /// Resolve folder, vars, backend config and local mode for a pair.
    pub fn resolve(config: &Config, stack_name: &str, stage_name: &str) -> Result<Self> {
        let params = Self {
            folder: stack_folder(config, stack_name)?,
            vars: vars(config, stack_name, stage_name),
            backend_config: backend_config(config, stack_name, stage_name),
            local: local_mode(config, stack_name),
        };

        log::debug!(
            "{stack_name}/{stage_name}: folder={} vars={} backend_config={} local={}",
            params.folder.display(),
            params.vars.len(),
            params.backend_config.len(),
            params.local.is_local()
        );

        Ok(params)
    }
}

/// Expand `~`/`$VAR` and anchor relative paths at `base_dir`.
pub(crate) fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let expanded = shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .unwrap_or_else(|_| PathBuf::from(path));
    base_dir.join(expanded)
}

/// Absolute folder of a stack; it must exist on disk.
pub fn stack_folder(config: &Config, stack_name: &str) -> Result<PathBuf> {
    let path = config
        .stack(stack_name)
        .map(|stack| stack.path.as_str())
        .filter(|path| !path.is_empty())
        .ok_or_else(|| Error::MissingStackPath {
            stack: stack_name.to_string(),
        })?;

    let folder = resolve_path(&config.base_dir, path);
    if !folder.exists() {
        return Err(Error::InvalidStackPath { path: folder });
    }

    Ok(folder)
}

/// Whether the stack opts out of `stage_name`.
pub fn ignore_stage(config: &Config, stack_name: &str, stage_name: &str) -> bool {
    config
        .stack(stack_name)
        .is_some_and(|stack| stack.ignore_stages.iter().any(|s| s == stage_name))
}

/// Variables for a pair, rendered as `export TF_VAR_<key>=<value>`.
pub fn vars(config: &Config, stack_name: &str, stage_name: &str) -> Vec<String> {
    merge_category(config, stack_name, stage_name, |stage| stage.vars.as_ref())
        .into_iter()
        .map(|(key, value)| format!("export TF_VAR_{key}={value}"))
        .collect()
}

/// Backend settings for a pair, rendered as `-backend-config="<key>=<value>"`.
pub fn backend_config(config: &Config, stack_name: &str, stage_name: &str) -> Vec<String> {
    merge_category(config, stack_name, stage_name, |stage| {
        stage.backend_config.as_ref()
    })
    .into_iter()
    .map(|(key, value)| format!("-backend-config=\"{key}={value}\""))
    .collect()
}

/// Layer one category (`vars` or `backendConfig`).
///
/// Globals: the `__all__` entry and then the `stage_name` entry are both
/// applied, so stage values win collisions. Stack: exactly one source is
/// used, the `__all__` entry's category if present, otherwise the stage
/// entry's.
fn merge_category<'a, F>(
    config: &'a Config,
    stack_name: &str,
    stage_name: &str,
    category: F,
) -> BTreeMap<&'a str, &'a str>
where
    F: Fn(&'a StageConfig) -> Option<&'a BTreeMap<String, String>>,
{
    let mut merged = BTreeMap::new();
    let mut apply = |values: &'a BTreeMap<String, String>| {
        for (key, value) in values {
            merged.insert(key.as_str(), value.as_str());
        }
    };

    for key in [ALL_STAGES, stage_name] {
        if let Some(values) = config.globals.stages.get(key).and_then(&category) {
            apply(values);
        }
    }

    if let Some(stack) = config.stack(stack_name) {
        let wildcard = stack.stages.get(ALL_STAGES).and_then(&category);
        let specific = stack.stages.get(stage_name).and_then(&category);
        if let Some(values) = wildcard.or(specific) {
            apply(values);
        }
    }

    merged
}

/// Effective local mode: the stack's `local` overrides the global one.
pub fn local_mode(config: &Config, stack_name: &str) -> LocalMode {
    let global = config.globals.local.as_ref();
    let stack = config.stack(stack_name).and_then(|s| s.local.as_ref());

    // `local` objects only carry `path`, so merging one over another is an override
    match stack.or(global) {
        Some(setting) if setting.is_enabled() => LocalMode::Local {
            path: stack.and_then(LocalSetting::path).map(ToString::to_string),
        },
        _ => LocalMode::Remote,
    }
}

/// Effective labels of a stack: global labels plus the stack's own.
pub fn stack_labels(config: &Config, stack_name: &str) -> Vec<String> {
    let own = config
        .stack(stack_name)
        .map(|stack| stack.labels.as_slice())
        .unwrap_or_default();

    dedup(config.globals.labels.iter().chain(own).cloned())
}
