//! Resolve the stacks, stages and labels a run targets.

use crate::error::{Error, Result};
use crate::model::{ALL_STAGES, Config};

/// Stack names to run on. Empty `requested` means every declared stack.
///
/// Fails on the first requested name that is not declared. Duplicates are
/// removed; ordering is applied later by [`order_stacks`](crate::order_stacks).
pub fn get_stacks(config: &Config, requested: &[String]) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(config.stacks.keys().cloned().collect());
    }

    if let Some(unknown) = requested.iter().find(|name| !config.has_stack(name)) {
        return Err(Error::InvalidStackName {
            name: unknown.clone(),
        });
    }

    Ok(dedup(requested.iter().cloned()))
}

/// Every stage declared in `globals.stages` or any stack's `stages`,
/// excluding the `__all__` wildcard.
pub fn valid_stages(config: &Config) -> Vec<String> {
    let global = config.globals.stages.keys();
    let per_stack = config.stacks.values().flat_map(|stack| stack.stages.keys());

    dedup(
        global
            .chain(per_stack)
            .filter(|name| name.as_str() != ALL_STAGES)
            .cloned(),
    )
}

/// Stage names to run on. Empty `requested` means every valid stage.
pub fn get_stages(config: &Config, requested: &[String]) -> Result<Vec<String>> {
    let valid = valid_stages(config);

    if requested.is_empty() {
        return Ok(valid);
    }

    if let Some(unknown) = requested.iter().find(|name| !valid.contains(name)) {
        return Err(Error::InvalidStageName {
            name: unknown.clone(),
        });
    }

    Ok(dedup(
        requested
            .iter()
            .filter(|name| name.as_str() != ALL_STAGES)
            .cloned(),
    ))
}

/// Labels to filter stacks by. Labels are free-form: nothing checks that
/// any stack declares them.
pub fn get_labels(requested: &[String]) -> Vec<String> {
    dedup(requested.iter().cloned())
}

/// Drop repeated items, keeping first occurrences in order.
pub(crate) fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    fn config() -> Config {
        Config::from_yaml_str(
            r"
globals:
  stages:
    __all__: {}
    dev: {}
    qa: {}
stacks:
  network:
    path: ./network
    stages:
      prod: {}
      dev: {}
  compute:
    path: ./compute
    stages:
      __all__: {}
      sandbox: {}
",
            "/work",
        )
        .unwrap()
    }

    #[test]
    fn test_get_stacks_defaults_to_all() {
        let mut stacks = get_stacks(&config(), &[]).unwrap();
        stacks.sort();
        assert_eq!(stacks, names(&["compute", "network"]));
    }

    #[test]
    fn test_get_stacks_dedups_requested() {
        let stacks = get_stacks(&config(), &names(&["network", "compute", "network"])).unwrap();
        assert_eq!(stacks, names(&["network", "compute"]));
    }

    #[test]
    fn test_get_stacks_rejects_unknown() {
        let err = get_stacks(&config(), &names(&["network", "storage"])).unwrap_err();
        assert!(matches!(err, Error::InvalidStackName { name } if name == "storage"));
    }

    #[test]
    fn test_get_stages_defaults_to_union_without_wildcard() {
        let mut stages = get_stages(&config(), &[]).unwrap();
        stages.sort();
        assert_eq!(stages, names(&["dev", "prod", "qa", "sandbox"]));
    }

    #[test]
    fn test_get_stages_rejects_unknown() {
        let err = get_stages(&config(), &names(&["bogus"])).unwrap_err();
        assert!(matches!(err, Error::InvalidStageName { name } if name == "bogus"));
    }

    #[test]
    fn test_get_stages_rejects_explicit_wildcard() {
        let err = get_stages(&config(), &names(&["dev", ALL_STAGES])).unwrap_err();
        assert!(matches!(err, Error::InvalidStageName { name } if name == ALL_STAGES));
    }

    #[test]
    fn test_get_stages_dedups_requested() {
        let stages = get_stages(&config(), &names(&["qa", "dev", "qa"])).unwrap();
        assert_eq!(stages, names(&["qa", "dev"]));
    }

    #[test]
    fn test_get_labels() {
        assert!(get_labels(&[]).is_empty());
        assert_eq!(
            get_labels(&names(&["core", "eu", "core"])),
            names(&["core", "eu"])
        );
    }
}
