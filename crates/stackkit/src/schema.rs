//! Structural validation of a raw config document.
//!
//! Runs on the untyped `serde_yaml::Value` so that every problem in the
//! file is reported at once, each with a dotted path, before the document
//! is deserialized into [`Config`](crate::Config).

use crate::error::{Error, Result, SchemaViolation};
use serde_yaml::{Mapping, Value};

const GLOBAL_FIELDS: [&str; 3] = ["local", "stages", "labels"];

/// Validate a config document, collecting every violation.
pub fn validate(doc: &Value) -> Result<()> {
    let mut validator = Validator::default();
    validator.root(doc);

    if validator.violations.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidSchema {
            violations: validator.violations,
        })
    }
}

/// Strip explicit nulls from a validated document so it deserializes into
/// the typed model. `dev:` with no body becomes an empty stage entry.
pub fn normalize(mut doc: Value) -> Value {
    let Some(root) = doc.as_mapping_mut() else {
        return doc;
    };
    drop_nulls(root);

    if let Some(globals) = root.get_mut("globals").and_then(Value::as_mapping_mut) {
        normalize_scope(globals);
    }

    if let Some(stacks) = root.get_mut("stacks").and_then(Value::as_mapping_mut) {
        for stack in stacks.values_mut() {
            if let Some(stack) = stack.as_mapping_mut() {
                normalize_scope(stack);
            }
        }
    }

    doc
}

fn normalize_scope(scope: &mut Mapping) {
    drop_nulls(scope);

    if let Some(stages) = scope.get_mut("stages").and_then(Value::as_mapping_mut) {
        for stage in stages.values_mut() {
            match stage {
                Value::Null => *stage = Value::Mapping(Mapping::new()),
                Value::Mapping(entry) => drop_nulls(entry),
                _ => {}
            }
        }
    }
}

fn drop_nulls(map: &mut Mapping) {
    let null_keys: Vec<Value> = map
        .iter()
        .filter(|(_, value)| value.is_null())
        .map(|(key, _)| key.clone())
        .collect();

    for key in null_keys {
        map.remove(&key);
    }
}

#[derive(Default)]
struct Validator {
    violations: Vec<SchemaViolation>,
}

impl Validator {
    fn missing(&mut self, path: &str) {
        self.violations.push(SchemaViolation::new(
            path,
            format!("Missing {path} field in the config file."),
        ));
    }

    fn mismatch(&mut self, path: &str, types: &[&str]) {
        self.violations.push(SchemaViolation::new(
            path,
            format!(
                "Invalid type for {path} field in the config file. Should be one of types: {}",
                types.join(", ")
            ),
        ));
    }

    fn root(&mut self, doc: &Value) {
        let Some(root) = doc.as_mapping() else {
            self.missing("stacks");
            return;
        };

        match root.get("globals") {
            None | Some(Value::Null) => {}
            Some(globals) => self.globals(globals),
        }

        match root.get("stacks") {
            None | Some(Value::Null) => self.missing("stacks"),
            Some(stacks) => self.stacks(stacks),
        }
    }

    fn globals(&mut self, value: &Value) {
        let path = "globals";
        let Some(globals) = value.as_mapping() else {
            self.mismatch(path, &["object"]);
            return;
        };

        for key in globals.keys() {
            let allowed = key.as_str().is_some_and(|k| GLOBAL_FIELDS.contains(&k));
            if !allowed {
                self.violations.push(SchemaViolation::new(
                    format!("{path}.{}", display_key(key)),
                    format!("{path} could only have the fields: {}", GLOBAL_FIELDS.join(", ")),
                ));
            }
        }

        self.scope(globals, path);
    }

    /// Fields shared by `globals` and every stack.
    fn scope(&mut self, scope: &Mapping, path: &str) {
        self.local(scope.get("local"), &format!("{path}.local"));
        self.stages(scope.get("stages"), &format!("{path}.stages"));
        self.string_list(scope.get("labels"), &format!("{path}.labels"));
    }

    fn local(&mut self, value: Option<&Value>, path: &str) {
        match value {
            None | Some(Value::Null | Value::Bool(_)) => {}
            Some(Value::Mapping(local)) => match local.get("path") {
                None | Some(Value::Null) => self.missing(&format!("{path}.path")),
                Some(Value::String(_)) => {}
                Some(_) => self.mismatch(&format!("{path}.path"), &["string"]),
            },
            Some(_) => self.mismatch(path, &["boolean", "{ path: string }", "undefined", "null"]),
        }
    }

    fn stages(&mut self, value: Option<&Value>, path: &str) {
        let stages = match value {
            None | Some(Value::Null) => return,
            Some(Value::Mapping(stages)) => stages,
            Some(_) => {
                self.mismatch(path, &["object"]);
                return;
            }
        };

        if stages.is_empty() {
            self.violations.push(SchemaViolation::new(
                path,
                "No stage provided in config. Should have at least one.",
            ));
            return;
        }

        for (key, stage) in stages {
            let Some(name) = self.key(key, path) else {
                continue;
            };
            let stage_path = format!("{path}.{name}");

            match stage {
                Value::Null => {}
                Value::Mapping(entry) => {
                    self.string_map(entry.get("vars"), &format!("{stage_path}.vars"));
                    self.string_map(
                        entry.get("backendConfig"),
                        &format!("{stage_path}.backendConfig"),
                    );
                }
                _ => self.mismatch(&stage_path, &["object"]),
            }
        }
    }

    fn string_map(&mut self, value: Option<&Value>, path: &str) {
        let map = match value {
            None | Some(Value::Null) => return,
            Some(Value::Mapping(map)) => map,
            Some(_) => {
                self.mismatch(path, &["object"]);
                return;
            }
        };

        for (key, entry) in map {
            let Some(name) = self.key(key, path) else {
                continue;
            };
            if !entry.is_string() {
                self.mismatch(&format!("{path}.{name}"), &["string"]);
            }
        }
    }

    fn string_list(&mut self, value: Option<&Value>, path: &str) {
        let items = match value {
            None | Some(Value::Null) => return,
            Some(Value::Sequence(items)) => items,
            Some(_) => {
                self.mismatch(path, &["string[]"]);
                return;
            }
        };

        for (index, item) in items.iter().enumerate() {
            if !item.is_string() {
                self.mismatch(&format!("{path}.{index}"), &["string"]);
            }
        }
    }

    fn stacks(&mut self, value: &Value) {
        let path = "stacks";
        let Some(stacks) = value.as_mapping() else {
            self.mismatch(path, &["object"]);
            return;
        };

        if stacks.is_empty() {
            self.violations.push(SchemaViolation::new(
                path,
                "No stack provided in config. Should have at least one.",
            ));
            return;
        }

        for (key, stack) in stacks {
            if let Some(name) = self.key(key, path) {
                self.stack(stack, &format!("{path}.{name}"));
            }
        }
    }

    fn stack(&mut self, value: &Value, path: &str) {
        let Some(stack) = value.as_mapping() else {
            self.mismatch(path, &["object"]);
            return;
        };

        self.scope(stack, path);

        let stack_path = format!("{path}.path");
        match stack.get("path") {
            None | Some(Value::Null) => self.missing(&stack_path),
            Some(Value::String(p)) if p.is_empty() => self.missing(&stack_path),
            Some(Value::String(_)) => {}
            Some(_) => self.mismatch(&stack_path, &["string"]),
        }

        match stack.get("description") {
            None | Some(Value::Null | Value::String(_)) => {}
            Some(_) => self.mismatch(&format!("{path}.description"), &["string"]),
        }

        match stack.get("order") {
            None | Some(Value::Null | Value::Number(_)) => {}
            Some(_) => self.mismatch(&format!("{path}.order"), &["number"]),
        }

        self.string_list(stack.get("ignoreStages"), &format!("{path}.ignoreStages"));
    }

    /// Mapping keys must be strings; returns the key when it is one.
    fn key<'a>(&mut self, key: &'a Value, parent: &str) -> Option<&'a str> {
        if let Some(name) = key.as_str() {
            return Some(name);
        }
        self.violations.push(SchemaViolation::new(
            format!("{parent}.{}", display_key(key)),
            format!("Keys under {parent} must be strings"),
        ));
        None
    }
}

fn display_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "?".to_string()),
    }
}
