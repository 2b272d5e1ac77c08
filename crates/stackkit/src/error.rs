//! Error types for config resolution and queue execution.
//!
//! Every error is fatal for a run. Variants carry the offending path or
//! name so the CLI can print a precise message, and [`Error::exit_code`]
//! maps them onto the process exit code.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single field-level schema problem, addressed by a dotted path
/// such as `stacks.network.stages.dev.vars.region`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Dotted path of the offending field
    pub path: String,
    /// Human readable explanation
    pub message: String,
}

impl SchemaViolation {
    /// Create a new violation.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "- {}: {}", self.path, self.message)
    }
}

/// Errors raised while loading a config, building a queue or draining it.
#[derive(Debug, Error)]
pub enum Error {
    /// The config path does not point at an existing file
    #[error("The config file \"{}\" does not exist.", path.display())]
    ConfigFileNotFound {
        /// Resolved config path
        path: PathBuf,
    },

    /// The config file exists but could not be read
    #[error("Could not read config file \"{}\": {source}", path.display())]
    ReadConfig {
        /// Resolved config path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The config file is not valid YAML
    #[error("Invalid YAML in \"{}\": {source}", path.display())]
    Yaml {
        /// Resolved config path (or `<inline>` for in-memory documents)
        path: PathBuf,
        /// Underlying parser error
        source: serde_yaml::Error,
    },

    /// The config document is structurally invalid
    #[error("dmark.config schema validation error:\n{}", render_violations(violations))]
    InvalidSchema {
        /// Every violation found, in document order
        violations: Vec<SchemaViolation>,
    },

    /// The config document is empty
    #[error("Execution error, no config provided in \"{}\".", path.display())]
    NoConfigProvided {
        /// Resolved config path
        path: PathBuf,
    },

    /// A requested stack is not declared in the config
    #[error("The stack \"{name}\" does not exist in the config file.")]
    InvalidStackName {
        /// Requested stack name
        name: String,
    },

    /// A requested stage is not declared anywhere in the config
    #[error("The stage \"{name}\" is not a valid stage name.")]
    InvalidStageName {
        /// Requested stage name
        name: String,
    },

    /// A stack declares no `path`
    #[error("Missing \"path\" field in the \"{stack}\" stack.")]
    MissingStackPath {
        /// Stack name
        stack: String,
    },

    /// A stack `path` does not exist on disk
    #[error("The path \"{}\" does not exist.", path.display())]
    InvalidStackPath {
        /// Resolved stack folder
        path: PathBuf,
    },

    /// A filesystem operation around local state failed
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted
        context: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The infrastructure tool could not be started
    #[error("Failed to execute \"{program}\": {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A queued invocation exited with a non-zero code
    #[error("Command \"{command}\" exited with code {code}")]
    CommandFailed {
        /// The invocation, joined with spaces
        command: String,
        /// Exit code of the child process
        code: i32,
    },
}

impl Error {
    /// Build an [`Error::Io`] with a short description of the attempted operation.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Exit code the process should terminate with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CommandFailed { code, .. } => *code,
            _ => 1,
        }
    }
}

fn render_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result alias for stackkit operations.
pub type Result<T> = std::result::Result<T, Error>;
