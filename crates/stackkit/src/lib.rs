//! # Stackkit
//!
//! Turns a multi-stack, multi-stage Terraform configuration into an ordered
//! queue of tool invocations and drains it.
//!
//! ## Core Concepts
//!
//! - **Stack**: an independently deployable Terraform root module in its own folder
//! - **Stage**: a named environment (`dev`, `prod`, ...) each stack is deployed into
//! - **Queue**: `init`, optional `fmt`, then the requested command, per (stack, stage) pair
//! - **Local mode**: state kept on disk and swapped per stage instead of a remote backend
//!
//! ## Example
//!
//! ```ignore
//! use stackkit::{NoProgress, RunOptions, execute_command, get_config, get_stacks, get_stages};
//!
//! let config = get_config(None)?;
//! let opts = RunOptions {
//!     stacks: get_stacks(&config, &[])?,
//!     stages: get_stages(&config, &["dev".to_string()])?,
//!     ..Default::default()
//! };
//!
//! execute_command("plan", &config, &opts, &mut runner, &mut NoProgress)?;
//! ```

pub mod context;
pub mod error;
pub mod executor;
pub mod loader;
pub mod local_state;
pub mod model;
pub mod order;
pub mod queue;
pub mod resolve;
pub mod schema;
pub mod select;

pub use context::{
    CommandRunner, DEFAULT_RUNNER, LogProgress, NoProgress, ProgressCallback, RunOptions,
};
pub use error::{Error, Result, SchemaViolation};
pub use executor::{ExecuteSummary, execute_command, execute_queue};
pub use loader::{DEFAULT_CONFIG_FILE, get_config};
pub use model::{ALL_STAGES, Config, Globals, LocalSetting, StackConfig, StageConfig};
pub use order::order_stacks;
pub use queue::{Hook, InvocationKind, QueueEntry, build_queue};
pub use resolve::{LocalMode, StageParams};
pub use select::{get_labels, get_stacks, get_stages};
