//! Run options and the traits the executor depends on.
//!
//! Spawning processes and printing are left to the caller so the engine
//! can be driven by a real terminal or by a test double.

use crate::error::Result;
use crate::queue::QueueEntry;

/// Default infrastructure tool binary.
pub const DEFAULT_RUNNER: &str = "terraform";

/// Per-run options, resolved by the caller from CLI flags.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub stacks: Vec<String>,
    pub stages: Vec<String>,
    /// A stack runs only if it carries every one of these labels
    pub labels: Vec<String>,
    /// Run `fmt` before the main command
    pub fmt: bool,
    /// Add `-upgrade` to `init`
    pub init_upgrade: bool,
    /// Add `-migrate-state` to `init`
    pub init_migrate_state: bool,
    /// Add `-auto-approve` to the main command (never to `plan`)
    pub auto_approve: bool,
    /// Skip the implicit `init`
    pub no_init: bool,
    /// Remove `.terraform.lock.hcl` before `init`
    pub delete_lock: bool,
    /// Extra arguments for the invocation matching the command
    pub rest: Vec<String>,
    /// Binary to invoke (`terraform`, `tofu`, ...)
    pub runner: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            stacks: Vec::new(),
            stages: Vec::new(),
            labels: Vec::new(),
            fmt: false,
            init_upgrade: false,
            init_migrate_state: false,
            auto_approve: false,
            no_init: false,
            delete_lock: false,
            rest: Vec::new(),
            runner: DEFAULT_RUNNER.to_string(),
        }
    }
}

/// Runs one invocation to completion.
///
/// `args` may start with `NAME=value` (or `export NAME=value`) elements that
/// belong in the child's environment rather than its argument list.
pub trait CommandRunner {
    /// Run the invocation with inherited stdio and return its exit code.
    fn run(&mut self, args: &[String]) -> Result<i32>;
}

/// Receives notifications while the queue drains.
pub trait ProgressCallback {
    /// A (stack, stage) pair is about to start.
    fn on_announce(&mut self, command: &str, entry: &QueueEntry, labels: &[String]);

    /// An invocation is about to run.
    fn on_invocation_start(&mut self, entry: &QueueEntry);

    /// An invocation exited with zero.
    fn on_invocation_complete(&mut self, entry: &QueueEntry);

    /// An invocation exited non-zero; nothing else will run.
    fn on_invocation_failed(&mut self, entry: &QueueEntry, code: i32);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_announce(&mut self, _command: &str, _entry: &QueueEntry, _labels: &[String]) {}
    fn on_invocation_start(&mut self, _entry: &QueueEntry) {}
    fn on_invocation_complete(&mut self, _entry: &QueueEntry) {}
    fn on_invocation_failed(&mut self, _entry: &QueueEntry, _code: i32) {}
}

/// Progress callback that writes to the `log` facade.
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_announce(&mut self, command: &str, entry: &QueueEntry, labels: &[String]) {
        log::info!(
            "Running {command} on stack={} stage={} labels={labels:?}",
            entry.stack,
            entry.stage
        );
    }

    fn on_invocation_start(&mut self, entry: &QueueEntry) {
        log::info!("{}", entry.command_line());
    }

    fn on_invocation_complete(&mut self, entry: &QueueEntry) {
        log::debug!("{} finished", entry.command_line());
    }

    fn on_invocation_failed(&mut self, entry: &QueueEntry, code: i32) {
        log::error!("{} exited with code {code}", entry.command_line());
    }
}
