//! Queue execution.
//!
//! Entries run strictly one after another. The first invocation that exits
//! non-zero stops the run: its post hooks and every later entry are skipped.

use crate::context::{CommandRunner, ProgressCallback, RunOptions};
use crate::error::{Error, Result};
use crate::local_state::{clear_cached_state, delete_lock_file};
use crate::model::Config;
use crate::queue::{Hook, QueueEntry, build_queue};

/// What a successful run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecuteSummary {
    /// Invocations that exited with zero
    pub invocations: usize,
    /// Distinct (stack, stage) pairs announced
    pub pairs: usize,
}

/// Build the queue for `command` and drain it.
pub fn execute_command(
    command: &str,
    config: &Config,
    opts: &RunOptions,
    runner: &mut dyn CommandRunner,
    progress: &mut dyn ProgressCallback,
) -> Result<ExecuteSummary> {
    let queue = build_queue(command, config, opts)?;
    execute_queue(&queue, runner, progress)
}

/// Run every entry in order: pre hooks, the invocation, then post hooks.
pub fn execute_queue(
    queue: &[QueueEntry],
    runner: &mut dyn CommandRunner,
    progress: &mut dyn ProgressCallback,
) -> Result<ExecuteSummary> {
    let mut summary = ExecuteSummary::default();

    for entry in queue {
        for hook in &entry.pre {
            if matches!(hook, Hook::Announce { .. }) {
                summary.pairs += 1;
            }
            run_hook(hook, entry, progress)?;
        }

        progress.on_invocation_start(entry);
        let code = runner.run(&entry.args)?;

        if code != 0 {
            progress.on_invocation_failed(entry, code);
            return Err(Error::CommandFailed {
                command: entry.command_line(),
                code,
            });
        }

        for hook in &entry.post {
            run_hook(hook, entry, progress)?;
        }

        progress.on_invocation_complete(entry);
        summary.invocations += 1;
    }

    Ok(summary)
}

fn run_hook(hook: &Hook, entry: &QueueEntry, progress: &mut dyn ProgressCallback) -> Result<()> {
    log::trace!("{}/{}: {hook}", entry.stack, entry.stage);

    match hook {
        Hook::Announce { command, labels } => {
            progress.on_announce(command, entry, labels);
            Ok(())
        }
        Hook::LoadLocalState(files) => files.load(),
        Hook::ClearCachedState(path) => clear_cached_state(path),
        Hook::DeleteLockFile(folder) => {
            delete_lock_file(folder);
            Ok(())
        }
        Hook::SaveLocalState(files) => files.save(),
    }
}
