//! Terminal progress reporting for dmark runs.

use crate::ui;
use colored::Colorize;
use stackkit::{InvocationKind, ProgressCallback, QueueEntry};

/// Prints a section per (stack, stage) pair and each invocation line.
pub struct TerminalProgress;

impl ProgressCallback for TerminalProgress {
    fn on_announce(&mut self, command: &str, entry: &QueueEntry, labels: &[String]) {
        ui::section(&format!(
            "{} {} / {}",
            command,
            entry.stack.bold(),
            entry.stage.bold()
        ));
        if !labels.is_empty() {
            ui::kv("labels", &labels.join(", "));
        }
    }

    fn on_invocation_start(&mut self, entry: &QueueEntry) {
        ui::dim(&format!("$ {}", entry.command_line()));
    }

    fn on_invocation_complete(&mut self, entry: &QueueEntry) {
        if entry.kind == InvocationKind::Command {
            ui::success(&format!("{}/{}", entry.stack, entry.stage));
        }
    }

    fn on_invocation_failed(&mut self, entry: &QueueEntry, code: i32) {
        ui::error(&format!(
            "{} failed for {}/{} (exit code {code})",
            entry.kind,
            entry.stack,
            entry.stage
        ));
    }
}
