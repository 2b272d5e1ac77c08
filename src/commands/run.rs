//! Run an infrastructure tool command across the selected stacks and stages.

use crate::Context;
use crate::cli::Cli;
use crate::progress::TerminalProgress;
use crate::runner::SystemRunner;
use crate::ui;
use anyhow::Result;
use stackkit::{
    Config, LogProgress, ProgressCallback, QueueEntry, RunOptions, build_queue, execute_queue,
    get_config, get_labels, get_stacks, get_stages,
};

pub fn run(ctx: &Context, cli: &Cli, command: &str) -> Result<()> {
    let command = command.to_lowercase();
    let config = get_config(cli.config_path().as_deref())?;
    let opts = resolve_options(&config, cli)?;

    log::debug!(
        "stacks={:?} stages={:?} labels={:?} runner={}",
        opts.stacks,
        opts.stages,
        opts.labels,
        opts.runner
    );

    let queue = build_queue(&command, &config, &opts)?;

    if cli.dry_run {
        print_queue(&queue);
        return Ok(());
    }

    if queue.is_empty() {
        ui::warn("Nothing to run for the selected stacks, stages and labels");
        return Ok(());
    }

    let mut progress: Box<dyn ProgressCallback> = if ctx.quiet {
        Box::new(LogProgress)
    } else {
        Box::new(TerminalProgress)
    };

    let summary = execute_queue(&queue, &mut SystemRunner, progress.as_mut())?;
    log::info!(
        "{} invocation(s) across {} stack/stage pair(s)",
        summary.invocations,
        summary.pairs
    );

    Ok(())
}

/// Validate the CLI selection against the config.
pub fn resolve_options(config: &Config, cli: &Cli) -> Result<RunOptions> {
    Ok(RunOptions {
        stacks: get_stacks(config, &cli.stacks)?,
        stages: get_stages(config, &cli.stages)?,
        labels: get_labels(&cli.labels),
        fmt: cli.fmt,
        init_upgrade: cli.upgrade,
        init_migrate_state: cli.migrate_state,
        auto_approve: cli.auto_approve,
        no_init: cli.no_init,
        delete_lock: cli.delete_lock,
        rest: cli.rest.clone(),
        runner: cli.runner.clone(),
    })
}

fn print_queue(queue: &[QueueEntry]) {
    ui::header(&format!("Dry run: {} invocation(s)", queue.len()));

    for (i, entry) in queue.iter().enumerate() {
        ui::step(
            i + 1,
            queue.len(),
            &format!("{}/{} {}", entry.stack, entry.stage, entry.kind),
        );
        for hook in &entry.pre {
            ui::dim(&format!("before: {hook}"));
        }
        ui::dim(&format!("$ {}", entry.command_line()));
        for hook in &entry.post {
            ui::dim(&format!("after: {hook}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    const CONFIG: &str = r"
globals:
  labels: [infra]
  stages:
    dev: {}
    prod: {}
stacks:
  network:
    path: network
    order: 1
  compute:
    path: compute
    labels: [app]
";

    fn setup() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("network")).unwrap();
        fs::create_dir(dir.path().join("compute")).unwrap();
        let config = Config::from_yaml_str(CONFIG, dir.path()).unwrap();
        (dir, config)
    }

    #[test]
    fn test_resolve_options_defaults_to_all_stacks() {
        let (_dir, config) = setup();
        let cli = Cli::try_parse_from(["dmark", "plan", "--stage", "dev"]).unwrap();

        let opts = resolve_options(&config, &cli).unwrap();
        assert_eq!(opts.stacks, vec!["compute", "network"]);
        assert_eq!(opts.stages, vec!["dev"]);
        assert!(opts.labels.is_empty());
    }

    #[test]
    fn test_resolve_options_rejects_unknown_names() {
        let (_dir, config) = setup();

        let cli = Cli::try_parse_from(["dmark", "plan", "--stack", "ghost"]).unwrap();
        let err = resolve_options(&config, &cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<stackkit::Error>(),
            Some(stackkit::Error::InvalidStackName { .. })
        ));

        let cli = Cli::try_parse_from(["dmark", "plan", "--stage", "qa"]).unwrap();
        let err = resolve_options(&config, &cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<stackkit::Error>(),
            Some(stackkit::Error::InvalidStageName { .. })
        ));
    }

    #[test]
    fn test_resolve_options_maps_flags() {
        let (_dir, config) = setup();
        let cli = Cli::try_parse_from([
            "dmark",
            "apply",
            "--stage",
            "prod",
            "-l",
            "app",
            "-l",
            "app",
            "--fmt",
            "--migrate-state",
            "--delete-lock",
            "--runner",
            "tofu",
            "--",
            "-refresh=false",
        ])
        .unwrap();

        let opts = resolve_options(&config, &cli).unwrap();
        assert_eq!(opts.labels, vec!["app"]);
        assert!(opts.fmt);
        assert!(opts.init_migrate_state);
        assert!(opts.delete_lock);
        assert!(!opts.init_upgrade);
        assert_eq!(opts.runner, "tofu");
        assert_eq!(opts.rest, vec!["-refresh=false"]);

        let queue = build_queue("apply", &config, &opts).unwrap();
        assert!(queue.iter().all(|e| e.stack == "compute"));
    }
}
