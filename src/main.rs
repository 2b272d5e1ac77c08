mod cli;
mod commands;
mod paths;
mod progress;
mod runner;
mod ui;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match dispatch(&ctx, &cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = exit_code(&err);
            // failed invocations were already reported by the progress callback
            if !matches!(
                err.downcast_ref::<stackkit::Error>(),
                Some(stackkit::Error::CommandFailed { .. })
            ) {
                ui::error(&err.to_string());
            }
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn dispatch(ctx: &Context, cli: &Cli) -> Result<()> {
    if let Some(shell) = cli.completions {
        commands::completions::run(shell);
        return Ok(());
    }

    log::trace!("verbosity={} quiet={}", ctx.verbose, ctx.quiet);

    match cli.command.as_deref() {
        Some(command) => commands::run::run(ctx, cli, command),
        None => anyhow::bail!("No command given"),
    }
}

/// Exit code for a failed run: the child's code when an invocation failed, 1 otherwise.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<stackkit::Error>()
        .map_or(1, stackkit::Error::exit_code)
}
