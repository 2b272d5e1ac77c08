use clap::Parser;
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dmark")]
#[command(version)]
#[command(about = "Run Terraform across multiple stacks and stages", long_about = None)]
#[command(after_help = "Examples:
  dmark plan --stage dev
  dmark apply --stack network --stack compute --stage prod --auto-approve
  dmark destroy --stage dev -l ephemeral -- -target=module.db")]
pub struct Cli {
    /// Infrastructure tool command to run (init, plan, apply, destroy, fmt, ...)
    #[arg(required_unless_present = "completions")]
    pub command: Option<String>,

    /// Extra arguments passed to the matching invocation
    #[arg(last = true)]
    pub rest: Vec<String>,

    /// Config file [default: ./dmark.config.yaml]
    #[arg(short, long, env = "DMARK_CONFIG")]
    pub config: Option<String>,

    /// Stack to run (repeatable, defaults to all stacks)
    #[arg(long = "stack", value_name = "NAME")]
    pub stacks: Vec<String>,

    /// Stage to run (repeatable)
    #[arg(long = "stage", value_name = "NAME")]
    pub stages: Vec<String>,

    /// Only run stacks carrying this label (repeatable, all must match)
    #[arg(short = 'l', long = "label", value_name = "LABEL")]
    pub labels: Vec<String>,

    /// Run `fmt` before the command
    #[arg(long)]
    pub fmt: bool,

    /// Pass `-upgrade` to `init`
    #[arg(short, long)]
    pub upgrade: bool,

    /// Pass `-migrate-state` to `init`
    #[arg(long)]
    pub migrate_state: bool,

    /// Pass `-auto-approve` to the command (ignored for plan)
    #[arg(long)]
    pub auto_approve: bool,

    /// Skip the implicit `init`
    #[arg(long)]
    pub no_init: bool,

    /// Remove `.terraform.lock.hcl` before `init`
    #[arg(long)]
    pub delete_lock: bool,

    /// Print the invocation queue without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Infrastructure tool binary
    #[arg(long, env = "DMARK_RUNNER", default_value = stackkit::DEFAULT_RUNNER)]
    pub runner: String,

    /// Print shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<Shell>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Config path from `--config` or `DMARK_CONFIG`, with `~` and `$VAR` expanded.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.as_deref().map(crate::paths::expand)
    }
}
