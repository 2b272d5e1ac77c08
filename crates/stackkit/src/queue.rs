//! Command queue construction.
//!
//! For every ordered stack that passes the label filter and every requested
//! stage it does not ignore, up to three invocations are queued in order:
//! `init`, `fmt`, then the main command. Side effects around them are
//! recorded as [`Hook`] values; building a queue never touches the disk
//! beyond checking that stack folders exist.

use crate::context::RunOptions;
use crate::error::Result;
use crate::local_state::{LocalStateFiles, cached_state_path};
use crate::model::Config;
use crate::order::order_stacks;
use crate::resolve::{LocalMode, StageParams, ignore_stage, stack_labels};
use std::fmt;
use std::path::PathBuf;

/// Which invocation of a (stack, stage) pair an entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationKind {
    Init,
    Fmt,
    Command,
}

impl fmt::Display for InvocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Fmt => write!(f, "fmt"),
            Self::Command => write!(f, "command"),
        }
    }
}

/// A side effect run before or after an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hook {
    /// Report the (stack, stage) pair that is starting
    Announce { command: String, labels: Vec<String> },
    /// Swap the stage's state backup in
    LoadLocalState(LocalStateFiles),
    /// Drop `.terraform/terraform.tfstate` so `init` reconfigures the backend
    ClearCachedState(PathBuf),
    /// Remove `.terraform.lock.hcl` from the stack folder
    DeleteLockFile(PathBuf),
    /// Move the live state out to the stage's backup
    SaveLocalState(LocalStateFiles),
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Announce { command, .. } => write!(f, "announce {command}"),
            Self::LoadLocalState(files) => write!(
                f,
                "restore {} -> {}",
                files.backup.display(),
                files.live.display()
            ),
            Self::ClearCachedState(path) => write!(f, "remove {}", path.display()),
            Self::DeleteLockFile(folder) => write!(f, "remove lock file in {}", folder.display()),
            Self::SaveLocalState(files) => write!(
                f,
                "save {} -> {}",
                files.live.display(),
                files.backup.display()
            ),
        }
    }
}

/// One queued invocation with its hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub stack: String,
    pub stage: String,
    pub kind: InvocationKind,
    /// Env prefixes, then the runner binary and its arguments
    pub args: Vec<String>,
    pub pre: Vec<Hook>,
    pub post: Vec<Hook>,
}

impl QueueEntry {
    /// The invocation as a single printable line.
    pub fn command_line(&self) -> String {
        self.args.join(" ")
    }
}

/// Build the ordered queue of invocations for `command`.
pub fn build_queue(command: &str, config: &Config, opts: &RunOptions) -> Result<Vec<QueueEntry>> {
    let mut queue = Vec::new();

    for stack_name in order_stacks(config, &opts.stacks) {
        let labels = stack_labels(config, &stack_name);
        if let Some(missing) = opts.labels.iter().find(|label| !labels.contains(label)) {
            log::debug!("Stack \"{stack_name}\" skipped, missing label \"{missing}\"");
            continue;
        }

        for stage_name in &opts.stages {
            if ignore_stage(config, &stack_name, stage_name) {
                log::info!("Stage \"{stage_name}\" ignored for the \"{stack_name}\" stack...");
                continue;
            }

            let params = StageParams::resolve(config, &stack_name, stage_name)?;
            let pair = PairBuilder {
                command,
                config,
                opts,
                stack: &stack_name,
                stage: stage_name,
                params: &params,
            };
            pair.push_entries(&mut queue);
        }
    }

    log::debug!("Queued {} invocation(s) for {command}", queue.len());
    Ok(queue)
}

struct PairBuilder<'a> {
    command: &'a str,
    config: &'a Config,
    opts: &'a RunOptions,
    stack: &'a str,
    stage: &'a str,
    params: &'a StageParams,
}

impl PairBuilder<'_> {
    fn push_entries(&self, queue: &mut Vec<QueueEntry>) {
        let state_files = match &self.params.local {
            LocalMode::Local { path } => Some(LocalStateFiles::new(
                self.config,
                &self.params.folder,
                path.as_deref(),
                self.stack,
                self.stage,
            )),
            LocalMode::Remote => None,
        };

        let mut entries = Vec::with_capacity(3);

        if !self.opts.no_init {
            entries.push(self.init_entry(state_files.as_ref()));
        }

        if self.opts.fmt || self.command == "fmt" {
            let mut args = self.base_args("fmt");
            if self.command == "fmt" {
                args.extend(self.opts.rest.iter().cloned());
            }
            entries.push(self.entry(InvocationKind::Fmt, args, Vec::new(), Vec::new()));
        }

        if self.command != "init" && self.command != "fmt" {
            let mut args = self.base_args(self.command);
            if self.opts.auto_approve && self.command != "plan" {
                args.push("-auto-approve".to_string());
            }
            args.extend(self.opts.rest.iter().cloned());

            let post = state_files
                .iter()
                .cloned()
                .map(Hook::SaveLocalState)
                .collect();
            entries.push(self.entry(InvocationKind::Command, args, Vec::new(), post));
        }

        // without init, the first invocation still announces the pair and
        // restores its local state
        if self.opts.no_init
            && let Some(first) = entries.first_mut()
        {
            first.pre.push(self.announce());
            if let Some(files) = &state_files {
                first.pre.push(Hook::LoadLocalState(files.clone()));
            }
        }

        queue.extend(entries);
    }

    fn init_entry(&self, state_files: Option<&LocalStateFiles>) -> QueueEntry {
        let mut args = self.base_args("init");

        if state_files.is_none() {
            args.extend(self.params.backend_config.iter().cloned());
        }
        if self.opts.init_migrate_state {
            args.push("-migrate-state".to_string());
        }
        if self.opts.init_upgrade {
            args.push("-upgrade".to_string());
        }
        if self.command == "init" {
            args.extend(self.opts.rest.iter().cloned());
        }

        let mut pre = vec![self.announce()];
        match state_files {
            Some(files) => pre.push(Hook::LoadLocalState(files.clone())),
            None => pre.push(Hook::ClearCachedState(cached_state_path(&self.params.folder))),
        }
        if self.opts.delete_lock {
            pre.push(Hook::DeleteLockFile(self.params.folder.clone()));
        }

        self.entry(InvocationKind::Init, args, pre, Vec::new())
    }

    fn announce(&self) -> Hook {
        Hook::Announce {
            command: self.command.to_string(),
            labels: self.opts.labels.clone(),
        }
    }

    /// `[vars..., <runner>, -chdir=<folder>, <subcommand>]`
    fn base_args(&self, subcommand: &str) -> Vec<String> {
        let mut args = self.params.vars.clone();
        args.push(self.opts.runner.clone());
        args.push(format!("-chdir={}", self.params.folder.display()));
        args.push(subcommand.to_string());
        args
    }

    fn entry(
        &self,
        kind: InvocationKind,
        args: Vec<String>,
        pre: Vec<Hook>,
        post: Vec<Hook>,
    ) -> QueueEntry {
        QueueEntry {
            stack: self.stack.to_string(),
            stage: self.stage.to_string(),
            kind,
            args,
            pre,
            post,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    struct Fixture {
        dir: TempDir,
        config: Config,
    }

    impl Fixture {
        fn new(yaml: &str, folders: &[&str]) -> Self {
            let dir = TempDir::new().unwrap();
            for folder in folders {
                fs::create_dir_all(dir.path().join(folder)).unwrap();
            }
            let config = Config::from_yaml_str(yaml, dir.path()).unwrap();
            Self { dir, config }
        }

        fn chdir(&self, folder: &str) -> String {
            format!("-chdir={}", self.dir.path().join(folder).display())
        }
    }

    const REMOTE: &str = r"
globals:
  stages:
    dev:
      backendConfig:
        bucket: x
        key: y
stacks:
  app:
    path: app
";

    fn opts(stacks: &[&str], stages: &[&str]) -> RunOptions {
        RunOptions {
            stacks: names(stacks),
            stages: names(stages),
            ..Default::default()
        }
    }

    #[test]
    fn test_remote_apply_queues_init_then_command() {
        let fx = Fixture::new(REMOTE, &["app"]);
        let queue = build_queue("apply", &fx.config, &opts(&["app"], &["dev"])).unwrap();

        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].kind, InvocationKind::Init);
        assert_eq!(
            queue[0].args,
            vec![
                "terraform".to_string(),
                fx.chdir("app"),
                "init".to_string(),
                "-backend-config=\"bucket=x\"".to_string(),
                "-backend-config=\"key=y\"".to_string(),
            ]
        );
        assert_eq!(
            queue[0].pre,
            vec![
                Hook::Announce {
                    command: "apply".to_string(),
                    labels: Vec::new()
                },
                Hook::ClearCachedState(cached_state_path(&fx.dir.path().join("app"))),
            ]
        );

        assert_eq!(queue[1].kind, InvocationKind::Command);
        assert_eq!(
            queue[1].args,
            vec!["terraform".to_string(), fx.chdir("app"), "apply".to_string()]
        );
        assert!(queue[1].post.is_empty());
    }

    #[test]
    fn test_local_mode_omits_backend_config() {
        let yaml = format!("{REMOTE}    local: true\n");
        let fx = Fixture::new(&yaml, &["app"]);
        let queue = build_queue("apply", &fx.config, &opts(&["app"], &["dev"])).unwrap();

        assert!(!queue[0].args.iter().any(|a| a.starts_with("-backend-config")));
        assert!(matches!(queue[0].pre[1], Hook::LoadLocalState(_)));
        assert!(matches!(queue[1].post[..], [Hook::SaveLocalState(_)]));
    }

    #[test]
    fn test_vars_prefix_every_invocation() {
        let yaml = r"
globals:
  stages:
    dev:
      vars:
        region: eu-west-1
stacks:
  app:
    path: app
";
        let fx = Fixture::new(yaml, &["app"]);
        let mut options = opts(&["app"], &["dev"]);
        options.fmt = true;

        let queue = build_queue("plan", &fx.config, &options).unwrap();
        assert_eq!(queue.len(), 3);
        for entry in &queue {
            assert_eq!(entry.args[0], "export TF_VAR_region=eu-west-1");
            assert_eq!(entry.args[1], "terraform");
        }
        assert_eq!(queue[1].kind, InvocationKind::Fmt);
        assert_eq!(queue[1].args[3], "fmt");
    }

    #[test]
    fn test_auto_approve_never_applies_to_plan() {
        let fx = Fixture::new(REMOTE, &["app"]);
        let mut options = opts(&["app"], &["dev"]);
        options.auto_approve = true;

        let plan = build_queue("plan", &fx.config, &options).unwrap();
        assert!(!plan[1].args.contains(&"-auto-approve".to_string()));

        let apply = build_queue("apply", &fx.config, &options).unwrap();
        assert_eq!(apply[1].args.last().map(String::as_str), Some("-auto-approve"));
    }

    #[test]
    fn test_init_flags_and_lock_deletion() {
        let fx = Fixture::new(REMOTE, &["app"]);
        let mut options = opts(&["app"], &["dev"]);
        options.init_migrate_state = true;
        options.init_upgrade = true;
        options.delete_lock = true;

        let queue = build_queue("init", &fx.config, &options).unwrap();
        assert_eq!(queue.len(), 1);

        let args = &queue[0].args;
        assert_eq!(&args[args.len() - 2..], ["-migrate-state", "-upgrade"]);
        assert_eq!(
            queue[0].pre.last(),
            Some(&Hook::DeleteLockFile(fx.dir.path().join("app")))
        );
    }

    #[test]
    fn test_rest_goes_to_matching_invocation() {
        let fx = Fixture::new(REMOTE, &["app"]);
        let mut options = opts(&["app"], &["dev"]);
        options.rest = names(&["-target=module.db"]);

        let apply = build_queue("apply", &fx.config, &options).unwrap();
        assert!(!apply[0].args.contains(&"-target=module.db".to_string()));
        assert_eq!(apply[1].args.last().map(String::as_str), Some("-target=module.db"));

        let init = build_queue("init", &fx.config, &options).unwrap();
        assert_eq!(init[0].args.last().map(String::as_str), Some("-target=module.db"));
    }

    #[test]
    fn test_fmt_command_runs_fmt_without_fmt_flag() {
        let fx = Fixture::new(REMOTE, &["app"]);
        let mut options = opts(&["app"], &["dev"]);
        options.rest = names(&["-recursive"]);
        assert!(!options.fmt);

        let queue = build_queue("fmt", &fx.config, &options).unwrap();

        let kinds: Vec<_> = queue.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![InvocationKind::Init, InvocationKind::Fmt]);
        assert!(!queue[0].args.contains(&"-recursive".to_string()));
        assert_eq!(
            queue[1].args[2..],
            ["fmt".to_string(), "-recursive".to_string()]
        );
    }

    #[test]
    fn test_fmt_flag_keeps_rest_on_main_command() {
        let fx = Fixture::new(REMOTE, &["app"]);
        let mut options = opts(&["app"], &["dev"]);
        options.fmt = true;
        options.rest = names(&["-lock=false"]);

        let queue = build_queue("plan", &fx.config, &options).unwrap();
        assert_eq!(queue[1].kind, InvocationKind::Fmt);
        assert_eq!(queue[1].args.last().map(String::as_str), Some("fmt"));
        assert_eq!(queue[2].args.last().map(String::as_str), Some("-lock=false"));
    }

    #[test]
    fn test_hyphenated_var_names_are_kept_verbatim() {
        let yaml = r"
globals:
  stages:
    dev:
      vars:
        my-var: x
stacks:
  app:
    path: app
";
        let fx = Fixture::new(yaml, &["app"]);
        let queue = build_queue("plan", &fx.config, &opts(&["app"], &["dev"])).unwrap();

        for entry in &queue {
            assert_eq!(entry.args[0], "export TF_VAR_my-var=x");
        }
    }

    #[test]
    fn test_folder_with_quote_is_passed_as_is() {
        let fx = Fixture::new("stacks:\n  app:\n    path: \"bob's app\"\n", &["bob's app"]);
        let queue = build_queue("plan", &fx.config, &opts(&["app"], &["dev"])).unwrap();
        assert_eq!(queue[0].args[1], fx.chdir("bob's app"));
    }

    #[test]
    fn test_no_init_moves_pair_hooks_to_first_invocation() {
        let yaml = format!("{REMOTE}    local: true\n");
        let fx = Fixture::new(&yaml, &["app"]);
        let mut options = opts(&["app"], &["dev"]);
        options.no_init = true;

        let queue = build_queue("apply", &fx.config, &options).unwrap();
        assert_eq!(queue.len(), 1);
        assert!(matches!(queue[0].pre[0], Hook::Announce { .. }));
        assert!(matches!(queue[0].pre[1], Hook::LoadLocalState(_)));
        assert!(matches!(queue[0].post[..], [Hook::SaveLocalState(_)]));
    }

    #[test]
    fn test_ignored_stage_is_skipped() {
        let yaml = r"
globals:
  stages:
    dev: {}
    prod: {}
stacks:
  app:
    path: app
    ignoreStages: [prod]
";
        let fx = Fixture::new(yaml, &["app"]);
        let queue = build_queue("plan", &fx.config, &opts(&["app"], &["dev", "prod"])).unwrap();

        assert_eq!(queue.len(), 2);
        assert!(queue.iter().all(|e| e.stage == "dev"));
    }

    #[test]
    fn test_label_filter_requires_every_label() {
        let yaml = r"
globals:
  labels: [infra]
  stages:
    dev: {}
stacks:
  web:
    path: web
    labels: [frontend]
  db:
    path: db
    labels: [data]
";
        let fx = Fixture::new(yaml, &["web", "db"]);
        let mut options = opts(&["web", "db"], &["dev"]);

        options.labels = names(&["infra", "data"]);
        let queue = build_queue("plan", &fx.config, &options).unwrap();
        assert!(queue.iter().all(|e| e.stack == "db"));
        assert_eq!(queue.len(), 2);

        options.labels = names(&["infra"]);
        let queue = build_queue("plan", &fx.config, &options).unwrap();
        assert_eq!(queue.len(), 4);

        options.labels = names(&["missing"]);
        assert!(build_queue("plan", &fx.config, &options).unwrap().is_empty());
    }

    #[test]
    fn test_stacks_follow_order_then_stages() {
        let yaml = r"
globals:
  stages:
    dev: {}
    qa: {}
stacks:
  compute:
    path: compute
  network:
    path: network
    order: 1
";
        let fx = Fixture::new(yaml, &["compute", "network"]);
        let mut options = opts(&["compute", "network"], &["dev", "qa"]);
        options.no_init = true;

        let queue = build_queue("apply", &fx.config, &options).unwrap();
        let pairs: Vec<_> = queue
            .iter()
            .map(|e| format!("{}/{}", e.stack, e.stage))
            .collect();
        assert_eq!(
            pairs,
            vec!["network/dev", "network/qa", "compute/dev", "compute/qa"]
        );
    }

    #[test]
    fn test_missing_stack_folder_fails_before_any_queueing() {
        let fx = Fixture::new(REMOTE, &[]);
        let err = build_queue("plan", &fx.config, &opts(&["app"], &["dev"])).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidStackPath { .. }));
    }

    #[test]
    fn test_custom_runner_binary() {
        let fx = Fixture::new(REMOTE, &["app"]);
        let mut options = opts(&["app"], &["dev"]);
        options.runner = "tofu".to_string();

        let queue = build_queue("plan", &fx.config, &options).unwrap();
        assert!(queue.iter().all(|e| e.args[0] == "tofu"));
    }
}
