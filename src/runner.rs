use regex::Regex;
use stackkit::{CommandRunner, Error};
use std::process::{Command, Stdio};
use std::sync::LazyLock;

/// `[export ]NAME=value`, value optionally single or double quoted.
/// Names may contain `-`, as Terraform variable names can.
static ENV_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:export\s+)?([A-Za-z_][\w-]*)=(?:'(.*)'|"(.*)"|(.*))$"#)
        .expect("Invalid env assignment regex")
});

/// Runs invocations as child processes with inherited stdio.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, args: &[String]) -> stackkit::Result<i32> {
        let invocation = Invocation::parse(args);
        let Some((program, program_args)) = invocation.argv.split_first() else {
            log::warn!("Empty invocation skipped");
            return Ok(0);
        };

        log::debug!(
            "Spawning {program} {} with {} env var(s)",
            program_args.join(" "),
            invocation.env.len()
        );

        let status = Command::new(program)
            .args(program_args)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| Error::Spawn {
                program: program.clone(),
                source,
            })?;

        // terminated by a signal
        Ok(status.code().unwrap_or(1))
    }
}

/// An argv split into environment assignments and the command itself.
#[derive(Debug, PartialEq, Eq)]
struct Invocation {
    env: Vec<(String, String)>,
    argv: Vec<String>,
}

impl Invocation {
    fn parse(args: &[String]) -> Self {
        let mut env = Vec::new();
        let mut rest = args.iter();
        let mut argv = Vec::with_capacity(args.len());

        for arg in rest.by_ref() {
            match parse_env_assignment(arg) {
                Some(pair) => env.push(pair),
                None => {
                    argv.push(arg.clone());
                    break;
                }
            }
        }
        argv.extend(rest.map(|arg| unquote_backend_config(arg)));

        Self { env, argv }
    }
}

fn parse_env_assignment(arg: &str) -> Option<(String, String)> {
    let caps = ENV_ASSIGNMENT.captures(arg)?;
    let name = caps.get(1)?.as_str().to_string();
    let value = caps
        .get(2)
        .or_else(|| caps.get(3))
        .or_else(|| caps.get(4))
        .map_or("", |m| m.as_str())
        .to_string();
    Some((name, value))
}

/// `-backend-config="k=v"` becomes `-backend-config=k=v`; every other
/// argument is passed through untouched.
fn unquote_backend_config(arg: &str) -> String {
    arg.strip_prefix("-backend-config=\"")
        .and_then(|value| value.strip_suffix('"'))
        .map_or_else(|| arg.to_string(), |value| format!("-backend-config={value}"))
}
