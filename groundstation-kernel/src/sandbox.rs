//! Remote command channel for the operator console.
//!
//! Free text from the dashboard is screened and run through `sh -c` in a
//! persistent working directory (the cursor). `cd` never reaches a shell: it
//! is resolved here as path arithmetic so the cursor survives between calls.
//!
//! SECURITY: screening is a substring denylist. It is trivially bypassed
//! (quoting, spacing, equivalent commands) and it lets anything through that
//! also mentions `reboot`. Treat this channel as a shell for whoever can reach
//! the HTTP port.

use crate::error::StationError;
use crate::health::HealthTracker;
use crate::state::{new_state, Shared};
use async_trait::async_trait;
use groundstation_host::{CommandExecutor, ExecutionResult};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const MAX_COMMAND_LEN: usize = 200;
pub const COMMAND_TIMEOUT_SECS: u64 = 15;

/// Case-insensitive substrings that block a command
pub const DENYLIST: &[&str] = &[
    "rm -rf", "mkfs", "dd if=", ":(){", "sudo rm", "shutdown", "halt", "mklabel",
];

/// A blocked command mentioning this is let through anyway
pub const DENYLIST_OVERRIDE: &str = "reboot";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screening {
    Allowed,
    Blocked(&'static str),
}

pub fn screen(cmd: &str) -> Screening {
    let lowered = cmd.to_lowercase();
    match DENYLIST.iter().find(|pattern| lowered.contains(*pattern)) {
        Some(_) if lowered.contains(DENYLIST_OVERRIDE) => Screening::Allowed,
        Some(pattern) => Screening::Blocked(pattern),
        None => Screening::Allowed,
    }
}

/// `Some(target)` when the line is a `cd`, with `None` for a bare `cd`.
fn parse_cd(line: &str) -> Option<Option<&str>> {
    let mut parts = line.splitn(2, char::is_whitespace);
    if parts.next()? != "cd" {
        return None;
    }
    Some(parts.next().map(str::trim).filter(|t| !t.is_empty()))
}

/// Resolve a `cd` target against the cursor without touching the filesystem.
pub fn resolve_cd(cursor: &Path, target: Option<&str>, home: &Path) -> Result<PathBuf, StationError> {
    let Some(target) = target else {
        return Ok(home.to_path_buf());
    };
    if target.contains('\0') {
        return Err(StationError::PathResolution(format!("invalid path {:?}", target)));
    }

    let target = Path::new(target);
    if target.is_absolute() {
        Ok(target.to_path_buf())
    } else {
        Ok(normalize(&cursor.join(target)))
    }
}

/// Lexical normalisation: drops `.`, folds `..`, never climbs above the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Reply to one console line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult {
    pub output: String,
    pub error: bool,
    pub cwd: String,
}

/// Executes screened command lines
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, cwd: &Path, timeout: Duration) -> ExecutionResult;
}

/// `sh -c` through the host executor
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, cwd: &Path, timeout: Duration) -> ExecutionResult {
        CommandExecutor::execute_shell_command(command, cwd, timeout).await
    }
}

pub struct CommandSandbox {
    cursor: Shared<PathBuf>,
    home: PathBuf,
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    max_len: usize,
    health: HealthTracker,
}

impl CommandSandbox {
    pub fn new(
        home: PathBuf,
        runner: Arc<dyn CommandRunner>,
        timeout: Duration,
        max_len: usize,
        health: HealthTracker,
    ) -> Self {
        Self {
            cursor: new_state(home.clone()),
            home,
            runner,
            timeout,
            max_len,
            health,
        }
    }

    pub fn cursor(&self) -> PathBuf {
        self.cursor.lock().clone()
    }

    pub async fn run(&self, cmd: &str) -> CommandResult {
        let line = cmd.trim();
        if line.is_empty() {
            return self.reply(String::new(), false);
        }

        if cmd.chars().count() > self.max_len {
            return self.refuse(StationError::CommandTooLong);
        }

        if let Some(target) = parse_cd(line) {
            return self.change_directory(target);
        }

        if let Screening::Blocked(pattern) = screen(cmd) {
            warn!("blocked command matching {:?}: {}", pattern, line);
            self.health.command_blocked();
            return self.refuse(StationError::CommandBlocked);
        }

        let cwd = self.cursor();
        info!("running in {}: {}", cwd.display(), line);
        self.health.command_executed();

        let execution = self.runner.run(cmd, &cwd, self.timeout).await;
        if execution.success {
            self.reply(execution.output, false)
        } else if execution.timed_out {
            self.refuse(StationError::CommandTimeout(self.timeout.as_secs()))
        } else {
            self.refuse(StationError::CommandFailed(execution.transcript()))
        }
    }

    fn change_directory(&self, target: Option<&str>) -> CommandResult {
        let mut cursor = self.cursor.lock();
        match resolve_cd(&cursor, target, &self.home) {
            Ok(dir) => {
                *cursor = dir;
                drop(cursor);
                self.reply(String::new(), false)
            }
            Err(e) => {
                drop(cursor);
                self.refuse(e)
            }
        }
    }

    fn refuse(&self, err: StationError) -> CommandResult {
        self.reply(err.to_string(), true)
    }

    fn reply(&self, output: String, error: bool) -> CommandResult {
        CommandResult {
            output,
            error,
            cwd: self.cursor().display().to_string(),
        }
    }
}
