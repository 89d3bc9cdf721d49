//! External process gateway
//!
//! Runs the platform CLI. Blocking calls are awaited to completion and their
//! exit code is always reported back; deciding whether a non-zero exit is
//! fatal is left to the caller. The relay is spawned detached with its output
//! redirected to a log file, which is tailed as a line stream.

use crate::error::{BootstrapError, Result};
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

/// How a blocking invocation treats stdio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvocationMode {
    /// stdout/stderr piped and captured
    #[default]
    Captured,
    /// stdio inherited from the operator's terminal
    Interactive,
}

/// A command to run: program name plus arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub mode: InvocationMode,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            mode: InvocationMode::Captured,
        }
    }

    pub fn interactive(mut self) -> Self {
        self.mode = InvocationMode::Interactive;
        self
    }

    /// Program followed by its arguments
    pub fn command(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    pub fn command_line(&self) -> String {
        self.command().join(" ")
    }
}

/// Result of a blocking invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub command: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn a non-zero exit into a `ProcessFailure`
    pub fn into_success(self) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }

        let stderr = if self.stderr.trim().is_empty() {
            self.stdout.trim().to_string()
        } else {
            self.stderr.trim().to_string()
        };

        Err(BootstrapError::ProcessFailure {
            command: self.command.join(" "),
            exit_code: self.exit_code,
            stderr,
        })
    }
}

/// A relay process left running in the background
pub struct DetachedProcess {
    pub pid: Option<u32>,
    /// Where the relay's output lands
    pub log_path: Option<PathBuf>,
    /// Live stream of the relay's output lines
    pub lines: BoxStream<'static, io::Result<String>>,
}

impl std::fmt::Debug for DetachedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetachedProcess")
            .field("pid", &self.pid)
            .field("log_path", &self.log_path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait ProcessGateway: Send + Sync {
    /// Resolve `program` to an installed executable
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Run to completion. Any exit code is returned as `Ok`.
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput>;

    /// Start a long-running process without waiting for it
    async fn spawn_detached(
        &self,
        invocation: &Invocation,
        log_path: &Path,
    ) -> Result<DetachedProcess>;
}

/// Gateway backed by real OS processes
#[derive(Debug, Clone)]
pub struct SystemGateway {
    poll_interval: Duration,
}

impl SystemGateway {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
        }
    }

    /// How often the relay log is polled for new output
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl Default for SystemGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessGateway for SystemGateway {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);

        tracing::debug!("Running: {}", invocation.command_line());

        match invocation.mode {
            InvocationMode::Captured => {
                cmd.stdin(Stdio::null());
                cmd.stdout(Stdio::piped());
                cmd.stderr(Stdio::piped());

                let output = cmd
                    .output()
                    .await
                    .map_err(|e| spawn_error(invocation, e))?;

                Ok(ProcessOutput {
                    command: invocation.command(),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                    exit_code: output.status.code(),
                })
            }
            InvocationMode::Interactive => {
                cmd.stdin(Stdio::inherit());
                cmd.stdout(Stdio::inherit());
                cmd.stderr(Stdio::inherit());

                let status = cmd
                    .status()
                    .await
                    .map_err(|e| spawn_error(invocation, e))?;

                Ok(ProcessOutput {
                    command: invocation.command(),
                    stdout: String::new(),
                    stderr: String::new(),
                    exit_code: status.code(),
                })
            }
        }
    }

    async fn spawn_detached(
        &self,
        invocation: &Invocation,
        log_path: &Path,
    ) -> Result<DetachedProcess> {
        let start_failed =
            |e: io::Error| BootstrapError::StartFailed(format!("{}: {}", log_path.display(), e));

        if let Some(parent) = log_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(start_failed)?;
        }

        // Output goes to a file rather than a pipe so the relay keeps a
        // writable stdout after this process exits.
        let log = std::fs::File::create(log_path).map_err(start_failed)?;
        let log_err = log.try_clone().map_err(start_failed)?;

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::from(log));
        cmd.stderr(Stdio::from(log_err));
        #[cfg(unix)]
        cmd.process_group(0);

        tracing::debug!(
            log = %log_path.display(),
            "Spawning detached: {}",
            invocation.command_line()
        );

        let child = cmd.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => BootstrapError::EnvironmentMissing {
                program: invocation.program.clone(),
            },
            _ => BootstrapError::StartFailed(format!("{}: {}", invocation.command_line(), e)),
        })?;

        let pid = child.id();
        let reader = File::open(log_path).await.map_err(start_failed)?;

        Ok(DetachedProcess {
            pid,
            log_path: Some(log_path.to_path_buf()),
            lines: tail_lines(BufReader::new(reader), child, self.poll_interval),
        })
    }
}

fn spawn_error(invocation: &Invocation, e: io::Error) -> BootstrapError {
    match e.kind() {
        io::ErrorKind::NotFound => BootstrapError::EnvironmentMissing {
            program: invocation.program.clone(),
        },
        _ => BootstrapError::ProcessFailure {
            command: invocation.command_line(),
            exit_code: None,
            stderr: e.to_string(),
        },
    }
}

struct Tail {
    reader: BufReader<File>,
    child: Child,
    poll_interval: Duration,
    /// Bytes of a line whose newline has not arrived yet
    partial: Vec<u8>,
    exited: bool,
    done: bool,
}

/// Follow a log file line by line until the writing process exits
///
/// Dropping the stream stops reading but leaves the process running.
fn tail_lines(
    reader: BufReader<File>,
    child: Child,
    poll_interval: Duration,
) -> BoxStream<'static, io::Result<String>> {
    let tail = Tail {
        reader,
        child,
        poll_interval,
        partial: Vec::new(),
        exited: false,
        done: false,
    };

    Box::pin(stream::unfold(tail, |mut tail| async move {
        if tail.done {
            return None;
        }

        loop {
            // Raw bytes: relay output is not guaranteed UTF-8, and a poll can
            // land in the middle of a multibyte character.
            match tail.reader.read_until(b'\n', &mut tail.partial).await {
                Ok(0) => {}
                Ok(_) => {
                    if tail.partial.ends_with(b"\n") {
                        let line = take_line(&mut tail.partial);
                        return Some((Ok(line), tail));
                    }
                    continue;
                }
                Err(e) => {
                    tail.done = true;
                    return Some((Err(e), tail));
                }
            }

            // At EOF. Once the process has exited, do one final read pass
            // to pick up anything flushed on exit, then end the stream.
            if tail.exited {
                tail.done = true;
                if tail.partial.is_empty() {
                    return None;
                }
                let line = take_line(&mut tail.partial);
                return Some((Ok(line), tail));
            }

            match tail.child.try_wait() {
                Ok(Some(status)) => {
                    tracing::debug!(?status, "Detached process exited");
                    tail.exited = true;
                }
                Ok(None) => tokio::time::sleep(tail.poll_interval).await,
                Err(e) => {
                    tail.done = true;
                    return Some((Err(e), tail));
                }
            }
        }
    }))
}

fn take_line(partial: &mut Vec<u8>) -> String {
    let bytes = std::mem::take(partial);
    String::from_utf8_lossy(&bytes)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}
