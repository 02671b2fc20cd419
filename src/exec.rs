//! Runs a submitted snippet under the configured interpreter with a hard
//! wall-clock bound.

use std::io::{self, Read};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Environment variables safe to pass to user code.
/// Only functional variables are included, never API keys or secrets.
const SAFE_ENV_VARS: &[&str] = &[
    "PATH", "HOME", "TERM", "LANG", "LC_ALL", "LC_CTYPE", "USER", "SHELL", "TMPDIR",
];

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Command '{command}' timed out after {secs} seconds")]
    Timeout { command: String, secs: u64 },
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Io(#[from] io::Error),
}

/// One-shot subprocess runner. Never retries: user code may have side effects.
pub struct Executor {
    interpreter: String,
    timeout: Duration,
}

impl Executor {
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
        }
    }

    /// Run `path` and return its interleaved stdout/stderr.
    pub async fn run(&self, path: &Path) -> Result<String, ExecError> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(path);
        let output = run_merged(cmd, self.timeout).await;

        match output {
            Err(Failure::Timeout) => {
                tracing::warn!(path = %path.display(), "execution timed out, process killed");
                Err(ExecError::Timeout {
                    command: format!("{} {}", self.interpreter, path.display()),
                    secs: self.timeout.as_secs(),
                })
            }
            Err(Failure::Spawn(source)) => Err(ExecError::Spawn {
                program: self.interpreter.clone(),
                source,
            }),
            Err(Failure::Io(e)) => Err(ExecError::Io(e)),
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }
}

enum Failure {
    Timeout,
    Spawn(io::Error),
    Io(io::Error),
}

/// Spawn `cmd` with stdout and stderr sharing one pipe and wait for it,
/// killing the whole process tree if `timeout` elapses first.
async fn run_merged(mut cmd: Command, timeout: Duration) -> Result<Vec<u8>, Failure> {
    let deadline = tokio::time::Instant::now() + timeout;
    let (mut reader, writer) = io::pipe().map_err(Failure::Io)?;
    let writer_err = writer.try_clone().map_err(Failure::Io)?;

    // Clear the environment, then re-add only safe, functional variables.
    cmd.env_clear();
    for var in SAFE_ENV_VARS {
        if let Ok(val) = std::env::var(var) {
            cmd.env(var, val);
        }
    }
    cmd.stdin(Stdio::null())
        .stdout(writer)
        .stderr(writer_err)
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(Failure::Spawn)?;
    // Taken now: `Child::id` is gone once the child has been reaped, but its
    // process group may still hold live descendants.
    let pid = child.id();
    // The command holds the parent's copies of the write end; drop them so the
    // reader sees EOF once the child tree exits.
    drop(cmd);

    let capture = tokio::task::spawn_blocking(move || {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).map(|_| buf)
    });

    match tokio::time::timeout_at(deadline, child.wait()).await {
        Ok(Ok(_status)) => {}
        Ok(Err(e)) => {
            terminate(&mut child, pid).await;
            return Err(Failure::Io(e));
        }
        Err(_) => {
            terminate(&mut child, pid).await;
            return Err(Failure::Timeout);
        }
    }

    // A background grandchild can keep the pipe open after the child exits.
    match tokio::time::timeout_at(deadline, capture).await {
        Ok(Ok(Ok(buf))) => Ok(buf),
        Ok(Ok(Err(e))) => Err(Failure::Io(e)),
        Ok(Err(join)) => Err(Failure::Io(io::Error::other(join))),
        Err(_) => {
            terminate(&mut child, pid).await;
            Err(Failure::Timeout)
        }
    }
}

/// Kill the child (and on Unix its whole process group) and reap it.
#[cfg_attr(not(unix), allow(unused_variables))]
async fn terminate(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        if let Ok(pgid) = libc::pid_t::try_from(pid) {
            // SAFETY: killpg only sends a signal; the group was created by
            // `process_group(0)` at spawn and is led by this child.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }
    if let Err(e) = child.kill().await {
        if e.kind() != io::ErrorKind::InvalidInput {
            tracing::warn!("failed to kill child process: {e}");
        }
    }
}
