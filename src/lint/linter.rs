use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Unparsed text report produced by the linter for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReport(String);

impl RawReport {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LintError {
    /// The linter wrote to stderr: misconfiguration, not findings.
    #[error("linter reported a tooling problem: {0}")]
    Tooling(String),
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("linter timed out after {0} seconds")]
    Timeout(u64),
    #[error("failed to collect linter output: {0}")]
    Io(#[from] io::Error),
}

/// Runs the external static-analysis tool against a scratch file.
pub struct Linter {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Linter {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub async fn analyze(&self, path: &Path) -> Result<RawReport, LintError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| LintError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| LintError::Timeout(self.timeout.as_secs()))??;

        // Exit status is ignored: pylint exits non-zero whenever it finds anything.
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::warn!(program = %self.program, "linter wrote to stderr: {}", stderr.trim());
            return Err(LintError::Tooling(stderr.into_owned()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::debug!(path = %path.display(), bytes = stdout.len(), "lint report captured");
        Ok(RawReport(stdout))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn fake_linter(script: &str) -> Linter {
        // `sh -c SCRIPT PATH` runs SCRIPT with the scratch path as $0.
        Linter::new(
            "sh",
            vec!["-c".into(), script.into()],
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn stdout_becomes_report() {
        let linter = fake_linter("echo \"checked $0\"");
        let report = linter.analyze(Path::new("/tmp/x.py")).await.unwrap();
        assert_eq!(report.as_str(), "checked /tmp/x.py\n");
    }

    #[tokio::test]
    async fn findings_with_nonzero_exit_are_not_errors() {
        let linter = fake_linter("echo '/tmp/x.py:1: error (E0602, undefined-variable, ) x 1:0'; exit 2");
        let report = linter.analyze(Path::new("/tmp/x.py")).await.unwrap();
        assert!(report.as_str().contains("E0602"));
    }

    #[tokio::test]
    async fn stderr_is_tooling_error() {
        let linter = fake_linter("echo 'no such option: --bogus' >&2");
        let err = linter.analyze(Path::new("/tmp/x.py")).await.unwrap_err();
        match err {
            LintError::Tooling(text) => assert!(text.contains("--bogus")),
            other => panic!("expected tooling error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let linter = Linter::new("no-such-linter-xyz", Vec::new(), Duration::from_secs(5));
        let err = linter.analyze(Path::new("/tmp/x.py")).await.unwrap_err();
        assert!(matches!(err, LintError::Spawn { .. }));
    }

    #[tokio::test]
    async fn slow_linter_times_out() {
        let linter = Linter::new(
            "sh",
            vec!["-c".into(), "sleep 10".into()],
            Duration::from_secs(1),
        );
        let err = linter.analyze(Path::new("/tmp/x.py")).await.unwrap_err();
        assert!(matches!(err, LintError::Timeout(1)));
    }
}
