//! Request-level pipelines.
//!
//! check: session -> scratch file -> linter -> diagnostic parser
//! run:   session -> throttle -> scratch file -> executor

use crate::config::ServiceConfig;
use crate::error::AppError;
use crate::exec::Executor;
use crate::lint::{DiagnosticParser, DiagnosticRecord, ExplanationTable, LineField, Linter};
use crate::scratch::ScratchFiles;
use crate::session::{Admission, RateLimiter, SessionStore};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    Cleaned,
    NoSession,
}

impl CleanupOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            CleanupOutcome::Cleaned => "cleaned",
            CleanupOutcome::NoSession => "no session",
        }
    }
}

pub struct Workbench {
    sessions: SessionStore,
    limiter: RateLimiter,
    scratch: ScratchFiles,
    executor: Executor,
    linter: Linter,
    parser: Arc<DiagnosticParser>,
}

impl Workbench {
    pub fn new(
        limiter: RateLimiter,
        scratch: ScratchFiles,
        executor: Executor,
        linter: Linter,
        parser: DiagnosticParser,
    ) -> Self {
        Self {
            sessions: SessionStore::new(),
            limiter,
            scratch,
            executor,
            linter,
            parser: Arc::new(parser),
        }
    }

    pub fn from_config(cfg: &ServiceConfig) -> anyhow::Result<Self> {
        let scratch_dir = cfg.scratch_dir();
        std::fs::create_dir_all(&scratch_dir).with_context(|| {
            format!("failed to create scratch dir: {}", scratch_dir.display())
        })?;

        let explanations = ExplanationTable::load(cfg.explanations_path.as_deref())?;
        let line_field = cfg
            .line_field
            .map(LineField::at)
            .unwrap_or_else(LineField::for_host);
        tracing::info!(
            "Explanation table ready ({} codes, line field {})",
            explanations.len(),
            line_field.index()
        );

        Ok(Self::new(
            RateLimiter::new(cfg.max_runs_per_sec),
            ScratchFiles::new(scratch_dir),
            Executor::new(&cfg.interpreter, cfg.run_timeout()),
            Linter::new(&cfg.linter.program, cfg.linter.args.clone(), cfg.lint_timeout()),
            DiagnosticParser::new(Arc::new(explanations), line_field),
        ))
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Lint `code` and return its diagnostics.
    pub async fn check(
        &self,
        session_id: &str,
        code: &str,
    ) -> Result<Vec<DiagnosticRecord>, AppError> {
        self.sessions.get_or_create(session_id);
        let path = self.scratch.write(&self.sessions, session_id, code).await?;
        let report = self.linter.analyze(&path).await?;

        let parser = self.parser.clone();
        let records = tokio::task::spawn_blocking(move || parser.parse(&report))
            .await
            .context("diagnostic parsing task failed")?;

        tracing::debug!(session = session_id, count = records.len(), "check complete");
        Ok(records)
    }

    /// Execute `code` unless the session is over its run rate.
    pub async fn run(&self, session_id: &str, code: &str) -> Result<String, AppError> {
        if self.sessions.admit(session_id, &self.limiter, Utc::now()) == Admission::Throttled {
            tracing::warn!(session = session_id, "run throttled");
            return Err(AppError::Throttled);
        }

        let path = self.scratch.write(&self.sessions, session_id, code).await?;
        let output = self.executor.run(&path).await?;
        tracing::debug!(session = session_id, bytes = output.len(), "run complete");
        Ok(output)
    }

    /// Drop the session and its scratch file. If the file cannot be deleted
    /// the session is kept so a later cleanup can retry.
    pub async fn cleanup(&self, session_id: &str) -> Result<CleanupOutcome, AppError> {
        let Some(session) = self.sessions.get(session_id) else {
            return Ok(CleanupOutcome::NoSession);
        };
        if let Some(path) = &session.scratch_path {
            if let Err(e) = self.scratch.remove(path).await {
                tracing::warn!(session = session_id, "scratch cleanup failed: {e}");
                return Err(e.into());
            }
        }
        if self.sessions.remove(session_id) {
            Ok(CleanupOutcome::Cleaned)
        } else {
            Ok(CleanupOutcome::NoSession)
        }
    }

    /// Remove every session's scratch file. Called once the server stops.
    pub async fn shutdown(&self) {
        let drained = self.sessions.drain();
        let mut removed = 0usize;
        for (id, session) in drained {
            if let Some(path) = session.scratch_path {
                match self.scratch.remove(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) => tracing::warn!(session = %id, "scratch cleanup failed: {e}"),
                }
            }
        }
        tracing::info!("Removed {} scratch files", removed);
    }
}
