use anyhow::{bail, Context};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// pylint message template. The trailing `{line}:{column}` keeps the final
/// whitespace token of every diagnostic line positional, which the parser skips.
pub const PYLINT_MSG_TEMPLATE: &str =
    "{path}:{line}: {category} ({msg_id}, {symbol}, {obj}) {msg} {line}:{column}";

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,
    #[serde(default = "default_lint_timeout")]
    pub lint_timeout_secs: u64,
    #[serde(default = "default_max_runs_per_sec")]
    pub max_runs_per_sec: f64,
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default)]
    pub linter: LinterConfig,
    /// Directory for per-session scratch files. Defaults to the OS temp dir.
    pub scratch_dir: Option<PathBuf>,
    /// Index of the ':'-separated field holding the line number in a
    /// diagnostic line. Defaults to the host platform's path convention.
    pub line_field: Option<usize>,
    /// Extra `CODE = "explanation"` entries merged over the built-in table.
    pub explanations_path: Option<PathBuf>,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LinterConfig {
    #[serde(default = "default_linter_program")]
    pub program: String,
    #[serde(default = "default_linter_args")]
    pub args: Vec<String>,
}

impl Default for LinterConfig {
    fn default() -> Self {
        Self {
            program: default_linter_program(),
            args: default_linter_args(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            run_timeout_secs: default_run_timeout(),
            lint_timeout_secs: default_lint_timeout(),
            max_runs_per_sec: default_max_runs_per_sec(),
            interpreter: default_interpreter(),
            linter: LinterConfig::default(),
            scratch_dir: None,
            line_field: None,
            explanations_path: None,
            cors_origins: Vec::new(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServiceConfig {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn lint_timeout(&self) -> Duration {
        Duration::from_secs(self.lint_timeout_secs)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.run_timeout_secs == 0 {
            bail!("run_timeout_secs must be greater than zero");
        }
        if self.lint_timeout_secs == 0 {
            bail!("lint_timeout_secs must be greater than zero");
        }
        if !(self.max_runs_per_sec.is_finite() && self.max_runs_per_sec > 0.0) {
            bail!(
                "max_runs_per_sec must be a positive number, got {}",
                self.max_runs_per_sec
            );
        }
        if self.interpreter.trim().is_empty() {
            bail!("interpreter must not be empty");
        }
        if self.linter.program.trim().is_empty() {
            bail!("linter.program must not be empty");
        }
        Ok(())
    }
}

// Default functions
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    5001
}
fn default_run_timeout() -> u64 {
    5
}
fn default_lint_timeout() -> u64 {
    30
}
fn default_max_runs_per_sec() -> f64 {
    5.0
}
fn default_interpreter() -> String {
    "python3".into()
}
fn default_linter_program() -> String {
    "pylint".into()
}
fn default_linter_args() -> Vec<String> {
    vec![
        "--reports=n".into(),
        "--disable=R,C".into(),
        format!("--msg-template={PYLINT_MSG_TEMPLATE}"),
    ]
}
fn default_max_body_bytes() -> usize {
    256 * 1024
}

/// Load config from TOML file with env var overrides.
pub fn load(path: &str) -> anyhow::Result<ServiceConfig> {
    let content = if std::path::Path::new(path).exists() {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?
    } else {
        tracing::warn!("Config file not found at {}, using defaults", path);
        String::new()
    };

    let mut config: ServiceConfig =
        toml::from_str(&content).with_context(|| format!("invalid config file {path}"))?;

    // Env var overrides
    if let Ok(v) = std::env::var("LINTBOX_HOST") {
        config.host = v;
    }
    if let Ok(v) = std::env::var("LINTBOX_PORT") {
        config.port = v
            .parse()
            .with_context(|| format!("LINTBOX_PORT is not a valid port: {v}"))?;
    }
    if let Ok(v) = std::env::var("LINTBOX_INTERPRETER") {
        config.interpreter = v;
    }
    if let Ok(v) = std::env::var("LINTBOX_LINTER") {
        config.linter.program = v;
    }

    config.validate()?;
    Ok(config)
}
