//! Turns a linter's free-text report into structured diagnostic records.
//!
//! The report is plain pylint text output, one finding per line:
//!
//! ```text
//! ************* Module snippet
//! /tmp/lintbox-x1.py:3: error (E0602, undefined-variable, ) Undefined variable 'y' 3:6
//! ```
//!
//! Each line is tokenized on whitespace and walked by a three-state scanner
//! (SEEK, CODE, MESSAGE). Lines run in parallel on the rayon pool; results
//! keep input order.

use super::explain::Explain;
use super::linter::RawReport;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const RATED_AT: &str = "rated at";

/// Severity token that opens a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            _ => None,
        }
    }
}

/// One structured finding. Field names on the wire match what the web
/// frontend reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub code: String,
    #[serde(rename = "error")]
    pub category: String,
    pub message: String,
    #[serde(rename = "line")]
    pub line_number: String,
    #[serde(rename = "error_info")]
    pub explanation: String,
    pub severity: Severity,
}

/// Which ':'-separated field of a diagnostic line holds the line number.
///
/// `path:line: ...` puts it at index 1; a drive-letter path
/// (`C:\dir\file.py:line: ...`) shifts it to index 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineField(usize);

impl LineField {
    pub const POSIX: Self = Self(1);
    pub const DRIVE_LETTER: Self = Self(2);

    pub fn at(index: usize) -> Self {
        Self(index)
    }

    /// The variant matching the host's path convention.
    pub fn for_host() -> Self {
        if cfg!(windows) {
            Self::DRIVE_LETTER
        } else {
            Self::POSIX
        }
    }

    pub fn index(self) -> usize {
        self.0
    }

    fn extract(self, line: &str) -> Option<&str> {
        line.split(':').nth(self.0).map(str::trim)
    }
}

enum ScanState {
    Seek,
    Code,
    Message,
}

struct Scanned<'a> {
    severity: Severity,
    code: &'a str,
    category: &'a str,
    message: String,
}

pub struct DiagnosticParser {
    explain: Arc<dyn Explain>,
    line_field: LineField,
}

impl DiagnosticParser {
    pub fn new(explain: Arc<dyn Explain>, line_field: LineField) -> Self {
        Self {
            explain,
            line_field,
        }
    }

    /// Parse a whole report. Lines that are not diagnostics, or whose code
    /// has no explanation, are dropped.
    pub fn parse(&self, report: &RawReport) -> Vec<DiagnosticRecord> {
        let lines: Vec<&str> = report.as_str().lines().collect();
        if is_clean(&lines) {
            return Vec::new();
        }

        // The first line is the module header.
        lines[1..]
            .par_iter()
            .filter_map(|line| self.parse_line(line))
            .collect()
    }

    /// Parse a single report line.
    pub fn parse_line(&self, line: &str) -> Option<DiagnosticRecord> {
        if line.trim().is_empty() || line.contains(RATED_AT) {
            return None;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 3 {
            return None;
        }

        let line_number = self.line_field.extract(line)?;
        let scanned = scan(&tokens)?;
        let explanation = self.explain.explain(scanned.code)?;

        Some(DiagnosticRecord {
            code: scanned.code.to_string(),
            category: scanned.category.to_string(),
            message: scanned.message,
            line_number: line_number.to_string(),
            explanation: explanation.to_string(),
            severity: scanned.severity,
        })
    }
}

/// A report with nothing to say: too short to hold a finding, or a bare
/// separator and score line under a header that names no module.
fn is_clean(lines: &[&str]) -> bool {
    if lines.len() <= 2 {
        return true;
    }
    is_separator(lines[1])
        && lines[2].contains(RATED_AT)
        && !lines[0].to_ascii_lowercase().contains("module")
}

fn is_separator(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && line.chars().all(|c| c == '-')
}

/// Walk the tokens of one line:
///
/// - SEEK: skip until the first `error` or `warning` token.
/// - CODE: this token minus its first and last character is the code
///   (`(E0602,`), the next minus its last character is the category
///   (`undefined-variable,`); one more separator token is skipped.
/// - MESSAGE: everything up to, not including, the final positional token.
fn scan<'a>(tokens: &[&'a str]) -> Option<Scanned<'a>> {
    let mut state = ScanState::Seek;
    let mut severity = None;
    let mut found = None;
    let mut message = String::new();
    let mut i = 0;

    while i < tokens.len() {
        match state {
            ScanState::Seek => {
                if let Some(s) = Severity::from_token(tokens[i]) {
                    severity = Some(s);
                    state = ScanState::Code;
                }
                i += 1;
            }
            ScanState::Code => {
                let code = strip_both(tokens[i]);
                let category = strip_last(tokens.get(i + 1)?);
                found = Some((code, category));
                i += 3;
                state = ScanState::Message;
            }
            ScanState::Message => {
                let end = tokens.len() - 1;
                message = tokens[i..end].join(" ");
                break;
            }
        }
    }

    let (code, category) = found?;
    Some(Scanned {
        severity: severity?,
        code,
        category,
        message,
    })
}

fn strip_both(token: &str) -> &str {
    let mut chars = token.chars();
    chars.next();
    chars.next_back();
    chars.as_str()
}

fn strip_last(token: &str) -> &str {
    let mut chars = token.chars();
    chars.next_back();
    chars.as_str()
}
