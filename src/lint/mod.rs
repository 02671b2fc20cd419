pub mod explain;
pub mod linter;
pub mod parser;

pub use explain::{Explain, ExplanationTable};
pub use linter::{LintError, Linter, RawReport};
pub use parser::{DiagnosticParser, DiagnosticRecord, LineField, Severity};
