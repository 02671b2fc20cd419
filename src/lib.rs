#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::needless_pass_by_value,
    clippy::uninlined_format_args
)]

pub mod config;
pub mod error;
pub mod exec;
pub mod lint;
pub mod routes;
pub mod scratch;
pub mod session;
pub mod state;
pub mod workbench;

pub use config::ServiceConfig;
pub use error::AppError;
pub use state::{AppState, SharedState};
pub use workbench::{CleanupOutcome, Workbench};
