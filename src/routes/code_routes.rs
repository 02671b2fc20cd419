use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::SESSION_HEADER;
use crate::error::AppError;
use crate::lint::DiagnosticRecord;
use crate::session::DEFAULT_SESSION_ID;
use crate::state::SharedState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CodeRequest {
    #[serde(default)]
    pub code: Option<String>,
}

/// Session key from the `X-Session-ID` header, or the shared default.
pub fn session_id(headers: &HeaderMap) -> &str {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_SESSION_ID)
}

fn require_code(payload: Result<Json<CodeRequest>, JsonRejection>) -> Result<String, AppError> {
    match payload {
        Ok(Json(CodeRequest { code: Some(code) })) => Ok(code),
        Ok(_) => Err(AppError::Validation("No code provided".into())),
        Err(rejection) => {
            tracing::debug!("rejected code payload: {}", rejection.body_text());
            Err(AppError::Validation("No code provided".into()))
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/check_code
pub async fn check_code(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<CodeRequest>, JsonRejection>,
) -> Result<Json<Vec<DiagnosticRecord>>, AppError> {
    let code = require_code(payload)?;
    let records = state.workbench.check(session_id(&headers), &code).await?;
    Ok(Json(records))
}

/// POST /api/run_code
pub async fn run_code(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<CodeRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let code = require_code(payload)?;
    let output = state.workbench.run(session_id(&headers), &code).await?;
    Ok(Json(json!({ "output": output })))
}

/// POST /api/cleanup
pub async fn cleanup(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let outcome = state.workbench.cleanup(session_id(&headers)).await?;
    Ok(Json(json!({ "status": outcome.as_str() })))
}
