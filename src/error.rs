use crate::exec::ExecError;
use crate::lint::LintError;
use crate::scratch::ScratchError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub const THROTTLE_MESSAGE: &str = "Running code too much within a short time period. \
Please wait a few seconds before clicking 'Run' each time.";

pub const TOOLING_MESSAGE: &str = "Issue with linter configuration";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("rate limited")]
    Throttled,
    #[error("linter tooling failure: {0}")]
    Tooling(String),
    #[error("{0}")]
    Timeout(String),
    #[error("{0}")]
    Execution(String),
    #[error("{0}")]
    Io(String),
    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ExecError> for AppError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::Timeout { .. } => AppError::Timeout(err.to_string()),
            ExecError::Spawn { .. } | ExecError::Io(_) => AppError::Execution(err.to_string()),
        }
    }
}

impl From<LintError> for AppError {
    fn from(err: LintError) -> Self {
        match err {
            LintError::Tooling(stderr) => AppError::Tooling(stderr),
            LintError::Timeout(_) => AppError::Timeout(err.to_string()),
            LintError::Spawn { .. } | LintError::Io(_) => AppError::Execution(err.to_string()),
        }
    }
}

impl From<ScratchError> for AppError {
    fn from(err: ScratchError) -> Self {
        AppError::Io(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Throttled => (StatusCode::TOO_MANY_REQUESTS, THROTTLE_MESSAGE.into()),
            AppError::Tooling(stderr) => {
                // raw stderr stays in the log
                tracing::error!("linter tooling failure: {}", stderr.trim());
                (StatusCode::INTERNAL_SERVER_ERROR, TOOLING_MESSAGE.into())
            }
            AppError::Timeout(msg) | AppError::Execution(msg) | AppError::Io(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".into(),
                )
            }
        };
        (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(resp: Response) -> serde_json::Value {
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn validation_returns_400() {
        let resp = AppError::Validation("No code provided".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "No code provided");
    }

    #[tokio::test]
    async fn throttled_returns_429_with_wait_message() {
        let resp = AppError::Throttled.into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("Please wait"));
    }

    #[tokio::test]
    async fn tooling_hides_stderr() {
        let resp = AppError::Tooling("Traceback: secret/path/config.py".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["error"], TOOLING_MESSAGE);
    }

    #[tokio::test]
    async fn timeout_surfaces_message() {
        let err: AppError = ExecError::Timeout {
            command: "python3 /tmp/a.py".into(),
            secs: 5,
        }
        .into();
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(resp).await["error"],
            "Command 'python3 /tmp/a.py' timed out after 5 seconds"
        );
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let err = AppError::Internal(anyhow::anyhow!("worker pool exhausted"));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        // must not leak internal detail
        assert_eq!(json["error"], "internal server error");
    }

    #[tokio::test]
    async fn linter_output_failure_is_execution_error() {
        let err: AppError = LintError::Io(std::io::Error::other("pipe closed")).into();
        assert!(matches!(err, AppError::Execution(_)));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(resp).await["error"],
            "failed to collect linter output: pipe closed"
        );
    }
}
