use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use error_stack::Report;
use serde_json::json;

use crate::error::{PipelineError, ProviderError, ProviderMessage};
use crate::logging::ErrorLog;

/// An HTTP error rendered as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Log `report` in full and turn it into a 500 carrying its message.
    pub async fn from_failure(
        errors: &dyn ErrorLog,
        route: &str,
        report: &Report<PipelineError>,
    ) -> Self {
        tracing::error!(route, error = ?report, "request failed");
        errors.record(route, &format!("{report:?}")).await;
        Self::internal(failure_message(report))
    }
}

// Malformed input is always a 400, whatever status axum would pick.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.message }))).into_response()
    }
}

/// One-line description of a failure: the pipeline step, the provider
/// error underneath it, and the provider's own message when it sent one.
pub fn failure_message(report: &Report<PipelineError>) -> String {
    let mut message = report.current_context().to_string();
    if let Some(provider) = report.downcast_ref::<ProviderError>() {
        message.push_str(&format!(": {provider}"));
    }
    if let Some(detail) = report.downcast_ref::<ProviderMessage>() {
        message.push_str(&format!(" ({detail})"));
    }
    message
}
