use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use belay_core::error::{ApiError, CoreError, codes};

/// Internal error type that converts to structured API responses
#[derive(Debug)]
pub enum AppError {
    /// Request-level validation error (400)
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
    },
    /// A core codec or mutation contract was violated (400/404)
    Core(CoreError),
    /// The hosted memory collaborator failed (502)
    Memory(reqwest::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::new_v4().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::Core(err) => core_error_response(err, request_id),
            AppError::Memory(err) => {
                tracing::error!("Memory collaborator error: {:?}", err);
                (
                    StatusCode::BAD_GATEWAY,
                    ApiError {
                        error: codes::MEMORY_UNAVAILABLE.to_string(),
                        message: "The workout memory service could not be reached".to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: Some(
                            "The workout itself was valid. Retry the submission once the memory \
                             service is reachable."
                                .to_string(),
                        ),
                    },
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

/// Map a core contract violation to a status and an agent-readable body.
/// Every arm keeps the offending field/value visible so whoever produced
/// the payload can correct it and retry.
fn core_error_response(err: CoreError, request_id: String) -> (StatusCode, ApiError) {
    let message = err.to_string();
    match err {
        CoreError::NoTrainingPlanPresent => (
            StatusCode::NOT_FOUND,
            ApiError {
                error: codes::NO_TRAINING_PLAN.to_string(),
                message,
                field: Some("context.currentTrainingPlan".to_string()),
                received: None,
                request_id,
                docs_hint: Some(
                    "This is expected for a new user. Create the workout instead of updating it."
                        .to_string(),
                ),
            },
        ),
        CoreError::InvalidDateFormat { field, received } => (
            StatusCode::BAD_REQUEST,
            ApiError {
                error: codes::VALIDATION_FAILED.to_string(),
                message,
                field: Some(field),
                received: Some(serde_json::Value::String(received)),
                request_id,
                docs_hint: Some(
                    "Dates are seconds since 2001-01-01T00:00:00Z or ISO-8601 with a Z suffix."
                        .to_string(),
                ),
            },
        ),
        CoreError::UngradableInput { received } => (
            StatusCode::BAD_REQUEST,
            ApiError {
                error: codes::VALIDATION_FAILED.to_string(),
                message,
                field: Some("grade".to_string()),
                received: Some(serde_json::Value::String(received)),
                request_id,
                docs_hint: Some(
                    "Grades are either a bare string (\"V7\", \"5.10a\") or \
                     {\"scale\": \"v\"|\"yds\", \"value\": \"...\"}."
                        .to_string(),
                ),
            },
        ),
        CoreError::UnknownActivityVariant { received } => (
            StatusCode::BAD_REQUEST,
            ApiError {
                error: codes::VALIDATION_FAILED.to_string(),
                message,
                field: Some("activity".to_string()),
                received: Some(serde_json::Value::String(received)),
                request_id,
                docs_hint: Some("activity must be \"climbing\" or \"running\".".to_string()),
            },
        ),
        CoreError::MissingField { variant: _, field } => (
            StatusCode::BAD_REQUEST,
            ApiError {
                error: codes::VALIDATION_FAILED.to_string(),
                message,
                field: Some(field.to_string()),
                received: None,
                request_id,
                docs_hint: None,
            },
        ),
        CoreError::InvalidDailyPlan { .. }
        | CoreError::MalformedSessionPayload { .. } => (
            StatusCode::BAD_REQUEST,
            ApiError {
                error: codes::VALIDATION_FAILED.to_string(),
                message,
                field: None,
                received: None,
                request_id,
                docs_hint: None,
            },
        ),
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Core(err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Memory(err)
    }
}
