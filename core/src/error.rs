use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Contract violations surfaced by the codecs and the context mutation
/// protocol. All are value-level results: a failed operation returns the
/// error and leaves the caller's context untouched. The orchestration layer
/// is expected to feed these back to whatever produced the payload (an
/// agent can retry with corrected JSON), not to treat them as fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Date was neither reference-epoch seconds nor parseable ISO-8601.
    #[error(
        "invalid date format for `{field}`: expected seconds since 2001-01-01T00:00:00Z or an ISO-8601 string, got {received}"
    )]
    InvalidDateFormat { field: String, received: String },

    /// Grade input that is empty or not a string/object.
    #[error("ungradable input: {received}")]
    UngradableInput { received: String },

    /// The `activity` discriminator is missing or names no known variant.
    #[error("unknown activity variant {received}, expected \"climbing\" or \"running\"")]
    UnknownActivityVariant { received: String },

    /// A payload is missing one of its required fields. `variant` names the
    /// shape being decoded ("climbing", "running", "dailyPlan", "goal",
    /// "context").
    #[error("{variant} payload is missing required field `{field}`")]
    MissingField {
        variant: &'static str,
        field: &'static str,
    },

    /// A daily plan failed to decode; plans are all-or-nothing, so a single
    /// bad session rejects the whole plan.
    #[error("invalid daily plan: {reason}")]
    InvalidDailyPlan { reason: Box<CoreError> },

    /// Session JSON that passed tag dispatch but is structurally broken
    /// (wrong field types, not an object, trailing garbage).
    #[error("malformed session payload: {detail}")]
    MalformedSessionPayload { detail: String },

    /// UpdateWorkout found no training plan to place the session into.
    /// A normal outcome for a brand-new user, not a fault.
    #[error("no training plan present to receive the workout")]
    NoTrainingPlanPresent,
}

impl CoreError {
    pub fn invalid_daily_plan(reason: CoreError) -> Self {
        CoreError::InvalidDailyPlan {
            reason: Box::new(reason),
        }
    }

    /// Compact rendering of an offending JSON value for error messages.
    /// Long payloads are truncated so errors stay readable in tool output.
    pub fn received_repr(value: &serde_json::Value) -> String {
        let rendered = value.to_string();
        match rendered.char_indices().nth(120) {
            Some((idx, _)) => format!("{}…", &rendered[..idx]),
            None => rendered,
        }
    }
}

/// Structured error response — designed for agents, not humans.
/// Every error carries enough information for an agent to understand what
/// went wrong and how to produce a corrected payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code (e.g. "validation_failed", "no_training_plan")
    pub error: String,
    /// Human/agent-readable description of what went wrong
    pub message: String,
    /// Which field caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The value that was received (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<serde_json::Value>,
    /// Request ID for tracing and debugging
    pub request_id: String,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

/// Error codes used across the API
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const NO_TRAINING_PLAN: &str = "no_training_plan";
    pub const MEMORY_UNAVAILABLE: &str = "memory_unavailable";
}
