use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use belay_core::completed::CompletedWorkout;
use belay_core::dates;
use belay_core::error::ApiError;
use belay_core::sessions::ActivityType;

use crate::error::AppError;
use crate::memory::SearchResults;
use crate::state::AppState;

const MAX_SEARCH_LIMIT: u32 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/workouts/completed", post(submit_workout))
        .route("/v1/workouts/history/search", post(search_history))
}

/// A finished session reported by the client for the history subsystem.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitWorkoutRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Flat completed-workout object with an `activity` discriminator.
    pub workout: serde_json::Value,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitWorkoutResponse {
    pub stored: bool,
    pub activity: ActivityType,
    /// ISO-8601 date of the stored workout.
    pub date: String,
}

/// A query over the user's workout history.
#[derive(Debug, Deserialize, ToSchema)]
pub struct HistorySearchRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub query: String,
    pub activity: ActivityType,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    5
}

fn validate_search(req: &HistorySearchRequest) -> Result<(), AppError> {
    if req.query.trim().is_empty() {
        return Err(AppError::Validation {
            message: "query must not be empty".to_string(),
            field: Some("query".to_string()),
            received: Some(serde_json::Value::String(req.query.clone())),
            docs_hint: Some(
                "Use a short text query; to fetch everything for an activity, query the \
                 activity name itself."
                    .to_string(),
            ),
        });
    }
    if req.limit == 0 || req.limit > MAX_SEARCH_LIMIT {
        return Err(AppError::Validation {
            message: format!("limit must be between 1 and {MAX_SEARCH_LIMIT}"),
            field: Some("limit".to_string()),
            received: Some(serde_json::Value::from(req.limit)),
            docs_hint: None,
        });
    }
    Ok(())
}

/// Submit a completed workout
///
/// Validates the record and stores it in the historical memory service as a
/// write-once fact. Nothing in the coordinator context is touched.
#[utoipa::path(
    post,
    path = "/v1/workouts/completed",
    request_body = SubmitWorkoutRequest,
    responses(
        (status = 201, description = "Workout stored", body = SubmitWorkoutResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 502, description = "Memory service unavailable", body = ApiError)
    ),
    tag = "workouts"
)]
pub async fn submit_workout(
    State(state): State<AppState>,
    Json(req): Json<SubmitWorkoutRequest>,
) -> Result<(axum::http::StatusCode, Json<SubmitWorkoutResponse>), AppError> {
    let workout = CompletedWorkout::parse(&req.workout)?;
    let user_id = req.user_id.to_lowercase();
    tracing::info!(user = %user_id, activity = %workout.activity(), "completed workout received");

    state.memory.store(&user_id, &workout).await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(SubmitWorkoutResponse {
            stored: true,
            activity: workout.activity(),
            date: dates::encode_iso8601(workout.date()),
        }),
    ))
}

/// Search workout history
///
/// Ranked retrieval over the user's stored completed workouts, filtered to
/// one activity. Results come back best-first as scored records.
#[utoipa::path(
    post,
    path = "/v1/workouts/history/search",
    request_body = HistorySearchRequest,
    responses(
        (status = 200, description = "Ranked history records", body = SearchResults),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 502, description = "Memory service unavailable", body = ApiError)
    ),
    tag = "workouts"
)]
pub async fn search_history(
    State(state): State<AppState>,
    Json(req): Json<HistorySearchRequest>,
) -> Result<Json<SearchResults>, AppError> {
    validate_search(&req)?;
    let user_id = req.user_id.to_lowercase();
    let results = state
        .memory
        .search(&user_id, &req.query, req.activity, req.limit)
        .await?;
    Ok(Json(results))
}
