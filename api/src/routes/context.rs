use axum::routing::{post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use belay_core::context::CoordinatorContext;
use belay_core::error::ApiError;
use belay_core::mutations;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/context/workouts",
            post(create_workout).put(update_workout),
        )
        .route("/v1/context/goals", put(upsert_goal))
        .route("/v1/context", put(replace_context))
}

/// A context edit that carries a session payload. The current context
/// travels with the request: the server holds no per-user state, so the
/// client (or the orchestrating agent) owns the document and must serialize
/// edits against it.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SessionEditRequest {
    /// The user's current coordinator context document.
    pub context: serde_json::Value,
    /// Flat session object with an `activity` discriminator.
    pub session: serde_json::Value,
}

/// A context edit that carries a goal payload.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GoalEditRequest {
    pub context: serde_json::Value,
    pub goal: serde_json::Value,
}

/// A full-context replacement request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplaceContextRequest {
    /// The context as currently held by the client.
    pub context: serde_json::Value,
    /// The complete replacement document. All fields required; anything
    /// omitted relative to `context` is deleted.
    pub replacement: serde_json::Value,
}

/// The updated context in canonical form (ISO-8601 dates, lowercase
/// `userId`).
#[derive(Debug, Serialize, ToSchema)]
pub struct ContextResponse {
    pub context: serde_json::Value,
}

fn respond(next: CoordinatorContext) -> Json<ContextResponse> {
    Json(ContextResponse {
        context: next.snapshot(),
    })
}

/// Add a workout session to the training plan
///
/// If the plan is empty, a new day dated now is minted around the session;
/// otherwise the session is appended to the first day.
#[utoipa::path(
    post,
    path = "/v1/context/workouts",
    request_body = SessionEditRequest,
    responses(
        (status = 200, description = "Updated context", body = ContextResponse),
        (status = 400, description = "Validation error", body = ApiError)
    ),
    tag = "context"
)]
pub async fn create_workout(
    Json(req): Json<SessionEditRequest>,
) -> Result<Json<ContextResponse>, AppError> {
    let ctx = CoordinatorContext::parse(&req.context)?;
    tracing::info!(user = %ctx.user_id, "create workout");
    let next = mutations::create_workout_json(&ctx, &req.session, Utc::now())?;
    Ok(respond(next))
}

/// Update a workout session by id
///
/// Replaces the first session whose id matches, scanning days in order. An
/// unmatched session is appended to the first day; with no plan at all the
/// request fails with `no_training_plan`.
#[utoipa::path(
    put,
    path = "/v1/context/workouts",
    request_body = SessionEditRequest,
    responses(
        (status = 200, description = "Updated context", body = ContextResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 404, description = "No training plan present", body = ApiError)
    ),
    tag = "context"
)]
pub async fn update_workout(
    Json(req): Json<SessionEditRequest>,
) -> Result<Json<ContextResponse>, AppError> {
    let ctx = CoordinatorContext::parse(&req.context)?;
    tracing::info!(user = %ctx.user_id, "update workout");
    let next = mutations::update_workout_json(&ctx, &req.session)?;
    Ok(respond(next))
}

/// Upsert a goal by id
#[utoipa::path(
    put,
    path = "/v1/context/goals",
    request_body = GoalEditRequest,
    responses(
        (status = 200, description = "Updated context", body = ContextResponse),
        (status = 400, description = "Validation error", body = ApiError)
    ),
    tag = "context"
)]
pub async fn upsert_goal(
    Json(req): Json<GoalEditRequest>,
) -> Result<Json<ContextResponse>, AppError> {
    let ctx = CoordinatorContext::parse(&req.context)?;
    tracing::info!(user = %ctx.user_id, "upsert goal");
    let next = mutations::upsert_goal_json(&ctx, &req.goal)?;
    Ok(respond(next))
}

/// Replace the whole context
///
/// Total replace: the replacement document must carry every field, and the
/// result is exactly the replacement — never a merge with prior state.
#[utoipa::path(
    put,
    path = "/v1/context",
    request_body = ReplaceContextRequest,
    responses(
        (status = 200, description = "Updated context", body = ContextResponse),
        (status = 400, description = "Validation error (partial documents are rejected)", body = ApiError)
    ),
    tag = "context"
)]
pub async fn replace_context(
    Json(req): Json<ReplaceContextRequest>,
) -> Result<Json<ContextResponse>, AppError> {
    let ctx = CoordinatorContext::parse(&req.context)?;
    tracing::info!(user = %ctx.user_id, "replace context");
    let next = mutations::replace_context_json(&ctx, &req.replacement)?;
    Ok(respond(next))
}
