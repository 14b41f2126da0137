use std::net::SocketAddr;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod error;
mod memory;
mod routes;
mod state;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Belay API",
        version = "0.1.0",
        description = "Coaching backend for climbing and running: coordinator-context edits and completed-workout history. Built for agents, not humans."
    ),
    paths(
        routes::health::health_check,
        routes::context::create_workout,
        routes::context::update_workout,
        routes::context::upsert_goal,
        routes::context::replace_context,
        routes::workouts::submit_workout,
        routes::workouts::search_history,
    ),
    components(schemas(
        HealthResponse,
        routes::context::SessionEditRequest,
        routes::context::GoalEditRequest,
        routes::context::ReplaceContextRequest,
        routes::context::ContextResponse,
        routes::workouts::SubmitWorkoutRequest,
        routes::workouts::SubmitWorkoutResponse,
        routes::workouts::HistorySearchRequest,
        crate::memory::ScoredRecord,
        crate::memory::SearchResults,
        belay_core::error::ApiError,
        belay_core::sessions::ActivityType,
        belay_core::sessions::ClimbRoute,
        belay_core::sessions::ClimbingSession,
        belay_core::sessions::RunningSession,
        belay_core::sessions::WorkoutSession,
        belay_core::grades::GradeScale,
        belay_core::grades::GradeValue,
        belay_core::plan::DailyPlan,
        belay_core::context::Goal,
        belay_core::context::FitnessLevel,
        belay_core::context::CoordinatorContext,
        belay_core::completed::CompletedRoute,
        belay_core::completed::CompletedClimbing,
        belay_core::completed::CompletedRunning,
        belay_core::completed::CompletedWorkout,
    ))
)]
struct ApiDoc;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// CORS from the `BELAY_CORS_ORIGINS` env var (comma-separated; default
/// localhost dev origin).
fn build_cors_layer() -> CorsLayer {
    let origins_str = std::env::var("BELAY_CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000".to_string());

    let origins: Vec<HeaderValue> = origins_str
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("authorization"),
            HeaderName::from_static("content-type"),
        ])
        .max_age(std::time::Duration::from_secs(3600))
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "belay_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let app_state = state::AppState {
        memory: memory::MemoryClient::from_env(),
    };

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::context::router())
        .merge(routes::workouts::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer()),
        )
        .with_state(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Belay API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind port");
    axum::serve(listener, app).await.expect("server error");
}
