use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde_json::json;
use tracing::info;

use crate::{
    VERSION,
    config::PlannerConfig,
    llm::TextGenerator,
    models::{ChatbotRequest, ChatbotResponse, HealthResponse, TravelRequest, TravelResponse},
    planner::TravelPlanner,
    validation::ValidationError,
};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn TextGenerator>,
    pub planner: PlannerConfig,
    pub started_at: Instant,
    pub environment: String,
}

impl AppState {
    pub fn new(generator: Arc<dyn TextGenerator>, planner: PlannerConfig) -> Self {
        Self {
            generator,
            planner,
            started_at: Instant::now(),
            environment: std::env::var("TRAVELIAN_ENV")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }
}

/// Rejected request, answered with `400` and the offending field
#[derive(Debug)]
pub struct ApiError(ValidationError);

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.0.to_string(),
            "field": self.0.field(),
        });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/travel/plan", post(plan_trip))
        .route("/chatbot/ask", post(ask_chatbot))
        .route("/health", get(health))
        .with_state(state)
}

async fn plan_trip(
    State(state): State<AppState>,
    Json(request): Json<TravelRequest>,
) -> Result<Json<TravelResponse>, ApiError> {
    info!(
        origin = %request.origin,
        destination = %request.destination,
        "travel plan requested"
    );
    let planner = TravelPlanner::new(state.generator.as_ref(), &state.planner);
    let response = planner.plan(&request).await?;
    Ok(Json(response))
}

async fn ask_chatbot(
    State(state): State<AppState>,
    Json(request): Json<ChatbotRequest>,
) -> Result<Json<ChatbotResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ValidationError::Missing { field: "message" }.into());
    }
    let planner = TravelPlanner::new(state.generator.as_ref(), &state.planner);
    Ok(Json(planner.ask(request).await))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        travel_module: true,
        chatbot_module: state.generator.is_configured(),
        version: VERSION.to_string(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        environment: state.environment.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_maps_to_bad_request() {
        let response = ApiError::from(ValidationError::SameOriginAndDestination).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
