//! 存活探针

use axum::{Json, extract::State};

use crate::{
    dto::{ApiResponse, HealthResponse},
    state::AppState,
};

/// GET /api/rules/health
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "ok",
        service: "rule-admin-service",
        rules_stored: state.repository.len(),
    }))
}
