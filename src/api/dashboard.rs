use axum::{Json, extract::State};

use crate::api::ApiError;
use crate::infrastructure::AppState;
use crate::services::{DashboardStats, dashboard_service};

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses((status = 200, description = "Dashboard counters", body = DashboardStats))
)]
pub async fn get_dashboard(State(state): State<AppState>) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(dashboard_service::dashboard_stats(&state).await?))
}
