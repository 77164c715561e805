use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::api::{ApiError, AppJson, AppPath, AppQuery};
use crate::infrastructure::AppState;
use crate::models::PunishmentDto;
use crate::models::punishment::NewPunishment;
use crate::services::{PunishmentFilter, punishment_service};

#[utoipa::path(
    get,
    path = "/api/punishments",
    params(
        ("user_id" = Option<i32>, Query, description = "Only punishments of this user"),
        ("active" = Option<bool>, Query, description = "true: still in force, false: expired")
    ),
    responses((status = 200, description = "Punishments, newest first"))
)]
pub async fn list_punishments(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<PunishmentFilter>,
) -> Result<Json<Value>, ApiError> {
    let punishments = punishment_service::list_punishments(&state, filter).await?;
    Ok(Json(json!({
        "total": punishments.len(),
        "punishments": punishments
    })))
}

#[utoipa::path(
    post,
    path = "/api/punishments",
    request_body = NewPunishment,
    responses(
        (status = 201, description = "Punishment applied", body = PunishmentDto),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Punisher is not staff"),
        (status = 404, description = "User or loan not found")
    )
)]
pub async fn create_punishment(
    State(state): State<AppState>,
    AppJson(input): AppJson<NewPunishment>,
) -> Result<(StatusCode, Json<PunishmentDto>), ApiError> {
    let punishment = punishment_service::apply_punishment(&state, input).await?;
    Ok((StatusCode::CREATED, Json(punishment)))
}

#[utoipa::path(
    get,
    path = "/api/punishments/{id}",
    params(("id" = i32, Path, description = "Punishment ID")),
    responses(
        (status = 200, description = "Punishment", body = PunishmentDto),
        (status = 404, description = "Punishment not found")
    )
)]
pub async fn get_punishment(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<PunishmentDto>, ApiError> {
    Ok(Json(punishment_service::get_punishment(&state, id).await?))
}
