//! Punishments applied by staff. Activity is a function of time only.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::collections::HashMap;

use crate::domain::{DomainError, UserRole};
use crate::infrastructure::AppState;
use crate::models::PunishmentDto;
use crate::models::loan::Entity as LoanEntity;
use crate::models::punishment::{self, Entity as PunishmentEntity, NewPunishment};
use crate::models::user::{self, Entity as UserEntity};
use crate::utils::dates;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PunishmentFilter {
    pub user_id: Option<i32>,
    /// Only punishments still in force
    pub active: Option<bool>,
}

pub async fn apply_punishment(
    state: &AppState,
    input: NewPunishment,
) -> Result<PunishmentDto, DomainError> {
    let policy = state.policy();

    let reason = input.reason.trim().to_string();
    if reason.chars().count() < policy.min_punishment_reason_chars {
        return Err(DomainError::Validation(format!(
            "reason must be at least {} characters",
            policy.min_punishment_reason_chars
        )));
    }
    if !policy.punishment_duration_allowed(input.duration_days) {
        return Err(DomainError::Validation(format!(
            "duration_days must be between {} and {}",
            policy.min_punishment_days, policy.max_punishment_days
        )));
    }
    if input.user_id == input.punisher_id {
        return Err(DomainError::Validation(
            "a user cannot punish themselves".into(),
        ));
    }

    let punished = UserEntity::find_by_id(input.user_id)
        .one(state.db())
        .await?
        .ok_or_else(|| DomainError::not_found("user", input.user_id))?;
    let punisher = UserEntity::find_by_id(input.punisher_id)
        .one(state.db())
        .await?
        .ok_or_else(|| DomainError::not_found("user", input.punisher_id))?;

    let punisher_role: UserRole = punisher.role.parse()?;
    if !punisher_role.is_staff() {
        tracing::warn!(
            "User {} ({}) tried to punish user {}",
            punisher.id,
            punisher.role,
            punished.id
        );
        return Err(DomainError::EligibilityDenied(format!(
            "role '{}' cannot apply punishments",
            punisher.role
        )));
    }

    if let Some(loan_id) = input.loan_id {
        let loan = LoanEntity::find_by_id(loan_id)
            .one(state.db())
            .await?
            .ok_or_else(|| DomainError::not_found("loan", loan_id))?;
        if loan.user_id != punished.id {
            return Err(DomainError::Validation(format!(
                "loan {} does not belong to user {}",
                loan_id, punished.id
            )));
        }
    }

    let now = state.clock().now();
    let model = punishment::ActiveModel {
        user_id: Set(punished.id),
        punisher_id: Set(punisher.id),
        kind: Set(input.kind.as_str().to_string()),
        reason: Set(reason),
        loan_id: Set(input.loan_id),
        started_at: Set(now),
        ends_at: Set(dates::add_days(now, input.duration_days)),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(state.db())
    .await?;

    tracing::info!(
        "User {} punished by {} for {} day(s): {}",
        punished.id,
        punisher.id,
        input.duration_days,
        input.kind.as_str()
    );

    Ok(to_dto(model, &punished.full_name(), &punisher.full_name(), now))
}

pub async fn get_punishment(state: &AppState, id: i32) -> Result<PunishmentDto, DomainError> {
    let model = PunishmentEntity::find_by_id(id)
        .one(state.db())
        .await?
        .ok_or_else(|| DomainError::not_found("punishment", id))?;

    let mut dtos = describe(state.db(), vec![model], state.clock().now()).await?;
    dtos.pop()
        .ok_or_else(|| DomainError::not_found("punishment", id))
}

/// Newest first
pub async fn list_punishments(
    state: &AppState,
    filter: PunishmentFilter,
) -> Result<Vec<PunishmentDto>, DomainError> {
    let now = state.clock().now();
    let mut query = PunishmentEntity::find();

    if let Some(user_id) = filter.user_id {
        query = query.filter(punishment::Column::UserId.eq(user_id));
    }
    match filter.active {
        Some(true) => query = query.filter(punishment::Column::EndsAt.gt(now)),
        Some(false) => query = query.filter(punishment::Column::EndsAt.lte(now)),
        None => {}
    }

    let models = query
        .order_by_desc(punishment::Column::StartedAt)
        .order_by_desc(punishment::Column::Id)
        .all(state.db())
        .await?;

    describe(state.db(), models, now).await
}

/// Punishments in force for `user_id` at `now`
pub(crate) async fn active_count<C>(
    conn: &C,
    user_id: i32,
    now: DateTime<Utc>,
) -> Result<u64, DomainError>
where
    C: ConnectionTrait,
{
    Ok(PunishmentEntity::find()
        .filter(punishment::Column::UserId.eq(user_id))
        .filter(punishment::Column::EndsAt.gt(now))
        .count(conn)
        .await?)
}

async fn describe<C>(
    conn: &C,
    models: Vec<punishment::Model>,
    now: DateTime<Utc>,
) -> Result<Vec<PunishmentDto>, DomainError>
where
    C: ConnectionTrait,
{
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let mut ids: Vec<i32> = models
        .iter()
        .flat_map(|p| [p.user_id, p.punisher_id])
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let names: HashMap<i32, String> = UserEntity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| (u.id, u.full_name()))
        .collect();

    Ok(models
        .into_iter()
        .map(|p| {
            let user_name = names.get(&p.user_id).cloned().unwrap_or_default();
            let punisher_name = names.get(&p.punisher_id).cloned().unwrap_or_default();
            to_dto(p, &user_name, &punisher_name, now)
        })
        .collect())
}

fn to_dto(
    model: punishment::Model,
    user_name: &str,
    punisher_name: &str,
    now: DateTime<Utc>,
) -> PunishmentDto {
    let is_active = model.is_active_at(now);
    // Round a partial day up so "ends tomorrow" reads as 1
    let remaining_days = if is_active {
        let secs = (model.ends_at - now).num_seconds();
        (secs + 86_399) / 86_400
    } else {
        0
    };

    PunishmentDto {
        id: model.id,
        user_id: model.user_id,
        user_name: user_name.to_string(),
        punisher_id: model.punisher_id,
        punisher_name: punisher_name.to_string(),
        kind: model.kind,
        reason: model.reason,
        loan_id: model.loan_id,
        started_at: model.started_at,
        ends_at: model.ends_at,
        is_active,
        remaining_days,
    }
}
