use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use engine_core::domains::volunteers::models::{
    NewVolunteerProfile, VolunteerProfile, VolunteerStatus,
};
use engine_core::{UserId, VolunteerId};

use crate::app::AppState;
use crate::error::ApiResult;

pub async fn register_volunteer(
    State(state): State<AppState>,
    Json(input): Json<NewVolunteerProfile>,
) -> ApiResult<(StatusCode, Json<VolunteerProfile>)> {
    let profile = state.engine.register_volunteer(input).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityBody {
    pub status: VolunteerStatus,
    pub actor_id: UserId,
}

pub async fn volunteer_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<VolunteerProfile>> {
    let profile = state
        .engine
        .volunteer_for_user(UserId::from_uuid(user_id))
        .await?;
    Ok(Json(profile))
}

pub async fn set_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AvailabilityBody>,
) -> ApiResult<Json<VolunteerProfile>> {
    let profile = state
        .engine
        .set_volunteer_availability(VolunteerId::from_uuid(id), body.status, body.actor_id)
        .await?;
    Ok(Json(profile))
}
