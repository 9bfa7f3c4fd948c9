use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use engine_core::domains::notifications::models::Notification;
use engine_core::{NotificationId, UserId};

use crate::app::AppState;
use crate::error::ApiResult;

pub async fn notifications(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(
        state
            .engine
            .notifications_for_user(UserId::from_uuid(user_id))
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct MarkReadBody {
    pub actor_id: UserId,
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<MarkReadBody>,
) -> ApiResult<Json<Notification>> {
    let updated = state
        .engine
        .mark_notification_read(NotificationId::from_uuid(id), body.actor_id)
        .await?;
    Ok(Json(updated))
}
