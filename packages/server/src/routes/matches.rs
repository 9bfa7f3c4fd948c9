use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use engine_core::domains::matching::models::{Match, MatchDecision};
use engine_core::{MatchId, RequestId, UserId};

use crate::app::AppState;
use crate::error::ApiResult;

#[derive(Debug, Deserialize)]
pub struct RespondBody {
    pub decision: MatchDecision,
    pub actor_id: UserId,
}

pub async fn respond_to_match(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RespondBody>,
) -> ApiResult<Json<Match>> {
    let updated = state
        .engine
        .respond_to_match(MatchId::from_uuid(id), body.decision, body.actor_id)
        .await?;
    Ok(Json(updated))
}

pub async fn match_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Match>>> {
    Ok(Json(
        state.engine.match_history(RequestId::from_uuid(id)).await?,
    ))
}
