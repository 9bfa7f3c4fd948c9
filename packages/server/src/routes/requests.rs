use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use engine_core::domains::requests::models::{
    HelpRequest, NewHelpRequest, RequestFilter, RequestStatus, StatusLog,
};
use engine_core::{RequestId, UserId};

use crate::app::AppState;
use crate::error::ApiResult;

pub async fn create_request(
    State(state): State<AppState>,
    Json(input): Json<NewHelpRequest>,
) -> ApiResult<(StatusCode, Json<HelpRequest>)> {
    let request = state.engine.create_request(input).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn list_requests(
    State(state): State<AppState>,
    Query(filter): Query<RequestFilter>,
) -> ApiResult<Json<Vec<HelpRequest>>> {
    Ok(Json(state.engine.list_requests(&filter).await?))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<HelpRequest>> {
    Ok(Json(state.engine.request(RequestId::from_uuid(id)).await?))
}

#[derive(Debug, Deserialize)]
pub struct AdvanceRequestBody {
    pub target_status: RequestStatus,
    pub actor_id: UserId,
    #[serde(default)]
    pub note: Option<String>,
}

pub async fn advance_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AdvanceRequestBody>,
) -> ApiResult<Json<HelpRequest>> {
    let request = state
        .engine
        .advance_request(
            RequestId::from_uuid(id),
            body.target_status,
            body.actor_id,
            body.note,
        )
        .await?;
    Ok(Json(request))
}

#[derive(Debug, Deserialize)]
pub struct CancelRequestBody {
    pub actor_id: UserId,
    #[serde(default)]
    pub note: Option<String>,
}

pub async fn cancel_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CancelRequestBody>,
) -> ApiResult<Json<HelpRequest>> {
    let request = state
        .engine
        .cancel_request(RequestId::from_uuid(id), body.actor_id, body.note)
        .await?;
    Ok(Json(request))
}

pub async fn status_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<StatusLog>>> {
    Ok(Json(
        state
            .engine
            .status_history(RequestId::from_uuid(id))
            .await?,
    ))
}
