use crate::api::AppState;
use crate::domain::{local_now, Decimal, FundId, Movement, MovementId, QuotaholderId};
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDateTime;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub fund_id: String,
    pub quotaholder_id: String,
    pub amount: Decimal,
    /// Defaults to the current local time.
    pub requested_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionRequest {
    pub fund_id: String,
    pub quotaholder_id: String,
    pub share_count: Decimal,
    pub requested_at: Option<NaiveDateTime>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub reason: Option<String>,
}

pub async fn create_subscription(
    State(state): State<AppState>,
    Json(req): Json<SubscriptionRequest>,
) -> Result<(StatusCode, Json<Movement>), AppError> {
    let movement = state
        .movements
        .subscribe(
            &FundId::new(req.fund_id),
            &QuotaholderId::new(req.quotaholder_id),
            req.amount,
            req.requested_at.unwrap_or_else(local_now),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

pub async fn create_redemption(
    State(state): State<AppState>,
    Json(req): Json<RedemptionRequest>,
) -> Result<(StatusCode, Json<Movement>), AppError> {
    let movement = state
        .movements
        .redeem(
            &FundId::new(req.fund_id),
            &QuotaholderId::new(req.quotaholder_id),
            req.share_count,
            req.requested_at.unwrap_or_else(local_now),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

pub async fn get_movement(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Movement>, AppError> {
    let movement = state.movements.movement(&MovementId::new(id)).await?;
    Ok(Json(movement))
}

pub async fn settle_movement(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Movement>, AppError> {
    let movement = state.movements.settle(&MovementId::new(id)).await?;
    Ok(Json(movement))
}

pub async fn cancel_movement(
    Path(id): Path<String>,
    State(state): State<AppState>,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<Movement>, AppError> {
    let Json(req) = body.unwrap_or_default();
    let movement = state
        .movements
        .cancel(&MovementId::new(id), req.reason.as_deref())
        .await?;
    Ok(Json(movement))
}
