use crate::api::AppState;
use crate::domain::{Decimal, FundId, QuotaHistory};
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuotaRequest {
    pub reference_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaHistoryQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaHistoryResponse {
    pub fund_id: FundId,
    pub quotas: Vec<QuotaHistory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReturnRequest {
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReturnResponse {
    pub fund_id: FundId,
    pub month: u32,
    pub year: i32,
    /// `None` when the month has no quotas or starts at a zero price.
    pub monthly_return: Option<Decimal>,
}

pub async fn price_quota(
    Path(fund_id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<PriceQuotaRequest>,
) -> Result<Json<QuotaHistory>, AppError> {
    let fund_id = FundId::new(fund_id);
    let quota = state
        .pricing
        .price_fund_close(&fund_id, req.reference_date)
        .await?;
    Ok(Json(quota))
}

pub async fn get_quota_history(
    Path(fund_id): Path<String>,
    Query(params): Query<QuotaHistoryQuery>,
    State(state): State<AppState>,
) -> Result<Json<QuotaHistoryResponse>, AppError> {
    let fund_id = FundId::new(fund_id);
    let quotas = state
        .pricing
        .quota_history(&fund_id, params.from, params.to)
        .await?;
    Ok(Json(QuotaHistoryResponse { fund_id, quotas }))
}

pub async fn recompute_monthly_return(
    Path(fund_id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<MonthlyReturnRequest>,
) -> Result<Json<MonthlyReturnResponse>, AppError> {
    let fund_id = FundId::new(fund_id);
    let monthly_return = state
        .pricing
        .recompute_monthly_return(&fund_id, req.month, req.year)
        .await?;
    Ok(Json(MonthlyReturnResponse {
        fund_id,
        month: req.month,
        year: req.year,
        monthly_return,
    }))
}
