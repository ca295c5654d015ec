//! Manual triggers for the batch jobs.
//!
//! `referenceDate` is the run date: pricing prices that date, settlement and
//! report submission process the day before it. It defaults to today.

use crate::api::AppState;
use crate::domain::local_now;
use crate::error::AppError;
use crate::orchestration::JobSummary;
use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub reference_date: Option<NaiveDate>,
}

fn run_date(body: Option<Json<JobRequest>>) -> NaiveDate {
    body.and_then(|Json(req)| req.reference_date)
        .unwrap_or_else(|| local_now().date())
}

pub async fn run_pricing(
    State(state): State<AppState>,
    body: Option<Json<JobRequest>>,
) -> Result<Json<JobSummary>, AppError> {
    let summary = state.orchestrator.run_daily_pricing(run_date(body)).await?;
    Ok(Json(summary))
}

pub async fn run_settlement(
    State(state): State<AppState>,
    body: Option<Json<JobRequest>>,
) -> Result<Json<JobSummary>, AppError> {
    let summary = state
        .orchestrator
        .run_daily_settlement(run_date(body))
        .await?;
    Ok(Json(summary))
}

pub async fn run_delinquency(
    State(state): State<AppState>,
    body: Option<Json<JobRequest>>,
) -> Result<Json<JobSummary>, AppError> {
    let summary = state
        .orchestrator
        .run_delinquency_sweep(run_date(body))
        .await?;
    Ok(Json(summary))
}

pub async fn run_reports(
    State(state): State<AppState>,
    body: Option<Json<JobRequest>>,
) -> Result<Json<JobSummary>, AppError> {
    let summary = state
        .orchestrator
        .run_report_submission(run_date(body))
        .await?;
    Ok(Json(summary))
}
