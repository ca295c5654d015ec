pub mod health;
pub mod jobs;
pub mod movements;
pub mod quotas;

use crate::db::Repository;
use crate::movements::MovementProcessor;
use crate::orchestration::BatchOrchestrator;
use crate::pricing::PricingEngine;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub pricing: PricingEngine,
    pub movements: MovementProcessor,
    pub orchestrator: Arc<BatchOrchestrator>,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        pricing: PricingEngine,
        movements: MovementProcessor,
        orchestrator: Arc<BatchOrchestrator>,
    ) -> Self {
        Self {
            repo,
            pricing,
            movements,
            orchestrator,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/funds/:fund_id/quotas",
            post(quotas::price_quota).get(quotas::get_quota_history),
        )
        .route(
            "/v1/funds/:fund_id/returns/monthly",
            post(quotas::recompute_monthly_return),
        )
        .route(
            "/v1/movements/subscriptions",
            post(movements::create_subscription),
        )
        .route("/v1/movements/redemptions", post(movements::create_redemption))
        .route("/v1/movements/:id", get(movements::get_movement))
        .route("/v1/movements/:id/settle", post(movements::settle_movement))
        .route("/v1/movements/:id/cancel", post(movements::cancel_movement))
        .route("/v1/jobs/pricing", post(jobs::run_pricing))
        .route("/v1/jobs/settlement", post(jobs::run_settlement))
        .route("/v1/jobs/delinquency", post(jobs::run_delinquency))
        .route("/v1/jobs/reports", post(jobs::run_reports))
        .layer(cors)
        .with_state(state)
}
