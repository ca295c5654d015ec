pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod movements;
pub mod notify;
pub mod orchestration;
pub mod pricing;
pub mod reporting;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Decimal, Fund, FundId, FundType, Movement, MovementId, MovementKind, MovementStatus,
    QuotaHistory, Quotaholder, QuotaholderId,
};
pub use error::{AppError, FundError};
pub use movements::MovementProcessor;
pub use notify::{LogNotifier, MockNotifier, Notifier, WebhookNotifier};
pub use orchestration::{BatchOrchestrator, JobKind, JobSummary, RetryPolicy};
pub use pricing::PricingEngine;
pub use reporting::{QuotaReporter, StubReporter};
