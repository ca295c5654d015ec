//! Batch orchestrator.
//!
//! Each job iterates its items, logs and collects per-item failures into a
//! [`JobSummary`] and never lets one item abort the batch. A failure of the
//! run itself (listing funds, reading movements) is retried by the
//! [`RetryPolicy`]; when the policy is exhausted an alert goes out and the
//! error is returned.

use crate::db::Repository;
use crate::domain::{
    local_now, Clock, Decimal, DecimalExt, FundType, MovementKind, MovementStatus,
};
use crate::engine::delinquency::delinquency;
use crate::movements::MovementProcessor;
use crate::notify::Notifier;
use crate::orchestration::retry::run_with_retry;
use crate::orchestration::{JobError, JobKind, JobSummary, RetryPolicy};
use crate::pricing::PricingEngine;
use crate::reporting::{QuotaReport, QuotaReporter};
use chrono::{Duration, NaiveDate};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    repo: Arc<Repository>,
    pricing: PricingEngine,
    movements: MovementProcessor,
    notifier: Arc<dyn Notifier>,
    reporter: Arc<dyn QuotaReporter>,
    retry: RetryPolicy,
    delinquency_threshold_pct: Decimal,
    clock: Clock,
}

impl BatchOrchestrator {
    pub fn new(
        repo: Arc<Repository>,
        pricing: PricingEngine,
        movements: MovementProcessor,
        notifier: Arc<dyn Notifier>,
        reporter: Arc<dyn QuotaReporter>,
        retry: RetryPolicy,
        delinquency_threshold_pct: Decimal,
    ) -> Self {
        Self {
            repo,
            pricing,
            movements,
            notifier,
            reporter,
            retry,
            delinquency_threshold_pct,
            clock: local_now,
        }
    }

    /// Replace the clock used to stamp submitted reports.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Price every active fund for `reference_date`.
    pub async fn run_daily_pricing(&self, reference_date: NaiveDate) -> Result<JobSummary, JobError> {
        self.run(JobKind::Pricing, || self.pricing_pass(reference_date))
            .await
    }

    /// Settle movements quoted on the calendar day before `today`.
    pub async fn run_daily_settlement(&self, today: NaiveDate) -> Result<JobSummary, JobError> {
        let quoted_on = today - Duration::days(1);
        self.run(JobKind::Settlement, || self.settlement_pass(quoted_on))
            .await
    }

    /// Check every active receivables fund against the delinquency threshold.
    pub async fn run_delinquency_sweep(&self, as_of: NaiveDate) -> Result<JobSummary, JobError> {
        self.run(JobKind::Delinquency, || self.delinquency_pass(as_of))
            .await
    }

    /// Submit the quotas of the calendar day before `today` not yet reported.
    pub async fn run_report_submission(&self, today: NaiveDate) -> Result<JobSummary, JobError> {
        let reference_date = today - Duration::days(1);
        self.run(JobKind::Reports, || self.report_pass(reference_date))
            .await
    }

    /// Best-effort alert: delivery failures are logged and dropped.
    pub async fn send_alert(&self, subject: &str, body: &str) {
        if let Err(e) = self.notifier.notify(subject, body).await {
            error!(subject = %subject, error = %e, "alert delivery failed");
        }
    }

    async fn run<F, Fut>(&self, job: JobKind, pass: F) -> Result<JobSummary, JobError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<JobSummary, JobError>>,
    {
        match run_with_retry(&self.retry, job, pass).await {
            Ok(summary) => {
                info!(
                    job = %job,
                    date = %summary.reference_date,
                    total = summary.total,
                    succeeded = summary.succeeded,
                    failed = summary.failed(),
                    "job finished"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(job = %job, error = %e, "job failed after retries");
                self.send_alert(
                    &format!("{job} job failed"),
                    &format!(
                        "The {job} job failed after {} attempts: {e}",
                        self.retry.max_retries + 1
                    ),
                )
                .await;
                Err(e)
            }
        }
    }

    async fn pricing_pass(&self, reference_date: NaiveDate) -> Result<JobSummary, JobError> {
        let funds = self.repo.list_active_funds(None).await?;
        info!(funds = funds.len(), date = %reference_date, "pricing active funds");

        let mut summary = JobSummary::new(JobKind::Pricing, reference_date);
        for fund in &funds {
            summary.total += 1;
            match self.pricing.price_fund_close(&fund.id, reference_date).await {
                Ok(_) => summary.succeeded += 1,
                Err(e) => {
                    error!(fund_id = %fund.id, error = %e, "pricing failed");
                    summary.errors.push(format!("{}: {e}", fund.legal_name));
                }
            }
        }

        if !summary.errors.is_empty() {
            self.send_alert(
                &format!(
                    "Quota pricing - {} OK / {} errors",
                    summary.succeeded,
                    summary.failed()
                ),
                &failure_body(&summary),
            )
            .await;
        }
        Ok(summary)
    }

    async fn settlement_pass(&self, quoted_on: NaiveDate) -> Result<JobSummary, JobError> {
        let mut due = self
            .repo
            .movements_due(MovementKind::Subscription, MovementStatus::AwaitingPayment, quoted_on)
            .await?;
        due.extend(
            self.repo
                .movements_due(MovementKind::Redemption, MovementStatus::Requested, quoted_on)
                .await?,
        );
        info!(movements = due.len(), date = %quoted_on, "settling movements");

        let mut summary = JobSummary::new(JobKind::Settlement, quoted_on);
        for movement in &due {
            summary.total += 1;
            match self.movements.settle(&movement.id).await {
                Ok(_) => summary.succeeded += 1,
                Err(e) => {
                    error!(movement_id = %movement.id, error = %e, "settlement failed");
                    summary
                        .errors
                        .push(format!("{} {}: {e}", movement.kind.code(), movement.id));
                }
            }
        }

        if !summary.errors.is_empty() {
            self.send_alert(
                &format!(
                    "Settlement - {} OK / {} errors",
                    summary.succeeded,
                    summary.failed()
                ),
                &failure_body(&summary),
            )
            .await;
        }
        Ok(summary)
    }

    async fn delinquency_pass(&self, as_of: NaiveDate) -> Result<JobSummary, JobError> {
        let funds = self.repo.list_active_funds(Some(FundType::Receivables)).await?;

        let mut summary = JobSummary::new(JobKind::Delinquency, as_of);
        for fund in &funds {
            summary.total += 1;
            let receivables = match self.repo.list_receivables(&fund.id).await {
                Ok(rs) => rs,
                Err(e) => {
                    error!(fund_id = %fund.id, error = %e, "loading receivables failed");
                    summary.errors.push(format!("{}: {e}", fund.legal_name));
                    continue;
                }
            };
            summary.succeeded += 1;

            let Some(report) = delinquency(&receivables) else {
                continue;
            };
            if report.exceeds(self.delinquency_threshold_pct) {
                let line = format!(
                    "{}\nDelinquency: {}%\nPast due: {}\nPortfolio: {}",
                    fund.legal_name,
                    report.ratio_pct,
                    report.past_due_face.round_money(),
                    report.outstanding_face.round_money()
                );
                warn!(fund_id = %fund.id, ratio = %report.ratio_pct, "delinquency above threshold");
                summary.alerts.push(line);
            }
        }

        if !summary.alerts.is_empty() {
            self.send_alert(
                &format!("Delinquency alert - {} fund(s)", summary.alerts.len()),
                &summary.alerts.join("\n\n"),
            )
            .await;
        }
        Ok(summary)
    }

    async fn report_pass(&self, reference_date: NaiveDate) -> Result<JobSummary, JobError> {
        let pending = self.repo.unreported_quotas(reference_date).await?;
        info!(quotas = pending.len(), date = %reference_date, "submitting quota reports");

        let mut summary = JobSummary::new(JobKind::Reports, reference_date);
        for quota in &pending {
            summary.total += 1;
            let fund = match self.repo.get_fund(&quota.fund_id).await {
                Ok(Some(fund)) => fund,
                Ok(None) => {
                    summary.errors.push(format!("fund {} not found", quota.fund_id));
                    continue;
                }
                Err(e) => {
                    error!(fund_id = %quota.fund_id, error = %e, "loading fund failed");
                    summary.errors.push(format!("fund {}: {e}", quota.fund_id));
                    continue;
                }
            };

            let report = QuotaReport::new(&fund, quota);
            let submitted = match self.reporter.submit(&report).await {
                Ok(_) => {
                    let now = (self.clock)();
                    self.repo
                        .mark_quota_reported(&quota.fund_id, reference_date, now)
                        .await
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                }
                Err(e) => Err(e.to_string()),
            };
            match submitted {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    error!(fund_id = %quota.fund_id, error = %e, "quota report failed");
                    summary.errors.push(format!("{}: {e}", fund.legal_name));
                }
            }
        }
        Ok(summary)
    }
}

fn failure_body(summary: &JobSummary) -> String {
    format!(
        "Succeeded: {}\n\nErrors:\n{}",
        summary.succeeded,
        summary.errors.join("\n")
    )
}
