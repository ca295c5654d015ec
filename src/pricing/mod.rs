//! Closing quota computation and period returns.
//!
//! [`PricingEngine`] loads a fund's portfolio, runs the pure valuation in
//! [`crate::engine::valuation`] and persists the receivable provisioning and
//! the quota row in a single transaction.

use crate::db::repo::{funds, movements, portfolio, quotas, quotas::ReturnPeriod};
use crate::db::Repository;
use crate::domain::{Decimal, DecimalExt, FundId, QuotaHistory};
use crate::engine::tax::ProvisioningTable;
use crate::engine::valuation::{value_fund, ValuationInput};
use crate::error::FundError;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PricingEngine {
    repo: Arc<Repository>,
    provisioning: ProvisioningTable,
}

impl PricingEngine {
    pub fn new(repo: Arc<Repository>, provisioning: ProvisioningTable) -> Self {
        Self { repo, provisioning }
    }

    /// Price a fund's closing quota for `reference_date` and persist it.
    ///
    /// Re-pricing the same date overwrites the pricing columns of the existing
    /// row and yields the same values when the inputs are unchanged.
    ///
    /// # Errors
    /// `NotFound` if the fund does not exist; `InvalidInput` on inconsistent
    /// receivable data; `Database` on persistence failure. Nothing is written
    /// on error.
    pub async fn price_fund_close(
        &self,
        fund_id: &FundId,
        reference_date: NaiveDate,
    ) -> Result<QuotaHistory, FundError> {
        let mut tx = self.repo.begin().await?;

        let fund = funds::fetch_fund(&mut *tx, fund_id)
            .await?
            .ok_or_else(|| FundError::not_found(format!("fund {fund_id}")))?;

        let assets = portfolio::fetch_active_assets(&mut *tx, fund_id).await?;
        let receivables = if fund.fund_type.is_receivables_based() {
            portfolio::fetch_provisionable_receivables(&mut *tx, fund_id).await?
        } else {
            Vec::new()
        };
        let previous = quotas::fetch_previous_quota(&mut *tx, fund_id, reference_date).await?;
        let holder_count = movements::count_confirmed_holders(&mut *tx, fund_id).await?;

        let input = ValuationInput {
            fund: &fund,
            reference_date,
            assets: &assets,
            receivables: &receivables,
            previous: previous.as_ref(),
            holder_count,
        };
        let valuation = value_fund(&self.provisioning, &input)?;

        let provisioned =
            portfolio::apply_provisioning(&mut *tx, &valuation.provisioning_updates).await?;
        let quota = valuation.to_quota(&input);
        quotas::upsert_pricing(&mut *tx, &quota).await?;
        let stored = quotas::fetch_quota(&mut *tx, fund_id, reference_date)
            .await?
            .unwrap_or(quota);

        tx.commit().await?;

        debug!(
            fund_id = %fund_id,
            portfolio = %valuation.portfolio_value,
            provisioning = %valuation.total_provisioning,
            fees = %valuation.fee_liability,
            receivables = provisioned,
            "valuation persisted"
        );
        info!(
            fund_id = %fund_id,
            date = %reference_date,
            share_price = %stored.share_price,
            nav = %stored.net_asset_value,
            "quota priced"
        );
        Ok(stored)
    }

    /// Stamp `(last / first) - 1` on every quota row of the month.
    ///
    /// Returns `None` (and writes nothing) when the month has no rows or its
    /// first price is zero.
    ///
    /// # Errors
    /// `InvalidInput` for an impossible month or year.
    pub async fn recompute_monthly_return(
        &self,
        fund_id: &FundId,
        month: u32,
        year: i32,
    ) -> Result<Option<Decimal>, FundError> {
        let (from, until) = month_bounds(year, month)?;
        self.recompute_period_return(fund_id, ReturnPeriod::Monthly, from, until)
            .await
    }

    /// Same rule as the monthly return, over a calendar year.
    ///
    /// # Errors
    /// `InvalidInput` for an unrepresentable year.
    pub async fn recompute_yearly_return(
        &self,
        fund_id: &FundId,
        year: i32,
    ) -> Result<Option<Decimal>, FundError> {
        let (from, until) = year_bounds(year)?;
        self.recompute_period_return(fund_id, ReturnPeriod::Yearly, from, until)
            .await
    }

    async fn recompute_period_return(
        &self,
        fund_id: &FundId,
        period: ReturnPeriod,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Option<Decimal>, FundError> {
        let mut tx = self.repo.begin().await?;
        let rows = quotas::fetch_quotas_between(&mut *tx, fund_id, from, until).await?;

        let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
            debug!(fund_id = %fund_id, from = %from, "no quotas in period");
            return Ok(None);
        };
        if first.share_price.is_zero() {
            debug!(fund_id = %fund_id, from = %from, "first quota of period has zero price");
            return Ok(None);
        }

        let value = (last.share_price / first.share_price - Decimal::ONE).round_quota();
        let stamped =
            quotas::stamp_period_return(&mut *tx, fund_id, period, from, until, value).await?;
        tx.commit().await?;

        info!(
            fund_id = %fund_id,
            period = ?period,
            from = %from,
            rows = stamped,
            value = %value,
            "period return stamped"
        );
        Ok(Some(value))
    }

    /// Quota rows in the inclusive range `[from, to]`.
    ///
    /// # Errors
    /// `InvalidInput` if `from` is after `to`.
    pub async fn quota_history(
        &self,
        fund_id: &FundId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<QuotaHistory>, FundError> {
        if from > to {
            return Err(FundError::invalid_input(format!(
                "range start {from} is after end {to}"
            )));
        }
        Ok(self.repo.quota_history(fund_id, from, to).await?)
    }
}

/// `[first of month, first of next month)`.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), FundError> {
    let invalid = || FundError::invalid_input(format!("invalid month {month}/{year}"));
    let from = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let until = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    Ok((from, until))
}

/// `[January 1st, January 1st of next year)`.
pub fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate), FundError> {
    let invalid = || FundError::invalid_input(format!("invalid year {year}"));
    let from = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?;
    let until = NaiveDate::from_ymd_opt(year + 1, 1, 1).ok_or_else(invalid)?;
    Ok((from, until))
}
