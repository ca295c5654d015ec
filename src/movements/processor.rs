//! Subscription and redemption lifecycle.

use crate::db::repo::{funds, movements, quotas};
use crate::db::Repository;
use crate::domain::{
    Decimal, DecimalExt, Fund, FundId, Movement, MovementId, MovementKind, MovementStatus,
    QuotaholderId,
};
use crate::engine::calendar::{add_business_days, quotation_date};
use crate::engine::tax::{settlement_taxes, TaxTables};
use crate::error::FundError;
use crate::movements::locks::MovementLocks;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteConnection;
use std::sync::Arc;
use tracing::{info, warn};

/// Fixed settlement parameters for redemptions.
///
/// There is no per-holder cost basis, so redemption taxes are estimated from
/// a cost basis of `cost_basis_ratio` of the gross value, subscribed
/// `assumed_holding_days` before the quotation date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRules {
    pub redemption_lag_days: u32,
    pub cost_basis_ratio: Decimal,
    pub assumed_holding_days: i64,
}

impl Default for SettlementRules {
    fn default() -> Self {
        Self {
            redemption_lag_days: 3,
            cost_basis_ratio: dec!(0.80),
            assumed_holding_days: 800,
        }
    }
}

/// Compute the settled form of a pending movement at `share_price`.
///
/// # Errors
/// `InvalidState` for kinds that are not settled here or a non-positive
/// price; `InvalidInput` if the request is missing its amount or share count.
pub fn settled_movement(
    movement: &Movement,
    share_price: Decimal,
    tax: &TaxTables,
    rules: &SettlementRules,
) -> Result<Movement, FundError> {
    if share_price <= Decimal::ZERO {
        return Err(FundError::invalid_state(format!(
            "quota price for {} is not positive",
            movement.quotation_date
        )));
    }
    let mut settled = movement.clone();
    settled.share_price = Some(share_price);
    settled.status = MovementStatus::Confirmed;

    match movement.kind {
        MovementKind::Subscription => {
            let amount = movement.amount.ok_or_else(|| {
                FundError::invalid_input(format!("subscription {} has no amount", movement.id))
            })?;
            settled.share_count = Some((amount / share_price).round_quota());
            settled.net_value = Some(amount);
        }
        MovementKind::Redemption => {
            let shares = movement.share_count.ok_or_else(|| {
                FundError::invalid_input(format!("redemption {} has no share count", movement.id))
            })?;
            let gross = (shares * share_price).round_money();
            let taxes = settlement_taxes(
                tax,
                gross,
                gross * rules.cost_basis_ratio,
                movement.quotation_date - Duration::days(rules.assumed_holding_days),
                movement.quotation_date,
            )?;
            settled.amount = Some(gross);
            settled.income_tax = taxes.income_tax;
            settled.transaction_tax = taxes.transaction_tax;
            settled.net_value = Some(taxes.net_value);
        }
        MovementKind::PeriodicTaxDebit => {
            return Err(FundError::invalid_state(format!(
                "movement {} is a periodic tax debit and is not settled by request",
                movement.id
            )));
        }
    }
    Ok(settled)
}

#[derive(Debug, Clone)]
pub struct MovementProcessor {
    repo: Arc<Repository>,
    tax: TaxTables,
    rules: SettlementRules,
    locks: Arc<MovementLocks>,
}

impl MovementProcessor {
    pub fn new(repo: Arc<Repository>, tax: TaxTables, rules: SettlementRules) -> Self {
        Self {
            repo,
            tax,
            rules,
            locks: Arc::new(MovementLocks::new()),
        }
    }

    /// Register a subscription of `amount`, awaiting payment.
    ///
    /// # Errors
    /// `NotFound` for a missing or inactive fund or quotaholder;
    /// `InvalidInput` unless `amount` is positive.
    pub async fn subscribe(
        &self,
        fund_id: &FundId,
        quotaholder_id: &QuotaholderId,
        amount: Decimal,
        requested_at: NaiveDateTime,
    ) -> Result<Movement, FundError> {
        let mut conn = self.repo.pool().acquire().await?;
        let fund = active_parties(&mut conn, fund_id, quotaholder_id).await?;
        if amount <= Decimal::ZERO {
            return Err(FundError::invalid_input("subscription amount must be positive"));
        }

        let quoted_on = quotation_date(requested_at, fund.quotation_convention, fund.cutoff_time);
        let movement = pending(
            MovementKind::Subscription,
            &fund,
            quotaholder_id,
            requested_at,
            quoted_on,
            add_business_days(quoted_on, fund.settlement_lag_days),
            MovementStatus::AwaitingPayment,
        );
        let movement = Movement {
            amount: Some(amount),
            ..movement
        };
        movements::insert_movement(&mut conn, &movement).await?;

        info!(
            movement_id = %movement.id,
            fund_id = %fund_id,
            amount = %amount,
            quotation_date = %movement.quotation_date,
            "subscription requested"
        );
        Ok(movement)
    }

    /// Register a redemption of `share_count` shares.
    ///
    /// Holdings are not checked against the requested share count.
    ///
    /// # Errors
    /// `NotFound` for a missing or inactive fund or quotaholder;
    /// `InvalidInput` unless `share_count` is positive.
    pub async fn redeem(
        &self,
        fund_id: &FundId,
        quotaholder_id: &QuotaholderId,
        share_count: Decimal,
        requested_at: NaiveDateTime,
    ) -> Result<Movement, FundError> {
        let mut conn = self.repo.pool().acquire().await?;
        let fund = active_parties(&mut conn, fund_id, quotaholder_id).await?;
        if share_count <= Decimal::ZERO {
            return Err(FundError::invalid_input("redemption share count must be positive"));
        }

        let quoted_on = quotation_date(requested_at, fund.quotation_convention, fund.cutoff_time);
        let movement = pending(
            MovementKind::Redemption,
            &fund,
            quotaholder_id,
            requested_at,
            quoted_on,
            add_business_days(quoted_on, self.rules.redemption_lag_days),
            MovementStatus::Requested,
        );
        let movement = Movement {
            share_count: Some(share_count),
            ..movement
        };
        movements::insert_movement(&mut conn, &movement).await?;

        info!(
            movement_id = %movement.id,
            fund_id = %fund_id,
            shares = %share_count,
            quotation_date = %movement.quotation_date,
            "redemption requested"
        );
        Ok(movement)
    }

    /// Settle a pending movement against the quota of its quotation date.
    ///
    /// Settling an already confirmed movement returns it unchanged.
    ///
    /// # Errors
    /// `NotFound` if the movement or its quota is missing; `InvalidState` for
    /// cancelled movements and periodic tax debits.
    pub async fn settle(&self, movement_id: &MovementId) -> Result<Movement, FundError> {
        let _guard = self.locks.acquire(movement_id).await;
        let mut tx = self.repo.begin().await?;

        let movement = load(&mut tx, movement_id).await?;
        if movement.is_confirmed() {
            return Ok(movement);
        }
        if movement.status == MovementStatus::Cancelled {
            return Err(FundError::invalid_state(format!(
                "movement {movement_id} is cancelled"
            )));
        }
        if movement.kind == MovementKind::PeriodicTaxDebit {
            return Err(FundError::invalid_state(format!(
                "movement {movement_id} is a periodic tax debit"
            )));
        }

        let quota = quotas::fetch_quota(&mut tx, &movement.fund_id, movement.quotation_date)
            .await?
            .ok_or_else(|| {
                FundError::not_found(format!(
                    "quota of fund {} for {}",
                    movement.fund_id, movement.quotation_date
                ))
            })?;

        let settled = settled_movement(&movement, quota.share_price, &self.tax, &self.rules)?;

        if !movements::store_settlement(&mut tx, &settled, movement.status).await? {
            // Status moved underneath us; report what is stored now.
            let current = load(&mut tx, movement_id).await?;
            warn!(movement_id = %movement_id, status = %current.status, "settlement lost a race");
            if current.is_confirmed() {
                return Ok(current);
            }
            return Err(FundError::invalid_state(format!(
                "movement {movement_id} is {}",
                current.status
            )));
        }

        let (inflow, outflow) = match settled.kind {
            MovementKind::Subscription => (settled.amount.unwrap_or_default(), Decimal::ZERO),
            _ => (Decimal::ZERO, settled.amount.unwrap_or_default()),
        };
        quotas::add_daily_flows(&mut tx, &settled.fund_id, settled.quotation_date, inflow, outflow)
            .await?;

        tx.commit().await?;

        info!(
            movement_id = %movement_id,
            fund_id = %settled.fund_id,
            kind = settled.kind.code(),
            share_price = %quota.share_price,
            net_value = %settled.net_value.unwrap_or_default(),
            "movement settled"
        );
        Ok(settled)
    }

    /// Cancel a pending movement, recording `reason` in its metadata.
    ///
    /// Cancelling an already cancelled movement succeeds and replaces the reason.
    ///
    /// # Errors
    /// `NotFound` if the movement is missing; `InvalidState` if it is confirmed.
    pub async fn cancel(
        &self,
        movement_id: &MovementId,
        reason: Option<&str>,
    ) -> Result<Movement, FundError> {
        let _guard = self.locks.acquire(movement_id).await;
        let mut tx = self.repo.begin().await?;

        let movement = load(&mut tx, movement_id).await?;
        if !movement.status.can_transition_to(MovementStatus::Cancelled) {
            return Err(FundError::invalid_state(format!(
                "movement {movement_id} is {} and cannot be cancelled",
                movement.status
            )));
        }

        let mut cancelled = movement.clone();
        cancelled.status = MovementStatus::Cancelled;
        if let Some(reason) = reason {
            cancelled.set_cancellation_reason(reason);
        }

        if !movements::store_status(&mut tx, &cancelled, movement.status).await? {
            let current = load(&mut tx, movement_id).await?;
            return Err(FundError::invalid_state(format!(
                "movement {movement_id} is {}",
                current.status
            )));
        }
        tx.commit().await?;

        info!(movement_id = %movement_id, reason = reason.unwrap_or(""), "movement cancelled");
        Ok(cancelled)
    }

    /// # Errors
    /// `NotFound` if the movement does not exist.
    pub async fn movement(&self, movement_id: &MovementId) -> Result<Movement, FundError> {
        let mut conn = self.repo.pool().acquire().await?;
        load(&mut conn, movement_id).await
    }
}

async fn load(conn: &mut SqliteConnection, movement_id: &MovementId) -> Result<Movement, FundError> {
    movements::fetch_movement(conn, movement_id)
        .await?
        .ok_or_else(|| FundError::not_found(format!("movement {movement_id}")))
}

/// The fund, provided both it and the quotaholder exist and are active.
async fn active_parties(
    conn: &mut SqliteConnection,
    fund_id: &FundId,
    quotaholder_id: &QuotaholderId,
) -> Result<Fund, FundError> {
    let fund = funds::fetch_fund(&mut *conn, fund_id)
        .await?
        .filter(|f| f.active)
        .ok_or_else(|| FundError::not_found(format!("active fund {fund_id}")))?;
    funds::fetch_quotaholder(&mut *conn, quotaholder_id)
        .await?
        .filter(|q| q.active)
        .ok_or_else(|| FundError::not_found(format!("active quotaholder {quotaholder_id}")))?;
    Ok(fund)
}

fn pending(
    kind: MovementKind,
    fund: &Fund,
    quotaholder_id: &QuotaholderId,
    requested_at: NaiveDateTime,
    quotation_date: NaiveDate,
    settlement_date: NaiveDate,
    status: MovementStatus,
) -> Movement {
    Movement {
        id: MovementId::generate(),
        kind,
        fund_id: fund.id.clone(),
        quotaholder_id: quotaholder_id.clone(),
        requested_at,
        quotation_date,
        settlement_date,
        amount: None,
        share_price: None,
        share_count: None,
        income_tax: Decimal::ZERO,
        transaction_tax: Decimal::ZERO,
        net_value: None,
        status,
        metadata: None,
    }
}
