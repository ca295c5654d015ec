//! Daily NAV and quota price computation.
//!
//! Pure: the pricing service loads the inputs, calls [`value_fund`] and
//! persists the outcome.

use crate::domain::{
    Asset, Decimal, DecimalExt, Fund, ProvisioningUpdate, QuotaHistory, Receivable,
};
use crate::engine::tax::{provisioning, ProvisioningTable};
use crate::error::FundError;
use chrono::{Datelike, NaiveDate};
use rust_decimal_macros::dec;

/// Share count used when a fund has no quota history yet.
pub const SEED_SHARE_COUNT: Decimal = dec!(1000000.000000);

/// Price used when the share count is not positive.
pub const FALLBACK_SHARE_PRICE: Decimal = dec!(1.000000);

/// Fee accrual convention: commercial month of 30 days.
const DAYS_PER_MONTH: Decimal = dec!(30);
const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Everything the valuation needs, already loaded.
#[derive(Debug, Clone, Copy)]
pub struct ValuationInput<'a> {
    pub fund: &'a Fund,
    pub reference_date: NaiveDate,
    pub assets: &'a [Asset],
    /// Receivables eligible for provisioning (written-off ones excluded).
    pub receivables: &'a [Receivable],
    /// Most recent quota strictly before `reference_date`.
    pub previous: Option<&'a QuotaHistory>,
    pub holder_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Valuation {
    /// Market value of active assets, net of provisioning.
    pub portfolio_value: Decimal,
    pub total_provisioning: Decimal,
    pub available_cash: Decimal,
    pub fee_liability: Decimal,
    pub net_asset_value: Decimal,
    pub share_count: Decimal,
    pub share_price: Decimal,
    pub daily_return: Decimal,
    pub provisioning_updates: Vec<ProvisioningUpdate>,
}

impl Valuation {
    /// The quota row this valuation produces.
    pub fn to_quota(&self, input: &ValuationInput<'_>) -> QuotaHistory {
        QuotaHistory::priced(
            input.fund.id.clone(),
            input.reference_date,
            self.share_price,
            self.net_asset_value.round_money(),
            self.share_count,
            input.holder_count,
            self.daily_return,
        )
    }
}

/// Provisioning for every eligible receivable, in input order.
///
/// # Errors
/// `InvalidInput` if a receivable has negative days past due or face value.
pub fn provision_receivables(
    table: &ProvisioningTable,
    receivables: &[Receivable],
) -> Result<Vec<ProvisioningUpdate>, FundError> {
    receivables
        .iter()
        .filter(|r| !r.is_written_off())
        .map(|r| {
            let amount = provisioning(table, r.days_past_due, r.face_value)?;
            let pct = if r.face_value > Decimal::ZERO {
                (amount / r.face_value * dec!(100)).round_money()
            } else {
                Decimal::ZERO
            };
            Ok(ProvisioningUpdate {
                receivable_id: r.id.clone(),
                provisioning_pct: pct,
                provisioning_amount: amount,
            })
        })
        .collect()
}

/// Pro-rata administration plus management fee accrued up to `reference_date`.
pub fn accrued_fees(fund: &Fund, base: Decimal, reference_date: NaiveDate) -> Decimal {
    let elapsed = Decimal::from(reference_date.day()) / DAYS_PER_MONTH;
    let monthly = |annual: Option<Decimal>| annual.unwrap_or(Decimal::ZERO) / MONTHS_PER_YEAR;
    base * monthly(fund.admin_fee_rate) * elapsed + base * monthly(fund.management_fee_rate) * elapsed
}

/// `(price / previous) - 1`, 6 dp; zero without a usable previous price.
pub fn daily_return(price: Decimal, previous: Option<&QuotaHistory>) -> Decimal {
    match previous {
        Some(prev) if !prev.share_price.is_zero() => {
            (price / prev.share_price - Decimal::ONE).round_quota()
        }
        _ => Decimal::ZERO,
    }
}

/// Value a fund for its closing quota.
///
/// # Errors
/// `InvalidInput` if receivable data is inconsistent.
pub fn value_fund(
    table: &ProvisioningTable,
    input: &ValuationInput<'_>,
) -> Result<Valuation, FundError> {
    let mut portfolio_value: Decimal = input
        .assets
        .iter()
        .filter(|a| a.active)
        .map(|a| a.market_value.unwrap_or(Decimal::ZERO))
        .sum();

    let provisioning_updates = if input.fund.fund_type.is_receivables_based() {
        provision_receivables(table, input.receivables)?
    } else {
        Vec::new()
    };
    let total_provisioning: Decimal = provisioning_updates
        .iter()
        .map(|u| u.provisioning_amount)
        .sum();
    portfolio_value -= total_provisioning;

    // Bank statement integration lives outside the core.
    let available_cash = Decimal::ZERO;

    let gross = portfolio_value + available_cash;
    let fee_liability = accrued_fees(input.fund, gross, input.reference_date);
    let net_asset_value = gross - fee_liability;

    let share_count = input
        .previous
        .map(|q| q.share_count)
        .unwrap_or(SEED_SHARE_COUNT);

    let share_price = if share_count > Decimal::ZERO {
        (net_asset_value / share_count).round_quota()
    } else {
        FALLBACK_SHARE_PRICE
    };

    Ok(Valuation {
        portfolio_value,
        total_provisioning,
        available_cash,
        fee_liability,
        net_asset_value,
        share_count,
        share_price,
        daily_return: daily_return(share_price, input.previous),
        provisioning_updates,
    })
}
