//! Provisioning and withholding-tax calculator.
//!
//! - PDD (provisioning for doubtful receivables), tiered by days past due
//! - Income tax on redemption gains, regressive by holding period
//! - IOF (financial transaction tax) on redemptions within 30 days
//! - Come-cotas, the periodic tax debit settled in shares
//!
//! Every function is pure and takes its tables explicitly. Amounts round
//! half-up: currency to 2 dp, share quantities to 6 dp.

use crate::domain::{Decimal, DecimalExt};
use crate::error::FundError;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// One inclusive range of days past due and its provisioning rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningTier {
    pub min_days: i64,
    /// `None` for the open-ended last tier.
    pub max_days: Option<i64>,
    pub rate: Decimal,
}

impl ProvisioningTier {
    fn contains(&self, days: i64) -> bool {
        days >= self.min_days && self.max_days.map_or(true, |max| days <= max)
    }
}

/// Provisioning tiers for credit receivables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningTable {
    pub tiers: Vec<ProvisioningTier>,
}

impl Default for ProvisioningTable {
    fn default() -> Self {
        let tier = |min_days, max_days, rate| ProvisioningTier {
            min_days,
            max_days,
            rate,
        };
        Self {
            tiers: vec![
                tier(0, Some(30), dec!(0.00)),
                tier(31, Some(60), dec!(0.01)),
                tier(61, Some(90), dec!(0.03)),
                tier(91, Some(120), dec!(0.10)),
                tier(121, Some(150), dec!(0.30)),
                tier(151, Some(180), dec!(0.50)),
                tier(181, Some(360), dec!(0.75)),
                tier(361, None, dec!(1.00)),
            ],
        }
    }
}

/// Income tax bracket: applies when days held is at most `max_days`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeTaxBracket {
    pub max_days: i64,
    pub rate: Decimal,
}

/// Withholding-tax parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxTables {
    /// Ascending by `max_days`.
    pub income_tax_brackets: Vec<IncomeTaxBracket>,
    /// Rate once the holding period exceeds every bracket.
    pub income_tax_long_term_rate: Decimal,
    /// IOF is zero from this many days held onwards.
    pub iof_exempt_after_days: i64,
    pub iof_initial_rate: Decimal,
    pub iof_daily_decrement: Decimal,
    /// Share of the redemption value the regressive IOF rate applies to.
    pub iof_base_factor: Decimal,
    pub come_cotas_rate: Decimal,
    /// Initial quota price; gains for come-cotas are measured against it.
    pub baseline_share_price: Decimal,
}

impl Default for TaxTables {
    fn default() -> Self {
        Self {
            income_tax_brackets: vec![
                IncomeTaxBracket {
                    max_days: 180,
                    rate: dec!(0.225),
                },
                IncomeTaxBracket {
                    max_days: 360,
                    rate: dec!(0.20),
                },
                IncomeTaxBracket {
                    max_days: 720,
                    rate: dec!(0.175),
                },
            ],
            income_tax_long_term_rate: dec!(0.15),
            iof_exempt_after_days: 30,
            iof_initial_rate: dec!(0.96),
            iof_daily_decrement: dec!(0.0333),
            iof_base_factor: dec!(0.01),
            come_cotas_rate: dec!(0.15),
            baseline_share_price: dec!(1.00),
        }
    }
}

impl TaxTables {
    /// Income tax rate for a holding period.
    pub fn income_tax_rate(&self, days_held: i64) -> Decimal {
        self.income_tax_brackets
            .iter()
            .find(|b| days_held <= b.max_days)
            .map(|b| b.rate)
            .unwrap_or(self.income_tax_long_term_rate)
    }

    /// Regressive IOF rate for a holding period (0 once exempt).
    pub fn iof_rate(&self, days_held: i64) -> Decimal {
        if days_held >= self.iof_exempt_after_days {
            return Decimal::ZERO;
        }
        let rate = self.iof_initial_rate - Decimal::from(days_held) * self.iof_daily_decrement;
        rate.max(Decimal::ZERO)
    }
}

/// Result of taxing a redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementTaxes {
    pub income_tax: Decimal,
    pub transaction_tax: Decimal,
    pub net_value: Decimal,
    pub days_held: i64,
    pub gross_gain: Decimal,
}

/// Rate of the tier that contains `days_past_due`.
///
/// # Errors
/// `InvalidInput` if `days_past_due` is negative.
pub fn provisioning_rate(table: &ProvisioningTable, days_past_due: i64) -> Result<Decimal, FundError> {
    if days_past_due < 0 {
        return Err(FundError::invalid_input("days past due cannot be negative"));
    }
    Ok(table
        .tiers
        .iter()
        .find(|t| t.contains(days_past_due))
        .map(|t| t.rate)
        .unwrap_or(Decimal::ZERO))
}

/// Provisioning amount for a receivable.
///
/// # Errors
/// `InvalidInput` if either argument is negative.
pub fn provisioning(
    table: &ProvisioningTable,
    days_past_due: i64,
    face_value: Decimal,
) -> Result<Decimal, FundError> {
    if face_value < Decimal::ZERO {
        return Err(FundError::invalid_input("face value cannot be negative"));
    }
    let rate = provisioning_rate(table, days_past_due)?;
    Ok((face_value * rate).round_money())
}

/// Income tax withheld on a redemption gain.
///
/// # Errors
/// `InvalidInput` if `days_held` is negative.
pub fn income_tax(
    tables: &TaxTables,
    redemption_value: Decimal,
    subscription_value: Decimal,
    days_held: i64,
) -> Result<Decimal, FundError> {
    if days_held < 0 {
        return Err(FundError::invalid_input("days held cannot be negative"));
    }
    let gain = redemption_value - subscription_value;
    if gain <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    Ok((gain * tables.income_tax_rate(days_held)).round_money())
}

/// IOF withheld on a redemption.
///
/// # Errors
/// `InvalidInput` if `days_held` is negative.
pub fn financial_transaction_tax(
    tables: &TaxTables,
    redemption_value: Decimal,
    days_held: i64,
) -> Result<Decimal, FundError> {
    if days_held < 0 {
        return Err(FundError::invalid_input("days held cannot be negative"));
    }
    let rate = tables.iof_rate(days_held);
    if rate.is_zero() {
        return Ok(Decimal::ZERO);
    }
    Ok((redemption_value * rate * tables.iof_base_factor).round_money())
}

/// Come-cotas: returns `(share_price, shares_to_remove)`.
///
/// Every gain above the baseline price is treated as taxable; a per-holder
/// cost basis is not available here.
pub fn periodic_share_tax_debit(
    tables: &TaxTables,
    net_asset_value: Decimal,
    share_count: Decimal,
) -> (Decimal, Decimal) {
    if share_count.is_zero() {
        return (Decimal::ZERO, Decimal::ZERO);
    }
    let share_price = net_asset_value / share_count;
    let gain = share_price - tables.baseline_share_price;
    if gain <= Decimal::ZERO || share_price.is_zero() {
        return (share_price, Decimal::ZERO);
    }
    let owed = gain * tables.come_cotas_rate;
    let shares_to_remove = (owed / share_price * share_count).round_quota();
    (share_price, shares_to_remove)
}

/// Income tax and IOF for a redemption, with the resulting net value.
///
/// # Errors
/// `InvalidInput` if the redemption date precedes the subscription date.
pub fn settlement_taxes(
    tables: &TaxTables,
    gross_value: Decimal,
    subscription_value: Decimal,
    subscription_date: NaiveDate,
    redemption_date: NaiveDate,
) -> Result<SettlementTaxes, FundError> {
    let days_held = (redemption_date - subscription_date).num_days();
    let income_tax = income_tax(tables, gross_value, subscription_value, days_held)?;
    let transaction_tax = financial_transaction_tax(tables, gross_value, days_held)?;
    Ok(SettlementTaxes {
        income_tax,
        transaction_tax,
        net_value: gross_value - income_tax - transaction_tax,
        days_held,
        gross_gain: gross_value - subscription_value,
    })
}
