//! Daily official quota record of a fund.

use crate::domain::{Decimal, FundId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One row per (fund, reference date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaHistory {
    pub fund_id: FundId,
    pub reference_date: NaiveDate,
    pub share_price: Decimal,
    pub net_asset_value: Decimal,
    pub share_count: Decimal,
    pub holder_count: i64,
    /// Settled subscription amounts quoted on this date.
    pub daily_inflow: Decimal,
    /// Settled redemption gross values quoted on this date.
    pub daily_outflow: Decimal,
    pub daily_return: Option<Decimal>,
    pub monthly_return: Option<Decimal>,
    pub yearly_return: Option<Decimal>,
    pub reported: bool,
    pub reported_at: Option<NaiveDateTime>,
}

impl QuotaHistory {
    /// A freshly priced row with no flows, period returns or report state.
    pub fn priced(
        fund_id: FundId,
        reference_date: NaiveDate,
        share_price: Decimal,
        net_asset_value: Decimal,
        share_count: Decimal,
        holder_count: i64,
        daily_return: Decimal,
    ) -> Self {
        Self {
            fund_id,
            reference_date,
            share_price,
            net_asset_value,
            share_count,
            holder_count,
            daily_inflow: Decimal::ZERO,
            daily_outflow: Decimal::ZERO,
            daily_return: Some(daily_return),
            monthly_return: None,
            yearly_return: None,
            reported: false,
            reported_at: None,
        }
    }
}
