//! Portfolio holdings owned by a fund: market assets and credit receivables.

use crate::domain::{AssetId, Decimal, FundId, ReceivableId, UnknownCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A marked-to-market holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: AssetId,
    pub fund_id: FundId,
    pub asset_type: String,
    pub isin: Option<String>,
    pub ticker: Option<String>,
    pub quantity: Option<Decimal>,
    /// Absent values count as zero in the portfolio valuation.
    pub market_value: Option<Decimal>,
    pub active: bool,
}

impl Asset {
    pub fn new(fund_id: FundId, asset_type: impl Into<String>, market_value: Decimal) -> Self {
        Self {
            id: AssetId::generate(),
            fund_id,
            asset_type: asset_type.into(),
            isin: None,
            ticker: None,
            quantity: None,
            market_value: Some(market_value),
            active: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceivableStatus {
    #[serde(rename = "A_ENVIAR")]
    ToBeSent,
    #[serde(rename = "EM_COBRANCA")]
    InCollection,
    #[serde(rename = "A_VENCER")]
    NotYetDue,
    #[serde(rename = "VENCIDO")]
    PastDue,
    #[serde(rename = "PAGO")]
    Paid,
    /// Written off; excluded from provisioning.
    #[serde(rename = "BAIXADO")]
    WrittenOff,
    #[serde(rename = "REJEITADO")]
    Rejected,
}

impl ReceivableStatus {
    pub fn code(&self) -> &'static str {
        match self {
            ReceivableStatus::ToBeSent => "A_ENVIAR",
            ReceivableStatus::InCollection => "EM_COBRANCA",
            ReceivableStatus::NotYetDue => "A_VENCER",
            ReceivableStatus::PastDue => "VENCIDO",
            ReceivableStatus::Paid => "PAGO",
            ReceivableStatus::WrittenOff => "BAIXADO",
            ReceivableStatus::Rejected => "REJEITADO",
        }
    }
}

impl FromStr for ReceivableStatus {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A_ENVIAR" => Ok(ReceivableStatus::ToBeSent),
            "EM_COBRANCA" => Ok(ReceivableStatus::InCollection),
            "A_VENCER" => Ok(ReceivableStatus::NotYetDue),
            "VENCIDO" => Ok(ReceivableStatus::PastDue),
            "PAGO" => Ok(ReceivableStatus::Paid),
            "BAIXADO" => Ok(ReceivableStatus::WrittenOff),
            "REJEITADO" => Ok(ReceivableStatus::Rejected),
            other => Err(UnknownCode::new("receivable status", other)),
        }
    }
}

/// A credit receivable assigned to a FIDC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receivable {
    pub id: ReceivableId,
    pub fund_id: FundId,
    pub originator_tax_id: String,
    pub originator_name: String,
    pub debtor_tax_id: String,
    pub debtor_name: String,
    pub credit_type: String,
    pub title_number: String,
    pub due_date: NaiveDate,
    pub face_value: Decimal,
    pub assignment_value: Decimal,
    pub status: ReceivableStatus,
    pub days_past_due: i64,
    /// Percentage of face value provisioned (2 dp, 0-100).
    pub provisioning_pct: Decimal,
    pub provisioning_amount: Decimal,
}

impl Receivable {
    /// A receivable with the given face value, assigned at face, not provisioned.
    pub fn new(
        fund_id: FundId,
        title_number: impl Into<String>,
        due_date: NaiveDate,
        face_value: Decimal,
        status: ReceivableStatus,
        days_past_due: i64,
    ) -> Self {
        Self {
            id: ReceivableId::generate(),
            fund_id,
            originator_tax_id: String::new(),
            originator_name: String::new(),
            debtor_tax_id: String::new(),
            debtor_name: String::new(),
            credit_type: "duplicata".to_string(),
            title_number: title_number.into(),
            due_date,
            face_value,
            assignment_value: face_value,
            status,
            days_past_due,
            provisioning_pct: Decimal::ZERO,
            provisioning_amount: Decimal::ZERO,
        }
    }

    pub fn is_written_off(&self) -> bool {
        self.status == ReceivableStatus::WrittenOff
    }
}

/// Provisioning values computed for one receivable during pricing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningUpdate {
    pub receivable_id: ReceivableId,
    pub provisioning_pct: Decimal,
    pub provisioning_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receivable_status_codes_roundtrip() {
        for s in [
            ReceivableStatus::ToBeSent,
            ReceivableStatus::InCollection,
            ReceivableStatus::NotYetDue,
            ReceivableStatus::PastDue,
            ReceivableStatus::Paid,
            ReceivableStatus::WrittenOff,
            ReceivableStatus::Rejected,
        ] {
            assert_eq!(s.code().parse::<ReceivableStatus>().unwrap(), s);
        }
        assert!("LIQUIDADO".parse::<ReceivableStatus>().is_err());
    }
}
