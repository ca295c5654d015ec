//! Fund configuration as seen by the pricing and settlement core.

use crate::domain::{Decimal, FundId, UnknownCode};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Regulatory fund category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FundType {
    /// Real-estate fund.
    #[serde(rename = "FII")]
    RealEstate,
    /// Credit-receivables fund; provisioning applies.
    #[serde(rename = "FIDC")]
    Receivables,
    /// Participations fund.
    #[serde(rename = "FIP")]
    Participations,
}

impl FundType {
    pub fn code(&self) -> &'static str {
        match self {
            FundType::RealEstate => "FII",
            FundType::Receivables => "FIDC",
            FundType::Participations => "FIP",
        }
    }

    /// Whether the portfolio carries receivables subject to provisioning.
    pub fn is_receivables_based(&self) -> bool {
        matches!(self, FundType::Receivables)
    }
}

impl FromStr for FundType {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FII" => Ok(FundType::RealEstate),
            "FIDC" => Ok(FundType::Receivables),
            "FIP" => Ok(FundType::Participations),
            other => Err(UnknownCode::new("fund type", other)),
        }
    }
}

/// When a request's quota price is fixed relative to the request day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuotationConvention {
    /// Same day if requested up to the cutoff time, next day otherwise.
    #[serde(rename = "D+0")]
    SameDay,
    /// Always the next day.
    #[serde(rename = "D+1")]
    NextDay,
}

impl QuotationConvention {
    pub fn code(&self) -> &'static str {
        match self {
            QuotationConvention::SameDay => "D+0",
            QuotationConvention::NextDay => "D+1",
        }
    }
}

impl FromStr for QuotationConvention {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "D+0" => Ok(QuotationConvention::SameDay),
            "D+1" => Ok(QuotationConvention::NextDay),
            other => Err(UnknownCode::new("quotation convention", other)),
        }
    }
}

/// An investment fund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fund {
    pub id: FundId,
    /// CNPJ.
    pub tax_id: String,
    /// ANBIMA code, when registered.
    pub regulatory_code: Option<String>,
    pub legal_name: String,
    pub fund_type: FundType,
    pub quotation_convention: QuotationConvention,
    /// Subscription settlement lag in business days.
    pub settlement_lag_days: u32,
    pub cutoff_time: NaiveTime,
    /// Annual administration fee as a fraction (0.02 = 2% a.a.).
    pub admin_fee_rate: Option<Decimal>,
    /// Annual management fee as a fraction.
    pub management_fee_rate: Option<Decimal>,
    pub active: bool,
}

impl Fund {
    /// New active fund with the market defaults: D+0, 14:00 cutoff, no lag, no fees.
    pub fn new(tax_id: impl Into<String>, legal_name: impl Into<String>, fund_type: FundType) -> Self {
        Self {
            id: FundId::generate(),
            tax_id: tax_id.into(),
            regulatory_code: None,
            legal_name: legal_name.into(),
            fund_type,
            quotation_convention: QuotationConvention::SameDay,
            settlement_lag_days: 0,
            cutoff_time: default_cutoff_time(),
            admin_fee_rate: None,
            management_fee_rate: None,
            active: true,
        }
    }
}

/// 14:00, the usual cutoff for same-day quotation.
pub fn default_cutoff_time() -> NaiveTime {
    NaiveTime::from_hms_opt(14, 0, 0).unwrap_or(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fund_type_codes_roundtrip() {
        for t in [FundType::RealEstate, FundType::Receivables, FundType::Participations] {
            assert_eq!(t.code().parse::<FundType>().unwrap(), t);
        }
        assert!("FIA".parse::<FundType>().is_err());
    }

    #[test]
    fn test_only_fidc_is_receivables_based() {
        assert!(FundType::Receivables.is_receivables_based());
        assert!(!FundType::RealEstate.is_receivables_based());
        assert!(!FundType::Participations.is_receivables_based());
    }

    #[test]
    fn test_quotation_convention_serialization() {
        let json = serde_json::to_string(&QuotationConvention::NextDay).unwrap();
        assert_eq!(json, "\"D+1\"");
        assert_eq!("D+0".parse::<QuotationConvention>().unwrap(), QuotationConvention::SameDay);
    }

    #[test]
    fn test_new_fund_defaults() {
        let fund = Fund::new("12345678000190", "FIDC Alpha", FundType::Receivables);
        assert!(fund.active);
        assert_eq!(fund.quotation_convention, QuotationConvention::SameDay);
        assert_eq!(fund.cutoff_time, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        assert_eq!(fund.settlement_lag_days, 0);
    }
}
