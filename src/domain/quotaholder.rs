//! Investor record referenced by movements.

use crate::domain::{QuotaholderId, UnknownCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersonType {
    #[serde(rename = "PF")]
    Individual,
    #[serde(rename = "PJ")]
    Company,
}

impl PersonType {
    pub fn code(&self) -> &'static str {
        match self {
            PersonType::Individual => "PF",
            PersonType::Company => "PJ",
        }
    }
}

impl FromStr for PersonType {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PF" => Ok(PersonType::Individual),
            "PJ" => Ok(PersonType::Company),
            other => Err(UnknownCode::new("person type", other)),
        }
    }
}

/// Investor qualification tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Qualification {
    Retail,
    Qualified,
    Professional,
}

impl Qualification {
    pub fn code(&self) -> &'static str {
        match self {
            Qualification::Retail => "retail",
            Qualification::Qualified => "qualified",
            Qualification::Professional => "professional",
        }
    }
}

impl FromStr for Qualification {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retail" => Ok(Qualification::Retail),
            "qualified" => Ok(Qualification::Qualified),
            "professional" => Ok(Qualification::Professional),
            other => Err(UnknownCode::new("qualification", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quotaholder {
    pub id: QuotaholderId,
    /// CPF or CNPJ.
    pub tax_id: String,
    pub person_type: PersonType,
    pub name: String,
    pub qualification: Option<Qualification>,
    pub suitability_date: Option<NaiveDate>,
    pub active: bool,
}

impl Quotaholder {
    pub fn new(tax_id: impl Into<String>, name: impl Into<String>, person_type: PersonType) -> Self {
        Self {
            id: QuotaholderId::generate(),
            tax_id: tax_id.into(),
            person_type,
            name: name.into(),
            qualification: None,
            suitability_date: None,
            active: true,
        }
    }
}
