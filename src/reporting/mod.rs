//! Daily quota submission to the external registry.
//!
//! The registry integration itself is not available; [`StubReporter`] builds
//! the daily quota file and its digest, logs the submission and optionally
//! keeps a copy on disk.

use crate::domain::{Decimal, Fund, FundId, QuotaHistory};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// One line of the daily quota file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaReport {
    pub fund_id: FundId,
    pub fund_tax_id: String,
    pub regulatory_code: Option<String>,
    pub reference_date: NaiveDate,
    pub share_price: Decimal,
    pub net_asset_value: Decimal,
    pub share_count: Decimal,
    pub holder_count: i64,
    pub daily_inflow: Decimal,
    pub daily_outflow: Decimal,
}

impl QuotaReport {
    pub fn new(fund: &Fund, quota: &QuotaHistory) -> Self {
        Self {
            fund_id: quota.fund_id.clone(),
            fund_tax_id: fund.tax_id.clone(),
            regulatory_code: fund.regulatory_code.clone(),
            reference_date: quota.reference_date,
            share_price: quota.share_price,
            net_asset_value: quota.net_asset_value,
            share_count: quota.share_count,
            holder_count: quota.holder_count,
            daily_inflow: quota.daily_inflow,
            daily_outflow: quota.daily_outflow,
        }
    }
}

/// Proof of submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// SHA-256 of the submitted file, hex encoded.
    pub digest: String,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait QuotaReporter: Send + Sync + fmt::Debug {
    async fn submit(&self, report: &QuotaReport) -> Result<Receipt, ReportError>;
}

/// Serialize reports as a CSV file with a header row.
pub fn quota_file(reports: &[QuotaReport]) -> Result<Vec<u8>, ReportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(Vec::new());
    for report in reports {
        writer.serialize(report)?;
    }
    writer.into_inner().map_err(|e| ReportError::Io(e.into_error()))
}

pub fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Logs each submission; writes the file under `dir` when one is configured.
#[derive(Debug, Clone, Default)]
pub struct StubReporter {
    dir: Option<PathBuf>,
}

impl StubReporter {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl QuotaReporter for StubReporter {
    async fn submit(&self, report: &QuotaReport) -> Result<Receipt, ReportError> {
        if report.share_price <= Decimal::ZERO {
            return Err(ReportError::Rejected(format!(
                "fund {} has non-positive share price {} on {}",
                report.fund_id, report.share_price, report.reference_date
            )));
        }
        let bytes = quota_file(std::slice::from_ref(report))?;
        let digest = digest(&bytes);

        let path = match &self.dir {
            Some(dir) => {
                tokio::fs::create_dir_all(dir).await?;
                let path = dir.join(format!(
                    "cotas_{}_{}.csv",
                    report.fund_id,
                    report.reference_date.format("%Y%m%d")
                ));
                tokio::fs::write(&path, &bytes).await?;
                Some(path)
            }
            None => None,
        };

        info!(
            fund_id = %report.fund_id,
            date = %report.reference_date,
            share_price = %report.share_price,
            digest = %digest,
            "quota report submitted"
        );
        Ok(Receipt { digest, path })
    }
}
