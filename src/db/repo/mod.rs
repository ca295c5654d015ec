//! Repository layer for database operations.
//!
//! `Repository` owns the pool and exposes pooled convenience methods. The
//! submodules also export connection-level functions taking
//! `&mut SqliteConnection`, so services can run several of them inside one
//! transaction obtained from [`Repository::begin`]:
//! - `funds.rs` - funds, quotaholders, fund deletion
//! - `portfolio.rs` - assets, receivables, provisioning updates
//! - `quotas.rs` - quota history
//! - `movements.rs` - subscription/redemption movements

pub mod funds;
pub mod movements;
pub mod portfolio;
pub mod quotas;

use crate::domain::decimal::parse_decimal;
use crate::domain::primitives::{parse_date, parse_datetime, parse_time};
use crate::domain::{Decimal, UnknownCode};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use std::str::FromStr;

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a transaction for multi-statement units of work.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Connectivity check used by the readiness endpoint.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn decode_err<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

pub(crate) fn decimal_col(row: &SqliteRow, col: &str) -> Result<Decimal, sqlx::Error> {
    let raw: String = row.try_get(col)?;
    parse_decimal(&raw).map_err(decode_err)
}

pub(crate) fn opt_decimal_col(row: &SqliteRow, col: &str) -> Result<Option<Decimal>, sqlx::Error> {
    let raw: Option<String> = row.try_get(col)?;
    raw.as_deref()
        .map(parse_decimal)
        .transpose()
        .map_err(decode_err)
}

pub(crate) fn date_col(row: &SqliteRow, col: &str) -> Result<NaiveDate, sqlx::Error> {
    let raw: String = row.try_get(col)?;
    parse_date(&raw).map_err(decode_err)
}

pub(crate) fn opt_date_col(row: &SqliteRow, col: &str) -> Result<Option<NaiveDate>, sqlx::Error> {
    let raw: Option<String> = row.try_get(col)?;
    raw.as_deref().map(parse_date).transpose().map_err(decode_err)
}

pub(crate) fn datetime_col(row: &SqliteRow, col: &str) -> Result<NaiveDateTime, sqlx::Error> {
    let raw: String = row.try_get(col)?;
    parse_datetime(&raw).map_err(decode_err)
}

pub(crate) fn opt_datetime_col(
    row: &SqliteRow,
    col: &str,
) -> Result<Option<NaiveDateTime>, sqlx::Error> {
    let raw: Option<String> = row.try_get(col)?;
    raw.as_deref()
        .map(parse_datetime)
        .transpose()
        .map_err(decode_err)
}

pub(crate) fn time_col(row: &SqliteRow, col: &str) -> Result<NaiveTime, sqlx::Error> {
    let raw: String = row.try_get(col)?;
    parse_time(&raw).map_err(decode_err)
}

/// Decode a persisted enum code (`FII`, `CONFIRMADO`, ...).
pub(crate) fn code_col<T>(row: &SqliteRow, col: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = UnknownCode>,
{
    let raw: String = row.try_get(col)?;
    raw.parse::<T>().map_err(decode_err)
}

pub(crate) fn bool_col(row: &SqliteRow, col: &str) -> Result<bool, sqlx::Error> {
    let raw: i64 = row.try_get(col)?;
    Ok(raw != 0)
}
