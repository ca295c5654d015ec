//! Quota history operations for the repository.

use crate::domain::primitives::{format_date, format_datetime};
use crate::domain::{Decimal, DecimalExt, FundId, QuotaHistory};
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use super::{bool_col, date_col, decimal_col, opt_datetime_col, opt_decimal_col, Repository};

const QUOTA_COLUMNS: &str = r#"
    fund_id, reference_date, share_price, net_asset_value, share_count, holder_count,
    daily_inflow, daily_outflow, daily_return, monthly_return, yearly_return,
    reported, reported_at
"#;

/// Which period-return column to stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnPeriod {
    Monthly,
    Yearly,
}

impl ReturnPeriod {
    fn column(self) -> &'static str {
        match self {
            ReturnPeriod::Monthly => "monthly_return",
            ReturnPeriod::Yearly => "yearly_return",
        }
    }
}

fn quota_from_row(row: &SqliteRow) -> Result<QuotaHistory, sqlx::Error> {
    Ok(QuotaHistory {
        fund_id: FundId::new(row.try_get::<String, _>("fund_id")?),
        reference_date: date_col(row, "reference_date")?,
        share_price: decimal_col(row, "share_price")?,
        net_asset_value: decimal_col(row, "net_asset_value")?,
        share_count: decimal_col(row, "share_count")?,
        holder_count: row.try_get("holder_count")?,
        daily_inflow: decimal_col(row, "daily_inflow")?,
        daily_outflow: decimal_col(row, "daily_outflow")?,
        daily_return: opt_decimal_col(row, "daily_return")?,
        monthly_return: opt_decimal_col(row, "monthly_return")?,
        yearly_return: opt_decimal_col(row, "yearly_return")?,
        reported: bool_col(row, "reported")?,
        reported_at: opt_datetime_col(row, "reported_at")?,
    })
}

pub async fn fetch_quota(
    conn: &mut SqliteConnection,
    fund_id: &FundId,
    reference_date: NaiveDate,
) -> Result<Option<QuotaHistory>, sqlx::Error> {
    let sql = format!(
        "SELECT {QUOTA_COLUMNS} FROM quota_history WHERE fund_id = ? AND reference_date = ?"
    );
    let row = sqlx::query(&sql)
        .bind(fund_id.as_str())
        .bind(format_date(reference_date))
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(quota_from_row).transpose()
}

/// Most recent quota strictly before `reference_date`.
pub async fn fetch_previous_quota(
    conn: &mut SqliteConnection,
    fund_id: &FundId,
    reference_date: NaiveDate,
) -> Result<Option<QuotaHistory>, sqlx::Error> {
    let sql = format!(
        "SELECT {QUOTA_COLUMNS} FROM quota_history
         WHERE fund_id = ? AND reference_date < ?
         ORDER BY reference_date DESC
         LIMIT 1"
    );
    let row = sqlx::query(&sql)
        .bind(fund_id.as_str())
        .bind(format_date(reference_date))
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(quota_from_row).transpose()
}

/// Rows in `[from, until)`, oldest first.
pub async fn fetch_quotas_between(
    conn: &mut SqliteConnection,
    fund_id: &FundId,
    from: NaiveDate,
    until: NaiveDate,
) -> Result<Vec<QuotaHistory>, sqlx::Error> {
    let sql = format!(
        "SELECT {QUOTA_COLUMNS} FROM quota_history
         WHERE fund_id = ? AND reference_date >= ? AND reference_date < ?
         ORDER BY reference_date ASC"
    );
    let rows = sqlx::query(&sql)
        .bind(fund_id.as_str())
        .bind(format_date(from))
        .bind(format_date(until))
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(quota_from_row).collect()
}

/// Insert or overwrite the pricing columns of a (fund, date) row.
///
/// Flows, period returns and report flags of an existing row are kept.
pub async fn upsert_pricing(
    conn: &mut SqliteConnection,
    quota: &QuotaHistory,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO quota_history (
            fund_id, reference_date, share_price, net_asset_value, share_count,
            holder_count, daily_inflow, daily_outflow, daily_return,
            monthly_return, yearly_return, reported, reported_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(fund_id, reference_date) DO UPDATE SET
            share_price = excluded.share_price,
            net_asset_value = excluded.net_asset_value,
            share_count = excluded.share_count,
            holder_count = excluded.holder_count,
            daily_return = excluded.daily_return
        "#,
    )
    .bind(quota.fund_id.as_str())
    .bind(format_date(quota.reference_date))
    .bind(quota.share_price.to_canonical_string())
    .bind(quota.net_asset_value.to_canonical_string())
    .bind(quota.share_count.to_canonical_string())
    .bind(quota.holder_count)
    .bind(quota.daily_inflow.to_canonical_string())
    .bind(quota.daily_outflow.to_canonical_string())
    .bind(quota.daily_return.map(|d| d.to_canonical_string()))
    .bind(quota.monthly_return.map(|d| d.to_canonical_string()))
    .bind(quota.yearly_return.map(|d| d.to_canonical_string()))
    .bind(quota.reported)
    .bind(quota.reported_at.map(format_datetime))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Add settled amounts to a row's daily flows. Returns false if the row is missing.
pub async fn add_daily_flows(
    conn: &mut SqliteConnection,
    fund_id: &FundId,
    reference_date: NaiveDate,
    inflow: Decimal,
    outflow: Decimal,
) -> Result<bool, sqlx::Error> {
    let Some(quota) = fetch_quota(&mut *conn, fund_id, reference_date).await? else {
        return Ok(false);
    };
    sqlx::query(
        r#"
        UPDATE quota_history
        SET daily_inflow = ?, daily_outflow = ?
        WHERE fund_id = ? AND reference_date = ?
        "#,
    )
    .bind((quota.daily_inflow + inflow).to_canonical_string())
    .bind((quota.daily_outflow + outflow).to_canonical_string())
    .bind(fund_id.as_str())
    .bind(format_date(reference_date))
    .execute(&mut *conn)
    .await?;
    Ok(true)
}

/// Stamp a period return on every row in `[from, until)`.
pub async fn stamp_period_return(
    conn: &mut SqliteConnection,
    fund_id: &FundId,
    period: ReturnPeriod,
    from: NaiveDate,
    until: NaiveDate,
    value: Decimal,
) -> Result<u64, sqlx::Error> {
    let sql = format!(
        "UPDATE quota_history SET {} = ?
         WHERE fund_id = ? AND reference_date >= ? AND reference_date < ?",
        period.column()
    );
    let result = sqlx::query(&sql)
        .bind(value.to_canonical_string())
        .bind(fund_id.as_str())
        .bind(format_date(from))
        .bind(format_date(until))
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

impl Repository {
    /// Insert or reprice a quota row outside of any larger unit of work.
    pub async fn upsert_quota(&self, quota: &QuotaHistory) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        upsert_pricing(&mut conn, quota).await
    }

    pub async fn get_quota(
        &self,
        fund_id: &FundId,
        reference_date: NaiveDate,
    ) -> Result<Option<QuotaHistory>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        fetch_quota(&mut conn, fund_id, reference_date).await
    }

    /// History in the inclusive range `[from, to]`, oldest first.
    pub async fn quota_history(
        &self,
        fund_id: &FundId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<QuotaHistory>, sqlx::Error> {
        let sql = format!(
            "SELECT {QUOTA_COLUMNS} FROM quota_history
             WHERE fund_id = ? AND reference_date >= ? AND reference_date <= ?
             ORDER BY reference_date ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(fund_id.as_str())
            .bind(format_date(from))
            .bind(format_date(to))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(quota_from_row).collect()
    }

    /// Rows for `reference_date` not yet submitted to the external registry.
    pub async fn unreported_quotas(
        &self,
        reference_date: NaiveDate,
    ) -> Result<Vec<QuotaHistory>, sqlx::Error> {
        let sql = format!(
            "SELECT {QUOTA_COLUMNS} FROM quota_history
             WHERE reference_date = ? AND reported = 0
             ORDER BY fund_id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(format_date(reference_date))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(quota_from_row).collect()
    }

    /// Flag a row as reported. Returns false if the row is missing.
    pub async fn mark_quota_reported(
        &self,
        fund_id: &FundId,
        reference_date: NaiveDate,
        reported_at: NaiveDateTime,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE quota_history
            SET reported = 1, reported_at = ?
            WHERE fund_id = ? AND reference_date = ?
            "#,
        )
        .bind(format_datetime(reported_at))
        .bind(fund_id.as_str())
        .bind(format_date(reference_date))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
