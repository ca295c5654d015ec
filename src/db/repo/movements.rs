//! Movement operations for the repository.

use crate::domain::primitives::{format_date, format_datetime};
use crate::domain::{
    DecimalExt, FundId, Movement, MovementId, MovementKind, MovementStatus, QuotaholderId,
};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use super::{code_col, date_col, datetime_col, decimal_col, decode_err, opt_decimal_col, Repository};

const MOVEMENT_COLUMNS: &str = r#"
    id, kind, fund_id, quotaholder_id, requested_at, quotation_date, settlement_date,
    amount, share_price, share_count, income_tax, transaction_tax, net_value, status, metadata
"#;

fn movement_from_row(row: &SqliteRow) -> Result<Movement, sqlx::Error> {
    let metadata: Option<String> = row.try_get("metadata")?;
    Ok(Movement {
        id: MovementId::new(row.try_get::<String, _>("id")?),
        kind: code_col(row, "kind")?,
        fund_id: FundId::new(row.try_get::<String, _>("fund_id")?),
        quotaholder_id: QuotaholderId::new(row.try_get::<String, _>("quotaholder_id")?),
        requested_at: datetime_col(row, "requested_at")?,
        quotation_date: date_col(row, "quotation_date")?,
        settlement_date: date_col(row, "settlement_date")?,
        amount: opt_decimal_col(row, "amount")?,
        share_price: opt_decimal_col(row, "share_price")?,
        share_count: opt_decimal_col(row, "share_count")?,
        income_tax: decimal_col(row, "income_tax")?,
        transaction_tax: decimal_col(row, "transaction_tax")?,
        net_value: opt_decimal_col(row, "net_value")?,
        status: code_col(row, "status")?,
        metadata: metadata
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()
            .map_err(decode_err)?,
    })
}

fn metadata_text(movement: &Movement) -> Option<String> {
    movement.metadata.as_ref().map(|m| m.to_string())
}

pub async fn insert_movement(
    conn: &mut SqliteConnection,
    movement: &Movement,
) -> Result<(), sqlx::Error> {
    let sql = format!(
        "INSERT INTO movements ({MOVEMENT_COLUMNS})
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    );
    sqlx::query(&sql)
        .bind(movement.id.as_str())
        .bind(movement.kind.code())
        .bind(movement.fund_id.as_str())
        .bind(movement.quotaholder_id.as_str())
        .bind(format_datetime(movement.requested_at))
        .bind(format_date(movement.quotation_date))
        .bind(format_date(movement.settlement_date))
        .bind(movement.amount.map(|d| d.to_canonical_string()))
        .bind(movement.share_price.map(|d| d.to_canonical_string()))
        .bind(movement.share_count.map(|d| d.to_canonical_string()))
        .bind(movement.income_tax.to_canonical_string())
        .bind(movement.transaction_tax.to_canonical_string())
        .bind(movement.net_value.map(|d| d.to_canonical_string()))
        .bind(movement.status.code())
        .bind(metadata_text(movement))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn fetch_movement(
    conn: &mut SqliteConnection,
    movement_id: &MovementId,
) -> Result<Option<Movement>, sqlx::Error> {
    let sql = format!("SELECT {MOVEMENT_COLUMNS} FROM movements WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(movement_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(movement_from_row).transpose()
}

/// Write the settlement outcome, only if the stored status is still `expected`.
///
/// Returns false when another writer changed the status first.
pub async fn store_settlement(
    conn: &mut SqliteConnection,
    movement: &Movement,
    expected: MovementStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE movements
        SET amount = ?, share_price = ?, share_count = ?, income_tax = ?,
            transaction_tax = ?, net_value = ?, status = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(movement.amount.map(|d| d.to_canonical_string()))
    .bind(movement.share_price.map(|d| d.to_canonical_string()))
    .bind(movement.share_count.map(|d| d.to_canonical_string()))
    .bind(movement.income_tax.to_canonical_string())
    .bind(movement.transaction_tax.to_canonical_string())
    .bind(movement.net_value.map(|d| d.to_canonical_string()))
    .bind(movement.status.code())
    .bind(movement.id.as_str())
    .bind(expected.code())
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Write status and metadata, only if the stored status is still `expected`.
pub async fn store_status(
    conn: &mut SqliteConnection,
    movement: &Movement,
    expected: MovementStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE movements SET status = ?, metadata = ? WHERE id = ? AND status = ?",
    )
    .bind(movement.status.code())
    .bind(metadata_text(movement))
    .bind(movement.id.as_str())
    .bind(expected.code())
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Distinct quotaholders with at least one confirmed movement on the fund.
pub async fn count_confirmed_holders(
    conn: &mut SqliteConnection,
    fund_id: &FundId,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(DISTINCT quotaholder_id) AS holders
        FROM movements
        WHERE fund_id = ? AND status = ?
        "#,
    )
    .bind(fund_id.as_str())
    .bind(MovementStatus::Confirmed.code())
    .fetch_one(&mut *conn)
    .await?;
    row.try_get("holders")
}

impl Repository {
    pub async fn insert_movement(&self, movement: &Movement) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_movement(&mut conn, movement).await
    }

    pub async fn get_movement(
        &self,
        movement_id: &MovementId,
    ) -> Result<Option<Movement>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        fetch_movement(&mut conn, movement_id).await
    }

    /// Movements of one kind and status quoted on `quotation_date`, oldest request first.
    pub async fn movements_due(
        &self,
        kind: MovementKind,
        status: MovementStatus,
        quotation_date: NaiveDate,
    ) -> Result<Vec<Movement>, sqlx::Error> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements
             WHERE kind = ? AND status = ? AND quotation_date = ?
             ORDER BY requested_at ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(kind.code())
            .bind(status.code())
            .bind(format_date(quotation_date))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(movement_from_row).collect()
    }
}
