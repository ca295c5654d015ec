//! Asset and receivable operations for the repository.

use crate::domain::primitives::format_date;
use crate::domain::{
    Asset, AssetId, DecimalExt, FundId, ProvisioningUpdate, Receivable, ReceivableId,
    ReceivableStatus,
};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use super::{bool_col, code_col, date_col, decimal_col, opt_decimal_col, Repository};

const RECEIVABLE_COLUMNS: &str = r#"
    id, fund_id, originator_tax_id, originator_name, debtor_tax_id, debtor_name,
    credit_type, title_number, due_date, face_value, assignment_value, status,
    days_past_due, provisioning_pct, provisioning_amount
"#;

fn asset_from_row(row: &SqliteRow) -> Result<Asset, sqlx::Error> {
    Ok(Asset {
        id: AssetId::new(row.try_get::<String, _>("id")?),
        fund_id: FundId::new(row.try_get::<String, _>("fund_id")?),
        asset_type: row.try_get("asset_type")?,
        isin: row.try_get("isin")?,
        ticker: row.try_get("ticker")?,
        quantity: opt_decimal_col(row, "quantity")?,
        market_value: opt_decimal_col(row, "market_value")?,
        active: bool_col(row, "active")?,
    })
}

fn receivable_from_row(row: &SqliteRow) -> Result<Receivable, sqlx::Error> {
    Ok(Receivable {
        id: ReceivableId::new(row.try_get::<String, _>("id")?),
        fund_id: FundId::new(row.try_get::<String, _>("fund_id")?),
        originator_tax_id: row.try_get("originator_tax_id")?,
        originator_name: row.try_get("originator_name")?,
        debtor_tax_id: row.try_get("debtor_tax_id")?,
        debtor_name: row.try_get("debtor_name")?,
        credit_type: row.try_get("credit_type")?,
        title_number: row.try_get("title_number")?,
        due_date: date_col(row, "due_date")?,
        face_value: decimal_col(row, "face_value")?,
        assignment_value: decimal_col(row, "assignment_value")?,
        status: code_col(row, "status")?,
        days_past_due: row.try_get("days_past_due")?,
        provisioning_pct: decimal_col(row, "provisioning_pct")?,
        provisioning_amount: decimal_col(row, "provisioning_amount")?,
    })
}

pub async fn fetch_active_assets(
    conn: &mut SqliteConnection,
    fund_id: &FundId,
) -> Result<Vec<Asset>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, fund_id, asset_type, isin, ticker, quantity, market_value, active
        FROM assets
        WHERE fund_id = ? AND active = 1
        ORDER BY id ASC
        "#,
    )
    .bind(fund_id.as_str())
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(asset_from_row).collect()
}

/// Every receivable of the fund except written-off ones.
pub async fn fetch_provisionable_receivables(
    conn: &mut SqliteConnection,
    fund_id: &FundId,
) -> Result<Vec<Receivable>, sqlx::Error> {
    let sql = format!(
        "SELECT {RECEIVABLE_COLUMNS} FROM receivables
         WHERE fund_id = ? AND status <> ?
         ORDER BY id ASC"
    );
    let rows = sqlx::query(&sql)
        .bind(fund_id.as_str())
        .bind(ReceivableStatus::WrittenOff.code())
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(receivable_from_row).collect()
}

/// Persist computed provisioning. Returns the number of rows updated.
pub async fn apply_provisioning(
    conn: &mut SqliteConnection,
    updates: &[ProvisioningUpdate],
) -> Result<u64, sqlx::Error> {
    let mut updated = 0u64;
    for update in updates {
        let result = sqlx::query(
            r#"
            UPDATE receivables
            SET provisioning_pct = ?, provisioning_amount = ?
            WHERE id = ?
            "#,
        )
        .bind(update.provisioning_pct.to_canonical_string())
        .bind(update.provisioning_amount.to_canonical_string())
        .bind(update.receivable_id.as_str())
        .execute(&mut *conn)
        .await?;
        updated += result.rows_affected();
    }
    Ok(updated)
}

impl Repository {
    /// Insert an asset.
    ///
    /// # Errors
    /// Returns an error if the insert fails (e.g. unknown fund).
    pub async fn insert_asset(&self, asset: &Asset) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO assets (id, fund_id, asset_type, isin, ticker, quantity, market_value, active)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(asset.id.as_str())
        .bind(asset.fund_id.as_str())
        .bind(&asset.asset_type)
        .bind(asset.isin.as_deref())
        .bind(asset.ticker.as_deref())
        .bind(asset.quantity.map(|d| d.to_canonical_string()))
        .bind(asset.market_value.map(|d| d.to_canonical_string()))
        .bind(asset.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn active_assets(&self, fund_id: &FundId) -> Result<Vec<Asset>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        fetch_active_assets(&mut conn, fund_id).await
    }

    /// Insert a receivable.
    ///
    /// # Errors
    /// Returns an error if the insert fails (e.g. unknown fund).
    pub async fn insert_receivable(&self, receivable: &Receivable) -> Result<(), sqlx::Error> {
        let sql = format!(
            "INSERT INTO receivables ({RECEIVABLE_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        sqlx::query(&sql)
            .bind(receivable.id.as_str())
            .bind(receivable.fund_id.as_str())
            .bind(&receivable.originator_tax_id)
            .bind(&receivable.originator_name)
            .bind(&receivable.debtor_tax_id)
            .bind(&receivable.debtor_name)
            .bind(&receivable.credit_type)
            .bind(&receivable.title_number)
            .bind(format_date(receivable.due_date))
            .bind(receivable.face_value.to_canonical_string())
            .bind(receivable.assignment_value.to_canonical_string())
            .bind(receivable.status.code())
            .bind(receivable.days_past_due)
            .bind(receivable.provisioning_pct.to_canonical_string())
            .bind(receivable.provisioning_amount.to_canonical_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All receivables of a fund, any status.
    pub async fn list_receivables(&self, fund_id: &FundId) -> Result<Vec<Receivable>, sqlx::Error> {
        let sql = format!(
            "SELECT {RECEIVABLE_COLUMNS} FROM receivables WHERE fund_id = ? ORDER BY id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(fund_id.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(receivable_from_row).collect()
    }

    pub async fn get_receivable(
        &self,
        receivable_id: &ReceivableId,
    ) -> Result<Option<Receivable>, sqlx::Error> {
        let sql = format!("SELECT {RECEIVABLE_COLUMNS} FROM receivables WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(receivable_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(receivable_from_row).transpose()
    }

    /// Record a collection status change. Returns false if the receivable does not exist.
    pub async fn update_receivable_status(
        &self,
        receivable_id: &ReceivableId,
        status: ReceivableStatus,
        days_past_due: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE receivables SET status = ?, days_past_due = ? WHERE id = ?",
        )
        .bind(status.code())
        .bind(days_past_due)
        .bind(receivable_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::test_support::setup_test_db;
    use crate::domain::{Fund, FundType};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    async fn seeded_fund(repo: &Repository) -> Fund {
        let fund = Fund::new("99", "FIDC Gama", FundType::Receivables);
        repo.insert_fund(&fund).await.unwrap();
        fund
    }

    #[tokio::test]
    async fn test_active_assets_excludes_inactive() {
        let (repo, _temp) = setup_test_db().await;
        let fund = seeded_fund(&repo).await;
        let live = Asset::new(fund.id.clone(), "CRI", dec!(100.50));
        let mut dead = Asset::new(fund.id.clone(), "CRI", dec!(10));
        dead.active = false;
        repo.insert_asset(&live).await.unwrap();
        repo.insert_asset(&dead).await.unwrap();

        let assets = repo.active_assets(&fund.id).await.unwrap();
        assert_eq!(assets, vec![live]);
    }

    #[tokio::test]
    async fn test_provisionable_receivables_skip_written_off() {
        let (repo, _temp) = setup_test_db().await;
        let fund = seeded_fund(&repo).await;
        let due = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let open = Receivable::new(fund.id.clone(), "A", due, dec!(1000), ReceivableStatus::PastDue, 40);
        let gone = Receivable::new(fund.id.clone(), "B", due, dec!(500), ReceivableStatus::WrittenOff, 400);
        repo.insert_receivable(&open).await.unwrap();
        repo.insert_receivable(&gone).await.unwrap();

        let mut conn = repo.pool().acquire().await.unwrap();
        let receivables = fetch_provisionable_receivables(&mut conn, &fund.id).await.unwrap();
        assert_eq!(receivables, vec![open]);
        assert_eq!(repo.list_receivables(&fund.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_apply_provisioning_updates_rows() {
        let (repo, _temp) = setup_test_db().await;
        let fund = seeded_fund(&repo).await;
        let due = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let r = Receivable::new(fund.id.clone(), "A", due, dec!(1000), ReceivableStatus::PastDue, 70);
        repo.insert_receivable(&r).await.unwrap();

        let mut conn = repo.pool().acquire().await.unwrap();
        let updated = apply_provisioning(
            &mut conn,
            &[ProvisioningUpdate {
                receivable_id: r.id.clone(),
                provisioning_pct: dec!(3.00),
                provisioning_amount: dec!(30.00),
            }],
        )
        .await
        .unwrap();
        assert_eq!(updated, 1);

        let stored = repo.get_receivable(&r.id).await.unwrap().unwrap();
        assert_eq!(stored.provisioning_pct, dec!(3));
        assert_eq!(stored.provisioning_amount, dec!(30));
    }

    #[tokio::test]
    async fn test_receivable_for_unknown_fund_is_rejected() {
        let (repo, _temp) = setup_test_db().await;
        let due = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let r = Receivable::new(FundId::new("ghost"), "A", due, dec!(1), ReceivableStatus::NotYetDue, 0);
        assert!(repo.insert_receivable(&r).await.is_err());
    }
}
