//! Fund and quotaholder operations for the repository.

use crate::domain::primitives::{format_date, format_time};
use crate::domain::{
    DecimalExt, Fund, FundId, FundType, Qualification, Quotaholder, QuotaholderId,
};
use crate::error::FundError;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use tracing::info;

use super::{
    bool_col, code_col, decode_err, opt_date_col, opt_decimal_col, time_col, Repository,
};

const FUND_COLUMNS: &str = r#"
    id, tax_id, regulatory_code, legal_name, fund_type, quotation_convention,
    settlement_lag_days, cutoff_time, admin_fee_rate, management_fee_rate, active
"#;

fn fund_from_row(row: &SqliteRow) -> Result<Fund, sqlx::Error> {
    let lag: i64 = row.try_get("settlement_lag_days")?;
    Ok(Fund {
        id: FundId::new(row.try_get::<String, _>("id")?),
        tax_id: row.try_get("tax_id")?,
        regulatory_code: row.try_get("regulatory_code")?,
        legal_name: row.try_get("legal_name")?,
        fund_type: code_col(row, "fund_type")?,
        quotation_convention: code_col(row, "quotation_convention")?,
        settlement_lag_days: u32::try_from(lag).map_err(decode_err)?,
        cutoff_time: time_col(row, "cutoff_time")?,
        admin_fee_rate: opt_decimal_col(row, "admin_fee_rate")?,
        management_fee_rate: opt_decimal_col(row, "management_fee_rate")?,
        active: bool_col(row, "active")?,
    })
}

fn quotaholder_from_row(row: &SqliteRow) -> Result<Quotaholder, sqlx::Error> {
    let qualification: Option<String> = row.try_get("qualification")?;
    Ok(Quotaholder {
        id: QuotaholderId::new(row.try_get::<String, _>("id")?),
        tax_id: row.try_get("tax_id")?,
        person_type: code_col(row, "person_type")?,
        name: row.try_get("name")?,
        qualification: qualification
            .as_deref()
            .map(str::parse::<Qualification>)
            .transpose()
            .map_err(decode_err)?,
        suitability_date: opt_date_col(row, "suitability_date")?,
        active: bool_col(row, "active")?,
    })
}

pub async fn fetch_fund(
    conn: &mut SqliteConnection,
    fund_id: &FundId,
) -> Result<Option<Fund>, sqlx::Error> {
    let sql = format!("SELECT {FUND_COLUMNS} FROM funds WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(fund_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(fund_from_row).transpose()
}

pub async fn fetch_quotaholder(
    conn: &mut SqliteConnection,
    quotaholder_id: &QuotaholderId,
) -> Result<Option<Quotaholder>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, tax_id, person_type, name, qualification, suitability_date, active
        FROM quotaholders
        WHERE id = ?
        "#,
    )
    .bind(quotaholder_id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(quotaholder_from_row).transpose()
}

impl Repository {
    /// Insert a fund.
    ///
    /// # Errors
    /// Returns an error if the insert fails (e.g. duplicate tax id).
    pub async fn insert_fund(&self, fund: &Fund) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO funds (
                id, tax_id, regulatory_code, legal_name, fund_type, quotation_convention,
                settlement_lag_days, cutoff_time, admin_fee_rate, management_fee_rate, active
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(fund.id.as_str())
        .bind(&fund.tax_id)
        .bind(fund.regulatory_code.as_deref())
        .bind(&fund.legal_name)
        .bind(fund.fund_type.code())
        .bind(fund.quotation_convention.code())
        .bind(i64::from(fund.settlement_lag_days))
        .bind(format_time(fund.cutoff_time))
        .bind(fund.admin_fee_rate.map(|d| d.to_canonical_string()))
        .bind(fund.management_fee_rate.map(|d| d.to_canonical_string()))
        .bind(fund.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_fund(&self, fund_id: &FundId) -> Result<Option<Fund>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        fetch_fund(&mut conn, fund_id).await
    }

    /// Active funds ordered by legal name, optionally restricted to one type.
    pub async fn list_active_funds(
        &self,
        fund_type: Option<FundType>,
    ) -> Result<Vec<Fund>, sqlx::Error> {
        let sql = format!(
            "SELECT {FUND_COLUMNS} FROM funds
             WHERE active = 1 AND (? IS NULL OR fund_type = ?)
             ORDER BY legal_name ASC, id ASC"
        );
        let code = fund_type.map(|t| t.code());
        let rows = sqlx::query(&sql)
            .bind(code)
            .bind(code)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(fund_from_row).collect()
    }

    /// Set the active flag of a fund. Returns false if the fund does not exist.
    pub async fn set_fund_active(&self, fund_id: &FundId, active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE funds SET active = ? WHERE id = ?")
            .bind(active)
            .bind(fund_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a fund and its quota history.
    ///
    /// # Errors
    /// `NotFound` if the fund does not exist; `InvalidState` while any asset,
    /// receivable or movement still references it.
    pub async fn delete_fund(&self, fund_id: &FundId) -> Result<(), FundError> {
        let mut tx = self.pool.begin().await?;

        if fetch_fund(&mut *tx, fund_id).await?.is_none() {
            return Err(FundError::not_found(format!("fund {fund_id}")));
        }

        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM assets WHERE fund_id = ?) AS assets,
                (SELECT COUNT(*) FROM receivables WHERE fund_id = ?) AS receivables,
                (SELECT COUNT(*) FROM movements WHERE fund_id = ?) AS movements
            "#,
        )
        .bind(fund_id.as_str())
        .bind(fund_id.as_str())
        .bind(fund_id.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let assets: i64 = row.get("assets");
        let receivables: i64 = row.get("receivables");
        let movements: i64 = row.get("movements");
        if assets + receivables + movements > 0 {
            return Err(FundError::invalid_state(format!(
                "fund {fund_id} still has {assets} assets, {receivables} receivables and {movements} movements"
            )));
        }

        sqlx::query("DELETE FROM funds WHERE id = ?")
            .bind(fund_id.as_str())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(fund_id = %fund_id, "fund deleted");
        Ok(())
    }

    /// Insert a quotaholder.
    ///
    /// # Errors
    /// Returns an error if the insert fails (e.g. duplicate tax id).
    pub async fn insert_quotaholder(&self, holder: &Quotaholder) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO quotaholders (
                id, tax_id, person_type, name, qualification, suitability_date, active
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(holder.id.as_str())
        .bind(&holder.tax_id)
        .bind(holder.person_type.code())
        .bind(&holder.name)
        .bind(holder.qualification.map(|q| q.code()))
        .bind(holder.suitability_date.map(format_date))
        .bind(holder.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_quotaholder(
        &self,
        quotaholder_id: &QuotaholderId,
    ) -> Result<Option<Quotaholder>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        fetch_quotaholder(&mut conn, quotaholder_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::test_support::setup_test_db;
    use crate::domain::{PersonType, QuotaHistory, QuotationConvention};
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_insert_and_get_fund_roundtrip() {
        let (repo, _temp) = setup_test_db().await;
        let mut fund = Fund::new("11222333000181", "FIDC Alpha", FundType::Receivables);
        fund.quotation_convention = QuotationConvention::NextDay;
        fund.settlement_lag_days = 2;
        fund.cutoff_time = NaiveTime::from_hms_opt(15, 30, 0).unwrap();
        fund.admin_fee_rate = Some(dec!(0.015));
        repo.insert_fund(&fund).await.unwrap();

        let loaded = repo.get_fund(&fund.id).await.unwrap().unwrap();
        assert_eq!(loaded, fund);
        assert!(repo.get_fund(&FundId::new("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_active_funds_filters_type_and_flag() {
        let (repo, _temp) = setup_test_db().await;
        let fidc = Fund::new("1", "B FIDC", FundType::Receivables);
        let fii = Fund::new("2", "A FII", FundType::RealEstate);
        let mut closed = Fund::new("3", "C FIDC", FundType::Receivables);
        closed.active = false;
        for f in [&fidc, &fii, &closed] {
            repo.insert_fund(f).await.unwrap();
        }

        let all = repo.list_active_funds(None).await.unwrap();
        assert_eq!(all.iter().map(|f| f.legal_name.as_str()).collect::<Vec<_>>(), vec!["A FII", "B FIDC"]);

        let receivables = repo.list_active_funds(Some(FundType::Receivables)).await.unwrap();
        assert_eq!(receivables.len(), 1);
        assert_eq!(receivables[0].id, fidc.id);
    }

    #[tokio::test]
    async fn test_quotaholder_roundtrip() {
        let (repo, _temp) = setup_test_db().await;
        let mut holder = Quotaholder::new("12345678909", "Ana Souza", PersonType::Individual);
        holder.qualification = Some(Qualification::Qualified);
        holder.suitability_date = NaiveDate::from_ymd_opt(2024, 1, 2);
        repo.insert_quotaholder(&holder).await.unwrap();

        let loaded = repo.get_quotaholder(&holder.id).await.unwrap().unwrap();
        assert_eq!(loaded, holder);
    }

    #[tokio::test]
    async fn test_delete_fund_with_only_quota_history_cascades() {
        let (repo, _temp) = setup_test_db().await;
        let fund = Fund::new("1", "FII Beta", FundType::RealEstate);
        repo.insert_fund(&fund).await.unwrap();
        let quota = QuotaHistory::priced(
            fund.id.clone(),
            NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
            dec!(1.0),
            dec!(1000000),
            dec!(1000000),
            0,
            dec!(0),
        );
        repo.upsert_quota(&quota).await.unwrap();

        repo.delete_fund(&fund.id).await.unwrap();

        assert!(repo.get_fund(&fund.id).await.unwrap().is_none());
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM quota_history")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_delete_fund_with_assets_is_blocked() {
        let (repo, _temp) = setup_test_db().await;
        let fund = Fund::new("1", "FII Beta", FundType::RealEstate);
        repo.insert_fund(&fund).await.unwrap();
        repo.insert_asset(&crate::domain::Asset::new(fund.id.clone(), "CRI", dec!(10)))
            .await
            .unwrap();

        let err = repo.delete_fund(&fund.id).await.unwrap_err();
        assert!(matches!(err, FundError::InvalidState(_)));
        assert!(repo.get_fund(&fund.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_missing_fund_is_not_found() {
        let (repo, _temp) = setup_test_db().await;
        let err = repo.delete_fund(&FundId::new("nope")).await.unwrap_err();
        assert!(matches!(err, FundError::NotFound(_)));
    }
}
