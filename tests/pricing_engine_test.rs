use chrono::NaiveDate;
use fundcota::db::init_db;
use fundcota::domain::{Asset, Fund, FundType, Receivable, ReceivableStatus};
use fundcota::engine::tax::ProvisioningTable;
use fundcota::{FundError, PricingEngine, Repository};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;

async fn setup() -> (Arc<Repository>, PricingEngine, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let engine = PricingEngine::new(repo.clone(), ProvisioningTable::default());
    (repo, engine, temp_dir)
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_first_pricing_seeds_share_count() {
    let (repo, engine, _temp) = setup().await;
    let fund = Fund::new("11111111000111", "FII Atlas", FundType::RealEstate);
    repo.insert_fund(&fund).await.unwrap();
    repo.insert_asset(&Asset::new(fund.id.clone(), "imovel", dec!(1000000)))
        .await
        .unwrap();

    let quota = engine.price_fund_close(&fund.id, ymd(2024, 3, 4)).await.unwrap();

    assert_eq!(quota.share_count, dec!(1000000));
    assert_eq!(quota.share_price, dec!(1));
    assert_eq!(quota.net_asset_value, dec!(1000000));
    assert_eq!(quota.daily_return, Some(dec!(0)));
    assert_eq!(quota.holder_count, 0);
}

#[tokio::test]
async fn test_daily_return_against_previous_quota() {
    let (repo, engine, _temp) = setup().await;
    let fund = Fund::new("22222222000122", "FII Boreal", FundType::RealEstate);
    repo.insert_fund(&fund).await.unwrap();
    repo.insert_asset(&Asset::new(fund.id.clone(), "imovel", dec!(1000000)))
        .await
        .unwrap();
    engine.price_fund_close(&fund.id, ymd(2024, 3, 4)).await.unwrap();

    repo.insert_asset(&Asset::new(fund.id.clone(), "cdb", dec!(50000)))
        .await
        .unwrap();
    let quota = engine.price_fund_close(&fund.id, ymd(2024, 3, 5)).await.unwrap();

    assert_eq!(quota.share_count, dec!(1000000));
    assert_eq!(quota.share_price, dec!(1.05));
    assert_eq!(quota.daily_return, Some(dec!(0.05)));
}

#[tokio::test]
async fn test_repricing_same_date_keeps_one_row() {
    let (repo, engine, _temp) = setup().await;
    let fund = Fund::new("33333333000133", "FIP Cedro", FundType::Participations);
    repo.insert_fund(&fund).await.unwrap();
    repo.insert_asset(&Asset::new(fund.id.clone(), "acoes", dec!(500000)))
        .await
        .unwrap();

    let first = engine.price_fund_close(&fund.id, ymd(2024, 3, 4)).await.unwrap();
    let second = engine.price_fund_close(&fund.id, ymd(2024, 3, 4)).await.unwrap();

    assert_eq!(first, second);
    let rows = repo
        .quota_history(&fund.id, ymd(2024, 3, 1), ymd(2024, 3, 31))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_fees_accrue_pro_rata() {
    let (repo, engine, _temp) = setup().await;
    let mut fund = Fund::new("44444444000144", "FII Dunas", FundType::RealEstate);
    fund.admin_fee_rate = Some(dec!(0.12));
    repo.insert_fund(&fund).await.unwrap();
    repo.insert_asset(&Asset::new(fund.id.clone(), "imovel", dec!(1200000)))
        .await
        .unwrap();

    // 1% a month for half a month.
    let quota = engine.price_fund_close(&fund.id, ymd(2024, 3, 15)).await.unwrap();

    assert_eq!(quota.net_asset_value, dec!(1194000));
    assert_eq!(quota.share_price, dec!(1.194));
}

#[tokio::test]
async fn test_receivables_fund_persists_provisioning() {
    let (repo, engine, _temp) = setup().await;
    let fund = Fund::new("55555555000155", "FIDC Estrela", FundType::Receivables);
    repo.insert_fund(&fund).await.unwrap();
    repo.insert_asset(&Asset::new(fund.id.clone(), "cotas_senior", dec!(200000)))
        .await
        .unwrap();

    let current = Receivable::new(
        fund.id.clone(),
        "DUP-1",
        ymd(2024, 4, 10),
        dec!(100000),
        ReceivableStatus::NotYetDue,
        0,
    );
    let late = Receivable::new(
        fund.id.clone(),
        "DUP-2",
        ymd(2024, 1, 20),
        dec!(50000),
        ReceivableStatus::PastDue,
        45,
    );
    let written_off = Receivable::new(
        fund.id.clone(),
        "DUP-3",
        ymd(2023, 1, 20),
        dec!(10000),
        ReceivableStatus::WrittenOff,
        400,
    );
    for r in [&current, &late, &written_off] {
        repo.insert_receivable(r).await.unwrap();
    }

    let quota = engine.price_fund_close(&fund.id, ymd(2024, 3, 5)).await.unwrap();

    // 200000 - 1% of 50000
    assert_eq!(quota.net_asset_value, dec!(199500));
    assert_eq!(quota.share_price, dec!(0.1995));

    let late = repo.get_receivable(&late.id).await.unwrap().unwrap();
    assert_eq!(late.provisioning_amount, dec!(500));
    assert_eq!(late.provisioning_pct, dec!(1));

    let written_off = repo.get_receivable(&written_off.id).await.unwrap().unwrap();
    assert_eq!(written_off.provisioning_amount, dec!(0));
}

#[tokio::test]
async fn test_pricing_unknown_fund_is_not_found() {
    let (_repo, engine, _temp) = setup().await;
    let result = engine
        .price_fund_close(&fundcota::FundId::new("missing"), ymd(2024, 3, 4))
        .await;
    assert!(matches!(result, Err(FundError::NotFound(_))));
}

#[tokio::test]
async fn test_invalid_receivable_aborts_without_writing() {
    let (repo, engine, _temp) = setup().await;
    let fund = Fund::new("66666666000166", "FIDC Falcao", FundType::Receivables);
    repo.insert_fund(&fund).await.unwrap();
    repo.insert_receivable(&Receivable::new(
        fund.id.clone(),
        "DUP-9",
        ymd(2024, 3, 1),
        dec!(1000),
        ReceivableStatus::PastDue,
        -1,
    ))
    .await
    .unwrap();

    let result = engine.price_fund_close(&fund.id, ymd(2024, 3, 5)).await;
    assert!(matches!(result, Err(FundError::InvalidInput(_))));
    assert!(repo.get_quota(&fund.id, ymd(2024, 3, 5)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_monthly_return_stamped_on_every_row() {
    let (repo, engine, _temp) = setup().await;
    let fund = Fund::new("77777777000177", "FII Gaia", FundType::RealEstate);
    repo.insert_fund(&fund).await.unwrap();
    repo.insert_asset(&Asset::new(fund.id.clone(), "imovel", dec!(1000000)))
        .await
        .unwrap();
    engine.price_fund_close(&fund.id, ymd(2024, 3, 1)).await.unwrap();

    repo.insert_asset(&Asset::new(fund.id.clone(), "cdb", dec!(20000)))
        .await
        .unwrap();
    engine.price_fund_close(&fund.id, ymd(2024, 3, 28)).await.unwrap();

    let value = engine
        .recompute_monthly_return(&fund.id, 3, 2024)
        .await
        .unwrap();
    assert_eq!(value, Some(dec!(0.02)));

    let rows = repo
        .quota_history(&fund.id, ymd(2024, 3, 1), ymd(2024, 3, 31))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|q| q.monthly_return == Some(dec!(0.02))));

    let yearly = engine.recompute_yearly_return(&fund.id, 2024).await.unwrap();
    assert_eq!(yearly, Some(dec!(0.02)));
}

#[tokio::test]
async fn test_monthly_return_of_empty_month_is_none() {
    let (repo, engine, _temp) = setup().await;
    let fund = Fund::new("88888888000188", "FII Horizonte", FundType::RealEstate);
    repo.insert_fund(&fund).await.unwrap();

    let value = engine
        .recompute_monthly_return(&fund.id, 2, 2024)
        .await
        .unwrap();
    assert_eq!(value, None);

    let invalid = engine.recompute_monthly_return(&fund.id, 13, 2024).await;
    assert!(matches!(invalid, Err(FundError::InvalidInput(_))));
}

#[tokio::test]
async fn test_quota_history_rejects_inverted_range() {
    let (_repo, engine, _temp) = setup().await;
    let result = engine
        .quota_history(&fundcota::FundId::new("f"), ymd(2024, 3, 5), ymd(2024, 3, 1))
        .await;
    assert!(matches!(result, Err(FundError::InvalidInput(_))));
}
