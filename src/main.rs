use anyhow::Context;
use fundcota::{
    api, config::Config, db::init_db, BatchOrchestrator, LogNotifier, MovementProcessor, Notifier,
    PricingEngine, QuotaReporter, Repository, StubReporter, WebhookNotifier,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("configuration error")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .with_context(|| format!("failed to initialize database at {}", config.database_path))?;
    let repo = Arc::new(Repository::new(pool));

    let notifier: Arc<dyn Notifier> = match &config.alert_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone(), config.alert_email.clone())),
        None => Arc::new(LogNotifier::new(config.alert_email.clone())),
    };
    let reporter: Arc<dyn QuotaReporter> = Arc::new(StubReporter::new(config.report_dir.clone()));

    let pricing = PricingEngine::new(repo.clone(), config.provisioning.clone());
    let movements = MovementProcessor::new(
        repo.clone(),
        config.tax.clone(),
        config.settlement.clone(),
    );
    let orchestrator = Arc::new(BatchOrchestrator::new(
        repo.clone(),
        pricing.clone(),
        movements.clone(),
        notifier,
        reporter,
        config.retry_policy(),
        config.delinquency_threshold_pct,
    ));

    let app = api::create_router(api::AppState::new(repo, pricing, movements, orchestrator));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
