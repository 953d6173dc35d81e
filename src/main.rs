//! Paygate delivery worker.
//!
//! Boots the retry scheduler against the configured database: claims due
//! webhooks on a fixed interval and redelivers them. The HTTP surface that
//! feeds the ledger runs elsewhere; this binary only drains the retry
//! backlog.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use paygate::adapters::http::ReqwestDeliveryTransport;
use paygate::adapters::postgres::PostgresWebhookStore;
use paygate::application::{
    DeliveryConfig, RetryScheduler, RetrySchedulerConfig, WebhookDeliveryEngine,
};
use paygate::config::AppConfig;
use paygate::domain::webhook::{RetryBackoff, WebhookSigner};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::load()?;
    config.validate()?;

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let store = Arc::new(PostgresWebhookStore::new(pool));
    let transport = Arc::new(ReqwestDeliveryTransport::new(
        config.webhook.request_timeout(),
    )?);
    let signer = WebhookSigner::new(config.webhook.signing_secret.clone());
    let engine = Arc::new(WebhookDeliveryEngine::new(
        store.clone(),
        transport,
        signer,
        DeliveryConfig {
            max_retries: config.webhook.max_retries,
            backoff: RetryBackoff::new(config.webhook.base_delay(), config.webhook.max_delay()),
            signature_max_age: config.webhook.signature_max_age(),
        },
    ));
    let scheduler = RetryScheduler::with_config(
        store,
        engine,
        RetrySchedulerConfig {
            sweep_interval: config.webhook.sweep_interval(),
            batch_size: config.webhook.sweep_batch_size,
        },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    tracing::info!(
        sweep_interval_secs = config.webhook.sweep_interval_secs,
        batch_size = config.webhook.sweep_batch_size,
        "Delivery worker started"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, finishing current sweep");
    shutdown_tx.send(true)?;

    // Give the final sweep a bounded window before giving up.
    match tokio::time::timeout(Duration::from_secs(30), worker).await {
        Ok(result) => result??,
        Err(_) => tracing::warn!("Final sweep did not finish in time"),
    }

    tracing::info!("Delivery worker stopped");
    Ok(())
}
