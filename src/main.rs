//! Marketplace backend server

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marketplace_backend::domain::EventPublisher;
use marketplace_backend::mailer::{LogMailer, Mailer, SesMailer};
use marketplace_backend::storage::{ObjectStore, S3Store};
use marketplace_backend::{router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    let db = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, domain events will only be logged");
                None
            }
        },
        None => None,
    };
    let storage: Option<Arc<dyn ObjectStore>> = match (&config.s3_region, &config.s3_bucket) {
        (Some(region), Some(bucket)) => Some(Arc::new(S3Store::new(region.clone(), bucket.clone()).await)),
        _ => {
            tracing::warn!("AWS_S3_REGION or AWS_S3_BUCKET_NAME not set, uploads are disabled");
            None
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.mail_from {
        Some(from) => Arc::new(SesMailer::new(config.ses_region.clone(), from.clone()).await),
        None => {
            tracing::warn!("SES_FROM_EMAIL not set, outgoing mail will only be logged");
            Arc::new(LogMailer)
        }
    };

    let port = config.port;
    let environment = config.environment.clone();
    let state = AppState::new(db, config, storage, mailer, EventPublisher::new(nats));
    let app = router(state);

    tracing::info!(environment = %environment, "Marketplace backend listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
