use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use rail_api::{
    app,
    metrics::Metrics,
    state::{AppState, AuthConfig, Repositories},
};
use rail_core::notify::Notifier;
use rail_store::app_config::{Config, StorageBackend};
use rail_store::{DbClient, LogNotifier, MemoryStore, RedisClient, SmtpNotifier};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rail_api=debug,rail_booking=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting RailReserve API on port {}", config.server.port);

    let (repos, business_rules) = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage, data is lost on restart");
            (Repositories::memory(Arc::new(MemoryStore::new())), config.business_rules.clone())
        }
        StorageBackend::Postgres => {
            let db = DbClient::new(&config.database.url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            let rules = db
                .fetch_business_rules(config.business_rules.clone())
                .await
                .context("Failed to load business rules")?;
            (Repositories::postgres(db.pool.clone()), rules)
        }
    };

    let redis = match &config.redis {
        Some(redis) => Some(Arc::new(
            RedisClient::new(&redis.url).await.context("Failed to connect to Redis")?,
        )),
        None => {
            tracing::info!("Redis not configured, rate limiting disabled");
            None
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.email {
        Some(email) => Arc::new(SmtpNotifier::new(email).context("Failed to load email templates")?),
        None => {
            tracing::info!("SMTP not configured, notifications will be logged");
            Arc::new(LogNotifier)
        }
    };

    let metrics = Arc::new(Metrics::new().context("Failed to register metrics")?);
    let auth = AuthConfig { secret: config.auth.jwt_secret.clone() };
    let app_state = AppState::new(repos, notifier, redis, auth, business_rules, metrics.clone());
    metrics.track_cancellations(app_state.inventory.subscribe());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(app_state).into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
