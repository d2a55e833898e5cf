use std::sync::Arc;

use cinder_api::config::AppConfig;
use cinder_api::events::ChangeBus;
use cinder_api::rate_limit::RateLimiter;
use cinder_api::store::{MemStore, PgStore, Store};
use cinder_api::AppState;
use cinder_shared::clients::rabbitmq::RabbitMQClient;
use cinder_shared::clients::redis::RedisClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cinder_shared::middleware::init_tracing("cinder-api");
    let metrics = cinder_shared::middleware::init_metrics();

    let config = AppConfig::load()?;
    let port = config.port;

    let store: Arc<dyn Store> = match config.store_backend.as_str() {
        "memory" => {
            tracing::warn!("running with the in-memory store; state is lost on restart");
            Arc::new(MemStore::new())
        }
        _ => {
            let pool = cinder_shared::clients::db::create_pool(&config.database_url);
            Arc::new(PgStore::new(pool))
        }
    };

    let limiter = match config.rate_limit_backend.as_str() {
        "redis" => {
            let redis = RedisClient::connect(&config.redis_url).await?;
            RateLimiter::redis(redis)
        }
        _ => RateLimiter::memory(),
    };

    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;

    let state = Arc::new(AppState {
        store,
        config,
        rabbitmq,
        limiter,
        bus: ChangeBus::default(),
        metrics,
    });

    let app = cinder_api::router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "cinder-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
