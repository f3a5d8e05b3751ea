use std::sync::Arc;

use anyhow::Result;
use moodlog::config::Config;
use moodlog::handlers::AppState;
use moodlog::sentiment::{HttpSentimentModel, SentimentModel};
use moodlog::server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("moodlog={},tower_http=debug", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting moodlog service");
    tracing::info!(
        port = config.port,
        environment = %config.environment,
        cors_origin = %config.cors_origin,
        rate_limit_max = config.rate_limit_max,
        rate_limit_window_ms = config.rate_limit_window.as_millis() as u64,
        "configuration loaded"
    );

    let model: Arc<dyn SentimentModel> =
        Arc::new(HttpSentimentModel::new(&config.sentiment_api_url));
    let state = AppState::new(config, model);

    // Best-effort warmup so the first request usually finds the model
    // ready; a failure here is retried lazily on first use.
    let warmup_state = state.clone();
    tokio::spawn(async move {
        if warmup_state.sentiment.warm_up().await.is_err() {
            tracing::warn!("sentiment model warmup failed, will retry on first request");
        }
    });

    Server::new(state).run().await
}
