use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use charted::config::RuntimeConfig;
use charted::server::{serve, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "charted=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RuntimeConfig::from_env();
    tracing::info!(env = %config.env, api_root = %config.api_root, "starting");
    let state = Arc::new(AppState::new(config)?);
    serve(state).await
}
