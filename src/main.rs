mod config;
mod model;
mod providers;
mod retrieval;
mod serde_utils;
mod server;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use retrieval::TaskRetriever;
use server::AppState;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipeline_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    // Load config
    let config = config::load_config()?;
    config.validate()?;

    let provider = providers::create_provider(&config)?;
    let retrieval = config.retrieval_config();
    info!(
        provider = provider.name(),
        workspace = retrieval.workspace_id.is_some(),
        invoicing = retrieval.invoicing_list_id.is_some(),
        "Starting pipeline gateway"
    );

    let retriever = TaskRetriever::new(provider, retrieval);
    let auth_token = config.server.auth_token.as_deref().unwrap_or_default();
    let state = AppState::new(retriever, auth_token);

    server::run(&config.server, state).await
}
