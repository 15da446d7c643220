use anyhow::Context;
use axum::serve;
use pin_a_tree::backend::{config::AppConfig, create_router, initialize_backend};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pin_a_tree=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::load()?;
    let app_state = initialize_backend(&config).await?;
    let router = create_router(app_state, &config)?;

    let addr = config.bind_address();
    info!("🌳 Starting Pin-a-Tree API server at {}", addr);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", listener.local_addr()?);

    serve(listener, router).await?;
    Ok(())
}
