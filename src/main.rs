//! Labo REST API server binary.
//!
//! Resolves configuration from the environment once, loads the
//! pre-provisioned bearer-token registry, and serves the REST API.
//!
//! # Environment Variables
//! - `LABO_REST_ADDR`: server address (default: "0.0.0.0:3000")
//! - `LABO_LAB_NAME`: laboratory name printed on report headers
//! - `LABO_TOKENS_FILE`: path to the JSON token registry (required); an
//!   array of `{"token", "userId", "username", "role"}` objects

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::auth::TokenRegistry;
use api_rest::AppState;
use labo_core::{constants::DEFAULT_LAB_NAME, CoreConfig, SharedStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("labo_run=info".parse()?)
                .add_directive("labo_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("LABO_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let lab_name = std::env::var("LABO_LAB_NAME").unwrap_or_else(|_| DEFAULT_LAB_NAME.into());

    let tokens_file = std::env::var("LABO_TOKENS_FILE")
        .map_err(|_| anyhow::anyhow!("LABO_TOKENS_FILE must point to the token registry file"))?;
    let raw = std::fs::read_to_string(&tokens_file)?;
    let tokens = TokenRegistry::from_json(&raw)?;
    if tokens.is_empty() {
        tracing::warn!("token registry is empty; only /health will be reachable");
    }

    let cfg = Arc::new(CoreConfig::new(lab_name)?);
    let state = AppState::new(cfg, SharedStore::new(), Arc::new(tokens));

    tracing::info!("-- Starting Labo REST API on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, api_rest::router(state)).await?;

    Ok(())
}
