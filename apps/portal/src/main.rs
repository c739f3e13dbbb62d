//! Portal Entry Point
//!
//! Terminal front-end for the education portal's session core. Uses
//! `anyhow` for startup errors; session-level failures surface as
//! controller state, never as crashes.

use std::env;
use std::sync::Arc;

use session::{HttpSessionStore, MemorySessionStore, Profile, StoreConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portal=info,session=info,catalog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let backend_url = env::var("PORTAL_BACKEND_URL").ok();
    let api_key = env::var("PORTAL_API_KEY").ok();

    match (backend_url, api_key) {
        (Some(url), Some(key)) => {
            let cache_path = env::var("PORTAL_TOKEN_CACHE")
                .unwrap_or_else(|_| ".portal-session.json".to_string());
            let config = StoreConfig::new(&url, &key).with_cache_path(cache_path);
            let store = Arc::new(HttpSessionStore::new(config)?);
            let data = catalog::CatalogClient::new(&url, &key)?;

            tracing::info!(backend = %url, "Using hosted backend");
            commands::run(
                Arc::clone(&store),
                Some(commands::CatalogHandle {
                    client: data,
                    store,
                }),
            )
            .await
        }
        _ => {
            tracing::warn!(
                "PORTAL_BACKEND_URL / PORTAL_API_KEY not set; \
                 using the built-in demo account (demo@university.edu / pyramids)"
            );
            let store = MemorySessionStore::new().with_account(
                "demo@university.edu",
                "pyramids",
                Profile::new()
                    .with_display_name("Demo Student")
                    .with_institution("Cairo University")
                    .with_field_of_study("Molecular Biology"),
            )?;
            commands::run(Arc::new(store), None).await
        }
    }
}
