use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use buildfinder_backend::api;
use buildfinder_backend::catalog::Catalog;
use buildfinder_backend::config::Config;
use buildfinder_backend::metrics;
use buildfinder_backend::optimizer::Optimizer;
use buildfinder_backend::packs::PackRegistry;

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "buildfinder-backend" }))
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::load();
    metrics::register_metrics();

    let catalog = match Catalog::load(&config.catalog_path) {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!(path = %config.catalog_path.display(), "Failed to load catalog: {e}");
            std::process::exit(1);
        }
    };

    let mut packs = PackRegistry::from_catalog(&catalog);
    if let Some(path) = &config.packs_path {
        packs = match packs.load_user_packs(&catalog, path) {
            Ok(packs) => packs,
            Err(e) => {
                tracing::error!(path = %path.display(), "Failed to load card packs: {e}");
                std::process::exit(1);
            }
        };
    }

    metrics::CATALOG_CARDS.set(catalog.cards().len() as i64);
    metrics::CATALOG_ITEMS.set(catalog.items().len() as i64);
    tracing::info!(
        cards = catalog.cards().len(),
        items = catalog.items().len(),
        archetypes = catalog.archetypes().len(),
        packs = packs.len(),
        "Catalog ready"
    );

    let optimizer = Optimizer::new(Arc::new(catalog), Arc::new(packs));

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .merge(api::router(optimizer, config.optimize_timeout))
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to {addr}: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!("Build finder backend listening on port {}", config.port);
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {e}");
    }
}
