//! HTTP surface of refundlens.
//!
//! Exposes the health probe, filing status lookup, the streaming explanation
//! endpoint and the manual demo-data trigger.

pub mod error;
pub mod logging;
pub mod routes;

use std::sync::Arc;

use anyhow::{Context, bail};
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use refundlens_core::{Config, ReturnStore};
use refundlens_orchestrator::{ExplanationOrchestrator, ModeSelector, Pacing};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::logging::RequestLoggerLayer;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: ReturnStore,
    pub orchestrator: Arc<ExplanationOrchestrator>,
}

impl AppState {
    pub fn new(store: ReturnStore, orchestrator: ExplanationOrchestrator) -> Self {
        Self { store, orchestrator: Arc::new(orchestrator) }
    }

    /// Opens storage and builds the explanation pipeline from `config`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or the AI client cannot be built.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = ReturnStore::open(config.database.path.as_deref())
            .context("failed to open filing database")?;
        let modes = ModeSelector::from_config(config).context("failed to configure AI client")?;
        let orchestrator = ExplanationOrchestrator::new(
            Arc::new(store.clone()),
            modes,
            Pacing::from(&config.pacing),
        );
        Ok(Self::new(store, orchestrator))
    }
}

/// CORS policy for the browser front end.
///
/// # Errors
/// Returns an error if an origin is not a valid header value or is `*`, which
/// cannot be combined with credentials.
pub fn cors_layer(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::with_capacity(allowed_origins.len());
    for origin in allowed_origins {
        if origin.trim() == "*" {
            bail!("wildcard origin cannot be used with credentialed CORS");
        }
        origins.push(
            HeaderValue::from_str(origin.trim())
                .with_context(|| format!("invalid CORS origin: {origin}"))?,
        );
    }

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true))
}

/// Builds the application router.
///
/// # Errors
/// Returns an error if the CORS origins are invalid.
pub fn router(state: AppState, allowed_origins: &[String]) -> anyhow::Result<Router> {
    Ok(Router::new()
        .route("/health", get(routes::health))
        .route("/v1/status/explain", get(routes::explain_lookup).post(routes::explain))
        .route("/v1/status/:id", get(routes::get_status))
        .route("/internal/scrape", post(routes::insert_demo))
        .layer(cors_layer(allowed_origins)?)
        .layer(RequestLoggerLayer)
        .with_state(state))
}
