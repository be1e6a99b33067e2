//! # wikiseq: sequence-diagram macros for a wiki host
//!
//! `wikiseq` is an add-on service that turns textual sequence-diagram markup
//! embedded in wiki pages into PNG images. For each macro the host calls
//! back with a page id, page version, and macro hash; the add-on resolves
//! the diagram source out of the page's history, has a remote rendering
//! service draw it, and uploads the image as a durable page attachment.
//!
//! ## Request Flow
//!
//! The interesting path is `GET /diagram`. The [`attach`] module sequences
//! it: fetch the macro body from the host's history API, parse out the
//! diagram source, render it via the [`render`] client, derive a
//! content-addressed file name ([`fingerprint`]), and upload the bytes
//! through the host's attachment RPC ([`host`]). If the upload is refused —
//! a new page with nothing to attach to yet, missing permissions, a host
//! outage — the response degrades to an inline preview image served by this
//! add-on's own `GET /preview.png` route instead of failing the macro.
//!
//! The preview route is unauthenticated and cacheable: identical diagram
//! source within the configured window (24 hours by default) is served from
//! a process-local cache without re-rendering.
//!
//! Requests are fully independent: no shared mutable state beyond that
//! cache, no coordination, no retries. Each remote call failure is scoped
//! to the one request that made it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use wikiseq::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = wikiseq::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     wikiseq::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config)?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod attach;
pub mod config;
pub mod errors;
pub mod fingerprint;
pub mod host;
pub mod render;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use axum::{Router, response::Redirect, routing::get};
use moka::future::Cache;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};

use attach::DiagramPersistence;
pub use config::Config;
use host::{HostContent, RestHostClient};
use render::{RenderDiagram, RenderedArtifact, WsdClient};

/// Application state shared across all request handlers.
///
/// Everything here is a stateless process-wide service or a cheap handle:
/// cloning per request is free, and requests never coordinate through it.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// The fetch → render → upload orchestrator behind `/diagram`
    pub persistence: Arc<DiagramPersistence>,
    /// Render client, used directly by the preview route
    pub renderer: Arc<dyn RenderDiagram>,
    /// Successful preview renders keyed by exact diagram source
    pub preview_cache: Cache<String, RenderedArtifact>,
}

impl AppState {
    /// Build the shared clients and caches from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let renderer: Arc<dyn RenderDiagram> = Arc::new(WsdClient::new(&config.renderer));
        let host: Arc<dyn HostContent> = Arc::new(RestHostClient::new(&config.host_api));
        let persistence = Arc::new(DiagramPersistence::new(renderer.clone(), host, config)?);

        let preview_cache = Cache::builder()
            .max_capacity(config.preview_cache.max_capacity)
            .time_to_live(config.preview_cache.ttl)
            .build();

        Ok(Self {
            config: config.clone(),
            persistence,
            renderer,
            preview_cache,
        })
    }
}

/// Build the application router with all endpoints and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // The host probes the add-on root for its descriptor; descriptor
        // serving itself lives outside this service.
        .route("/", get(|| async { Redirect::temporary("/atlassian-connect.json") }))
        .route("/healthz", get(|| async { "OK" }))
        .route("/diagram", get(api::handlers::diagram::render_diagram))
        .route("/preview.png", get(api::handlers::preview::preview_png))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Main application struct owning the router and configuration.
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with clients and router built.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting diagram add-on with configuration: {:#?}", config);

        let state = AppState::from_config(&config)?;
        let router = build_router(state);

        Ok(Self { router, config })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Diagram add-on listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::test_utils::{create_test_app, test_config};
    use axum::http::StatusCode;
    use wiremock::MockServer;

    #[tokio::test]
    async fn test_healthz() {
        let render_service = MockServer::start().await;
        let host = MockServer::start().await;

        let app = create_test_app(test_config(&render_service.uri(), &host.uri()));
        let response = app.get("/healthz").await;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.text(), "OK");
    }

    #[tokio::test]
    async fn test_root_redirects_to_descriptor() {
        let render_service = MockServer::start().await;
        let host = MockServer::start().await;

        let app = create_test_app(test_config(&render_service.uri(), &host.uri()));
        let response = app.get("/").await;

        response.assert_status(StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.header("location"), "/atlassian-connect.json");
    }
}
