//! Router configuration for the IIIF server.
//!
//! # Route Structure
//!
//! ```text
//! /health                - Health check
//! /iiif                  - List image identifiers
//! /iiif/{*path}          - Redirect, info.json or image
//! ```
//!
//! # Example
//!
//! ```ignore
//! use iiif_streamer::catalog::Catalog;
//! use iiif_streamer::server::{create_router, RouterConfig};
//! use iiif_streamer::tile::TileService;
//!
//! let catalog = Catalog::load_dir("/data/images").await?;
//! let tile_service = TileService::new(Arc::new(catalog));
//!
//! let config = RouterConfig::new()
//!     .with_base_url("https://images.example.org")
//!     .with_cors_origins(vec!["https://viewer.example.org".to_string()]);
//!
//! let router = create_router(tile_service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::{CONTENT_TYPE, RANGE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, iiif_handler, list_handler, AppState};
use crate::iiif::ApiVersion;
use crate::tile::TileService;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Version for unprefixed paths
    pub default_version: ApiVersion,

    /// Public base URL (None = derive from request headers)
    pub base_url: Option<String>,

    /// Listening port, used when no base URL can be derived
    pub port: u16,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age for info.json, in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default:
    /// - Unprefixed paths are IIIF 3
    /// - Base URL is derived from each request
    /// - CORS allows any origin
    /// - info.json max-age is 1 hour (3600 seconds)
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            default_version: ApiVersion::V3,
            base_url: None,
            port: 3000,
            cors_origins: None,
            cache_max_age: 3600,
            enable_tracing: true,
        }
    }

    pub fn with_default_version(mut self, version: ApiVersion) -> Self {
        self.default_version = version;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the info.json Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
pub fn create_router(tile_service: TileService, config: RouterConfig) -> Router {
    let app_state = AppState {
        tile_service,
        default_version: config.default_version,
        base_url: config.base_url.clone(),
        port: config.port,
        cache_max_age: config.cache_max_age,
    };

    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/iiif", get(list_handler))
        .route("/iiif/{*path}", get(iiif_handler))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, RANGE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
