//! HTTP request handlers for the IIIF Image API.
//!
//! # Endpoints
//!
//! - `GET /iiif/[{v}/]{id}` - Redirect to the capability document
//! - `GET /iiif/[{v}/]{id}/info.json` - Capability document
//! - `GET /iiif/[{v}/]{id}/{region}/{size}/{rotation}/{quality}.{format}` - Image
//! - `GET /iiif` - List image identifiers
//! - `GET /health` - Health check endpoint

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, warn};

use crate::error::{RequestError, TileError};
use crate::iiif::{image_id, info_json, ApiVersion, IiifPath};
use crate::tile::{TileBody, TileService, IMMUTABLE_CACHE_CONTROL};

/// Mount point of the IIIF routes.
pub const IIIF_PREFIX: &str = "/iiif/";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub tile_service: TileService,

    /// Version for paths without a version prefix
    pub default_version: ApiVersion,

    /// Public base URL; derived from request headers when unset
    pub base_url: Option<String>,

    /// Listening port, used for the fallback base URL
    pub port: u16,

    /// Cache-Control max-age for capability documents, in seconds
    pub cache_max_age: u32,
}

impl AppState {
    pub fn new(tile_service: TileService) -> Self {
        Self {
            tile_service,
            default_version: ApiVersion::V3,
            base_url: None,
            port: 3000,
            cache_max_age: 3600,
        }
    }

    /// Base URL for `id` fields and redirects.
    ///
    /// Prefers the configured URL, then `X-Forwarded-Proto` + `Host`, then
    /// `http://localhost:{port}`.
    pub fn base_url_for(&self, headers: &HeaderMap) -> String {
        if let Some(base) = &self.base_url {
            return base.trim_end_matches('/').to_string();
        }

        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .filter(|h| !h.is_empty());

        match host {
            Some(host) => {
                let scheme = headers
                    .get("x-forwarded-proto")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.split(',').next())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or("http");
                format!("{}://{}", scheme, host)
            }
            None => format!("http://localhost:{}", self.port),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_region")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Response from the image list endpoint.
#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    /// Identifiers in sorted order
    pub images: Vec<String>,
}

// =============================================================================
// Error Mapping
// =============================================================================

impl RequestError {
    /// Error type identifier used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::InvalidPath(_) => "invalid_path",
            RequestError::InvalidRegion(_) => "invalid_region",
            RequestError::InvalidSize(_) => "invalid_size",
            RequestError::InvalidRotation(_) => "invalid_rotation",
            RequestError::UnsupportedFormat(_) => "unsupported_format",
            RequestError::UnsupportedVersion(_) => "unsupported_version",
        }
    }
}

impl TileError {
    /// HTTP status and error type identifier for this error.
    pub fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            TileError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            TileError::Request(e) => (StatusCode::BAD_REQUEST, e.kind()),
            TileError::NoFullSizeMatch { .. } => (StatusCode::BAD_REQUEST, "no_passthrough_size"),
            TileError::NotTileAligned { .. } => (StatusCode::BAD_REQUEST, "not_tile_aligned"),
            TileError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            TileError::Container(_) => (StatusCode::INTERNAL_SERVER_ERROR, "container_error"),
            TileError::DecodeError { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "decode_error"),
            TileError::EncodeError { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
        }
    }
}

/// Convert TileError to HTTP response.
///
/// 5xx errors are logged at ERROR, 404s at DEBUG and other 4xx at WARN.
impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_kind();
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        TileError::Request(self).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle every request under `/iiif/`.
///
/// The raw URI path is used rather than a `Path` extractor so that each
/// segment is percent-decoded exactly once, after splitting.
///
/// # Response
///
/// - `303 See Other`: bare identifier, `Location` points at `info.json`
/// - `200 OK`: capability document or JPEG tile
/// - `400 Bad Request`: malformed path, unsupported parameters or no
///   matching stored tile
/// - `404 Not Found`: unknown identifier
/// - `500 Internal Server Error`: I/O or transcode failure
pub async fn iiif_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, TileError> {
    let path = uri
        .path()
        .strip_prefix(IIIF_PREFIX)
        .ok_or_else(|| RequestError::InvalidPath(uri.path().to_string()))?;

    match IiifPath::parse(path, state.default_version)? {
        IiifPath::Base {
            version,
            identifier,
        } => {
            state.tile_service.pyramid(&identifier)?;
            let base = state.base_url_for(&headers);
            let location = format!("{}/info.json", image_id(&base, version, &identifier));
            Ok(Redirect::to(&location).into_response())
        }

        IiifPath::Info {
            version,
            identifier,
        } => {
            let pyramid = state.tile_service.pyramid(&identifier)?;
            let base = state.base_url_for(&headers);
            let doc = info_json(&pyramid, version, &base, &identifier);

            Ok((
                [
                    (header::CONTENT_TYPE, version.info_content_type()),
                    (
                        header::CACHE_CONTROL,
                        format!("public, max-age={}", state.cache_max_age),
                    ),
                ],
                Json(doc),
            )
                .into_response())
        }

        IiifPath::Image {
            identifier, params, ..
        } => {
            let response = state.tile_service.get_image(&identifier, &params).await?;

            let body = match response.body {
                TileBody::Stream(reader) => Body::from_stream(ReaderStream::new(reader)),
                TileBody::Buffered(data) => Body::from(data),
            };

            Ok((
                [
                    (header::CONTENT_TYPE, "image/jpeg".to_string()),
                    (header::CONTENT_LENGTH, response.content_length.to_string()),
                    (header::CACHE_CONTROL, IMMUTABLE_CACHE_CONTROL.to_string()),
                ],
                body,
            )
                .into_response())
        }
    }
}

/// Handle image list requests.
///
/// # Endpoint
///
/// `GET /iiif`
///
/// # Response
///
/// ```json
/// { "images": ["a", "b"] }
/// ```
pub async fn list_handler(State(state): State<AppState>) -> Json<ImagesResponse> {
    Json(ImagesResponse {
        images: state.tile_service.catalog().identifiers(),
    })
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
