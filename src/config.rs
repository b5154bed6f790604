//! Configuration management for the IIIF server.
//!
//! Command-line arguments are parsed with clap; every `serve` option can also
//! be set through an environment variable with the `IIIF_` prefix.
//!
//! # Environment Variables
//!
//! - `IIIF_HOST` - Server bind address (default: 0.0.0.0)
//! - `IIIF_PORT` - Server port (default: 3000)
//! - `IIIF_DATA_DIR` - Directory scanned for TIFF containers (required)
//! - `IIIF_BASE_URL` - Public base URL used in `id` fields and redirects
//! - `IIIF_DEFAULT_VERSION` - API version for unprefixed paths (default: 3)
//! - `IIIF_JPEG_QUALITY` - Quality of re-encoded edge tiles (default: 90)
//! - `IIIF_CACHE_MAX_AGE` - info.json cache max-age seconds (default: 3600)
//! - `IIIF_CORS_ORIGINS` - Comma-separated allowed origins (default: any)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::iiif::ApiVersion;
use crate::tile::{is_valid_quality, DEFAULT_JPEG_QUALITY};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default API version for unprefixed paths.
pub const DEFAULT_VERSION: &str = "3";

/// Default info.json cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// IIIF Streamer - serves tiled pyramidal TIFFs over the IIIF Image API.
///
/// JPEG tiles are streamed straight out of the file; only edge tiles
/// requested at their cropped size are re-encoded.
#[derive(Parser, Debug, Clone)]
#[command(name = "iiif-streamer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the HTTP server.
    Serve(ServeConfig),

    /// Parse container files and print their pyramid structure.
    Check(CheckConfig),
}

/// Options for `serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "IIIF_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "IIIF_PORT")]
    pub port: u16,

    // =========================================================================
    // Catalog Configuration
    // =========================================================================
    /// Directory containing .tif/.tiff/.ptif/.btf files.
    ///
    /// Each file is served under its file stem.
    #[arg(short, long, env = "IIIF_DATA_DIR")]
    pub data_dir: PathBuf,

    // =========================================================================
    // IIIF Configuration
    // =========================================================================
    /// Public base URL, e.g. https://images.example.org.
    ///
    /// If not specified, derived from X-Forwarded-Proto and Host.
    #[arg(long, env = "IIIF_BASE_URL")]
    pub base_url: Option<String>,

    /// IIIF Image API version for paths without a version prefix (2 or 3).
    #[arg(long, default_value = DEFAULT_VERSION, env = "IIIF_DEFAULT_VERSION")]
    pub default_version: String,

    /// JPEG quality for re-encoded edge tiles (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "IIIF_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Cache-Control max-age for info.json, in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "IIIF_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "IIIF_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.data_dir.as_os_str().is_empty() {
            return Err("Data directory is required. Set --data-dir or IIIF_DATA_DIR".to_string());
        }

        if ApiVersion::parse(&self.default_version).is_err() {
            return Err(format!(
                "default_version must be 2 or 3, got {}",
                self.default_version
            ));
        }

        if !is_valid_quality(self.jpeg_quality) {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        if let Some(ref base_url) = self.base_url {
            let parsed =
                url::Url::parse(base_url).map_err(|e| format!("Invalid base_url: {}", e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(format!(
                    "base_url must use http or https, got {}",
                    parsed.scheme()
                ));
            }
            if parsed.query().is_some() || parsed.fragment().is_some() {
                return Err("base_url must not have a query or fragment".to_string());
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Version for unprefixed paths (call validate() first).
    pub fn api_version(&self) -> ApiVersion {
        ApiVersion::parse(&self.default_version).unwrap_or(ApiVersion::V3)
    }
}

/// Options for `check`.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// Container files to inspect.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
