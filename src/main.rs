//! IIIF Streamer - a IIIF Image API server for tiled pyramidal TIFFs.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iiif_streamer::{
    catalog::Catalog,
    config::{CheckConfig, Cli, Command, ServeConfig},
    format::tiff::{compression_name, TiffPyramid},
    server::{create_router, RouterConfig},
    tile::{JpegTileEncoder, TileService},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("IIIF Streamer v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Data directory: {}", config.data_dir.display());
    info!("  Default IIIF version: {}", config.api_version());
    match config.base_url {
        Some(ref base_url) => info!("  Base URL: {}", base_url),
        None => info!("  Base URL: from request headers"),
    }
    info!("  Edge tile JPEG quality: {}", config.jpeg_quality);

    let catalog = match Catalog::load_dir(&config.data_dir).await {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(
                "Failed to read data directory {}: {}",
                config.data_dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    if catalog.is_empty() {
        warn!(
            "No servable images found in {}; every request will return 404",
            config.data_dir.display()
        );
    }

    let tile_service =
        TileService::with_encoder(Arc::new(catalog), JpegTileEncoder::new(config.jpeg_quality));
    let router = create_router(tile_service, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/iiif", addr);
    info!("    curl http://{}/iiif/<identifier>/info.json", addr);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "iiif_streamer=debug,tower_http=debug"
    } else {
        "iiif_streamer=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_default_version(config.api_version())
        .with_port(config.port)
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);

    if let Some(ref base_url) = config.base_url {
        router_config = router_config.with_base_url(base_url.clone());
    }

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    let mut failures = 0usize;

    for path in &config.files {
        match TiffPyramid::open(path).await {
            Ok(pyramid) => print_pyramid(path, &pyramid),
            Err(e) => {
                println!("✗ {}: {}", path.display(), e);
                failures += 1;
            }
        }
        println!();
    }

    if failures > 0 {
        println!("{} of {} file(s) failed", failures, config.files.len());
        return ExitCode::FAILURE;
    }

    println!("✓ All {} file(s) parsed", config.files.len());
    ExitCode::SUCCESS
}

fn print_pyramid(path: &Path, pyramid: &TiffPyramid) {
    println!(
        "✓ {} ({}, {}x{}, {} level(s))",
        path.display(),
        if pyramid.is_bigtiff { "BigTIFF" } else { "TIFF" },
        pyramid.width,
        pyramid.height,
        pyramid.levels.len()
    );

    for level in &pyramid.levels {
        println!(
            "  level {}: {}x{} scale {} tiles {}x{} grid {}x{} {}{}",
            level.rank,
            level.width,
            level.height,
            level.scale,
            level.tile_width,
            level.tile_height,
            level.tiles_across,
            level.tiles_down,
            compression_name(level.compression),
            if level.jpeg_tables.is_some() {
                " +tables"
            } else {
                ""
            }
        );
    }

    let sizes = pyramid.single_tile_sizes();
    if sizes.is_empty() {
        println!("  full-image sizes: none");
    } else {
        let sizes: Vec<String> = sizes.iter().map(|(w, h)| format!("{}x{}", w, h)).collect();
        println!("  full-image sizes: {}", sizes.join(", "));
    }
}
