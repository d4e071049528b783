//! MVT Streamer - A vector tile server for PostGIS layers.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mvt_streamer::{
    config::{CheckConfig, Cli, Command, ServeConfig},
    server::{create_router, RouterConfig},
    store::{CacheStore, MemoryCacheStore, RedisCacheStore, DEFAULT_MEMORY_CACHE_BYTES},
    tile::{create_pg_pool, postgis_version, PostgisTileEncoder, TileCache, TileService},
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

    let layer_config = config.layer_config();

    info!("MVT Streamer v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Layer: {}", config.layer);
    info!(
        "  Source: {}.{} (srid {})",
        layer_config.table, layer_config.geometry_column, layer_config.srid
    );
    info!("  Attributes: {}", layer_config.columns.join(", "));
    match layer_config.filter_column {
        Some(ref column) => info!("  Filter: {} IS NOT NULL", column),
        None => info!("  Filter: none"),
    }
    info!(
        "  Cache: ttl {}s, writes {:?}",
        config.cache_ttl,
        config.write_mode()
    );

    // Database
    let pool = match create_pg_pool(config.database_url_or_empty(), config.db_pool_size) {
        Ok(pool) => pool,
        Err(e) => {
            error!("Invalid database configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let encoder = match PostgisTileEncoder::new(pool, layer_config) {
        Ok(encoder) => encoder,
        Err(e) => {
            error!("Invalid layer configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Connecting to PostgreSQL...");
    match encoder.postgis_version().await {
        Ok(version) => info!("  Connected, PostGIS {}", version),
        Err(e) => {
            error!("  Failed to reach PostGIS: {}", e);
            error!("  Please check:");
            error!("    - The database URL is correct and the server is reachable");
            error!("    - The postgis extension is installed in the database");
            return ExitCode::FAILURE;
        }
    }

    // Cache
    let store: Arc<dyn CacheStore> = match config.redis_url {
        Some(ref url) => {
            info!("Connecting to Redis...");
            match RedisCacheStore::connect(url).await {
                Ok(store) => {
                    info!("  Connected to {}", store.display_url());
                    Arc::new(store)
                }
                Err(e) => {
                    error!("  Failed to connect to Redis: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        None => {
            warn!(
                "No Redis URL configured, caching up to {} tiles in memory",
                config.memory_cache_entries
            );
            Arc::new(MemoryCacheStore::with_capacity(
                config.memory_cache_entries,
                DEFAULT_MEMORY_CACHE_BYTES,
            ))
        }
    };

    let cache = TileCache::with_ttl(store, config.cache_ttl());
    let tile_service = TileService::new(config.layer.clone(), encoder, cache)
        .with_write_mode(config.write_mode());

    let router = create_router(tile_service, build_router_config(&config));

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);
    info!("  View the layer:  open http://{}/view", addr);
    info!(
        "  Fetch a tile:    curl http://{}/tiles/{}/0/0/0.mvt",
        addr, config.layer
    );

    let server = axum::serve(listener, router).with_graceful_shutdown(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
    });

    if let Err(e) = server.await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "mvt_streamer=debug,tower_http=debug"
    } else {
        "mvt_streamer=info,tower_http=info"
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
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing)
        .with_compression(!config.no_compression);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    if let Some(ref dir) = config.static_dir {
        router_config = router_config.with_static_dir(dir.clone());
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

    println!("MVT Streamer Configuration Check");
    println!("═════════════════════════════════");
    println!();

    let Some(database_url) = config.database_url.as_deref().filter(|u| !u.is_empty()) else {
        println!("✗ Database URL: not set (use --database-url, MVT_DATABASE_URL or DATABASE_URL)");
        return ExitCode::FAILURE;
    };

    print!("Testing PostgreSQL connection... ");
    let result = match create_pg_pool(database_url, 1) {
        Ok(pool) => postgis_version(&pool).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(version) => println!("✓ PostGIS {}", version),
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            println!();
            println!("Please check:");
            println!("  - The database server is running and reachable");
            println!("  - The credentials in the URL are correct");
            println!("  - The postgis extension is installed");
            return ExitCode::FAILURE;
        }
    }

    match config.redis_url.as_deref() {
        Some(url) => {
            print!("Testing Redis connection... ");
            let result = match RedisCacheStore::connect(url).await {
                Ok(store) => store.ping().await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => println!("✓ success"),
                Err(e) => {
                    println!("✗ failed");
                    println!();
                    println!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        None => println!("- Redis: not configured, the in-memory cache will be used"),
    }

    println!();
    println!("═════════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
