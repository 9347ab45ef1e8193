use anyhow::Context;
use axum::http::Method;
use clap::Parser;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use zg_domain::config::Config;
use zg_gateway::api;
use zg_gateway::bootstrap;
use zg_gateway::cli::{Cli, Command, ConfigCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            let (config, _config_path) = zg_gateway::cli::load_config()?;
            init_tracing();
            run_server(config).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = zg_gateway::cli::load_config()?;
            let valid = zg_gateway::cli::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = zg_gateway::cli::load_config()?;
            zg_gateway::cli::show(&config);
            Ok(())
        }
        Some(Command::Version) => {
            println!("zapgate {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Initialize structured JSON tracing (only for the `serve` command).
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,zg_gateway=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer().json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Start the gateway server with the given configuration.
async fn run_server(config: Config) -> anyhow::Result<()> {
    tracing::info!("zapgate starting");

    let state = bootstrap::build_app_state(config)?;
    let config = state.config.clone();

    let cors_layer = build_cors_layer(&config.server.cors);

    // Concurrency limit (backpressure protection).
    let max_concurrent = std::env::var("ZAPGATE_MAX_CONCURRENT_REQUESTS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(256);
    tracing::info!(max_concurrent, "concurrency limit set");

    let app = api::router()
        .layer(cors_layer)
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_concurrent))
        .with_state(state.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    tracing::info!(addr = %addr, "zapgate listening");

    // Restore persisted instances once the listener is up, so a slow
    // reconciliation never delays readiness.
    let lifecycle = state.lifecycle.clone();
    tokio::spawn(async move {
        let (restored, failed) = lifecycle.restore_all().await;
        tracing::info!(restored, failed, "instance restoration finished");
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("axum server error")?;

    tracing::info!("shutdown complete");

    Ok(())
}

/// Wait for SIGINT or SIGTERM, then return to trigger graceful shutdown
/// of the Axum server.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        tracing::info!("received SIGINT, shutting down");
    }
}

/// Build a [`CorsLayer`] from the configured allowed origins.
///
/// An entry may end in `:*` to match any port on that host (the default
/// config allows localhost this way). A lone `"*"` allows every origin
/// (not recommended for production).
fn build_cors_layer(cors: &zg_domain::config::CorsConfig) -> CorsLayer {
    use axum::http::header;

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    // Note: allow_credentials is incompatible with a wildcard origin.
    if cors.allowed_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured with \"*\" — all origins allowed");
        return layer.allow_origin(tower_http::cors::Any);
    }

    let patterns = cors.allowed_origins.clone();
    layer
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            origin
                .to_str()
                .is_ok_and(|origin| patterns.iter().any(|p| origin_allowed(p, origin)))
        }))
        .allow_credentials(true)
}

/// True when `origin` matches `pattern`: either exactly, or — for a
/// pattern ending in `:*` — on any numeric port of the same scheme+host.
fn origin_allowed(pattern: &str, origin: &str) -> bool {
    match pattern.strip_suffix(":*") {
        Some(host) => origin
            .strip_prefix(host)
            .and_then(|rest| rest.strip_prefix(':'))
            .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())),
        None => pattern == origin,
    }
}
