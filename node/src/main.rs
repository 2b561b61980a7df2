// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # KEYSEAL Identity Node
//!
//! Entry point for the `keyseal-node` binary. Parses CLI arguments,
//! initializes logging and metrics, loads the master keypair, opens the
//! credential store, and serves the authentication API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     : start the node
//! - `generate`: print a fresh master keypair as environment lines
//! - `version` : print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use keyseal_protocol::config::IdentityConfig;
use keyseal_protocol::crypto::keys::MasterKeypair;
use keyseal_protocol::identity::IdentityService;
use keyseal_protocol::storage::{KvStore, MemoryStore, SledStore};

use cli::{Commands, KeysealNodeCli, MasterKeyArgs};
use logging::LogFormat;
use metrics::AuthMetrics;
use session::CookieSessionIssuer;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = KeysealNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Generate => {
            generate_master();
            Ok(())
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the node: API server and metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&args.log_format),
    );

    // --- Master keypair ---
    let master = Arc::new(load_master(&args.master)?);
    tracing::info!(master_pub = %master.public_key_hex(), "master keypair loaded");

    tracing::info!(
        port = args.port,
        metrics_port = args.metrics_port,
        in_memory = args.in_memory,
        data_dir = %args.data_dir.display(),
        "starting keyseal-node"
    );

    // --- Credential store ---
    let backend: Arc<dyn KvStore> = if args.in_memory {
        tracing::warn!("running with in-memory store; nothing will survive a restart");
        Arc::new(MemoryStore::new())
    } else {
        let db_path = args.data_dir.join("db");
        std::fs::create_dir_all(&db_path).with_context(|| {
            format!("failed to create database directory: {}", db_path.display())
        })?;
        let db = SledStore::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;
        tracing::info!(path = %db_path.display(), entries = db.len(), "database opened");
        Arc::new(db)
    };

    // --- Identity service ---
    let config = IdentityConfig {
        store_timeout: Duration::from_millis(args.store_timeout_ms),
        ..IdentityConfig::default()
    };
    let service = IdentityService::with_backend(backend, Arc::clone(&master), config);

    // --- Metrics ---
    let auth_metrics = Arc::new(AuthMetrics::new().context("failed to register metrics")?);

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            keyseal_protocol::config::PROTOCOL_VERSION,
        ),
        service,
        issuer: Arc::new(CookieSessionIssuer::new(&master)),
        metrics: Arc::clone(&auth_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&auth_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("keyseal-node stopped");
    Ok(())
}

/// Build the master keypair from the four configured values.
fn load_master(args: &MasterKeyArgs) -> Result<MasterKeypair> {
    MasterKeypair::from_hex_parts(
        &args.public,
        &args.private,
        &args.enc_public,
        &args.enc_private,
    )
    .map_err(|e| {
        anyhow::anyhow!(
            "invalid master keypair ({e}). Run `keyseal-node generate` to create one, \
             then set KEYSEAL_PUB, KEYSEAL_PRIV, KEYSEAL_EPUB and KEYSEAL_EPRIV"
        )
    })
}

/// Prints a fresh master keypair in env-file form.
fn generate_master() {
    let (public, private, enc_public, enc_private) = MasterKeypair::generate().to_hex_parts();
    println!("KEYSEAL_PUB={public}");
    println!("KEYSEAL_PRIV={private}");
    println!("KEYSEAL_EPUB={enc_public}");
    println!("KEYSEAL_EPRIV={enc_private}");
}

/// Prints version information to stdout.
fn print_version() {
    println!("keyseal-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol     {}", keyseal_protocol::config::PROTOCOL_VERSION);
    println!("rustc        {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler can't be
/// installed, that branch never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
