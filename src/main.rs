// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use wallet_auth_server::{
    api::router,
    auth::SystemClock,
    config::{LogFormat, ServerConfig, DEFAULT_LOG_FILTER},
    state::AppState,
    storage::AuthDatabase,
    sweeper::ExpirySweeper,
};

/// Time given to in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() {
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_format);
    info!(?config, "Configuration loaded");

    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let database_path = config.database_path();
    let db = match AuthDatabase::open(&database_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!(path = %database_path.display(), error = %e, "Failed to open database");
            std::process::exit(1);
        }
    };

    let state = AppState::new(db, config.auth.clone(), Arc::new(SystemClock))
        .with_admin_token(config.admin_token.clone())
        .with_secure_cookies(config.tls.is_some());
    if state.admin_token.is_none() {
        info!("Admin endpoints disabled (WALLET_AUTH_ADMIN_TOKEN not set)");
    }

    let shutdown = CancellationToken::new();
    let sweeper_task = config.nonce_sweep_interval.map(|interval| {
        let sweeper = ExpirySweeper::new(
            state.authenticator.nonces().clone(),
            state.sessions.clone(),
            interval,
        );
        tokio::spawn(sweeper.run(shutdown.clone()))
    });

    let app = router(state, &config.cors_allowed_origins);

    let handle = Handle::new();
    {
        let handle = handle.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("Shutdown signal received");
            shutdown.cancel();
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });
    }

    let addr = config.bind_addr;
    let served = match &config.tls {
        Some(tls) => {
            let tls_config = match RustlsConfig::from_pem_file(&tls.cert, &tls.key).await {
                Ok(tls_config) => tls_config,
                Err(e) => {
                    error!(error = %e, "Failed to load TLS certificate or key");
                    std::process::exit(1);
                }
            };
            info!(%addr, "Wallet auth server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            warn!(%addr, "TLS not configured; serving plain http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    };

    shutdown.cancel();
    if let Some(task) = sweeper_task {
        if let Err(e) = task.await {
            warn!(error = %e, "Expiry sweeper task failed");
        }
    }

    if let Err(e) = served {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }
    info!("Server stopped");
}
