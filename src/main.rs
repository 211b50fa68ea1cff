// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use clap::Parser;
use kube::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use tenant_operator::{
    config::{LogFormat, OperatorConfig},
    constants::OPERATOR_NAME,
    dispatch::Manager,
    events::KubeEventRecorder,
    metrics::gather_metrics,
    reconcilers::Context,
    store::KubeStore,
};
use tokio::sync::watch;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let config = OperatorConfig::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("tenant-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

fn initialize_logging(format: LogFormat) {
    // Respects RUST_LOG if set, otherwise defaults to INFO level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(config: OperatorConfig) -> Result<()> {
    initialize_logging(config.log_format);
    config.validate()?;

    info!(
        workers = config.workers,
        controllers = ?config.controllers,
        "Starting tenant operator"
    );

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    let store = KubeStore::new(client.clone(), config.request_timeout());
    let recorder = Arc::new(KubeEventRecorder::new(client, OPERATOR_NAME));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let manager = Manager::new(
        Context::new(store, recorder),
        config.controller_config(),
        shutdown_rx.clone(),
    );

    let server = tokio::spawn(serve_metrics(config.metrics_addr, shutdown_rx));
    let signals = tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received, draining controllers");
        let _ = shutdown_tx.send(true);
    });

    let registrations = config.registrations::<KubeStore>();
    manager.run(&registrations).await;

    signals.abort();
    match server.await {
        Ok(Err(err)) => error!(error = %err, "Metrics server failed"),
        Err(err) if !err.is_cancelled() => error!(error = %err, "Metrics server panicked"),
        _ => {}
    }

    info!("Tenant operator stopped");
    Ok(())
}

/// Serve `/metrics` and `/healthz` until shutdown.
async fn serve_metrics(addr: SocketAddr, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(|| async { "ok" }));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Metrics server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow_and_update() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;
    Ok(())
}

async fn metrics_handler() -> impl IntoResponse {
    match gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(err) => {
            error!(error = %err, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(err) => {
            error!(error = %err, "Cannot install SIGTERM handler, waiting for SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
