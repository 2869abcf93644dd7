// src/main.rs
use anyhow::{Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use std::{net::SocketAddr, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod ledger;
mod monitors;
mod notifier;
mod pages;
mod pipeline;
mod session;
mod web;

#[cfg(test)]
mod monitors_tests;

use config::{AppConfig, Cli};
use error::AppError;
use ledger::Ledger;
use monitors::MonitorDirectory;
use notifier::{Notifier, SmtpMailer};
use session::SessionKeys;
use web::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()
        .context("Failed to read configuration from environment")?
        .apply_cli(cli);
    info!("App configuration loaded.");

    // --- Storage ---
    let ledger = Ledger::new(config.data_dir.clone());
    ledger
        .ensure_root()
        .context("Failed to create ledger directory")?;
    info!("Ledgers stored under {}", ledger.root().display());

    let monitors = MonitorDirectory::new(config.monitores_file.clone());
    match monitors.load() {
        Ok(found) => info!(
            "{} monitor(s) configured in {}",
            found.len(),
            monitors.path().display()
        ),
        Err(e) => error!("Monitor file is not readable yet: {}", e),
    }

    // --- Notification ---
    let smtp = config.smtp_settings();
    if smtp.is_complete() {
        info!(
            "Email notifications enabled via {}:{}",
            smtp.host.as_deref().unwrap_or_default(),
            smtp.port
        );
    } else {
        warn!("SMTP configuration incomplete. Absences will be recorded but not emailed.");
    }
    let notifier = Notifier::new(smtp, Arc::new(SmtpMailer));

    // --- Create Shared App State ---
    let state = AppState {
        monitors: Arc::new(monitors),
        ledger: Arc::new(ledger),
        notifier: Arc::new(notifier),
        sessions: Arc::new(SessionKeys::new(
            config.secret_key(),
            config.session_ttl_hours,
        )),
    };
    let app = web::router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind_host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.bind_host, config.port))?;

    // --- Run Web Server ---
    match config.tls_paths() {
        Some((cert_path, key_path)) => {
            let tls_config = RustlsConfig::from_pem_file(&cert_path, &key_path)
                .await
                .map_err(|e| AppError::TlsConfig(format!("Failed to load TLS cert/key: {}", e)))?;
            info!(
                "TLS configuration loaded from {} and {}",
                cert_path.display(),
                key_path.display()
            );
            info!("Starting server on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
