//! imagegate - image security admission webhook for Kubernetes.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Loads settings and creates the Kubernetes client
//! - Starts the health server and the TLS webhook server

use std::sync::Arc;
use std::time::Duration;

use kube::Client;
use tokio::signal;
use tracing::{error, info};

use imagegate::health::{HealthState, run_health_server};
use imagegate::{Settings, WebhookState, build_engine, run_webhook_server};

/// Grace period for in-flight admission requests during shutdown
const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("imagegate=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .json()
        .init();

    info!("Starting imagegate");

    // kube, reqwest and axum-server share one rustls provider
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let settings = Settings::from_env()?;
    info!(
        breakglass_annotation = %settings.breakglass_annotation,
        whitelist = ?settings.whitelist,
        grafeas_endpoint = %settings.grafeas.endpoint,
        decision_timeout = ?settings.decision_timeout,
        "Loaded settings"
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let engine = build_engine(client, &settings)?;
    let health_state = Arc::new(HealthState::new());

    // Probes must answer before the webhook is ready
    let health_handle = {
        let health_state = health_state.clone();
        let port = settings.health_port;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, port).await {
                error!("Health server error: {}", e);
            }
        })
    };

    let webhook_handle = {
        let state = Arc::new(WebhookState::new(
            engine,
            settings.decision_timeout,
            Some(health_state.clone()),
        ));
        let port = settings.webhook_port;
        let cert_path = settings.tls_cert_path.clone();
        let key_path = settings.tls_key_path.clone();
        tokio::spawn(async move {
            if let Err(e) = run_webhook_server(state, port, &cert_path, &key_path).await {
                error!("Webhook server error: {}", e);
            }
        })
    };

    tokio::select! {
        result = webhook_handle => {
            if let Err(e) = result {
                error!("Webhook server task panicked: {}", e);
            }
        }
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");

            // Stop receiving new admission requests
            health_state.set_ready(false).await;
            info!("Marked webhook as not ready");

            info!(
                "Waiting {}s for in-flight admission requests to complete...",
                SHUTDOWN_GRACE_PERIOD_SECS
            );
            tokio::time::sleep(Duration::from_secs(SHUTDOWN_GRACE_PERIOD_SECS)).await;

            info!("Grace period complete, shutting down");
        }
    }

    info!("imagegate stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Note: Signal handler setup failures are fatal - the webhook cannot shut down
/// gracefully without them. Using expect() here is intentional.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
