//! Admission webhook server.
//!
//! Provides the HTTP endpoint the API server calls for pod admission.
//!
//! To enable the webhook:
//! 1. Deploy cert-manager for TLS certificates
//! 2. Create a ValidatingWebhookConfiguration for pods pointing at `/validate-pods`
//! 3. Mount the TLS certificate secret to the webhook pod at /etc/webhook/certs/

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{Router, body::Bytes, extract::State, routing::post};
use tracing::{debug, error, info};

use crate::admission::{AdmissionEngine, DecisionState, extract_pod};
use crate::health::HealthState;
use crate::webhooks::response::{WebhookResponse, build_error_response, build_response};

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 9443;

/// Shared state for webhook handlers
pub struct WebhookState {
    pub engine: AdmissionEngine,
    /// Deadline for a single admission decision
    pub decision_timeout: Duration,
    /// Optional health state for metrics
    pub health_state: Option<Arc<HealthState>>,
}

impl WebhookState {
    pub fn new(
        engine: AdmissionEngine,
        decision_timeout: Duration,
        health_state: Option<Arc<HealthState>>,
    ) -> Self {
        Self {
            engine,
            decision_timeout,
            health_state,
        }
    }
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/", post(validate_pod))
        .route("/validate-pods", post(validate_pod))
        .with_state(state)
}

async fn validate_pod(State(state): State<Arc<WebhookState>>, body: Bytes) -> WebhookResponse {
    review_pod(&state, &body).await
}

/// Decide one raw AdmissionReview body and encode the reply.
pub async fn review_pod(state: &WebhookState, body: &[u8]) -> WebhookResponse {
    let started = Instant::now();

    let (request, pod) = match extract_pod(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!(error = %e, "Failed to extract pod from admission request");
            return build_error_response(&e);
        }
    };

    debug!(
        uid = %request.uid,
        operation = ?request.operation,
        namespace = %pod.namespace,
        images = ?pod.images,
        "Processing admission request"
    );

    let decision = state
        .engine
        .evaluate_within(&pod, state.decision_timeout)
        .await;

    if let Some(health) = &state.health_state {
        health
            .metrics
            .record_decision(&decision, started.elapsed().as_secs_f64());
    }

    if decision.state == DecisionState::BreakglassAllow {
        info!(uid = %request.uid, "Breakglass annotation found, admitting pod");
    }

    build_response(&request, &decision.result)
}

/// Errors that can occur when running the webhook server
#[derive(Debug)]
pub enum WebhookError {
    /// TLS configuration error
    TlsConfig(String),
    /// Server error
    Server(String),
}

impl std::fmt::Display for WebhookError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebhookError::TlsConfig(msg) => write!(f, "TLS configuration error: {}", msg),
            WebhookError::Server(msg) => write!(f, "Webhook server error: {}", msg),
        }
    }
}

impl std::error::Error for WebhookError {}

/// Run the webhook server with TLS
///
/// Binds to 0.0.0.0:`port` and serves the pod validation endpoint.
/// TLS certificates are loaded from the paths specified (PEM format).
pub async fn run_webhook_server(
    state: Arc<WebhookState>,
    port: u16,
    cert_path: &Path,
    key_path: &Path,
) -> Result<(), WebhookError> {
    use axum_server::tls_rustls::RustlsConfig;
    use std::net::SocketAddr;

    let health_state = state.health_state.clone();
    let app = create_webhook_router(state);

    let config = RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|e| WebhookError::TlsConfig(e.to_string()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Webhook server listening with TLS");

    if let Some(health) = health_state {
        health.set_ready(true).await;
    }

    axum_server::bind_rustls(addr, config)
        .serve(app.into_make_service())
        .await
        .map_err(|e| WebhookError::Server(e.to_string()))?;

    Ok(())
}
