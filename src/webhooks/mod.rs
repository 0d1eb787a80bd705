//! Webhook module for validating pod admission requests.
//!
//! Wires the admission pipeline to HTTP: request parsing, the decision
//! deadline, metrics, and the admission-review reply.

pub mod response;
mod server;

pub use response::{FAILURE_STATUS, SUCCESS_STATUS, WebhookResponse};
pub use server::{
    WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookError, WebhookState,
    create_webhook_router, review_pod, run_webhook_server,
};
