//! Admission response encoding.
//!
//! - verdicts (allow or deny) are sent with HTTP 200 and `allowed` set
//!   accordingly
//! - infrastructure errors are sent with HTTP 400 so the API server treats
//!   them as a webhook failure rather than a policy decision
//! - a response that cannot be serialized becomes an empty HTTP 500

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use k8s_openapi::api::core::v1::Pod;
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use kube::core::response::StatusSummary;
use tracing::error;

use crate::admission::{AdmissionError, Verdict};

/// Status summary string sent with allowed pods
pub const SUCCESS_STATUS: &str = "Success";
/// Status summary string sent with denied pods
pub const FAILURE_STATUS: &str = "Failure";

/// Serialized webhook reply
#[derive(Debug)]
pub struct WebhookResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl IntoResponse for WebhookResponse {
    fn into_response(self) -> Response {
        if self.body.is_empty() {
            return self.status.into_response();
        }
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            self.body,
        )
            .into_response()
    }
}

/// Admission review answering `request` with `verdict`
pub fn verdict_review(
    request: &AdmissionRequest<Pod>,
    verdict: &Verdict,
) -> AdmissionReview<DynamicObject> {
    let mut response = AdmissionResponse::from(request);
    response.allowed = verdict.allowed;
    response.result.status = Some(if verdict.allowed {
        StatusSummary::Success
    } else {
        StatusSummary::Failure
    });
    response.result.message = verdict.message.clone();
    response.into_review()
}

/// Admission review for a request that could not be evaluated
pub fn error_review(err: &AdmissionError) -> AdmissionReview<DynamicObject> {
    AdmissionResponse::invalid(format!("[{}] {}", err.reason(), err)).into_review()
}

/// Build the HTTP reply for a pipeline outcome.
pub fn build_response(
    request: &AdmissionRequest<Pod>,
    result: &Result<Verdict, AdmissionError>,
) -> WebhookResponse {
    match result {
        Ok(verdict) => encode(StatusCode::OK, &verdict_review(request, verdict)),
        Err(err) => build_error_response(err),
    }
}

/// Build the HTTP reply for an error raised before a request was available.
pub fn build_error_response(err: &AdmissionError) -> WebhookResponse {
    encode(StatusCode::BAD_REQUEST, &error_review(err))
}

fn encode(status: StatusCode, review: &AdmissionReview<DynamicObject>) -> WebhookResponse {
    match serde_json::to_vec(review) {
        Ok(body) => WebhookResponse { status, body },
        Err(e) => {
            error!(error = %e, "Failed to serialize admission response");
            WebhookResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: Vec::new(),
            }
        }
    }
}
