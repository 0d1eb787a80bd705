//! Error types for the admission pipeline.
//!
//! Every variant is an infrastructure failure: the pipeline could not reach
//! a verdict. Policy denials are verdicts, not errors.

use std::time::Duration;

use thiserror::Error;

use crate::metadata::MetadataError;
use crate::policy::{PolicyStoreError, ValidationError};

/// Error type for admission decisions
#[derive(Error, Debug)]
pub enum AdmissionError {
    /// The request body could not be turned into a pod
    #[error("Malformed admission request: {0}")]
    RequestMalformed(String),

    /// ImageSecurityPolicies could not be fetched
    #[error("Failed to fetch image security policies: {0}")]
    PolicyStoreUnavailable(#[source] PolicyStoreError),

    /// The vulnerability metadata client could not be acquired
    #[error("Failed to acquire metadata client: {0}")]
    MetadataClientUnavailable(#[source] MetadataError),

    /// A policy check errored before producing a result
    #[error("Failed to validate {image} against policy {policy}: {source}")]
    ValidationFailed {
        image: String,
        policy: String,
        #[source]
        source: ValidationError,
    },

    /// The decision did not finish within the configured deadline
    #[error("Admission decision did not complete within {0:?}")]
    Timeout(Duration),
}

impl AdmissionError {
    /// Short machine-readable reason used in responses and logs
    pub fn reason(&self) -> &'static str {
        match self {
            AdmissionError::RequestMalformed(_) => "RequestMalformed",
            AdmissionError::PolicyStoreUnavailable(_) => "PolicyStoreUnavailable",
            AdmissionError::MetadataClientUnavailable(_) => "MetadataClientUnavailable",
            AdmissionError::ValidationFailed { .. } => "ValidationFailed",
            AdmissionError::Timeout(_) => "Timeout",
        }
    }
}

/// Result type alias for admission operations
pub type Result<T> = std::result::Result<T, AdmissionError>;
