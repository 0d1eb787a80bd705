//! Vulnerability metadata.
//!
//! The admission engine never talks to a scanner directly. It asks a
//! [`MetadataClientFactory`] for a [`MetadataClient`] once per request and
//! hands that client to the policy validator.

mod grafeas;

pub use grafeas::{GrafeasClient, GrafeasClientFactory, GrafeasSettings};

use async_trait::async_trait;
use thiserror::Error;

/// Vulnerability severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    #[default]
    Unspecified,
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Parse a severity name as reported by the metadata service.
    /// Unknown names map to `Unspecified`.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "MINIMAL" => Severity::Minimal,
            "LOW" => Severity::Low,
            "MEDIUM" => Severity::Medium,
            "HIGH" => Severity::High,
            "CRITICAL" => Severity::Critical,
            _ => Severity::Unspecified,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Unspecified => write!(f, "UNSPECIFIED"),
            Severity::Minimal => write!(f, "MINIMAL"),
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A single vulnerability found in an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vulnerability {
    /// CVE identifier, e.g. `CVE-2019-5736`
    pub cve: String,
    /// Effective severity
    pub severity: Severity,
    /// Whether a fixed package version is available
    pub fix_available: bool,
}

/// Errors raised while acquiring or querying a metadata client
#[derive(Error, Debug)]
pub enum MetadataError {
    /// Credentials could not be loaded
    #[error("Failed to load metadata credentials: {0}")]
    Credentials(String),

    /// Transport-level failure
    #[error("Metadata request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Metadata service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered with something we cannot interpret
    #[error("Invalid metadata response: {0}")]
    InvalidResponse(String),

    /// Any other failure reported by a client implementation
    #[error("Metadata client unavailable: {0}")]
    Unavailable(String),
}

/// Answers vulnerability queries for container images.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// List known vulnerabilities for a fully qualified image reference.
    async fn vulnerabilities(&self, image: &str) -> Result<Vec<Vulnerability>, MetadataError>;
}

/// Produces a metadata client for one admission request.
#[async_trait]
pub trait MetadataClientFactory: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn MetadataClient>, MetadataError>;
}
