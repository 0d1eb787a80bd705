//! Image security policy evaluation.
//!
//! A [`PolicyValidator`] checks one image against one ImageSecurityPolicy
//! and reports every breach it finds as a [`SecurityPolicyViolation`]. The
//! admission engine only relies on the contract:
//! - `Ok(vec![])`: the image is compliant
//! - `Ok(violations)`: the image breaches the policy
//! - `Err(_)`: the check could not be completed

pub mod image;
mod store;
mod vulnerability;

pub use image::{ImageReference, image_matches};
pub use store::{KubePolicyStore, PolicyStore, PolicyStoreError};
pub use vulnerability::VulnerabilityPolicyValidator;

use async_trait::async_trait;
use thiserror::Error;

use crate::crd::ImageSecurityPolicy;
use crate::metadata::{MetadataClient, MetadataError};

/// Kind of policy breach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// Image is not pinned to a content digest
    UnqualifiedImage,
    /// A vulnerability exceeds the policy's maximum severity
    Severity,
    /// A vulnerability above the threshold has a fix that was not applied
    FixAvailable,
    /// Any other breach reported by a custom validator
    Generic,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationKind::UnqualifiedImage => write!(f, "UnqualifiedImage"),
            ViolationKind::Severity => write!(f, "Severity"),
            ViolationKind::FixAvailable => write!(f, "FixAvailable"),
            ViolationKind::Generic => write!(f, "Generic"),
        }
    }
}

/// One breach of an ImageSecurityPolicy by an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPolicyViolation {
    pub kind: ViolationKind,
    pub reason: String,
}

impl SecurityPolicyViolation {
    pub fn new(kind: ViolationKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    pub fn unqualified(image: &str) -> Self {
        Self::new(
            ViolationKind::UnqualifiedImage,
            format!("{} is not a fully qualified image", image),
        )
    }
}

/// Errors that prevent a policy check from completing
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Vulnerability lookup failed
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// The policy itself cannot be interpreted
    #[error("Invalid policy {policy}: {message}")]
    InvalidPolicy { policy: String, message: String },
}

/// Evaluates an ImageSecurityPolicy against a single image.
#[async_trait]
pub trait PolicyValidator: Send + Sync {
    async fn validate(
        &self,
        policy: &ImageSecurityPolicy,
        image: &str,
        client: &dyn MetadataClient,
    ) -> Result<Vec<SecurityPolicyViolation>, ValidationError>;
}
