//! imagegate library crate
//!
//! Kubernetes validating admission webhook that admits pods only when their
//! container images satisfy the ImageSecurityPolicies of their namespace.

pub mod admission;
pub mod config;
pub mod crd;
pub mod health;
pub mod metadata;
pub mod policy;
pub mod violation;
pub mod webhooks;

pub use admission::{AdmissionEngine, Decision, DecisionState, Dependencies, EngineSettings, Verdict};
pub use config::Settings;
pub use health::HealthState;
pub use webhooks::{WebhookError, WebhookState, run_webhook_server};

use std::sync::Arc;

use kube::Client;

use metadata::{GrafeasClientFactory, MetadataError};
use policy::{KubePolicyStore, VulnerabilityPolicyValidator};
use violation::LoggingStrategy;

/// Assemble the production pipeline: policies from the API server,
/// vulnerabilities from Grafeas, violations logged.
pub fn build_engine(client: Client, settings: &Settings) -> Result<AdmissionEngine, MetadataError> {
    let deps = Dependencies {
        policy_store: Arc::new(KubePolicyStore::new(client)),
        metadata: Arc::new(GrafeasClientFactory::new(settings.grafeas.clone())?),
        validator: Arc::new(VulnerabilityPolicyValidator::new()),
        strategy: Arc::new(LoggingStrategy),
    };
    Ok(AdmissionEngine::new(settings.engine_settings(), deps))
}
