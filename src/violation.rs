//! Violation handling strategies.
//!
//! A strategy is invoked once for the image that caused a pod to be denied,
//! before the deny response is sent. Its outcome never changes the verdict.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::admission::PodInfo;
use crate::policy::SecurityPolicyViolation;

/// Error reported by a strategy; logged by the caller and otherwise ignored
#[derive(Error, Debug)]
#[error("Violation strategy failed: {0}")]
pub struct StrategyError(pub String);

/// Side-effecting reaction to policy violations.
#[async_trait]
pub trait ViolationStrategy: Send + Sync {
    async fn handle(
        &self,
        image: &str,
        pod: &PodInfo,
        violations: &[SecurityPolicyViolation],
    ) -> Result<(), StrategyError>;
}

/// Emits one structured log event per violation.
#[derive(Debug, Default, Clone)]
pub struct LoggingStrategy;

#[async_trait]
impl ViolationStrategy for LoggingStrategy {
    async fn handle(
        &self,
        image: &str,
        pod: &PodInfo,
        violations: &[SecurityPolicyViolation],
    ) -> Result<(), StrategyError> {
        for violation in violations {
            warn!(
                image = %image,
                namespace = %pod.namespace,
                pod = pod.name.as_deref().unwrap_or("<generated>"),
                kind = %violation.kind,
                reason = %violation.reason,
                "Image security policy violation"
            );
        }
        Ok(())
    }
}
