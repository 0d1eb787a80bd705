//! The admission decision pipeline.
//!
//! Stages run in a fixed order and each one either hands over to the next
//! stage or ends the request with a [`Decision`]:
//!
//! ```text
//! Breakglass -> Whitelist -> FetchPolicies -> AcquireClient -> Validate
//!     |             |              |                |              |
//! BreakglassAllow  WhitelistAllow FetchError     ClientError    ValidateError
//!                                                               UnqualifiedDeny
//!                                                               ViolationDeny
//!                                                               CleanAllow
//! ```
//!
//! Collaborators are awaited inline, so dropping the future returned by
//! [`AdmissionEngine::evaluate`] stops all further policy, metadata and
//! strategy calls for that request.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::decision::{Decision, DecisionState, Verdict};
use super::error::AdmissionError;
use super::pod::PodInfo;
use super::whitelist::{GlobalWhitelist, WhitelistChecker};
use crate::crd::ImageSecurityPolicy;
use crate::metadata::{MetadataClient, MetadataClientFactory};
use crate::policy::{PolicyStore, PolicyValidator, ViolationKind};
use crate::violation::ViolationStrategy;

/// Default annotation that bypasses all checks
pub const DEFAULT_BREAKGLASS_ANNOTATION: &str = "imagegate.dev/breakglass";

/// Configuration-time constants of the pipeline
#[derive(Clone)]
pub struct EngineSettings {
    /// Annotation key whose presence admits a pod unconditionally
    pub breakglass_annotation: String,
    /// Images exempt from policy evaluation
    pub whitelist: Arc<dyn WhitelistChecker>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            breakglass_annotation: DEFAULT_BREAKGLASS_ANNOTATION.to_string(),
            whitelist: Arc::new(GlobalWhitelist::default()),
        }
    }
}

impl EngineSettings {
    pub fn with_whitelist(mut self, whitelist: impl WhitelistChecker + 'static) -> Self {
        self.whitelist = Arc::new(whitelist);
        self
    }

    pub fn with_breakglass_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.breakglass_annotation = annotation.into();
        self
    }
}

/// Collaborators the pipeline calls out to
#[derive(Clone)]
pub struct Dependencies {
    pub policy_store: Arc<dyn PolicyStore>,
    pub metadata: Arc<dyn MetadataClientFactory>,
    pub validator: Arc<dyn PolicyValidator>,
    pub strategy: Arc<dyn ViolationStrategy>,
}

/// Pipeline position, carrying whatever earlier stages produced
enum Stage {
    Breakglass,
    Whitelist,
    FetchPolicies,
    AcquireClient {
        policies: Vec<ImageSecurityPolicy>,
    },
    Validate {
        policies: Vec<ImageSecurityPolicy>,
        client: Box<dyn MetadataClient>,
    },
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::Breakglass => "Breakglass",
            Stage::Whitelist => "Whitelist",
            Stage::FetchPolicies => "FetchPolicies",
            Stage::AcquireClient { .. } => "AcquireClient",
            Stage::Validate { .. } => "Validate",
        }
    }
}

/// Outcome of running one stage
enum Step {
    Next(Stage),
    Done(Decision),
}

/// Decides whether pods may be admitted based on their images.
///
/// Holds no mutable state; one instance is shared by all requests.
#[derive(Clone)]
pub struct AdmissionEngine {
    settings: EngineSettings,
    deps: Dependencies,
}

impl AdmissionEngine {
    pub fn new(settings: EngineSettings, deps: Dependencies) -> Self {
        Self { settings, deps }
    }

    /// Decide a pod: `Ok` with a verdict, or `Err` when no verdict could be
    /// computed.
    pub async fn decide(&self, pod: &PodInfo) -> Result<Verdict, AdmissionError> {
        self.evaluate(pod).await.result
    }

    /// Run the pipeline to its terminal state.
    pub async fn evaluate(&self, pod: &PodInfo) -> Decision {
        let mut stage = Stage::Breakglass;
        loop {
            debug!(namespace = %pod.namespace, stage = stage.name(), "Entering admission stage");
            match self.step(stage, pod).await {
                Step::Next(next) => stage = next,
                Step::Done(decision) => {
                    log_decision(pod, &decision);
                    return decision;
                }
            }
        }
    }

    /// Run the pipeline, giving up with [`AdmissionError::Timeout`] once
    /// `timeout` elapses. No collaborator is called after the deadline.
    pub async fn evaluate_within(&self, pod: &PodInfo, timeout: Duration) -> Decision {
        match tokio::time::timeout(timeout, self.evaluate(pod)).await {
            Ok(decision) => decision,
            Err(_) => {
                error!(namespace = %pod.namespace, ?timeout, "Admission decision timed out");
                Decision::failed(DecisionState::TimedOut, AdmissionError::Timeout(timeout))
            }
        }
    }

    async fn step(&self, stage: Stage, pod: &PodInfo) -> Step {
        match stage {
            Stage::Breakglass => {
                if pod.has_annotation(&self.settings.breakglass_annotation) {
                    return Step::Done(Decision::allow(DecisionState::BreakglassAllow));
                }
                Step::Next(Stage::Whitelist)
            }
            Stage::Whitelist => {
                if self.settings.whitelist.all_whitelisted(&pod.images) {
                    return Step::Done(Decision::allow(DecisionState::WhitelistAllow));
                }
                Step::Next(Stage::FetchPolicies)
            }
            Stage::FetchPolicies => match self.deps.policy_store.fetch(&pod.namespace).await {
                Ok(policies) => Step::Next(Stage::AcquireClient { policies }),
                Err(e) => Step::Done(Decision::failed(
                    DecisionState::FetchError,
                    AdmissionError::PolicyStoreUnavailable(e),
                )),
            },
            Stage::AcquireClient { policies } => match self.deps.metadata.connect().await {
                Ok(client) => Step::Next(Stage::Validate { policies, client }),
                Err(e) => Step::Done(Decision::failed(
                    DecisionState::ClientError,
                    AdmissionError::MetadataClientUnavailable(e),
                )),
            },
            Stage::Validate { policies, client } => {
                Step::Done(self.validate(&policies, client.as_ref(), pod).await)
            }
        }
    }

    /// Check every image against every policy. The first policy, then the
    /// first image within it, to produce violations decides the outcome.
    async fn validate(
        &self,
        policies: &[ImageSecurityPolicy],
        client: &dyn MetadataClient,
        pod: &PodInfo,
    ) -> Decision {
        for policy in policies {
            let policy_name = policy.metadata.name.as_deref().unwrap_or_default();
            for image in &pod.images {
                debug!(policy = %policy_name, image = %image, "Validating image");
                let violations = match self.deps.validator.validate(policy, image, client).await {
                    Ok(violations) => violations,
                    Err(source) => {
                        return Decision::failed(
                            DecisionState::ValidateError,
                            AdmissionError::ValidationFailed {
                                image: image.clone(),
                                policy: policy_name.to_string(),
                                source,
                            },
                        );
                    }
                };

                if violations
                    .iter()
                    .any(|v| v.kind == ViolationKind::UnqualifiedImage)
                {
                    return Decision::deny(
                        DecisionState::UnqualifiedDeny,
                        format!("{} is not a fully qualified image", image),
                        violations,
                    );
                }

                if !violations.is_empty() {
                    if let Err(e) = self.deps.strategy.handle(image, pod, &violations).await {
                        warn!(image = %image, error = %e, "Violation strategy failed");
                    }
                    return Decision::deny(
                        DecisionState::ViolationDeny,
                        format!("found violations in {}", image),
                        violations,
                    );
                }
            }
        }
        Decision::allow(DecisionState::CleanAllow)
    }
}

fn log_decision(pod: &PodInfo, decision: &Decision) {
    let pod_name = pod.name.as_deref().unwrap_or("<generated>");
    match &decision.result {
        Ok(verdict) if verdict.allowed => info!(
            namespace = %pod.namespace,
            pod = pod_name,
            state = %decision.state,
            "Pod admitted"
        ),
        Ok(verdict) => info!(
            namespace = %pod.namespace,
            pod = pod_name,
            state = %decision.state,
            message = %verdict.message,
            "Pod denied"
        ),
        Err(e) => error!(
            namespace = %pod.namespace,
            pod = pod_name,
            state = %decision.state,
            error = %e,
            "Admission decision failed"
        ),
    }
}
