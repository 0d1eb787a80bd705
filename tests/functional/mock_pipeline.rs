//! Mock collaborators for driving the admission engine in functional tests.
//!
//! Every mock records its calls in a shared [`CallLog`], so tests can assert
//! not only the verdict but also which collaborators were consulted and in
//! what order. The engine under test is always the production
//! [`AdmissionEngine`]; only its I/O boundaries are replaced.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use imagegate::admission::{
    AdmissionEngine, Dependencies, EngineSettings, GlobalWhitelist, PodInfo,
};
use imagegate::crd::ImageSecurityPolicy;
use imagegate::metadata::{
    MetadataClient, MetadataClientFactory, MetadataError, Severity, Vulnerability,
};
use imagegate::policy::{
    PolicyStore, PolicyStoreError, PolicyValidator, SecurityPolicyViolation, ValidationError,
    ViolationKind,
};
use imagegate::violation::{StrategyError, ViolationStrategy};

/// One invocation of the violation strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyCall {
    pub image: String,
    pub namespace: String,
    pub violations: Vec<SecurityPolicyViolation>,
}

/// Calls observed across all mocks of one pipeline.
#[derive(Debug, Default)]
pub struct CallLog {
    /// Namespaces passed to the policy store
    pub fetches: Mutex<Vec<String>>,
    /// Number of metadata client acquisitions
    pub connects: Mutex<usize>,
    /// (policy, image) pairs passed to the validator
    pub validations: Mutex<Vec<(String, String)>>,
    /// Images vulnerabilities were requested for
    pub lookups: Mutex<Vec<String>>,
    /// Strategy invocations with their full arguments
    pub strategy_calls: Mutex<Vec<StrategyCall>>,
}

impl CallLog {
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        *self.connects.lock().unwrap()
    }

    pub fn validations(&self) -> Vec<(String, String)> {
        self.validations.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    /// Images the strategy was invoked for
    pub fn strategy_calls(&self) -> Vec<String> {
        self.strategy_invocations()
            .into_iter()
            .map(|call| call.image)
            .collect()
    }

    pub fn strategy_invocations(&self) -> Vec<StrategyCall> {
        self.strategy_calls.lock().unwrap().clone()
    }

    /// True when no collaborator was called at all
    pub fn untouched(&self) -> bool {
        self.fetches().is_empty()
            && self.connects() == 0
            && self.validations().is_empty()
            && self.strategy_calls().is_empty()
    }
}

/// Policy store answering every namespace from a fixed map.
pub struct MockPolicyStore {
    policies: HashMap<String, Vec<ImageSecurityPolicy>>,
    fail: bool,
    delay: Option<Duration>,
    calls: Arc<CallLog>,
}

#[async_trait]
impl PolicyStore for MockPolicyStore {
    async fn fetch(&self, namespace: &str) -> Result<Vec<ImageSecurityPolicy>, PolicyStoreError> {
        self.calls.fetches.lock().unwrap().push(namespace.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(PolicyStoreError::Unavailable(
                "connection refused".to_string(),
            ));
        }
        Ok(self.policies.get(namespace).cloned().unwrap_or_default())
    }
}

/// Metadata client returning canned vulnerabilities per image.
pub struct MockMetadataClient {
    vulnerabilities: HashMap<String, Vec<Vulnerability>>,
    calls: Arc<CallLog>,
}

#[async_trait]
impl MetadataClient for MockMetadataClient {
    async fn vulnerabilities(&self, image: &str) -> Result<Vec<Vulnerability>, MetadataError> {
        self.calls.lookups.lock().unwrap().push(image.to_string());
        Ok(self.vulnerabilities.get(image).cloned().unwrap_or_default())
    }
}

pub struct MockMetadataFactory {
    vulnerabilities: HashMap<String, Vec<Vulnerability>>,
    fail: bool,
    calls: Arc<CallLog>,
}

#[async_trait]
impl MetadataClientFactory for MockMetadataFactory {
    async fn connect(&self) -> Result<Box<dyn MetadataClient>, MetadataError> {
        *self.calls.connects.lock().unwrap() += 1;
        if self.fail {
            return Err(MetadataError::Credentials(
                "token file is empty".to_string(),
            ));
        }
        Ok(Box::new(MockMetadataClient {
            vulnerabilities: self.vulnerabilities.clone(),
            calls: self.calls.clone(),
        }))
    }
}

/// Scripted validator outcome for one image
#[derive(Debug, Clone)]
pub enum Outcome {
    Clean,
    Violations(Vec<SecurityPolicyViolation>),
    Fail,
}

/// Validator answering per image from a script; unknown images are clean.
pub struct ScriptedValidator {
    script: HashMap<String, Outcome>,
    calls: Arc<CallLog>,
}

#[async_trait]
impl PolicyValidator for ScriptedValidator {
    async fn validate(
        &self,
        policy: &ImageSecurityPolicy,
        image: &str,
        _client: &dyn MetadataClient,
    ) -> Result<Vec<SecurityPolicyViolation>, ValidationError> {
        let policy_name = policy.metadata.name.clone().unwrap_or_default();
        self.calls
            .validations
            .lock()
            .unwrap()
            .push((policy_name.clone(), image.to_string()));
        match self.script.get(image).cloned().unwrap_or(Outcome::Clean) {
            Outcome::Clean => Ok(Vec::new()),
            Outcome::Violations(violations) => Ok(violations),
            Outcome::Fail => Err(ValidationError::InvalidPolicy {
                policy: policy_name,
                message: "scripted failure".to_string(),
            }),
        }
    }
}

pub struct RecordingStrategy {
    fail: bool,
    calls: Arc<CallLog>,
}

#[async_trait]
impl ViolationStrategy for RecordingStrategy {
    async fn handle(
        &self,
        image: &str,
        pod: &PodInfo,
        violations: &[SecurityPolicyViolation],
    ) -> Result<(), StrategyError> {
        self.calls.strategy_calls.lock().unwrap().push(StrategyCall {
            image: image.to_string(),
            namespace: pod.namespace.clone(),
            violations: violations.to_vec(),
        });
        if self.fail {
            return Err(StrategyError("audit sink unavailable".to_string()));
        }
        Ok(())
    }
}

/// Builder assembling an engine from mocks.
///
/// # Example
/// ```
/// let pipeline = MockPipeline::new()
///     .policies("prod", vec![policy("isp-1")])
///     .violation("gcr.io/x:bad", ViolationKind::Severity)
///     .build();
/// let decision = pipeline.engine.evaluate(&pod).await;
/// ```
#[derive(Default)]
pub struct MockPipeline {
    settings: EngineSettings,
    policies: HashMap<String, Vec<ImageSecurityPolicy>>,
    store_fails: bool,
    store_delay: Option<Duration>,
    connect_fails: bool,
    vulnerabilities: HashMap<String, Vec<Vulnerability>>,
    script: HashMap<String, Outcome>,
    real_validator: bool,
    strategy_fails: bool,
}

/// Built pipeline and the log its mocks write to
pub struct Pipeline {
    pub engine: AdmissionEngine,
    pub calls: Arc<CallLog>,
}

impl MockPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn whitelist(mut self, entries: &[&str]) -> Self {
        self.settings = self
            .settings
            .with_whitelist(GlobalWhitelist::new(entries.iter().copied()));
        self
    }

    pub fn breakglass_annotation(mut self, annotation: &str) -> Self {
        self.settings = self.settings.with_breakglass_annotation(annotation);
        self
    }

    pub fn policies(mut self, namespace: &str, policies: Vec<ImageSecurityPolicy>) -> Self {
        self.policies.insert(namespace.to_string(), policies);
        self
    }

    pub fn store_fails(mut self) -> Self {
        self.store_fails = true;
        self
    }

    pub fn store_delay(mut self, delay: Duration) -> Self {
        self.store_delay = Some(delay);
        self
    }

    pub fn connect_fails(mut self) -> Self {
        self.connect_fails = true;
        self
    }

    pub fn violation(self, image: &str, kind: ViolationKind) -> Self {
        self.violation_with_reason(image, kind, "scripted")
    }

    pub fn violation_with_reason(mut self, image: &str, kind: ViolationKind, reason: &str) -> Self {
        self.script.insert(
            image.to_string(),
            Outcome::Violations(vec![SecurityPolicyViolation::new(kind, reason)]),
        );
        self
    }

    pub fn violations(mut self, image: &str, kinds: &[ViolationKind]) -> Self {
        let violations = kinds
            .iter()
            .map(|kind| SecurityPolicyViolation::new(*kind, format!("scripted {}", kind)))
            .collect();
        self.script
            .insert(image.to_string(), Outcome::Violations(violations));
        self
    }

    pub fn validation_fails(mut self, image: &str) -> Self {
        self.script.insert(image.to_string(), Outcome::Fail);
        self
    }

    /// Use the production vulnerability validator instead of the script
    pub fn with_vulnerability_validator(mut self) -> Self {
        self.real_validator = true;
        self
    }

    pub fn vulnerability(
        mut self,
        image: &str,
        cve: &str,
        severity: Severity,
        fix_available: bool,
    ) -> Self {
        self.vulnerabilities
            .entry(image.to_string())
            .or_default()
            .push(Vulnerability {
                cve: cve.to_string(),
                severity,
                fix_available,
            });
        self
    }

    pub fn strategy_fails(mut self) -> Self {
        self.strategy_fails = true;
        self
    }

    pub fn build(self) -> Pipeline {
        let calls = Arc::new(CallLog::default());

        let validator: Arc<dyn PolicyValidator> = if self.real_validator {
            Arc::new(imagegate::policy::VulnerabilityPolicyValidator::new())
        } else {
            Arc::new(ScriptedValidator {
                script: self.script,
                calls: calls.clone(),
            })
        };

        let deps = Dependencies {
            policy_store: Arc::new(MockPolicyStore {
                policies: self.policies,
                fail: self.store_fails,
                delay: self.store_delay,
                calls: calls.clone(),
            }),
            metadata: Arc::new(MockMetadataFactory {
                vulnerabilities: self.vulnerabilities,
                fail: self.connect_fails,
                calls: calls.clone(),
            }),
            validator,
            strategy: Arc::new(RecordingStrategy {
                fail: self.strategy_fails,
                calls: calls.clone(),
            }),
        };

        Pipeline {
            engine: AdmissionEngine::new(self.settings, deps),
            calls,
        }
    }
}
