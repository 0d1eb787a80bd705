//! Vulnerability-threshold policy validator.
//!
//! Checks, in order:
//! - images on the policy's image allowlist are compliant
//! - images must be pinned by digest
//! - every non-allowlisted CVE must be within the maximum severity, unless
//!   the policy tolerates vulnerabilities that have no fix yet

use async_trait::async_trait;
use tracing::debug;

use super::{
    ImageReference, PolicyValidator, SecurityPolicyViolation, ValidationError, ViolationKind,
    image_matches,
};
use crate::crd::ImageSecurityPolicy;
use crate::metadata::{MetadataClient, Severity, Vulnerability};

/// Parsed `maximumSeverity` value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Threshold {
    /// Vulnerabilities up to and including this severity are tolerated
    Max(Severity),
    /// No vulnerability is tolerated
    BlockAll,
}

impl Threshold {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "BLOCK_ALL" | "BLOCKALL" => Some(Threshold::BlockAll),
            "MINIMAL" => Some(Threshold::Max(Severity::Minimal)),
            "LOW" => Some(Threshold::Max(Severity::Low)),
            "MEDIUM" => Some(Threshold::Max(Severity::Medium)),
            "HIGH" => Some(Threshold::Max(Severity::High)),
            "CRITICAL" => Some(Threshold::Max(Severity::Critical)),
            _ => None,
        }
    }

    fn exceeded_by(&self, severity: Severity) -> bool {
        match self {
            Threshold::BlockAll => true,
            Threshold::Max(max) => severity > *max,
        }
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Threshold::BlockAll => write!(f, "BLOCK_ALL"),
            Threshold::Max(severity) => write!(f, "{}", severity),
        }
    }
}

/// Default [`PolicyValidator`] driven by the policy's vulnerability requirements
#[derive(Debug, Default, Clone)]
pub struct VulnerabilityPolicyValidator;

impl VulnerabilityPolicyValidator {
    pub fn new() -> Self {
        Self
    }

    fn check(
        threshold: Threshold,
        tolerate_unfixable: bool,
        vuln: &Vulnerability,
    ) -> Option<SecurityPolicyViolation> {
        if !threshold.exceeded_by(vuln.severity) {
            return None;
        }
        if tolerate_unfixable {
            if !vuln.fix_available {
                return None;
            }
            return Some(SecurityPolicyViolation::new(
                ViolationKind::FixAvailable,
                format!(
                    "found {} vulnerability {} with an available fix (max severity {})",
                    vuln.severity, vuln.cve, threshold
                ),
            ));
        }
        Some(SecurityPolicyViolation::new(
            ViolationKind::Severity,
            format!(
                "found {} vulnerability {} exceeding max severity {}",
                vuln.severity, vuln.cve, threshold
            ),
        ))
    }
}

#[async_trait]
impl PolicyValidator for VulnerabilityPolicyValidator {
    async fn validate(
        &self,
        policy: &ImageSecurityPolicy,
        image: &str,
        client: &dyn MetadataClient,
    ) -> Result<Vec<SecurityPolicyViolation>, ValidationError> {
        let policy_name = policy.metadata.name.clone().unwrap_or_default();

        if policy
            .spec
            .image_whitelist
            .iter()
            .any(|entry| image_matches(entry, image))
        {
            debug!(policy = %policy_name, image = %image, "Image allowlisted by policy");
            return Ok(Vec::new());
        }

        if !ImageReference::parse(image).is_fully_qualified() {
            return Ok(vec![SecurityPolicyViolation::unqualified(image)]);
        }

        let reqs = &policy.spec.package_vulnerability_requirements;
        let threshold =
            Threshold::parse(&reqs.maximum_severity).ok_or_else(|| {
                ValidationError::InvalidPolicy {
                    policy: policy_name.clone(),
                    message: format!("unknown maximumSeverity {:?}", reqs.maximum_severity),
                }
            })?;

        let vulnerabilities = client.vulnerabilities(image).await?;
        let violations: Vec<_> = vulnerabilities
            .iter()
            .filter(|v| !reqs.whitelist_cves.contains(&v.cve))
            .filter_map(|v| Self::check(threshold, reqs.tolerate_unfixable, v))
            .collect();

        debug!(
            policy = %policy_name,
            image = %image,
            vulnerabilities = vulnerabilities.len(),
            violations = violations.len(),
            "Validated image against policy"
        );
        Ok(violations)
    }
}
