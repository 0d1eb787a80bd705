//! ImageSecurityPolicy Custom Resource Definition.
//!
//! An ImageSecurityPolicy describes which container images pods in its
//! namespace may run, expressed as a vulnerability severity threshold plus
//! image and CVE allowlists.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ImageSecurityPolicy is a namespaced policy evaluated against every image
/// of every pod admitted into its namespace.
///
/// Example:
/// ```yaml
/// apiVersion: imagegate.dev/v1beta1
/// kind: ImageSecurityPolicy
/// metadata:
///   name: production
///   namespace: prod
/// spec:
///   imageWhitelist:
///     - gcr.io/my-project/debug-shell
///   packageVulnerabilityRequirements:
///     maximumSeverity: MEDIUM
///     tolerateUnfixable: true
///     whitelistCVEs:
///       - CVE-2017-1000082
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "imagegate.dev",
    version = "v1beta1",
    kind = "ImageSecurityPolicy",
    plural = "imagesecuritypolicies",
    shortname = "isp",
    namespaced,
    printcolumn = r#"{"name":"MaxSeverity", "type":"string", "jsonPath":".spec.packageVulnerabilityRequirements.maximumSeverity"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ImageSecurityPolicySpec {
    /// Images exempt from this policy. Entries match an image exactly or by
    /// repository (tag and digest ignored).
    #[serde(default)]
    pub image_whitelist: Vec<String>,

    /// Vulnerability acceptance criteria.
    #[serde(default)]
    pub package_vulnerability_requirements: PackageVulnerabilityRequirements,
}

/// Vulnerability thresholds for images covered by a policy.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackageVulnerabilityRequirements {
    /// Highest tolerated severity: MINIMAL, LOW, MEDIUM, HIGH, CRITICAL or
    /// BLOCK_ALL (default CRITICAL).
    #[serde(default = "default_maximum_severity")]
    pub maximum_severity: String,

    /// Tolerate vulnerabilities above the threshold when no fix exists yet.
    #[serde(default)]
    pub tolerate_unfixable: bool,

    /// CVE identifiers ignored by this policy.
    #[serde(default, rename = "whitelistCVEs")]
    pub whitelist_cves: Vec<String>,
}

impl Default for PackageVulnerabilityRequirements {
    fn default() -> Self {
        Self {
            maximum_severity: default_maximum_severity(),
            tolerate_unfixable: false,
            whitelist_cves: Vec::new(),
        }
    }
}

fn default_maximum_severity() -> String {
    "CRITICAL".to_string()
}
