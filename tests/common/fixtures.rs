//! Test fixtures and builder patterns for pods and policies.

#![allow(dead_code)]

use std::collections::BTreeMap;

use imagegate::admission::PodInfo;
use imagegate::crd::{ImageSecurityPolicy, ImageSecurityPolicySpec};

/// A digest-pinned image reference
pub const PINNED_IMAGE: &str =
    "gcr.io/x/app@sha256:4a1c4b21597c1b4415bdbecb28a3296c6b5e23ca4f9feeb599860a1dac6a0108";

/// Builder for creating PodInfo test fixtures.
///
/// # Example
/// ```
/// let pod = PodBuilder::new("web")
///     .namespace("prod")
///     .image("gcr.io/x@sha256:abc")
///     .annotation("team", "payments")
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct PodBuilder {
    name: String,
    namespace: String,
    images: Vec<String>,
    annotations: BTreeMap<String, String>,
}

impl PodBuilder {
    /// Create a new builder with the given pod name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: "default".to_string(),
            images: Vec::new(),
            annotations: BTreeMap::new(),
        }
    }

    /// Set the namespace for the pod.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Append a container image.
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.images.push(image.into());
        self
    }

    /// Append several container images.
    pub fn images<I, S>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.images.extend(images.into_iter().map(Into::into));
        self
    }

    /// Add an annotation to the pod.
    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Build the PodInfo.
    pub fn build(self) -> PodInfo {
        PodInfo {
            name: Some(self.name),
            namespace: self.namespace,
            annotations: self.annotations,
            images: self.images,
        }
    }
}

impl Default for PodBuilder {
    fn default() -> Self {
        Self::new("test-pod")
    }
}

/// Create an ImageSecurityPolicy with default requirements.
pub fn policy(name: &str) -> ImageSecurityPolicy {
    ImageSecurityPolicy::new(name, ImageSecurityPolicySpec::default())
}

/// Raw AdmissionReview body for a pod with the given images and annotations.
pub fn review_body(namespace: &str, images: &[&str], annotations: &[(&str, &str)]) -> Vec<u8> {
    let containers: Vec<_> = images
        .iter()
        .enumerate()
        .map(|(i, image)| serde_json::json!({"name": format!("c{}", i), "image": image}))
        .collect();
    let annotations: BTreeMap<_, _> = annotations.iter().copied().collect();

    let review = serde_json::json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": "3f1e2c1a-0000-4000-8000-000000000001",
            "kind": {"group": "", "version": "v1", "kind": "Pod"},
            "resource": {"group": "", "version": "v1", "resource": "pods"},
            "namespace": namespace,
            "operation": "CREATE",
            "userInfo": {"username": "system:serviceaccount:kube-system:replicaset-controller"},
            "object": {
                "apiVersion": "v1",
                "kind": "Pod",
                "metadata": {"name": "test-pod", "annotations": annotations},
                "spec": {"containers": containers}
            },
            "dryRun": false
        }
    });
    serde_json::to_vec(&review).unwrap_or_default()
}
