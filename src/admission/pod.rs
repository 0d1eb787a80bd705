//! Pod extraction from admission reviews.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;
use kube::core::admission::{AdmissionRequest, AdmissionReview};

use super::error::{AdmissionError, Result};

/// The parts of a pod the admission pipeline looks at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodInfo {
    /// Pod name, absent for `generateName` pods on CREATE
    pub name: Option<String>,
    pub namespace: String,
    pub annotations: BTreeMap<String, String>,
    /// Images in declaration order: init, regular, then ephemeral containers
    pub images: Vec<String>,
}

impl PodInfo {
    /// Build from a pod object. The request namespace wins over the pod's
    /// own metadata since the API server fills it before calling webhooks.
    pub fn from_pod(pod: &Pod, request_namespace: Option<&str>) -> Self {
        let namespace = request_namespace
            .filter(|ns| !ns.is_empty())
            .or(pod.metadata.namespace.as_deref())
            .unwrap_or("default")
            .to_string();

        let mut images = Vec::new();
        if let Some(spec) = &pod.spec {
            let init = spec.init_containers.iter().flatten().map(|c| &c.image);
            let regular = spec.containers.iter().map(|c| &c.image);
            let ephemeral = spec.ephemeral_containers.iter().flatten().map(|c| &c.image);
            images.extend(init.chain(regular).chain(ephemeral).flatten().cloned());
        }

        Self {
            name: pod.metadata.name.clone(),
            namespace,
            annotations: pod.metadata.annotations.clone().unwrap_or_default(),
            images,
        }
    }

    pub fn has_annotation(&self, key: &str) -> bool {
        self.annotations.contains_key(key)
    }
}

/// Parse an AdmissionReview body into its request and the pod under review.
pub fn extract_pod(body: &[u8]) -> Result<(AdmissionRequest<Pod>, PodInfo)> {
    let review: AdmissionReview<Pod> = serde_json::from_slice(body)
        .map_err(|e| AdmissionError::RequestMalformed(format!("invalid AdmissionReview: {}", e)))?;

    let request: AdmissionRequest<Pod> = review
        .try_into()
        .map_err(|e| AdmissionError::RequestMalformed(format!("{}", e)))?;

    let pod = request
        .object
        .as_ref()
        .map(|pod| PodInfo::from_pod(pod, request.namespace.as_deref()))
        .ok_or_else(|| AdmissionError::RequestMalformed("missing object in request".to_string()))?;

    Ok((request, pod))
}
