//! Grafeas REST metadata client.
//!
//! Vulnerabilities are read from Grafeas occurrences of kind
//! `VULNERABILITY` whose resource URI is the image reference.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{MetadataClient, MetadataClientFactory, MetadataError, Severity, Vulnerability};

/// Connection settings for a Grafeas server
#[derive(Debug, Clone)]
pub struct GrafeasSettings {
    /// Base URL, e.g. `https://containeranalysis.googleapis.com`
    pub endpoint: String,
    /// Project holding the occurrences
    pub project: String,
    /// File containing a bearer token, re-read on every connect
    pub token_path: Option<PathBuf>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

/// Creates [`GrafeasClient`]s sharing one HTTP connection pool.
pub struct GrafeasClientFactory {
    settings: GrafeasSettings,
    http: reqwest::Client,
}

impl GrafeasClientFactory {
    pub fn new(settings: GrafeasSettings) -> Result<Self, MetadataError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self { settings, http })
    }
}

#[async_trait]
impl MetadataClientFactory for GrafeasClientFactory {
    async fn connect(&self) -> Result<Box<dyn MetadataClient>, MetadataError> {
        let token = match &self.settings.token_path {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                    MetadataError::Credentials(format!("{}: {}", path.display(), e))
                })?;
                let token = raw.trim().to_string();
                if token.is_empty() {
                    return Err(MetadataError::Credentials(format!(
                        "{} is empty",
                        path.display()
                    )));
                }
                Some(token)
            }
            None => None,
        };

        Ok(Box::new(GrafeasClient {
            http: self.http.clone(),
            base_url: self.settings.endpoint.trim_end_matches('/').to_string(),
            project: self.settings.project.clone(),
            token,
        }))
    }
}

/// Metadata client backed by the Grafeas v1 occurrences API
pub struct GrafeasClient {
    http: reqwest::Client,
    base_url: String,
    project: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListOccurrencesResponse {
    #[serde(default)]
    occurrences: Vec<Occurrence>,
    #[serde(default)]
    next_page_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Occurrence {
    #[serde(default)]
    note_name: String,
    #[serde(default)]
    kind: String,
    vulnerability: Option<VulnerabilityDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VulnerabilityDetails {
    #[serde(default)]
    severity: String,
    #[serde(default)]
    effective_severity: String,
    #[serde(default)]
    fix_available: bool,
    #[serde(default)]
    short_description: String,
}

impl Occurrence {
    fn into_vulnerability(self) -> Option<Vulnerability> {
        if self.kind != "VULNERABILITY" {
            return None;
        }
        let details = self.vulnerability?;
        // effectiveSeverity may be absent or SEVERITY_UNSPECIFIED
        let severity = match Severity::from_name(&details.effective_severity) {
            Severity::Unspecified => Severity::from_name(&details.severity),
            effective => effective,
        };
        // Note names end in the CVE id: projects/<p>/notes/CVE-2019-5736
        let cve = self
            .note_name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or(details.short_description);
        Some(Vulnerability {
            cve,
            severity,
            fix_available: details.fix_available,
        })
    }
}

fn occurrence_filter(image: &str) -> String {
    format!(
        "resourceUrl=\"https://{}\" AND kind=\"VULNERABILITY\"",
        image
    )
}

impl GrafeasClient {
    async fn list_page(
        &self,
        filter: &str,
        page_token: &str,
    ) -> Result<ListOccurrencesResponse, MetadataError> {
        let url = format!(
            "{}/v1/projects/{}/occurrences",
            self.base_url, self.project
        );
        let mut request = self.http.get(&url).query(&[("filter", filter)]);
        if !page_token.is_empty() {
            request = request.query(&[("pageToken", page_token)]);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<ListOccurrencesResponse>()
            .await
            .map_err(|e| MetadataError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl MetadataClient for GrafeasClient {
    async fn vulnerabilities(&self, image: &str) -> Result<Vec<Vulnerability>, MetadataError> {
        let filter = occurrence_filter(image);
        let mut vulnerabilities = Vec::new();
        let mut page_token = String::new();

        loop {
            let page = self.list_page(&filter, &page_token).await?;
            vulnerabilities.extend(
                page.occurrences
                    .into_iter()
                    .filter_map(Occurrence::into_vulnerability),
            );
            if page.next_page_token.is_empty() || page.next_page_token == page_token {
                break;
            }
            page_token = page.next_page_token;
        }

        debug!(image = %image, count = vulnerabilities.len(), "Fetched vulnerabilities");
        Ok(vulnerabilities)
    }
}
