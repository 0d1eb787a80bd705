//! Process configuration read from the environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `IMAGEGATE_BREAKGLASS_ANNOTATION` | `imagegate.dev/breakglass` |
//! | `IMAGEGATE_WHITELIST` | empty (comma-separated image patterns) |
//! | `IMAGEGATE_GRAFEAS_ENDPOINT` | `https://containeranalysis.googleapis.com` |
//! | `IMAGEGATE_GRAFEAS_PROJECT` | required |
//! | `IMAGEGATE_GRAFEAS_TOKEN_PATH` | unset |
//! | `IMAGEGATE_METADATA_TIMEOUT_SECS` | `5` |
//! | `IMAGEGATE_DECISION_TIMEOUT_SECS` | `9` |
//! | `IMAGEGATE_WEBHOOK_PORT` | `9443` |
//! | `IMAGEGATE_HEALTH_PORT` | `8080` |
//! | `IMAGEGATE_TLS_CERT_PATH` | `/etc/webhook/certs/tls.crt` |
//! | `IMAGEGATE_TLS_KEY_PATH` | `/etc/webhook/certs/tls.key` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::admission::{DEFAULT_BREAKGLASS_ANNOTATION, EngineSettings, GlobalWhitelist};
use crate::metadata::GrafeasSettings;
use crate::webhooks::{WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT};

const DEFAULT_GRAFEAS_ENDPOINT: &str = "https://containeranalysis.googleapis.com";
const DEFAULT_HEALTH_PORT: u16 = 8080;
const DEFAULT_METADATA_TIMEOUT_SECS: u64 = 5;
/// API server webhook timeout defaults to 10s; answer before it gives up.
const DEFAULT_DECISION_TIMEOUT_SECS: u64 = 9;

/// Configuration errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for {key}: {message}")]
    Invalid {
        key: &'static str,
        value: String,
        message: String,
    },
}

/// Process-wide settings, fixed at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub breakglass_annotation: String,
    pub whitelist: Vec<String>,
    pub grafeas: GrafeasSettings,
    pub decision_timeout: Duration,
    pub webhook_port: u16,
    pub health_port: u16,
    pub tls_cert_path: PathBuf,
    pub tls_key_path: PathBuf,
}

impl Settings {
    /// Read settings from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns the raw value of a key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let project = get("IMAGEGATE_GRAFEAS_PROJECT")
            .ok_or(ConfigError::Missing("IMAGEGATE_GRAFEAS_PROJECT"))?;

        Ok(Self {
            breakglass_annotation: get("IMAGEGATE_BREAKGLASS_ANNOTATION")
                .unwrap_or_else(|| DEFAULT_BREAKGLASS_ANNOTATION.to_string()),
            whitelist: get("IMAGEGATE_WHITELIST")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            grafeas: GrafeasSettings {
                endpoint: get("IMAGEGATE_GRAFEAS_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_GRAFEAS_ENDPOINT.to_string()),
                project,
                token_path: get("IMAGEGATE_GRAFEAS_TOKEN_PATH").map(PathBuf::from),
                request_timeout: Duration::from_secs(parse_or(
                    "IMAGEGATE_METADATA_TIMEOUT_SECS",
                    get("IMAGEGATE_METADATA_TIMEOUT_SECS"),
                    DEFAULT_METADATA_TIMEOUT_SECS,
                )?),
            },
            decision_timeout: Duration::from_secs(parse_or(
                "IMAGEGATE_DECISION_TIMEOUT_SECS",
                get("IMAGEGATE_DECISION_TIMEOUT_SECS"),
                DEFAULT_DECISION_TIMEOUT_SECS,
            )?),
            webhook_port: parse_or(
                "IMAGEGATE_WEBHOOK_PORT",
                get("IMAGEGATE_WEBHOOK_PORT"),
                WEBHOOK_PORT,
            )?,
            health_port: parse_or(
                "IMAGEGATE_HEALTH_PORT",
                get("IMAGEGATE_HEALTH_PORT"),
                DEFAULT_HEALTH_PORT,
            )?,
            tls_cert_path: get("IMAGEGATE_TLS_CERT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(WEBHOOK_CERT_PATH)),
            tls_key_path: get("IMAGEGATE_TLS_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(WEBHOOK_KEY_PATH)),
        })
    }

    /// Pipeline constants derived from these settings
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings::default()
            .with_breakglass_annotation(self.breakglass_annotation.clone())
            .with_whitelist(GlobalWhitelist::new(self.whitelist.iter().cloned()))
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::Invalid {
                key,
                message: e.to_string(),
                value,
            }),
        },
    }
}
