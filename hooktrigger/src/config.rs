//! Configuration loading.
//!
//! The JSON document is read once at startup and resolved into an immutable
//! [`Config`], including the endpoint-id index. `PORT` and `WEBHOOK_SECRET`
//! environment variables override the document.

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::deliver::EndpointDefinition;
use crate::error::TriggerError;
use crate::rules::TriggerRule;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Configuration document
// =============================================================================

/// Integer setting written either as a JSON number or a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntSetting {
    Number(i64),
    Text(String),
}

impl IntSetting {
    /// Parse the setting. An empty string is unset; on failure the raw text
    /// is returned.
    pub fn parse<T: FromStr>(&self) -> std::result::Result<Option<T>, String> {
        let raw = match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        };
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<T>().map(Some).map_err(|_| raw)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub count: Option<IntSetting>,
    #[serde(default)]
    pub delay: Option<IntSetting>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuccessConfig {
    #[serde(default)]
    pub http_status: Option<IntSetting>,
}

/// Endpoint as written in the document, before integer resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub id: String,
    pub path: String,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub success: SuccessConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct JenkinsDocument {
    #[serde(default)]
    user: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    base_url: String,
    #[serde(default)]
    timeout_seconds: Option<IntSetting>,
    #[serde(default)]
    endpoints: Vec<EndpointConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TriggersDocument {
    #[serde(default)]
    jenkins: Option<Vec<TriggerRule>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    port: Option<IntSetting>,
    #[serde(default)]
    secret: Option<String>,
    #[serde(default)]
    failure_policy: FailurePolicy,
    #[serde(default)]
    jenkins: JenkinsDocument,
    #[serde(default)]
    triggers: TriggersDocument,
    #[serde(default)]
    forward: Option<Vec<ForwardTarget>>,
}

// =============================================================================
// Resolved configuration
// =============================================================================

/// What happens to the remaining rules once one exhausts its retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop processing the remaining rules for this webhook.
    #[default]
    Halt,
    /// Keep going and report every failure.
    Continue,
}

/// Static URL that receives a copy of every webhook body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardTarget {
    pub url: String,
    /// Copy the GitHub headers onto the forwarded request.
    #[serde(default)]
    pub headers: bool,
}

/// Jenkins server connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JenkinsServer {
    pub base_url: String,
    pub user: String,
    pub token: String,
    pub timeout: Duration,
}

/// Application configuration. Read-only once built.
#[derive(Debug, Clone)]
pub struct Config {
    pub version: Option<String>,
    pub port: u16,
    /// Shared webhook secret. `None` disables signature verification.
    pub secret: Option<String>,
    pub failure_policy: FailurePolicy,
    pub jenkins: JenkinsServer,
    pub rules: Vec<TriggerRule>,
    /// Endpoint index by id.
    pub endpoints: HashMap<String, EndpointDefinition>,
    /// Endpoints whose settings failed to resolve, with the reason.
    pub rejected_endpoints: HashMap<String, TriggerError>,
    pub forward: Vec<ForwardTarget>,
}

impl Config {
    /// Load from a file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file(path)?.with_overrides(|name| env::var(name).ok())
    }

    /// Load from a JSON file without environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Build from a JSON document.
    pub fn from_json(raw: &[u8]) -> Result<Self> {
        let doc: ConfigDocument =
            serde_json::from_slice(raw).context("Failed to parse config JSON")?;

        let port = match doc.port {
            Some(setting) => setting
                .parse::<u16>()
                .map_err(|value| anyhow!("Invalid port {value:?}"))?
                .unwrap_or(DEFAULT_PORT),
            None => DEFAULT_PORT,
        };

        let timeout_secs = match &doc.jenkins.timeout_seconds {
            Some(setting) => setting
                .parse::<u64>()
                .map_err(|value| anyhow!("Invalid jenkins.timeout_seconds {value:?}"))?
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            None => DEFAULT_TIMEOUT_SECS,
        };

        let rules = doc.triggers.jenkins.unwrap_or_default();

        let base_url = doc.jenkins.base_url.trim().trim_end_matches('/').to_string();
        if !base_url.is_empty() || !rules.is_empty() {
            Url::parse(&base_url)
                .with_context(|| format!("Invalid jenkins.base_url {base_url:?}"))?;
        }

        let (endpoints, rejected_endpoints) = index_endpoints(&doc.jenkins.endpoints);

        for rule in &rules {
            if !endpoints.contains_key(&rule.endpoint)
                && !rejected_endpoints.contains_key(&rule.endpoint)
            {
                warn!(endpoint = %rule.endpoint, "rule_endpoint_unknown");
            }
        }

        Ok(Self {
            version: doc.version,
            port,
            secret: doc.secret.filter(|s| !s.trim().is_empty()),
            failure_policy: doc.failure_policy,
            jenkins: JenkinsServer {
                base_url,
                user: doc.jenkins.user,
                token: doc.jenkins.token,
                timeout: Duration::from_secs(timeout_secs),
            },
            rules,
            endpoints,
            rejected_endpoints,
            forward: doc.forward.unwrap_or_default(),
        })
    }

    /// Apply `PORT` and `WEBHOOK_SECRET` overrides from `lookup`.
    ///
    /// A blank `WEBHOOK_SECRET` counts as unset and keeps the document's secret.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT {port:?}"))?;
        }
        if let Some(secret) = lookup("WEBHOOK_SECRET").filter(|s| !s.trim().is_empty()) {
            self.secret = Some(secret);
        }
        Ok(self)
    }

    pub fn endpoint(&self, id: &str) -> Option<&EndpointDefinition> {
        self.endpoints.get(id)
    }
}

/// Resolve every endpoint once. Failures are logged here and nowhere else.
fn index_endpoints(
    raw: &[EndpointConfig],
) -> (
    HashMap<String, EndpointDefinition>,
    HashMap<String, TriggerError>,
) {
    let mut endpoints = HashMap::new();
    let mut rejected = HashMap::new();

    for endpoint in raw {
        match EndpointDefinition::resolve(endpoint) {
            Ok(definition) => {
                rejected.remove(&endpoint.id);
                endpoints.insert(endpoint.id.clone(), definition);
            }
            Err(e) => {
                warn!(endpoint = %endpoint.id, error = %e, "endpoint_config_invalid");
                endpoints.remove(&endpoint.id);
                rejected.insert(endpoint.id.clone(), e);
            }
        }
    }

    (endpoints, rejected)
}
