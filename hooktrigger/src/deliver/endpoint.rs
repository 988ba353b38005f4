//! Resolved CI endpoint definitions.

use std::time::Duration;

use crate::config::{EndpointConfig, IntSetting};
use crate::error::{Result, TriggerError};

pub const REPOSITORY_PLACEHOLDER: &str = "{{.repository}}";
pub const BRANCH_PLACEHOLDER: &str = "{{.branch}}";

/// A job-trigger path template plus its retry and success policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDefinition {
    pub id: String,
    pub path: String,
    /// Number of attempts. Zero never attempts delivery.
    pub retry_count: u32,
    /// Pause after a failed attempt, in whole seconds.
    pub retry_delay: Duration,
    pub expected_status: Option<u16>,
}

impl EndpointDefinition {
    pub const DEFAULT_RETRY_COUNT: u32 = 1;

    /// Resolve the integer fields of a configured endpoint.
    ///
    /// Unset values take their defaults; anything that fails integer
    /// parsing is `ConfigValueInvalid`.
    pub fn resolve(raw: &EndpointConfig) -> Result<Self> {
        let retry_count = resolve_field(&raw.id, "retry.count", raw.retry.count.as_ref())?
            .unwrap_or(Self::DEFAULT_RETRY_COUNT);
        let retry_delay = resolve_field::<u64>(&raw.id, "retry.delay", raw.retry.delay.as_ref())?
            .unwrap_or(0);
        let expected_status =
            resolve_field(&raw.id, "success.http_status", raw.success.http_status.as_ref())?;

        Ok(Self {
            id: raw.id.clone(),
            path: raw.path.clone(),
            retry_count,
            retry_delay: Duration::from_secs(retry_delay),
            expected_status,
        })
    }

    /// Substitute repository and branch into the path template, verbatim.
    pub fn render_path(&self, repository: &str, branch: &str) -> String {
        self.path
            .replace(REPOSITORY_PLACEHOLDER, repository)
            .replace(BRANCH_PLACEHOLDER, branch)
    }
}

fn resolve_field<T: std::str::FromStr>(
    endpoint: &str,
    field: &'static str,
    setting: Option<&IntSetting>,
) -> Result<Option<T>> {
    match setting {
        None => Ok(None),
        Some(setting) => setting
            .parse()
            .map_err(|value| TriggerError::ConfigValueInvalid {
                endpoint: endpoint.to_string(),
                field,
                value,
            }),
    }
}
