//! Jenkins HTTP calls: crumb acquisition and the trigger POST.

use reqwest::{header::CONTENT_TYPE, Client};
use tracing::{debug, info};

use crate::config::JenkinsServer;
use crate::error::{Result, TriggerError};

/// Crumb issuer query, answered with `<fieldName>:<crumbValue>`.
pub const CRUMB_PATH: &str = "crumbIssuer/api/xml?xpath=concat(//crumbRequestField,\":\",//crumb)";

/// Header carrying the crumb on state-changing requests.
pub const CRUMB_HEADER: &str = "Jenkins-Crumb";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Authenticated client for one Jenkins server.
#[derive(Debug, Clone)]
pub struct JenkinsClient {
    http: Client,
    base_url: String,
    user: String,
    token: String,
}

impl JenkinsClient {
    pub fn new(http: Client, server: &JenkinsServer) -> Self {
        Self {
            http,
            base_url: server.base_url.trim_end_matches('/').to_string(),
            user: server.user.clone(),
            token: server.token.clone(),
        }
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Fetch a one-time crumb.
    ///
    /// Transport errors, non-2xx statuses and bodies without a `:` are all
    /// transient failures.
    pub async fn fetch_crumb(&self) -> Result<String> {
        let response = self
            .http
            .get(self.url_for(CRUMB_PATH))
            .basic_auth(&self.user, Some(&self.token))
            .send()
            .await
            .map_err(|e| TriggerError::transient(format!("crumb request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TriggerError::transient(format!(
                "crumb request returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TriggerError::transient(format!("crumb body unreadable: {e}")))?;

        let crumb = parse_crumb(&body)
            .ok_or_else(|| TriggerError::transient("crumb response has no field separator"))?;

        debug!(crumb_length = crumb.len(), "jenkins_crumb_acquired");
        Ok(crumb)
    }

    /// POST an empty form to `path` with the crumb attached. Returns the status.
    pub async fn post_trigger(&self, path: &str, crumb: &str) -> Result<u16> {
        let response = self
            .http
            .post(self.url_for(path))
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(CRUMB_HEADER, crumb)
            .basic_auth(&self.user, Some(&self.token))
            .body("")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TriggerError::transient(format!("request to {path} timed out"))
                } else {
                    TriggerError::transient(format!("request to {path} failed: {e}"))
                }
            })?;

        let status = response.status().as_u16();
        info!(path = %path, status_code = status, "jenkins_trigger_posted");
        Ok(status)
    }
}

/// Take the substring after the first `:` of a crumb issuer response.
pub fn parse_crumb(body: &str) -> Option<String> {
    body.split_once(':')
        .map(|(_, crumb)| crumb.trim().to_string())
        .filter(|crumb| !crumb.is_empty())
}
