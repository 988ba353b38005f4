//! Pass-through forwarding of raw webhook payloads to static URLs.

use futures::future::join_all;
use reqwest::{header::HeaderMap, Client};
use tracing::{error, info};

use crate::config::ForwardTarget;
use crate::error::{Result, TriggerError};

/// Inbound headers copied onto forwarded requests when a target asks for them.
pub const FORWARDED_HEADERS: &[&str] = &[
    "X-GitHub-Event",
    "X-Hub-Signature",
    "X-GitHub-Delivery",
    "Content-Type",
];

/// POST `body` to every target concurrently.
///
/// Returns the number of targets reached, or the first failure.
pub async fn forward_payload(
    client: &Client,
    targets: &[ForwardTarget],
    body: &[u8],
    inbound_headers: &HeaderMap,
) -> Result<usize> {
    let targets: Vec<&ForwardTarget> = targets.iter().filter(|t| !t.url.is_empty()).collect();
    if targets.is_empty() {
        return Ok(0);
    }

    let futures: Vec<_> = targets
        .iter()
        .map(|target| forward_one(client, target, body, inbound_headers))
        .collect();

    let results = join_all(futures).await;
    let forwarded = results.iter().filter(|r| r.is_ok()).count();

    info!(
        targets = targets.len(),
        forwarded = forwarded,
        "forward_complete"
    );

    results.into_iter().collect::<Result<Vec<()>>>()?;
    Ok(forwarded)
}

async fn forward_one(
    client: &Client,
    target: &ForwardTarget,
    body: &[u8],
    inbound_headers: &HeaderMap,
) -> Result<()> {
    let mut request = client.post(&target.url).body(body.to_vec());

    if target.headers {
        for name in FORWARDED_HEADERS {
            if let Some(value) = inbound_headers.get(*name) {
                request = request.header(*name, value.clone());
            }
        }
    }

    match request.send().await {
        Ok(resp) => {
            info!(
                url = %target.url,
                status_code = resp.status().as_u16(),
                "forward_posted"
            );
            Ok(())
        }
        Err(e) => {
            error!(url = %target.url, error = %e, "forward_failed");
            Err(TriggerError::ForwardFailed {
                url: target.url.clone(),
                message: e.to_string(),
            })
        }
    }
}
