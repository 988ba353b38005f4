//! Outbound HTTP: Jenkins trigger delivery and raw payload forwarding.
//!
//! ## Delivery Flow
//!
//! ```text
//! EndpointDefinition → render path → [crumb GET → trigger POST → status check]* → Delivery
//! ```

pub mod endpoint;
pub mod engine;
pub mod forward;
pub mod jenkins;

use std::time::Duration;

use reqwest::Client;

pub use endpoint::EndpointDefinition;
pub use engine::{Delivery, DeliveryEngine};
pub use forward::forward_payload;
pub use jenkins::JenkinsClient;

const USER_AGENT: &str = concat!("hooktrigger/", env!("CARGO_PKG_VERSION"));

/// Build the shared outbound client. `timeout` is the per-request deadline.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .pool_max_idle_per_host(16)
        .build()
}
