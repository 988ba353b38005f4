//! Retrying trigger delivery.
//!
//! Each attempt acquires a fresh crumb, posts to the rendered endpoint path
//! and checks the response status. Any failure inside an attempt is
//! transient: the engine pauses for the endpoint's delay and tries again
//! until the attempt budget runs out. The first clean attempt ends the loop.

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::deliver::endpoint::EndpointDefinition;
use crate::deliver::jenkins::JenkinsClient;
use crate::error::{Result, TriggerError};

/// Successful delivery summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub path: String,
    /// Attempts spent, including the successful one.
    pub attempts: u32,
    pub status: u16,
}

/// State of one attempt. Lives only inside a single `deliver` call.
#[derive(Debug)]
struct DeliveryAttempt {
    iteration: u32,
    crumb: Option<String>,
    outcome: Result<u16>,
}

#[derive(Debug, Clone)]
pub struct DeliveryEngine {
    jenkins: JenkinsClient,
}

impl DeliveryEngine {
    pub fn new(jenkins: JenkinsClient) -> Self {
        Self { jenkins }
    }

    /// Trigger `endpoint` for the given repository and branch.
    ///
    /// Fails with `DeliveryExhausted` once `retry_count` attempts have
    /// failed. A zero budget fails without any HTTP traffic.
    pub async fn deliver(
        &self,
        endpoint: &EndpointDefinition,
        repository: &str,
        branch: &str,
    ) -> Result<Delivery> {
        let path = endpoint.render_path(repository, branch);
        let budget = endpoint.retry_count;

        for iteration in 0..budget {
            info!(
                endpoint = %endpoint.id,
                path = %path,
                attempt = iteration + 1,
                budget = budget,
                "delivery_attempt_starting"
            );

            let attempt = self.attempt(iteration, endpoint, &path).await;

            match attempt.outcome {
                Ok(status) => {
                    info!(
                        endpoint = %endpoint.id,
                        path = %path,
                        attempt = attempt.iteration + 1,
                        status_code = status,
                        "delivery_succeeded"
                    );
                    return Ok(Delivery {
                        path,
                        attempts: attempt.iteration + 1,
                        status,
                    });
                }
                Err(e) => {
                    warn!(
                        endpoint = %endpoint.id,
                        path = %path,
                        attempt = attempt.iteration + 1,
                        crumb_acquired = attempt.crumb.is_some(),
                        error = %e,
                        "delivery_attempt_failed"
                    );

                    let remaining = budget - iteration - 1;
                    if remaining > 0 && !endpoint.retry_delay.is_zero() {
                        sleep(endpoint.retry_delay).await;
                    }
                }
            }
        }

        error!(
            endpoint = %endpoint.id,
            path = %path,
            attempts = budget,
            "delivery_exhausted"
        );

        Err(TriggerError::DeliveryExhausted {
            path,
            attempts: budget,
        })
    }

    async fn attempt(
        &self,
        iteration: u32,
        endpoint: &EndpointDefinition,
        path: &str,
    ) -> DeliveryAttempt {
        let crumb = match self.jenkins.fetch_crumb().await {
            Ok(crumb) => crumb,
            Err(e) => {
                return DeliveryAttempt {
                    iteration,
                    crumb: None,
                    outcome: Err(e),
                }
            }
        };

        let outcome = match self.jenkins.post_trigger(path, &crumb).await {
            Ok(status) => check_status(status, endpoint.expected_status),
            Err(e) => Err(e),
        };

        DeliveryAttempt {
            iteration,
            crumb: Some(crumb),
            outcome,
        }
    }
}

/// A mismatch against the expected status is a soft, retryable failure.
fn check_status(status: u16, expected: Option<u16>) -> Result<u16> {
    match expected {
        Some(expected) if expected != status => Err(TriggerError::transient(format!(
            "HTTP status {status} different than expected {expected}"
        ))),
        _ => Ok(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JenkinsServer;
    use crate::deliver::jenkins::CRUMB_HEADER;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn engine_for(server: &MockServer) -> DeliveryEngine {
        let jenkins = JenkinsServer {
            base_url: server.uri(),
            user: "ci".to_string(),
            token: "token".to_string(),
            timeout: Duration::from_secs(5),
        };
        DeliveryEngine::new(JenkinsClient::new(reqwest::Client::new(), &jenkins))
    }

    fn endpoint(retry_count: u32, expected_status: Option<u16>) -> EndpointDefinition {
        EndpointDefinition {
            id: "build".to_string(),
            path: "build/{{.repository}}/{{.branch}}".to_string(),
            retry_count,
            retry_delay: Duration::ZERO,
            expected_status,
        }
    }

    async fn mount_crumb(server: &MockServer, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/crumbIssuer/api/xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Jenkins-Crumb:c0ffee"))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[test]
    fn test_check_status() {
        assert_eq!(check_status(500, None), Ok(500));
        assert_eq!(check_status(201, Some(201)), Ok(201));
        assert!(check_status(200, Some(201)).unwrap_err().is_retryable());
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let server = MockServer::start().await;
        mount_crumb(&server, 3).await;

        Mock::given(method("POST"))
            .and(path("/build/app/main"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/build/app/main"))
            .and(header(CRUMB_HEADER, "c0ffee"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let delivery = engine_for(&server)
            .deliver(&endpoint(3, Some(201)), "app", "main")
            .await
            .unwrap();

        assert_eq!(delivery.attempts, 3);
        assert_eq!(delivery.status, 201);
        assert_eq!(delivery.path, "build/app/main");
    }

    #[tokio::test]
    async fn test_success_stops_remaining_attempts() {
        let server = MockServer::start().await;
        mount_crumb(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/build/app/main"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let delivery = engine_for(&server)
            .deliver(&endpoint(5, None), "app", "main")
            .await
            .unwrap();

        assert_eq!(delivery.attempts, 1);
    }

    #[tokio::test]
    async fn test_any_status_succeeds_without_expectation() {
        let server = MockServer::start().await;
        mount_crumb(&server, 1).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let delivery = engine_for(&server)
            .deliver(&endpoint(3, None), "app", "main")
            .await
            .unwrap();

        assert_eq!(delivery.status, 404);
    }

    #[tokio::test]
    async fn test_zero_budget_makes_no_calls() {
        let server = MockServer::start().await;
        mount_crumb(&server, 0).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = engine_for(&server)
            .deliver(&endpoint(0, None), "app", "main")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TriggerError::DeliveryExhausted {
                path: "build/app/main".to_string(),
                attempts: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_crumb_failure_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/crumbIssuer/api/xml"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        mount_crumb(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/build/app/main"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let delivery = engine_for(&server)
            .deliver(&endpoint(2, Some(201)), "app", "main")
            .await
            .unwrap();

        assert_eq!(delivery.attempts, 2);
    }

    #[tokio::test]
    async fn test_exhausted_after_persistent_mismatch() {
        let server = MockServer::start().await;
        mount_crumb(&server, 2).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let err = engine_for(&server)
            .deliver(&endpoint(2, Some(201)), "app", "main")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TriggerError::DeliveryExhausted { attempts: 2, .. }
        ));
    }

    fn unreachable_engine() -> DeliveryEngine {
        let jenkins = JenkinsServer {
            base_url: "http://127.0.0.1:1".to_string(),
            user: "ci".to_string(),
            token: "token".to_string(),
            timeout: Duration::from_secs(1),
        };
        DeliveryEngine::new(JenkinsClient::new(reqwest::Client::new(), &jenkins))
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delay_only_between_attempts() {
        let mut endpoint = endpoint(2, None);
        endpoint.retry_delay = Duration::from_secs(5);

        let started = tokio::time::Instant::now();
        let err = unreachable_engine()
            .deliver(&endpoint, "app", "main")
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(
            err,
            TriggerError::DeliveryExhausted { attempts: 2, .. }
        ));
        // One pause between the two attempts, none after the last.
        assert!(elapsed >= Duration::from_secs(5), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(10), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_never_sleeps() {
        let mut endpoint = endpoint(1, None);
        endpoint.retry_delay = Duration::from_secs(5);

        let started = tokio::time::Instant::now();
        unreachable_engine()
            .deliver(&endpoint, "app", "main")
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_transport_error_is_retried_until_exhausted() {
        let err = unreachable_engine()
            .deliver(&endpoint(2, None), "app", "main")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TriggerError::DeliveryExhausted { attempts: 2, .. }
        ));
    }
}
