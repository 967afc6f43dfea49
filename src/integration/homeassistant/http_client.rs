//! Home Assistant HTTP client.
//! This is the lower level client for the Home Assistant REST API.
use failsafe::{
    backoff::{self, Constant},
    failure_policy::{self, ConsecutiveFailures},
    futures::CircuitBreaker,
};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

use super::schemas::StateCreateOrUpdate;
use super::{Error, Result};

type Breaker = failsafe::StateMachine<ConsecutiveFailures<Constant>, ()>;

pub struct HttpClient {
    client: Client,
    token: String,
    base_url: Url,
    circuit_breaker: Breaker,
}

impl HttpClient {
    /// Creates a new instance of `HttpClient`.
    pub fn new(url: Url, token: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(2)
            .timeout(timeout)
            .build()?;
        Ok(HttpClient {
            client,
            token,
            base_url: url,
            circuit_breaker: circuit_breaker(),
        })
    }

    /// Creates or updates the state of an entity.
    /// Server errors are retried; repeated failures open the circuit breaker.
    pub async fn set_state(&self, entity_id: &str, state: &StateCreateOrUpdate) -> Result<()> {
        let body = serde_json::to_string(state)?;
        RetryIf::spawn(
            retry_strategy(),
            || async {
                self.circuit_breaker
                    .call_with(is_recorded_error, self.request_post_state(entity_id, &body))
                    .await
                    .map_err(|err| match err {
                        failsafe::Error::Rejected => Error::RequestRejected,
                        failsafe::Error::Inner(e) => e,
                    })
            },
            is_retryable_error,
        )
        .await
    }

    /// Internal method to post a state.
    async fn request_post_state(&self, entity_id: &str, body: &str) -> Result<()> {
        log::debug!("Sending state for '{entity_id}': {body}");
        let url = self
            .base_url
            .join(&format!("api/states/{entity_id}"))
            .expect("cannot build state URL");
        self.client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Circuit breaker opening after 5 consecutive failures, half-open again after 60 seconds.
fn circuit_breaker() -> Breaker {
    let backoff = backoff::constant(Duration::from_secs(60));
    let policy = failure_policy::consecutive_failures(5, backoff);
    failsafe::Config::new().failure_policy(policy).build()
}

/// Exponential backoff from 10 milliseconds, with jitter, at most 3 retries.
fn retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(10).map(jitter).take(3)
}

fn is_client_error(error: &reqwest::Error) -> bool {
    error
        .status()
        .is_some_and(|status_code| StatusCode::is_client_error(&status_code))
}

// A rejected state will be rejected again: only server and transport errors are retried.
fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::RequestFailed(err) => !is_client_error(err),
        Error::RequestRejected => false,
        Error::JsonSerializationFailed(_) => false,
    }
}

fn is_recorded_error(error: &Error) -> bool {
    match error {
        Error::RequestFailed(err) => !is_client_error(err),
        Error::RequestRejected => false,
        Error::JsonSerializationFailed(_) => false,
    }
}
