//! Resilient Forwarding Client
//!
//! Delivers an extracted report record to the external collector endpoint
//! under bounded retry with exponential backoff. The retry loop is an
//! explicit state machine driven by an injectable sleeper so tests can
//! reproduce the exact delay sequence without real time elapsing.

use async_trait::async_trait;
use hydroreport_models::{ForwardPayload, ReportRecord};
use hydroreport_utils::{ForwardingConfig, ReportError, RetryConfig};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retry loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardState {
    /// An attempt is about to be issued (1-based counter)
    Attempting(u32),
    /// Sleeping before re-issuing; holds the attempt that just failed
    WaitingToRetry(u32),
    /// Terminal: the collector accepted the record
    Succeeded,
    /// Terminal: non-retriable rejection or attempts exhausted
    FailedPermanently,
}

impl ForwardState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::FailedPermanently)
    }
}

/// Deterministic backoff schedule: `min(factor^(attempt-1) * base, max)`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_factor: f64,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let scaled = self.backoff_factor.powi(exponent) * self.base_delay.as_secs_f64();
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_factor: config.backoff_factor,
            base_delay: Duration::from_secs_f64(config.base_delay_seconds),
            max_delay: Duration::from_secs_f64(config.max_delay_seconds),
        }
    }
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// 2xx from the collector; carries the opaque response body
    Delivered(String),
    /// Network failure, timeout or 5xx; eligible for retry
    Transient(String),
    /// 4xx (authentication or payload rejected); must never be retried
    Permanent(String),
}

/// Time source seam for the backoff sleep.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Transport seam: issues a single outbound call per attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, payload: &ForwardPayload) -> AttemptOutcome;
}

/// Production transport: authenticated JSON POST via reqwest.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &ForwardingConfig) -> Result<Self, ReportError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ReportError::configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, payload: &ForwardPayload) -> AttemptOutcome {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-Key", &self.api_key)
            .json(payload)
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    AttemptOutcome::Delivered(resp.text().await.unwrap_or_default())
                } else if status.is_server_error() {
                    AttemptOutcome::Transient(format!("collector returned {}", status))
                } else {
                    AttemptOutcome::Permanent(format!("collector rejected request: {}", status))
                }
            }
            Err(e) if e.is_timeout() => {
                AttemptOutcome::Transient("request timed out".to_string())
            }
            Err(e) => AttemptOutcome::Transient(format!("transport error: {}", e)),
        }
    }
}

/// Client for forwarding parsed report records to the external collector.
pub struct ForwardClient {
    transport: Box<dyn Transport>,
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
    /// Bounds total retry time for one record, regardless of per-attempt
    /// timeouts.
    overall_deadline: Duration,
}

impl ForwardClient {
    pub fn from_config(config: &ForwardingConfig) -> Result<Self, ReportError> {
        Ok(Self::new(
            Box::new(HttpTransport::new(config)?),
            RetryPolicy::from(&config.retry),
            Box::new(TokioSleeper),
            config.overall_deadline(),
        ))
    }

    pub fn new(
        transport: Box<dyn Transport>,
        policy: RetryPolicy,
        sleeper: Box<dyn Sleeper>,
        overall_deadline: Duration,
    ) -> Self {
        Self {
            transport,
            policy,
            sleeper,
            overall_deadline,
        }
    }

    /// Forward one record, driving the retry state machine to a terminal
    /// state within the overall deadline. Returns the collector's response
    /// body on success.
    pub async fn forward(&self, record: &ReportRecord) -> Result<String, ReportError> {
        let payload = ForwardPayload::from(record);
        let mut attempts_made = 0u32;

        let outcome = tokio::time::timeout(
            self.overall_deadline,
            self.drive(&payload, &mut attempts_made),
        )
        .await;

        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(attempts = attempts_made, "overall forwarding deadline exceeded");
                Err(ReportError::forwarding(
                    "overall forwarding deadline exceeded",
                    attempts_made,
                ))
            }
        }
    }

    async fn drive(
        &self,
        payload: &ForwardPayload,
        attempts_made: &mut u32,
    ) -> Result<String, ReportError> {
        let mut state = ForwardState::Attempting(1);
        let mut last_error = String::new();
        let mut response_body = None;

        while !state.is_terminal() {
            state = match state {
                ForwardState::Attempting(attempt) => {
                    *attempts_made = attempt;
                    debug!(attempt, "forwarding attempt started");

                    match self.transport.send(payload).await {
                        AttemptOutcome::Delivered(body) => {
                            info!(attempt, "record accepted by collector");
                            response_body = Some(body);
                            ForwardState::Succeeded
                        }
                        AttemptOutcome::Transient(reason) => {
                            warn!(attempt, %reason, "transient forwarding failure");
                            last_error = reason;
                            if attempt < self.policy.max_attempts {
                                ForwardState::WaitingToRetry(attempt)
                            } else {
                                ForwardState::FailedPermanently
                            }
                        }
                        AttemptOutcome::Permanent(reason) => {
                            warn!(attempt, %reason, "permanent forwarding failure");
                            last_error = reason;
                            ForwardState::FailedPermanently
                        }
                    }
                }
                ForwardState::WaitingToRetry(attempt) => {
                    let delay = self.policy.delay_for(attempt);
                    debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off");
                    self.sleeper.sleep(delay).await;
                    ForwardState::Attempting(attempt + 1)
                }
                terminal => terminal,
            };
        }

        match state {
            ForwardState::Succeeded => Ok(response_body.unwrap_or_default()),
            _ => Err(ReportError::forwarding(last_error, *attempts_made)),
        }
    }
}
