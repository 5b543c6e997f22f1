//! Registration poller: submit, poll until terminal, fetch the receipt.
//!
//! ```text
//! SUBMITTED ──► RUNNING ─┬─► SUCCEEDED ──► receipt
//!                  ▲     ├─► FAILED
//!                  └─────┴── RUNNING / UNSPECIFIED (sleep, poll again)
//! ```
//!
//! Polls are strictly sequential. There is no deadline; bound the wait with
//! `tokio::time::timeout` around [`RegistrationPoller::register`]. Dropping
//! the future abandons the poll but not the service-side operation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{ScrapiError, ScrapiResult};
use crate::facade::Scrapi;
use crate::types::{OperationRecord, OperationStatus};

/// Default wait between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Suspension point between polls.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fixed-interval backoff between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub interval: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl BackoffPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self { interval }
    }
}

/// Outcome of a completed registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub operation_id: String,
    pub entry_id: String,
    pub receipt: Vec<u8>,
}

/// Drives one registration flow through the facade.
pub struct RegistrationPoller<'a> {
    scrapi: &'a Scrapi,
    policy: BackoffPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl<'a> RegistrationPoller<'a> {
    pub fn new(scrapi: &'a Scrapi) -> Self {
        Self {
            scrapi,
            policy: BackoffPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Submit `statement`, wait for the operation to finish and fetch its receipt.
    pub async fn register(&self, statement: &[u8]) -> ScrapiResult<Registration> {
        let operation_id = self.scrapi.register_signed_statement(statement).await?;
        info!(operation_id = %operation_id, "statement submitted");

        let record = self.wait_for_completion(&operation_id).await?;

        let entry_id = record
            .entry_id
            .ok_or_else(|| ScrapiError::MalformedOperationRecord {
                message: format!("operation {} succeeded without an entryID", operation_id),
            })?;

        let receipt = self.scrapi.resolve_receipt(&entry_id).await?;
        info!(
            operation_id = %operation_id,
            entry_id = %entry_id,
            receipt_bytes = receipt.len(),
            "receipt resolved"
        );

        Ok(Registration {
            operation_id,
            entry_id,
            receipt,
        })
    }

    /// Poll until the operation succeeds (`Ok`) or fails (`RegistrationFailed`).
    pub async fn wait_for_completion(&self, operation_id: &str) -> ScrapiResult<OperationRecord> {
        let mut polls: u64 = 0;

        loop {
            let record = self.scrapi.check_registration(operation_id).await?;
            polls += 1;

            match record.status {
                OperationStatus::Succeeded => {
                    info!(operation_id = %operation_id, polls, "registration operation SUCCESS");
                    return Ok(record);
                }
                OperationStatus::Failed => {
                    warn!(operation_id = %operation_id, polls, "registration operation FAILED");
                    return Err(ScrapiError::RegistrationFailed {
                        operation_id: operation_id.to_string(),
                    });
                }
                OperationStatus::Running => {
                    info!(
                        operation_id = %operation_id,
                        polls,
                        wait_ms = self.policy.interval.as_millis(),
                        "registration operation still running"
                    );
                }
                OperationStatus::Unspecified => {
                    warn!(
                        operation_id = %operation_id,
                        polls,
                        record = ?record,
                        "unrecognized operation status, treating as running"
                    );
                }
            }

            self.sleeper.sleep(self.policy.interval).await;
        }
    }
}
