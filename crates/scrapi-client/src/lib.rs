//! Client for SCITT transparency services speaking SCRAPI.
//!
//! This crate implements the client side of statement registration:
//!
//! - Pluggable transport engines behind one capability trait
//! - Facade that validates engine liveness and decodes service payloads
//! - Registration poller that drives the long-running operation to a receipt
//! - Problem details decoding for error payloads
//! - COSE_Sign1 unwrapping to recover the issuer's original statement
//!
//! # Quick Start
//!
//! ```no_run
//! use scrapi_client::{EngineConfig, Scrapi};
//!
//! # async fn example() -> Result<(), scrapi_client::ScrapiError> {
//! let scrapi = Scrapi::new("DataTrails", EngineConfig::from_env())?;
//!
//! let statement = std::fs::read("signed-statement.cbor").unwrap();
//! let registration = scrapi.register_signed_statement_sync(&statement).await?;
//! println!("entry {} has a {} byte receipt", registration.entry_id, registration.receipt.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `SCRAPI_URL` | Service base URL (default: `https://app.datatrails.ai`) |
//! | `SCRAPI_CLIENT_ID` | Client id for the credentials exchange |
//! | `SCRAPI_CLIENT_SECRET` | Client secret for the credentials exchange |
//! | `SCRAPI_TOKEN` | Pre-issued bearer token |
//! | `SCRAPI_LOG_LEVEL` | Log verbosity (default: `info`) |
//! | `SCRAPI_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `SCRAPI_MAX_RETRIES` | Max resends for transient failures (default: 3) |
//!
//! # Logging
//!
//! Events go through `tracing`. Install a subscriber to see them; the crate
//! never installs one itself.

pub mod auth;
pub mod envelope;
pub mod error;
pub mod facade;
pub mod poller;
pub mod problem;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types
pub use auth::{ClientCredentialsProvider, TokenProvider};
pub use envelope::{unwrap_statement, CoseSign1, HeaderMap, SignedStatement, COSE_SIGN1_TAG};
pub use error::{ScrapiError, ScrapiResult};
pub use facade::Scrapi;
pub use poller::{
    BackoffPolicy, Registration, RegistrationPoller, Sleeper, TokioSleeper, DEFAULT_POLL_INTERVAL,
};
pub use problem::ProblemDetails;
pub use transport::datatrails::ENGINE_USER_AGENT;
pub use transport::{DataTrailsEngine, EngineType, TransportEngine};
pub use types::{EngineConfig, LogLevel, OperationRecord, OperationStatus, TransportResult};
