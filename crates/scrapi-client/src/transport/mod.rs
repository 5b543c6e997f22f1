//! Transport engine capability.
//!
//! An engine performs the authenticated network calls for one backend and
//! hands back raw payloads. It never interprets problem details or operation
//! records; that is the facade's job. `Err` is reserved for calls that could
//! not be completed at all (connection failure, rejected credentials); a
//! service-side error answer is a [`TransportResult::Failure`].

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::{ScrapiError, ScrapiResult};
use crate::types::TransportResult;

pub mod datatrails;

pub use datatrails::DataTrailsEngine;

/// Backend capability every engine variant implements.
#[async_trait]
pub trait TransportEngine: fmt::Display + Send + Sync {
    /// True iff the engine can accept calls.
    fn initialized(&self) -> bool;

    /// Transparency service configuration (`NotSupported` where the backend
    /// has no such endpoint).
    async fn get_configuration(&self) -> ScrapiResult<TransportResult>;

    /// Submit a signed statement.
    async fn register_signed_statement(&self, statement: &[u8])
        -> ScrapiResult<TransportResult>;

    /// Query a registration operation.
    async fn check_registration(&self, registration_id: &str) -> ScrapiResult<TransportResult>;

    /// Fetch the receipt for a registered entry.
    async fn resolve_receipt(&self, entry_id: &str) -> ScrapiResult<TransportResult>;

    /// Fetch the stored (counter-signed) entry.
    async fn resolve_signed_statement(&self, entry_id: &str) -> ScrapiResult<TransportResult>;
}

/// Known engine variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineType {
    DataTrails,
}

impl EngineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataTrails => "DataTrails",
        }
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineType {
    type Err = ScrapiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("datatrails") {
            Ok(Self::DataTrails)
        } else {
            Err(ScrapiError::UnknownEngineType {
                engine_type: s.to_string(),
            })
        }
    }
}
