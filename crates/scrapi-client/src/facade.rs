//! Engine facade: owns one transport engine and turns its raw payloads into
//! domain results.
//!
//! Public API: no status code knowledge. All HTTP handling lives in the
//! engine; all payload interpretation lives here.

use std::fmt;

use tracing::{debug, warn};

use crate::envelope::{unwrap_statement, SignedStatement};
use crate::error::{ScrapiError, ScrapiResult};
use crate::poller::{Registration, RegistrationPoller};
use crate::problem::ProblemDetails;
use crate::transport::{DataTrailsEngine, EngineType, TransportEngine};
use crate::types::{EngineConfig, OperationRecord, OperationStatus, RawOperationRecord, TransportResult};

/// Portable SCRAPI client over a single transport engine.
#[derive(Default)]
pub struct Scrapi {
    engine: Option<Box<dyn TransportEngine>>,
}

impl Scrapi {
    /// Build the engine named by `engine_type`.
    pub fn new(engine_type: &str, config: EngineConfig) -> ScrapiResult<Self> {
        let engine_type: EngineType = engine_type.parse()?;
        Self::for_engine_type(engine_type, config)
    }

    pub fn for_engine_type(engine_type: EngineType, config: EngineConfig) -> ScrapiResult<Self> {
        let engine: Box<dyn TransportEngine> = match engine_type {
            EngineType::DataTrails => Box::new(DataTrailsEngine::new(config)?),
        };
        debug!(engine = %engine, "transparency service engine created");
        Ok(Self {
            engine: Some(engine),
        })
    }

    /// Wrap an already constructed engine.
    pub fn with_engine(engine: impl TransportEngine + 'static) -> Self {
        Self {
            engine: Some(Box::new(engine)),
        }
    }

    /// Liveness guard run before every delegated call.
    pub fn check_engine(&self) -> ScrapiResult<&dyn TransportEngine> {
        debug!("checking engine liveness");

        let engine = self
            .engine
            .as_deref()
            .ok_or(ScrapiError::EngineUnavailable)?;

        if !engine.initialized() {
            return Err(ScrapiError::EngineUnhealthy {
                engine: engine.to_string(),
            });
        }

        Ok(engine)
    }

    /// Transparency service configuration, decoded from CBOR.
    pub async fn get_configuration(&self) -> ScrapiResult<ciborium::Value> {
        let engine = self.check_engine()?;
        let payload = into_payload(engine.get_configuration().await?, "get_configuration")?;

        ciborium::from_reader(payload.as_slice()).map_err(|e| ScrapiError::InvalidResponse {
            message: format!("failed to decode transparency configuration: {}", e),
        })
    }

    /// Submit a signed statement and return the operation id.
    pub async fn register_signed_statement(&self, statement: &[u8]) -> ScrapiResult<String> {
        let engine = self.check_engine()?;
        let payload = into_payload(
            engine.register_signed_statement(statement).await?,
            "register_signed_statement",
        )?;

        let record = RawOperationRecord::from_cbor(&payload)?;

        let operation_id = record
            .operation_id
            .filter(|id| !id.is_empty())
            .ok_or(ScrapiError::MissingOperationId)?;

        if record.status.as_deref().map(OperationStatus::parse) == Some(OperationStatus::Failed) {
            return Err(ScrapiError::RegistrationFailed { operation_id });
        }

        debug!(operation_id = %operation_id, "statement accepted");
        Ok(operation_id)
    }

    /// Current state of a registration operation.
    pub async fn check_registration(&self, operation_id: &str) -> ScrapiResult<OperationRecord> {
        let engine = self.check_engine()?;
        let payload = into_payload(
            engine.check_registration(operation_id).await?,
            "check_registration",
        )?;

        OperationRecord::from_cbor(&payload)
    }

    /// Receipt bytes for a registered entry, unmodified.
    pub async fn resolve_receipt(&self, entry_id: &str) -> ScrapiResult<Vec<u8>> {
        let engine = self.check_engine()?;
        into_payload(engine.resolve_receipt(entry_id).await?, "resolve_receipt")
    }

    /// The issuer's original signed statement for a registered entry.
    pub async fn resolve_signed_statement(&self, entry_id: &str) -> ScrapiResult<SignedStatement> {
        let engine = self.check_engine()?;
        let payload = into_payload(
            engine.resolve_signed_statement(entry_id).await?,
            "resolve_signed_statement",
        )?;

        unwrap_statement(&payload)
    }

    /// Register and block until the receipt is available.
    ///
    /// CAUTION: there is no built-in deadline; some services take a long time
    /// to complete registration. Wrap in `tokio::time::timeout` to bound it.
    pub async fn register_signed_statement_sync(
        &self,
        statement: &[u8],
    ) -> ScrapiResult<Registration> {
        RegistrationPoller::new(self).register(statement).await
    }
}

impl fmt::Display for Scrapi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.engine {
            Some(engine) => write!(f, "{}", engine),
            None => f.write_str("Scrapi (uninitialized)"),
        }
    }
}

impl fmt::Debug for Scrapi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scrapi")
            .field("engine", &self.engine.as_ref().map(|e| e.to_string()))
            .finish()
    }
}

fn into_payload(result: TransportResult, operation: &str) -> ScrapiResult<Vec<u8>> {
    result.into_result().map_err(|error_payload| {
        let problem = ProblemDetails::decode(&error_payload);
        warn!(operation = operation, problem = %problem, "transparency service reported an error");
        ScrapiError::Transport {
            operation: operation.to_string(),
            problem,
        }
    })
}
