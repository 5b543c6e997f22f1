//! DataTrails transparency service engine.
//!
//! Maps each engine operation onto the public SCITT REST routes and decides
//! which statuses count as success. The service answers registration and
//! status calls with JSON; those bodies are transcoded to CBOR so the facade
//! decodes a single format.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, StatusCode};
use tracing::debug;

use crate::auth::TokenProvider;
use crate::error::{ScrapiError, ScrapiResult};
use crate::problem::ProblemDetails;
use crate::transport::TransportEngine;
use crate::types::{EngineConfig, OperationRecord, OperationStatus, TransportResult};

mod helpers;
mod http;

use helpers::{json_to_cbor, truncate_for_log};
use http::{HttpBackend, RawResponse};

/// User agent sent on every request.
pub const ENGINE_USER_AGENT: &str = concat!("scrapi-client/", env!("CARGO_PKG_VERSION"));

const ENTRIES_PATH: [&str; 4] = ["archivist", "v1", "publicscitt", "entries"];
const OPERATIONS_PATH: [&str; 4] = ["archivist", "v1", "publicscitt", "operations"];
const COSE_CONTENT_TYPE: &str = "application/cose";

/// Engine for the DataTrails public SCITT endpoint.
#[derive(Debug, Clone)]
pub struct DataTrailsEngine {
    http: HttpBackend,
    service_url: url::Url,
    initialized: bool,
}

impl DataTrailsEngine {
    pub fn new(config: EngineConfig) -> ScrapiResult<Self> {
        let service_url = config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(ENGINE_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| ScrapiError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        let token_provider = TokenProvider::from_config(&config, client.clone());
        let base_url = config.url.trim_end_matches('/').to_string();

        debug!(
            url = %base_url,
            authenticated = token_provider.is_authenticated(),
            log_level = %config.log_level,
            "DataTrails engine ready"
        );

        Ok(Self {
            http: HttpBackend {
                client,
                base_url,
                token_provider,
                config,
            },
            service_url,
            initialized: true,
        })
    }

    pub fn from_env() -> ScrapiResult<Self> {
        Self::new(EngineConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.http.base_url
    }

    pub fn config(&self) -> &EngineConfig {
        &self.http.config
    }

    pub fn is_authenticated(&self) -> bool {
        self.http.token_provider.is_authenticated()
    }

    /// Route under the service URL; ids are percent-encoded as single segments.
    fn route(&self, prefix: &[&str], ids: &[&str]) -> String {
        let mut url = self.service_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(prefix).extend(ids);
        }
        url.to_string()
    }

    fn entries_url(&self) -> String {
        self.route(&ENTRIES_PATH, &[])
    }

    fn entry_url(&self, entry_id: &str) -> String {
        self.route(&ENTRIES_PATH, &[entry_id])
    }

    fn receipt_url(&self, entry_id: &str) -> String {
        self.route(&ENTRIES_PATH, &[entry_id, "receipt"])
    }

    fn operation_url(&self, operation_id: &str) -> String {
        self.route(&OPERATIONS_PATH, &[operation_id])
    }

    /// Success payload as CBOR; an undecodable body becomes a failure.
    fn record_payload(response: RawResponse, operation: &str) -> TransportResult {
        if response.is_cbor() {
            return TransportResult::Success(response.body);
        }

        match json_to_cbor(&response.body) {
            Ok(cbor) => TransportResult::Success(cbor),
            Err(e) => {
                debug!(
                    operation = operation,
                    error = %e,
                    body = %truncate_for_log(&response.body),
                    "response body is not a usable operation record"
                );
                let problem = ProblemDetails {
                    title: "Invalid Response".to_string(),
                    detail: format!("{} returned an undecodable body: {}", operation, e),
                    ..Default::default()
                };
                TransportResult::Failure(problem.to_cbor())
            }
        }
    }
}

impl fmt::Display for DataTrailsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataTrails Scrapi Engine ({})", self.http.base_url)
    }
}

#[async_trait]
impl TransportEngine for DataTrailsEngine {
    fn initialized(&self) -> bool {
        self.initialized
    }

    async fn get_configuration(&self) -> ScrapiResult<TransportResult> {
        Err(ScrapiError::NotSupported {
            engine: self.to_string(),
            operation: "get_configuration".to_string(),
        })
    }

    async fn register_signed_statement(
        &self,
        statement: &[u8],
    ) -> ScrapiResult<TransportResult> {
        let url = self.entries_url();
        debug!(url = %url, bytes = statement.len(), "registering signed statement");

        let response = self
            .http
            .send(Method::POST, &url, Some((COSE_CONTENT_TYPE, statement)))
            .await?;

        // Failure modes: non-200; a body with no operation id; an operation
        // that comes back already failed. Only the first is decided here.
        if response.status != StatusCode::OK {
            debug!(status = response.status.as_u16(), "FAILED to register statement");
            return Ok(TransportResult::Failure(response.body));
        }

        Ok(Self::record_payload(response, "register_signed_statement"))
    }

    async fn check_registration(&self, registration_id: &str) -> ScrapiResult<TransportResult> {
        let url = self.operation_url(registration_id);
        debug!(operation_id = registration_id, "checking on operation");

        let response = self.http.send(Method::GET, &url, None).await?;

        match response.status {
            // Entries that have not yet crossed the sharing boundary come back
            // as 400. That cannot be told apart from a real bad request, so it
            // is reported as still running.
            StatusCode::BAD_REQUEST => {
                debug!(
                    operation_id = registration_id,
                    "suspected temporary propagation 400 error"
                );
                let record = OperationRecord::new(registration_id, OperationStatus::Running);
                Ok(TransportResult::Success(record.to_cbor()?))
            }
            StatusCode::OK | StatusCode::ACCEPTED => {
                Ok(Self::record_payload(response, "check_registration"))
            }
            status => {
                debug!(status = status.as_u16(), "FAILED to get operation status");
                Ok(TransportResult::Failure(response.body))
            }
        }
    }

    async fn resolve_receipt(&self, entry_id: &str) -> ScrapiResult<TransportResult> {
        let url = self.receipt_url(entry_id);
        debug!(entry_id = entry_id, "resolving receipt");

        let response = self.http.send(Method::GET, &url, None).await?;
        if response.status != StatusCode::OK {
            debug!(status = response.status.as_u16(), "FAILED to get receipt");
            return Ok(TransportResult::Failure(response.body));
        }

        Ok(TransportResult::Success(response.body))
    }

    async fn resolve_signed_statement(&self, entry_id: &str) -> ScrapiResult<TransportResult> {
        let url = self.entry_url(entry_id);
        debug!(entry_id = entry_id, "resolving entry");

        let response = self.http.send(Method::GET, &url, None).await?;
        if response.status != StatusCode::OK {
            debug!(status = response.status.as_u16(), "FAILED to get entry");
            return Ok(TransportResult::Failure(response.body));
        }

        Ok(TransportResult::Success(response.body))
    }
}
