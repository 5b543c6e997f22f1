//! Protocol data model: engine configuration, operation records, transport results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{ScrapiError, ScrapiResult};

/// Raw outcome of a transport engine call.
///
/// Exactly one side is populated: either the service's error payload or its
/// success payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportResult {
    /// Success payload (CBOR record, receipt or envelope bytes).
    Success(Vec<u8>),

    /// Error payload (problem details, usually CBOR or JSON).
    Failure(Vec<u8>),
}

impl TransportResult {
    /// Split into a standard `Result` (`Err` carries the error payload).
    pub fn into_result(self) -> Result<Vec<u8>, Vec<u8>> {
        match self {
            Self::Success(payload) => Ok(payload),
            Self::Failure(payload) => Err(payload),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Status of a long-running registration operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationStatus {
    Running,
    Succeeded,
    Failed,
    /// Status string not recognized.
    Unspecified,
}

impl OperationStatus {
    /// Parse a wire status string.
    ///
    /// Both `succeeded` and `success` map to [`OperationStatus::Succeeded`];
    /// anything unrecognized is [`OperationStatus::Unspecified`].
    pub fn parse(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "succeeded" | "success" => Self::Succeeded,
            "failed" => Self::Failed,
            _ => Self::Unspecified,
        }
    }

    /// Canonical wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Unspecified => "unspecified",
        }
    }

    /// Whether polling stops at this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OperationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Operation record exactly as it appears on the wire. Every field optional so
/// that validation can report which one is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct RawOperationRecord {
    #[serde(
        rename = "operationID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(rename = "entryID", default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
}

impl RawOperationRecord {
    pub(crate) fn from_cbor(bytes: &[u8]) -> ScrapiResult<Self> {
        ciborium::from_reader(bytes).map_err(|e| ScrapiError::MalformedOperationRecord {
            message: format!("failed to decode operation record: {}", e),
        })
    }
}

/// State of a registration operation as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationRecord {
    #[serde(rename = "operationID")]
    pub operation_id: String,

    pub status: OperationStatus,

    /// Entry identifier, present once the statement has been registered.
    #[serde(rename = "entryID", skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
}

impl OperationRecord {
    pub fn new(operation_id: impl Into<String>, status: OperationStatus) -> Self {
        Self {
            operation_id: operation_id.into(),
            status,
            entry_id: None,
        }
    }

    pub fn with_entry_id(mut self, entry_id: impl Into<String>) -> Self {
        self.entry_id = Some(entry_id.into());
        self
    }

    /// Decode a CBOR operation record; `operationID` and `status` are required.
    pub fn from_cbor(bytes: &[u8]) -> ScrapiResult<Self> {
        let raw = RawOperationRecord::from_cbor(bytes)?;

        let operation_id = raw
            .operation_id
            .ok_or_else(|| ScrapiError::MalformedOperationRecord {
                message: "missing operationID".to_string(),
            })?;
        let status = raw
            .status
            .ok_or_else(|| ScrapiError::MalformedOperationRecord {
                message: format!("missing status for operation {}", operation_id),
            })?;

        Ok(Self {
            operation_id,
            status: OperationStatus::parse(&status),
            entry_id: raw.entry_id,
        })
    }

    /// Encode as a CBOR map (`operationID`, `status`, optional `entryID`).
    pub fn to_cbor(&self) -> ScrapiResult<Vec<u8>> {
        let raw = RawOperationRecord {
            operation_id: Some(self.operation_id.clone()),
            status: Some(self.status.as_str().to_string()),
            entry_id: self.entry_id.clone(),
        };
        let mut out = Vec::new();
        ciborium::into_writer(&raw, &mut out).map_err(|e| ScrapiError::InvalidResponse {
            message: format!("failed to encode operation record: {}", e),
        })?;
        Ok(out)
    }
}

/// Log verbosity requested for an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ScrapiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(ScrapiError::Config {
                message: format!("unknown log level: {}", other),
            }),
        }
    }
}

/// Engine configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the transparency service.
    #[serde(default = "default_service_url")]
    pub url: String,

    /// Client identity for the credentials exchange.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret for the credentials exchange.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Pre-issued bearer token; takes precedence over client credentials.
    #[serde(default)]
    pub token: Option<String>,

    /// Log verbosity.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum resends for rate-limited or dropped requests.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_service_url() -> String {
    "https://app.datatrails.ai".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_service_url(),
            client_id: None,
            client_secret: None,
            token: None,
            log_level: LogLevel::default(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("url", &self.url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("log_level", &self.log_level)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `SCRAPI_URL` | Service base URL |
    /// | `SCRAPI_CLIENT_ID` | Client id for the credentials exchange |
    /// | `SCRAPI_CLIENT_SECRET` | Client secret for the credentials exchange |
    /// | `SCRAPI_TOKEN` | Pre-issued bearer token |
    /// | `SCRAPI_LOG_LEVEL` | error, warn, info, debug, trace |
    /// | `SCRAPI_TIMEOUT` | Request timeout in seconds |
    /// | `SCRAPI_MAX_RETRIES` | Max resends for transient failures |
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("SCRAPI_URL").unwrap_or_else(|_| default_service_url()),
            client_id: non_empty_env("SCRAPI_CLIENT_ID"),
            client_secret: non_empty_env("SCRAPI_CLIENT_SECRET"),
            token: non_empty_env("SCRAPI_TOKEN"),
            log_level: std::env::var("SCRAPI_LOG_LEVEL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            timeout_secs: std::env::var("SCRAPI_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            max_retries: std::env::var("SCRAPI_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_max_retries),
        }
    }

    /// Check the service URL is an absolute http(s) URL.
    pub fn validate(&self) -> ScrapiResult<url::Url> {
        let parsed = url::Url::parse(&self.url).map_err(|e| ScrapiError::Config {
            message: format!("invalid service url '{}': {}", self.url, e),
        })?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            scheme => Err(ScrapiError::Config {
                message: format!("unsupported url scheme: {}", scheme),
            }),
        }
    }

    /// Set the base URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set client credentials.
    pub fn with_client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Set a static bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
