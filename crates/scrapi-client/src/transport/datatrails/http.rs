//! HTTP layer: auth headers, resend policy, raw response capture.
//!
//! Status codes are not interpreted here beyond 429; the engine decides
//! which statuses are success for each operation.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use tracing::{debug, warn};

use crate::auth::TokenProvider;
use crate::error::{ScrapiError, ScrapiResult};
use crate::types::EngineConfig;

/// Fully read response.
#[derive(Debug, Clone)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub(crate) fn is_cbor(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.contains("cbor") || ct.contains("cose"))
            .unwrap_or(false)
    }
}

/// HTTP backend for making requests (holds reqwest client, auth, config).
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) token_provider: TokenProvider,
    pub(crate) config: EngineConfig,
}

impl HttpBackend {
    /// Send a request, resending on 429 (any method) and on connection
    /// failures (GET only). The final response is returned whatever its status.
    pub(crate) async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<(&'static str, &[u8])>,
    ) -> ScrapiResult<RawResponse> {
        use rand::Rng;

        let mut retries: u32 = 0;
        let max_retries = self.config.max_retries;

        loop {
            let backoff = match self.send_once(method.clone(), url, body).await {
                Ok((response, retry_after)) => {
                    if response.status != StatusCode::TOO_MANY_REQUESTS || retries >= max_retries {
                        return Ok(response);
                    }
                    let capped = retry_after
                        .unwrap_or(Duration::from_secs(1))
                        .min(Duration::from_secs(30));
                    let jitter_factor: f64 = rand::thread_rng().gen_range(0.9_f64..=1.1_f64);
                    let jittered_ms =
                        ((capped.as_millis() as f64) * jitter_factor).round() as u64;
                    Duration::from_millis(jittered_ms.max(100))
                }
                Err(e) if e.is_retryable() && method == Method::GET && retries < max_retries => {
                    debug!(error = %e, "request failed before a response arrived");
                    let base_backoff =
                        Duration::from_secs(1u64 << retries.min(5)).min(Duration::from_secs(30));
                    let jittered_ms =
                        rand::thread_rng().gen_range(0..=base_backoff.as_millis() as u64);
                    Duration::from_millis(jittered_ms.max(10))
                }
                Err(e) => return Err(e),
            };

            retries += 1;
            warn!(
                url = %url,
                retry = retries,
                max_retries = max_retries,
                backoff_ms = backoff.as_millis(),
                "resending request"
            );
            tokio::time::sleep(backoff).await;
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<(&'static str, &[u8])>,
    ) -> ScrapiResult<(RawResponse, Option<Duration>)> {
        let mut request = self.client.request(method.clone(), url);

        if let Some(token) = self.token_provider.get_token().await? {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        if let Some((content_type, bytes)) = body {
            request = request.header(CONTENT_TYPE, content_type).body(bytes.to_vec());
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers();

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let retry_after = headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = response.bytes().await.map_err(|e| ScrapiError::Network {
            message: format!("failed to read response body: {}", e),
        })?;

        debug!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            bytes = body.len(),
            "response received"
        );

        Ok((
            RawResponse {
                status,
                content_type,
                body: body.to_vec(),
            },
            retry_after,
        ))
    }
}
