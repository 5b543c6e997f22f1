//! Pure helpers: body transcoding and log truncation (no HTTP, no status logic).

/// Longest body excerpt written to debug logs.
const MAX_LOG_BODY: usize = 200;

/// Re-encode a JSON document as CBOR.
pub(crate) fn json_to_cbor(body: &[u8]) -> Result<Vec<u8>, String> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| format!("invalid JSON: {}", e))?;

    let mut out = Vec::new();
    ciborium::into_writer(&value, &mut out).map_err(|e| format!("CBOR encoding: {}", e))?;
    Ok(out)
}

/// Lossy, bounded rendering of a body for logs.
pub(crate) fn truncate_for_log(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(MAX_LOG_BODY)
        .collect()
}
