//! Problem details decoding for error payloads.
//!
//! Error bodies arrive as CBOR problem details (text keys, or the RFC 9290
//! integer keys) or, from backends that still speak JSON, as a JSON object.
//! Decoding never fails: this runs on an error path already and must not
//! replace the original failure with a decode failure.

use std::collections::BTreeMap;
use std::fmt;

use ciborium::Value as CborValue;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Longest plain-text body copied into `detail`.
const MAX_TEXT_DETAIL: usize = 200;

/// Structured error report from the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub detail: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, JsonValue>,
}

impl ProblemDetails {
    /// Best-effort decode of an error payload.
    pub fn decode(payload: &[u8]) -> Self {
        if payload.is_empty() {
            return Self::default();
        }

        if let Ok(CborValue::Map(entries)) = ciborium::from_reader::<CborValue, _>(payload) {
            return Self::from_cbor_map(entries);
        }

        if let Ok(JsonValue::Object(map)) = serde_json::from_slice::<JsonValue>(payload) {
            return Self::from_json_map(map);
        }

        // A structured body that failed to decode is truncated or corrupt;
        // its fragment is not a useful detail.
        if looks_structured(payload) {
            return Self::default();
        }

        let detail = std::str::from_utf8(payload)
            .map(|text| text.trim().chars().take(MAX_TEXT_DETAIL).collect())
            .unwrap_or_default();
        Self {
            detail,
            ..Default::default()
        }
    }

    /// True when nothing at all could be recovered.
    pub fn is_empty(&self) -> bool {
        self.problem_type.is_empty()
            && self.title.is_empty()
            && self.detail.is_empty()
            && self.extensions.is_empty()
    }

    /// Encode as a CBOR map with text keys.
    pub(crate) fn to_cbor(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // Serializing strings and JSON values into a Vec cannot fail.
        let _ = ciborium::into_writer(self, &mut out);
        out
    }

    fn from_cbor_map(entries: Vec<(CborValue, CborValue)>) -> Self {
        let mut problem = Self::default();

        for (key, value) in entries {
            match key {
                CborValue::Text(name) => match (name.as_str(), value) {
                    ("type", CborValue::Text(v)) => problem.problem_type = v,
                    ("title", CborValue::Text(v)) => problem.title = v,
                    ("detail", CborValue::Text(v)) => problem.detail = v,
                    (_, other) => {
                        problem.extensions.insert(name, cbor_to_json(other));
                    }
                },
                CborValue::Integer(i) => {
                    let code = i128::from(i);
                    match (code, value) {
                        (-1, CborValue::Text(v)) => problem.title = v,
                        (-2, CborValue::Text(v)) => problem.detail = v,
                        (code, other) => {
                            problem
                                .extensions
                                .insert(rfc9290_key_name(code), cbor_to_json(other));
                        }
                    }
                }
                _ => {}
            }
        }

        problem
    }

    fn from_json_map(map: serde_json::Map<String, JsonValue>) -> Self {
        let mut problem = Self::default();

        for (name, value) in map {
            match (name.as_str(), value) {
                ("type", JsonValue::String(v)) => problem.problem_type = v,
                ("title", JsonValue::String(v)) => problem.title = v,
                ("detail", JsonValue::String(v)) => problem.detail = v,
                (_, other) => {
                    problem.extensions.insert(name, other);
                }
            }
        }

        // gRPC-gateway style bodies: {"code": 3, "message": "..."}
        if problem.detail.is_empty() {
            if let Some(JsonValue::String(message)) = problem.extensions.remove("message") {
                problem.detail = message;
            }
        }

        problem
    }
}

impl fmt::Display for ProblemDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.title.is_empty(), self.detail.is_empty()) {
            (false, false) => write!(f, "{}: {}", self.title, self.detail),
            (false, true) => f.write_str(&self.title),
            (true, false) => f.write_str(&self.detail),
            (true, true) if !self.problem_type.is_empty() => f.write_str(&self.problem_type),
            (true, true) => f.write_str("no problem details provided"),
        }
    }
}

/// JSON object/array opener, or a CBOR map header (major type 5).
fn looks_structured(payload: &[u8]) -> bool {
    if matches!(payload.first(), Some(0xa0..=0xbf)) {
        return true;
    }
    matches!(
        payload.iter().find(|b| !b.is_ascii_whitespace()),
        Some(b'{') | Some(b'[')
    )
}

fn rfc9290_key_name(code: i128) -> String {
    match code {
        -3 => "instance".to_string(),
        -4 => "response-code".to_string(),
        -5 => "base-uri".to_string(),
        -6 => "base-lang".to_string(),
        -7 => "base-rtl".to_string(),
        other => other.to_string(),
    }
}

fn cbor_to_json(value: CborValue) -> JsonValue {
    match value {
        CborValue::Null => JsonValue::Null,
        CborValue::Bool(b) => JsonValue::Bool(b),
        CborValue::Integer(i) => {
            let wide = i128::from(i);
            i64::try_from(wide)
                .map(JsonValue::from)
                .unwrap_or_else(|_| JsonValue::String(wide.to_string()))
        }
        CborValue::Float(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        CborValue::Text(s) => JsonValue::String(s),
        CborValue::Bytes(b) => JsonValue::String(hex::encode(b)),
        CborValue::Tag(_, inner) => cbor_to_json(*inner),
        CborValue::Array(items) => JsonValue::Array(items.into_iter().map(cbor_to_json).collect()),
        CborValue::Map(entries) => {
            let mut map = serde_json::Map::new();
            for (k, v) in entries {
                let key = match k {
                    CborValue::Text(s) => s,
                    other => cbor_to_json(other).to_string(),
                };
                map.insert(key, cbor_to_json(v));
            }
            JsonValue::Object(map)
        }
        _ => JsonValue::Null,
    }
}
