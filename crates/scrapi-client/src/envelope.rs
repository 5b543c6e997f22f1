//! COSE_Sign1 envelope parsing and statement recovery.
//!
//! Stored entries come back as a counter-signed envelope whose payload is the
//! issuer's original signed statement. Recovery strips exactly one layer.
//! Signatures are not verified here.

use ciborium::Value as CborValue;

use crate::error::{ScrapiError, ScrapiResult};

/// CBOR tag for COSE_Sign1 (RFC 9052).
pub const COSE_SIGN1_TAG: u64 = 18;

/// Header label for the signing algorithm.
pub const HEADER_ALG: i64 = 1;

/// Header label for the payload content type.
pub const HEADER_CONTENT_TYPE: i64 = 3;

/// Header map as decoded, in wire order.
pub type HeaderMap = Vec<(CborValue, CborValue)>;

/// A decoded COSE_Sign1 structure.
#[derive(Debug, Clone, PartialEq)]
pub struct CoseSign1 {
    /// Protected header bucket exactly as encoded.
    pub protected: Vec<u8>,
    pub protected_headers: HeaderMap,
    pub unprotected_headers: HeaderMap,
    /// `None` for a detached payload.
    pub payload: Option<Vec<u8>>,
    pub signature: Vec<u8>,
}

impl CoseSign1 {
    /// Build an envelope, encoding the protected headers.
    pub fn new(
        protected_headers: HeaderMap,
        unprotected_headers: HeaderMap,
        payload: Option<Vec<u8>>,
        signature: Vec<u8>,
    ) -> ScrapiResult<Self> {
        let protected = if protected_headers.is_empty() {
            Vec::new()
        } else {
            encode_value(&CborValue::Map(protected_headers.clone()))?
        };

        Ok(Self {
            protected,
            protected_headers,
            unprotected_headers,
            payload,
            signature,
        })
    }

    /// Decode a COSE_Sign1, tagged (18) or untagged.
    pub fn decode(bytes: &[u8]) -> ScrapiResult<Self> {
        let value: CborValue = ciborium::from_reader(bytes)
            .map_err(|e| malformed(format!("not valid CBOR: {}", e)))?;

        let value = match value {
            CborValue::Tag(COSE_SIGN1_TAG, inner) => *inner,
            CborValue::Tag(tag, _) => {
                return Err(malformed(format!(
                    "unexpected tag {}, expected {}",
                    tag, COSE_SIGN1_TAG
                )))
            }
            other => other,
        };

        let items = match value {
            CborValue::Array(items) => items,
            _ => return Err(malformed("expected a CBOR array")),
        };

        let arity = items.len();
        let [protected, unprotected, payload, signature]: [CborValue; 4] = items
            .try_into()
            .map_err(|_| malformed(format!("expected 4 elements, found {}", arity)))?;

        let protected = match protected {
            CborValue::Bytes(b) => b,
            _ => return Err(malformed("protected header must be a byte string")),
        };

        let unprotected_headers = match unprotected {
            CborValue::Map(m) => m,
            _ => return Err(malformed("unprotected header must be a map")),
        };

        let payload = match payload {
            CborValue::Bytes(b) => Some(b),
            CborValue::Null => None,
            _ => return Err(malformed("payload must be a byte string or nil")),
        };

        let signature = match signature {
            CborValue::Bytes(b) => b,
            _ => return Err(malformed("signature must be a byte string")),
        };

        let protected_headers = if protected.is_empty() {
            Vec::new()
        } else {
            match ciborium::from_reader::<CborValue, _>(protected.as_slice()) {
                Ok(CborValue::Map(m)) => m,
                Ok(_) => return Err(malformed("protected header is not a map")),
                Err(e) => return Err(malformed(format!("protected header: {}", e))),
            }
        };

        Ok(Self {
            protected,
            protected_headers,
            unprotected_headers,
            payload,
            signature,
        })
    }

    /// Encode as a tagged COSE_Sign1.
    pub fn to_vec(&self) -> ScrapiResult<Vec<u8>> {
        let payload = match &self.payload {
            Some(p) => CborValue::Bytes(p.clone()),
            None => CborValue::Null,
        };
        let value = CborValue::Tag(
            COSE_SIGN1_TAG,
            Box::new(CborValue::Array(vec![
                CborValue::Bytes(self.protected.clone()),
                CborValue::Map(self.unprotected_headers.clone()),
                payload,
                CborValue::Bytes(self.signature.clone()),
            ])),
        );
        encode_value(&value)
    }
}

/// Signed statement recovered from a stored entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedStatement {
    pub protected_headers: HeaderMap,
    pub unprotected_headers: HeaderMap,
    pub payload: Option<Vec<u8>>,
    /// The statement envelope exactly as the issuer submitted it.
    pub encoded: Vec<u8>,
}

impl SignedStatement {
    /// Look up a protected header by integer label.
    pub fn protected_header(&self, label: i64) -> Option<&CborValue> {
        find_label(&self.protected_headers, label)
    }

    /// Look up an unprotected header by integer label.
    pub fn unprotected_header(&self, label: i64) -> Option<&CborValue> {
        find_label(&self.unprotected_headers, label)
    }
}

/// Strip the service's outer envelope and return the inner statement.
pub fn unwrap_statement(entry: &[u8]) -> ScrapiResult<SignedStatement> {
    let outer = CoseSign1::decode(entry).map_err(|e| context("outer envelope", e))?;

    let encoded = outer
        .payload
        .ok_or_else(|| malformed("outer envelope has a detached payload"))?;

    let inner = CoseSign1::decode(&encoded).map_err(|e| context("inner envelope", e))?;

    Ok(SignedStatement {
        protected_headers: inner.protected_headers,
        unprotected_headers: inner.unprotected_headers,
        payload: inner.payload,
        encoded,
    })
}

fn find_label(headers: &HeaderMap, label: i64) -> Option<&CborValue> {
    headers.iter().find_map(|(k, v)| match k {
        CborValue::Integer(i) if i128::from(*i) == i128::from(label) => Some(v),
        _ => None,
    })
}

fn encode_value(value: &CborValue) -> ScrapiResult<Vec<u8>> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out).map_err(|e| ScrapiError::InvalidResponse {
        message: format!("failed to encode envelope: {}", e),
    })?;
    Ok(out)
}

fn malformed(message: impl Into<String>) -> ScrapiError {
    ScrapiError::MalformedEnvelope {
        message: message.into(),
    }
}

fn context(layer: &str, err: ScrapiError) -> ScrapiError {
    match err {
        ScrapiError::MalformedEnvelope { message } => ScrapiError::MalformedEnvelope {
            message: format!("{}: {}", layer, message),
        },
        other => other,
    }
}
