//! Signed token structure
//!
//! A token is `header.payload.signature`, each segment URL-safe base64 without
//! padding. The payload carries the request hashes and, in-band, the salts and
//! secret needed to mint the next token.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::crypto::{base64_url_decode, base64_url_encode, verify_hmac_sha256};
use crate::{Error, Result};

/// Fixed JOSE header, serialized exactly as the site expects it.
pub const TOKEN_HEADER_JSON: &str = r#"{"typ":"JWT","alg":"HS256"}"#;

/// Claims carried in a token payload.
///
/// Field order is the serialization order and is covered by the signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issued-at, Unix seconds with millisecond precision
    pub iat: f64,
    /// Expiry, always `iat + 120`
    pub exp: f64,
    /// MD5 of `s1 + query + s2`
    pub hq: String,
    /// MD5 of `s1 + "false" + s2`
    pub wb: String,
    /// MD5 of `s1 + body + s2`, present only for non-empty bodies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<String>,
}

/// Salts and base64 secret recovered from a token payload.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretMaterial {
    pub salt1: String,
    pub salt2: String,
    /// Base64 encoded HMAC key
    pub secret: String,
}

impl SecretMaterial {
    pub fn new(
        salt1: impl Into<String>,
        salt2: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            salt1: salt1.into(),
            salt2: salt2.into(),
            secret: secret.into(),
        }
    }

    /// Pull `s1`, `s2`, `s3` out of a decoded payload. All three must be strings.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        let field = |name: &str| -> Result<String> {
            payload
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::missing_secret_material(name))
        };

        Ok(Self {
            salt1: field("s1")?,
            salt2: field("s2")?,
            secret: field("s3")?,
        })
    }
}

// Keeps the secret out of logs.
impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretMaterial")
            .field("salt1", &self.salt1)
            .field("salt2", &self.salt2)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A three-segment signed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    raw: String,
    payload_start: usize,
    signature_start: usize,
}

impl Token {
    /// Parse a token string, requiring exactly three non-empty segments.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let segments: Vec<&str> = raw.split('.').collect();
        let non_empty = segments.iter().filter(|s| !s.is_empty()).count();

        if segments.len() != 3 || non_empty != 3 {
            let segments = if segments.len() == 3 {
                non_empty
            } else {
                segments.len()
            };
            return Err(Error::MalformedToken { segments });
        }

        let payload_start = segments[0].len() + 1;
        let signature_start = payload_start + segments[1].len() + 1;
        Ok(Self {
            raw: raw.to_string(),
            payload_start,
            signature_start,
        })
    }

    /// Assemble a token from already-encoded segments.
    pub(crate) fn from_segments(header: &str, payload: &str, signature: &str) -> Self {
        let payload_start = header.len() + 1;
        let signature_start = payload_start + payload.len() + 1;
        Self {
            raw: format!("{}.{}.{}", header, payload, signature),
            payload_start,
            signature_start,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn header_segment(&self) -> &str {
        &self.raw[..self.payload_start - 1]
    }

    pub fn payload_segment(&self) -> &str {
        &self.raw[self.payload_start..self.signature_start - 1]
    }

    pub fn signature_segment(&self) -> &str {
        &self.raw[self.signature_start..]
    }

    /// `header.payload`, the bytes covered by the signature.
    pub fn signing_input(&self) -> &str {
        &self.raw[..self.signature_start - 1]
    }

    /// Decode the payload segment into JSON.
    pub fn payload(&self) -> Result<Value> {
        let bytes = base64_url_decode(self.payload_segment())
            .map_err(|e| Error::malformed_payload(e.to_string()))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| Error::malformed_payload(format!("payload is not UTF-8: {}", e)))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::malformed_payload(format!("payload is not JSON: {}", e)))
    }

    /// Decode the payload into typed claims.
    pub fn claims(&self) -> Result<TokenClaims> {
        serde_json::from_value(self.payload()?)
            .map_err(|e| Error::malformed_payload(format!("unexpected claims shape: {}", e)))
    }

    /// Salts and secret embedded in the payload.
    pub fn secret_material(&self) -> Result<SecretMaterial> {
        SecretMaterial::from_payload(&self.payload()?)
    }

    /// Check the signature against a raw HMAC key.
    pub fn verify(&self, key: &[u8]) -> Result<bool> {
        let tag = base64_url_decode(self.signature_segment())?;
        verify_hmac_sha256(key, self.signing_input().as_bytes(), &tag)
    }

    /// Encode a header/claims pair into unsigned `header.payload` segments.
    pub(crate) fn encode_unsigned(claims: &TokenClaims) -> Result<(String, String)> {
        let header = base64_url_encode(TOKEN_HEADER_JSON.as_bytes());
        let payload = base64_url_encode(serde_json::to_string(claims)?.as_bytes());
        Ok((header, payload))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for Token {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
