//! Error type definitions
//!
//! Defines the error taxonomy shared by the token pipeline, session bootstrap
//! and fetch orchestration.

use thiserror::Error;

/// Main error type for the scraper
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed base64 or payload bytes
    #[error("Decode error: {0}")]
    Decode(String),

    /// Secret material could not be turned into a signing key
    #[error("Invalid secret: {0}")]
    InvalidSecret(String),

    /// Token payload lacks `s1`, `s2` or `s3`
    #[error("Missing secret material: {field}")]
    MissingSecretMaterial { field: String },

    /// Token does not have exactly three segments
    #[error("Malformed token: expected 3 segments, got {segments}")]
    MalformedToken { segments: usize },

    /// Token payload segment is not valid base64 JSON
    #[error("Malformed token payload: {0}")]
    MalformedPayload(String),

    /// HMAC signing failed
    #[error("Signing error: {0}")]
    Signing(String),

    /// Session bootstrap could not produce a complete session context
    #[error("Bootstrap failed for {url}: {reason}")]
    Bootstrap { url: String, reason: String },

    /// Non-200 response, timeout or connection failure
    #[error("Network error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Network {
        status: Option<u16>,
        message: String,
    },

    /// Server signalled rate limiting (HTTP 429)
    #[error("Rate limited: {url}")]
    RateLimited { url: String },

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parse errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an invalid secret error
    pub fn invalid_secret(msg: impl Into<String>) -> Self {
        Self::InvalidSecret(msg.into())
    }

    /// Create a missing secret material error for the named payload field
    pub fn missing_secret_material(field: impl Into<String>) -> Self {
        Self::MissingSecretMaterial {
            field: field.into(),
        }
    }

    /// Create a malformed payload error
    pub fn malformed_payload(msg: impl Into<String>) -> Self {
        Self::MalformedPayload(msg.into())
    }

    /// Create a signing error
    pub fn signing(msg: impl Into<String>) -> Self {
        Self::Signing(msg.into())
    }

    /// Create a bootstrap error
    pub fn bootstrap(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Bootstrap {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a network error with an optional HTTP status
    pub fn network(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Network {
            status,
            message: message.into(),
        }
    }

    /// Create a rate limited error
    pub fn rate_limited(url: impl Into<String>) -> Self {
        Self::RateLimited { url: url.into() }
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error came from the network layer.
    ///
    /// `RateLimited` counts as a network failure: it is answered by a
    /// re-bootstrap, never by an immediate resend.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::RateLimited { .. } | Self::Http(_)
        )
    }
}
