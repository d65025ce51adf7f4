//! Token minting
//!
//! Builds a fresh signed token for one outgoing request from the salts, the
//! shared secret, the request's query string and optional body.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::codec::{SecretMaterial, Token, TokenClaims};
use super::crypto::{base64_url_decode, base64_url_encode, hmac_sha256, md5_hex};
use crate::{Error, Result};

/// Seconds between `iat` and `exp`.
pub const TOKEN_VALIDITY_SECS: f64 = 120.0;

/// Webdriver flag hashed into `wb`. Server-side minting never runs under a
/// browser driver, so this is always the string `false`.
const WEBDRIVER_FLAG: &str = "false";

/// Mints signed tokens.
#[derive(Debug, Clone)]
pub struct TokenGenerator {
    /// Carry `s1`/`s2`/`s3` inside every minted payload
    embed_secret_material: bool,
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self {
            embed_secret_material: true,
        }
    }
}

impl TokenGenerator {
    pub fn new(embed_secret_material: bool) -> Self {
        Self {
            embed_secret_material,
        }
    }

    /// Mint a token issued now.
    pub fn generate(
        &self,
        material: &SecretMaterial,
        query_string: &str,
        request_body: &str,
    ) -> Result<Token> {
        self.generate_at(material, query_string, request_body, Utc::now())
    }

    /// Mint a token with an explicit issue time.
    pub fn generate_at(
        &self,
        material: &SecretMaterial,
        query_string: &str,
        request_body: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<Token> {
        let SecretMaterial {
            salt1,
            salt2,
            secret,
        } = material;

        let hq = md5_hex(&format!("{salt1}{query_string}{salt2}"));
        let hb = (!request_body.is_empty())
            .then(|| md5_hex(&format!("{salt1}{request_body}{salt2}")));
        let wb = md5_hex(&format!("{salt1}{WEBDRIVER_FLAG}{salt2}"));

        let key = base64_url_decode(secret)
            .map_err(|e| Error::invalid_secret(format!("secret is not base64: {}", e)))?;

        let iat = issued_at.timestamp_millis() as f64 / 1000.0;
        let claims = TokenClaims {
            iat,
            exp: iat + TOKEN_VALIDITY_SECS,
            hq,
            wb,
            hb,
            s1: self.embed_secret_material.then(|| salt1.clone()),
            s2: self.embed_secret_material.then(|| salt2.clone()),
            s3: self.embed_secret_material.then(|| secret.clone()),
        };

        let (header, payload) = Token::encode_unsigned(&claims)?;
        let unsigned = format!("{header}.{payload}");
        let signature = base64_url_encode(&hmac_sha256(&key, unsigned.as_bytes())?);

        debug!(
            iat = claims.iat,
            has_body = claims.hb.is_some(),
            "minted request token"
        );

        Ok(Token::from_segments(&header, &payload, &signature))
    }
}

/// Mint a token from loose salts and secret with the default generator.
pub fn generate_token(
    salt1: &str,
    salt2: &str,
    secret_base64: &str,
    query_string: &str,
    request_body: &str,
) -> Result<Token> {
    TokenGenerator::default().generate(
        &SecretMaterial::new(salt1, salt2, secret_base64),
        query_string,
        request_body,
    )
}
