//! Token regeneration
//!
//! Derives a request-scoped token from an existing one. The salts and secret
//! ride inside the existing token's payload, so one bootstrap token can sign
//! any number of later requests.

use tracing::{debug, warn};

use super::codec::Token;
use super::generator::TokenGenerator;
use crate::Result;

/// Everything after the first `?`, or empty when there is no query.
pub fn query_string(url: &str) -> &str {
    url.split_once('?').map(|(_, query)| query).unwrap_or("")
}

/// Mints tokens for new requests from the secret material of existing ones.
#[derive(Debug, Clone, Default)]
pub struct TokenRegenerator {
    generator: TokenGenerator,
}

impl TokenRegenerator {
    pub fn new(generator: TokenGenerator) -> Self {
        Self { generator }
    }

    /// Mint a token for `target_url`/`request_body` from `existing_token`.
    pub fn regenerate(
        &self,
        existing_token: &str,
        target_url: &str,
        request_body: &str,
    ) -> Result<Token> {
        let material = Token::parse(existing_token)
            .and_then(|token| token.secret_material())
            .inspect_err(|e| warn!("Cannot regenerate token: {}", e))?;

        let query = query_string(target_url);
        debug!(query_len = query.len(), "regenerating token for request");

        self.generator.generate(&material, query, request_body)
    }
}

/// Regenerate with the default generator settings.
pub fn regenerate_token(existing_token: &str, target_url: &str, request_body: &str) -> Result<Token> {
    TokenRegenerator::default().regenerate(existing_token, target_url, request_body)
}
