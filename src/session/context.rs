//! Session context produced by a successful bootstrap

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::{Error, Result};

/// Bootstrap token, encrypted input and cookies for one scraping session.
///
/// Immutable once built; a re-bootstrap replaces the whole context.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionContext {
    token: String,
    encrypted_input: String,
    cookies: Arc<BTreeMap<String, String>>,
}

impl SessionContext {
    /// Build a context, rejecting it unless all three parts are non-empty.
    pub fn new(
        token: impl Into<String>,
        encrypted_input: impl Into<String>,
        cookies: BTreeMap<String, String>,
    ) -> Result<Self> {
        let token = token.into();
        let encrypted_input = encrypted_input.into();

        let missing: Vec<&str> = [
            ("token", token.is_empty()),
            ("encrypted input", encrypted_input.is_empty()),
            ("cookies", cookies.is_empty()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        if !missing.is_empty() {
            return Err(Error::internal(format!(
                "incomplete session context, missing {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            token,
            encrypted_input,
            cookies: Arc::new(cookies),
        })
    }

    /// Bootstrap token; its payload carries the signing material
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Opaque site parameter passed through to API calls
    pub fn encrypted_input(&self) -> &str {
        &self.encrypted_input
    }

    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }
}

/// Cookies rendered as a single `Cookie` header value.
pub fn cookie_header(cookies: &BTreeMap<String, String>) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview: String = self.token.chars().take(12).collect();
        f.debug_struct("SessionContext")
            .field("token", &format!("{}…", preview))
            .field("encrypted_input_len", &self.encrypted_input.len())
            .field("cookies", &self.cookies.keys().collect::<Vec<_>>())
            .finish()
    }
}
