//! Signed request tokens
//!
//! This module implements the site's request-signing scheme: MD5 hashes of the
//! query, body and webdriver flag, wrapped in a JWT-shaped envelope and signed
//! with HMAC-SHA256. Tokens embed the salts and secret needed to mint the next
//! token, which is how a single bootstrap token signs a whole scraping run.
//!
//! # Examples
//!
//! ```rust
//! use acres_scout::token::{generate_token, regenerate_token};
//!
//! # fn example() -> acres_scout::Result<()> {
//! let bootstrap = generate_token("saltA", "saltB", "c2VjcmV0a2V5", "city=8&page=1", "")?;
//! let next = regenerate_token(bootstrap.as_str(), "https://example.com/api?city=8&page=2", "")?;
//! assert_eq!(next.as_str().split('.').count(), 3);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod codec;
pub mod crypto;
pub mod generator;
pub mod regenerator;

pub use codec::{SecretMaterial, Token, TokenClaims};
pub use generator::{TOKEN_VALIDITY_SECS, TokenGenerator, generate_token};
pub use regenerator::{TokenRegenerator, query_string, regenerate_token};
