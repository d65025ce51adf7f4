//! acres-scout
//!
//! Scrapes rental, resale and new-project listings from a real-estate search
//! API that signs every request with a short-lived HMAC token.
//!
//! # Architecture
//!
//! - [`token`]: MD5/HMAC-SHA256 primitives and the JWT-shaped token codec,
//!   generator and regenerator
//! - [`session`]: bootstraps a session (token, encrypted input, cookies) from a
//!   rendered search page
//! - [`fetch`]: rate-limited, batched pagination with re-bootstrap on failure
//! - [`config`]: layered settings (defaults, TOML file, `ACRES_*` environment)
//!
//! The two entry points most callers need are [`SessionBootstrap::bootstrap`]
//! and [`regenerate_token`].
//!
//! # Examples
//!
//! ```rust
//! use acres_scout::{Scraper, Settings};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Settings::default();
//! let _scraper = Scraper::from_settings(&settings)?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod session;
pub mod token;

pub use config::Settings;
pub use error::{Error, Result};
pub use fetch::{FetchOrchestrator, RunReport, Scraper, SearchTarget};
pub use session::{SessionBootstrap, SessionContext};
pub use token::{Token, generate_token, regenerate_token};
