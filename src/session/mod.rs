//! # Session Module
//!
//! Acquires the session a scrape runs under: a bootstrap token, the encrypted
//! input parameter and the authentication cookies, all taken from one render
//! of a search page.
//!
//! - [`PageRenderer`] renders a URL and captures the login call's cookies
//! - [`SessionBootstrap`] extracts the markers and retries under a [`RetryPolicy`]
//! - [`SessionContext`] is the immutable result, replaced wholesale on re-bootstrap

pub mod bootstrap;
pub mod context;
pub mod renderer;

pub use bootstrap::{RetryPolicy, SessionBootstrap, extract_api_token, extract_encrypted_input};
pub use context::{SessionContext, cookie_header};
pub use renderer::{HttpPageRenderer, PageRenderer, RenderedPage};
