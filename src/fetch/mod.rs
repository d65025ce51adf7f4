//! # Fetch Module
//!
//! Paginated listing retrieval on top of a bootstrapped session.
//!
//! - [`SearchTarget`] / [`ListingKind`] describe what to page through
//! - [`RateLimiter`] bounds request rate across concurrent fetches
//! - [`ApiTransport`] sends the signed API calls
//! - [`FetchOrchestrator`] runs the per-target state machine
//! - [`Scraper`] drives a list of targets and collects a [`RunReport`]

pub mod client;
pub mod orchestrator;
pub mod rate_limiter;
pub mod report;
pub mod scraper;
pub mod target;

pub use client::{ApiResponse, ApiTransport, HeaderList, ReqwestTransport, api_headers};
pub use orchestrator::{FetchConfig, FetchOrchestrator};
pub use rate_limiter::RateLimiter;
pub use report::{RunReport, TargetOutcome, TargetReport, TargetState};
pub use scraper::{ScrapeRun, Scraper};
pub use target::{ListingKind, SearchTarget, advertised_total, record_id};
