//! # Fetch Orchestrator
//!
//! Drives one target through `Bootstrapping → Fetching → (Retrying ⇄ Fetching)
//! → Done | Aborted`.
//!
//! Pages go out in batches of `batch_size`. Every request takes a rate-limiter
//! permit and mints its own `apitoken` from the bootstrap token right before
//! it is sent. Pages that fail (bad status, transport error, token failure or
//! unparsable body) are resubmitted once after a fresh bootstrap; pages that
//! fail again are dropped. Pagination always advances by one batch stride.
//!
//! The target finishes when the collected records reach the advertised total,
//! when the page ceiling is hit, or when a clean batch returns nothing.

use futures_util::future::join_all;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use url::Url;

use super::client::{ApiTransport, api_headers};
use super::rate_limiter::RateLimiter;
use super::report::{TargetOutcome, TargetReport, TargetState};
use super::target::{SearchTarget, advertised_total, record_id};
use crate::config::Settings;
use crate::session::{SessionBootstrap, SessionContext};
use crate::token::{TokenGenerator, TokenRegenerator};
use crate::{Error, Result};

/// Pagination knobs for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub base_url: Url,
    pub batch_size: u32,
    pub page_size: u32,
    pub max_pages: u32,
    pub user_agent: String,
}

impl FetchConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(&settings.fetch.base_url)?,
            batch_size: settings.fetch.batch_size.max(1),
            page_size: settings.fetch.page_size.max(1),
            max_pages: settings.fetch.max_pages.max(1),
            user_agent: settings.http.user_agent.clone(),
        })
    }
}

/// Listings and total parsed from one successful page.
#[derive(Debug)]
struct PageData {
    records: Vec<Value>,
    total: Option<u64>,
}

/// Records collected for a target, deduplicated by listing id.
#[derive(Debug, Default)]
struct Collected {
    records: Vec<Value>,
    seen: HashSet<String>,
    total: Option<u64>,
}

impl Collected {
    /// Append a page's records; returns how many were new.
    fn absorb(&mut self, page: PageData) -> usize {
        if self.total.is_none() {
            self.total = page.total;
        }

        let before = self.records.len();
        for record in page.records {
            if let Some(id) = record_id(&record) {
                if !self.seen.insert(id) {
                    continue;
                }
            }
            self.records.push(record);
        }
        self.records.len() - before
    }

    fn reached_total(&self) -> bool {
        self.total
            .is_some_and(|total| self.records.len() as u64 >= total)
    }
}

/// Runs the per-target state machine.
#[derive(Clone)]
pub struct FetchOrchestrator {
    bootstrap: SessionBootstrap,
    transport: Arc<dyn ApiTransport>,
    limiter: Arc<RateLimiter>,
    regenerator: TokenRegenerator,
    config: FetchConfig,
}

impl FetchOrchestrator {
    /// Zero `batch_size`, `page_size` and `max_pages` are raised to one.
    ///
    /// Per-request tokens carry only the request claims; use
    /// [`with_generator`](Self::with_generator) to change that.
    pub fn new(
        bootstrap: SessionBootstrap,
        transport: Arc<dyn ApiTransport>,
        limiter: Arc<RateLimiter>,
        mut config: FetchConfig,
    ) -> Self {
        config.batch_size = config.batch_size.max(1);
        config.page_size = config.page_size.max(1);
        config.max_pages = config.max_pages.max(1);
        Self {
            bootstrap,
            transport,
            limiter,
            regenerator: TokenRegenerator::new(TokenGenerator::new(false)),
            config,
        }
    }

    /// Use a custom token generator for per-request tokens.
    pub fn with_generator(mut self, generator: TokenGenerator) -> Self {
        self.regenerator = TokenRegenerator::new(generator);
        self
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Scrape one target to a terminal state.
    ///
    /// Never fails as a whole: errors end in [`TargetState::Aborted`] or as
    /// dropped pages, and everything collected so far is returned.
    pub async fn run(&self, target: &SearchTarget, interrupt: &AtomicBool) -> TargetOutcome {
        let mut report = TargetReport::new(target.name());
        let mut collected = Collected::default();

        info!(search = %target, state = %report.state, "Starting target");

        let mut session = match self.bootstrap.bootstrap(target.page_url(), interrupt).await {
            Ok(session) => session,
            Err(e) => {
                interrupted(interrupt, &mut report, target);
                warn!(search = %target, error = %e, "Bootstrap failed, skipping target");
                report.abort_reason = Some(e.to_string());
                transition(&mut report, TargetState::Aborted, target);
                return finish(report, collected);
            }
        };

        let mut page = 1u32;
        loop {
            if interrupted(interrupt, &mut report, target) {
                transition(&mut report, TargetState::Done, target);
                break;
            }
            if page > self.config.max_pages {
                info!(search = %target, max_pages = self.config.max_pages, "Page ceiling reached");
                transition(&mut report, TargetState::Done, target);
                break;
            }

            transition(&mut report, TargetState::Fetching, target);
            let last = page
                .saturating_add(self.config.batch_size - 1)
                .min(self.config.max_pages);
            let pages: Vec<u32> = (page..=last).collect();
            debug!(search = %target, ?pages, "Fetching batch");

            let mut batch_records = 0usize;
            let mut failed = Vec::new();
            for (page_no, result) in self.fetch_batch(target, &session, &pages).await {
                match result {
                    Ok(data) => {
                        report.pages_succeeded += 1;
                        batch_records += data.records.len();
                        collected.absorb(data);
                    }
                    Err(e) => {
                        warn!(
                            search = %target,
                            page = page_no,
                            network = e.is_network(),
                            error = %e,
                            "Page failed"
                        );
                        failed.push(page_no);
                    }
                }
            }

            if !failed.is_empty() {
                if interrupted(interrupt, &mut report, target) {
                    report.pages_dropped += failed.len() as u32;
                    transition(&mut report, TargetState::Done, target);
                    break;
                }

                transition(&mut report, TargetState::Retrying, target);
                info!(search = %target, pages = ?failed, "Re-bootstrapping for failed pages");

                session = match self.bootstrap.bootstrap(target.page_url(), interrupt).await {
                    Ok(fresh) => fresh,
                    Err(_) if interrupted(interrupt, &mut report, target) => {
                        report.pages_dropped += failed.len() as u32;
                        transition(&mut report, TargetState::Done, target);
                        break;
                    }
                    Err(e) => {
                        warn!(
                            search = %target,
                            pages = ?failed,
                            error = %e,
                            "Re-bootstrap failed, dropping pages"
                        );
                        report.pages_dropped += failed.len() as u32;
                        report.abort_reason = Some(e.to_string());
                        transition(&mut report, TargetState::Aborted, target);
                        break;
                    }
                };

                for (page_no, result) in self.fetch_batch(target, &session, &failed).await {
                    match result {
                        Ok(data) => {
                            report.pages_succeeded += 1;
                            batch_records += data.records.len();
                            collected.absorb(data);
                        }
                        Err(e) => {
                            warn!(
                                search = %target,
                                page = page_no,
                                network = e.is_network(),
                                error = %e,
                                "Retry failed, dropping page"
                            );
                            report.pages_dropped += 1;
                        }
                    }
                }
            }

            page = page.saturating_add(self.config.batch_size);
            info!(
                search = %target,
                records = collected.records.len(),
                total = ?collected.total,
                "Batch complete"
            );

            if collected.reached_total() {
                transition(&mut report, TargetState::Done, target);
                break;
            }
            if failed.is_empty() && batch_records == 0 {
                info!(search = %target, "Listing exhausted");
                transition(&mut report, TargetState::Done, target);
                break;
            }
        }

        finish(report, collected)
    }

    async fn fetch_batch(
        &self,
        target: &SearchTarget,
        session: &SessionContext,
        pages: &[u32],
    ) -> Vec<(u32, Result<PageData>)> {
        join_all(
            pages
                .iter()
                .map(|&page| async move { (page, self.fetch_page(target, session, page).await) }),
        )
        .await
    }

    async fn fetch_page(
        &self,
        target: &SearchTarget,
        session: &SessionContext,
        page: u32,
    ) -> Result<PageData> {
        self.limiter.acquire().await;

        let url = target.api_url(
            &self.config.base_url,
            page,
            self.config.page_size,
            session.encrypted_input(),
        )?;
        let api_token = self.regenerator.regenerate(session.token(), &url, "")?;
        let headers = api_headers(
            &self.config.user_agent,
            target.kind().page_name(),
            api_token.as_str(),
            session.token(),
            target.page_url(),
        );

        let response = self.transport.get(&url, &headers, session.cookies()).await?;
        debug!(search = %target, page, status = response.status, "API response");
        if !response.is_success() {
            return Err(Error::network(
                Some(response.status),
                format!("page {} returned HTTP {}", page, response.status),
            ));
        }

        let body = response.json()?;
        let records = target.kind().extract_records(&body)?;
        Ok(PageData {
            records,
            total: advertised_total(&body),
        })
    }
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("bootstrap", &self.bootstrap)
            .field("limiter", &self.limiter)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn interrupted(interrupt: &AtomicBool, report: &mut TargetReport, target: &SearchTarget) -> bool {
    if interrupt.load(Ordering::SeqCst) {
        if !report.interrupted {
            warn!(search = %target, "Interrupted, not launching further requests");
        }
        report.interrupted = true;
    }
    report.interrupted
}

fn transition(report: &mut TargetReport, next: TargetState, target: &SearchTarget) {
    if report.state != next {
        debug!(search = %target, from = %report.state, to = %next, "State change");
        report.state = next;
    }
}

fn finish(mut report: TargetReport, collected: Collected) -> TargetOutcome {
    report.records = collected.records.len();
    report.advertised_total = collected.total;
    info!(report = %report, "Target finished");
    TargetOutcome {
        report,
        records: collected.records,
    }
}
