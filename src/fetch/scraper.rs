//! Run driver over many targets
//!
//! Builds the collaborators from [`Settings`] once, then walks the targets in
//! order with a shared HTTP client and rate limiter.

use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use super::client::{ReqwestTransport, build_http_client};
use super::orchestrator::{FetchConfig, FetchOrchestrator};
use super::rate_limiter::RateLimiter;
use super::report::RunReport;
use super::target::SearchTarget;
use crate::Result;
use crate::config::Settings;
use crate::session::{HttpPageRenderer, RetryPolicy, SessionBootstrap};
use crate::token::TokenGenerator;

/// Records grouped by target name plus the run report.
#[derive(Debug, Clone)]
pub struct ScrapeRun {
    pub report: RunReport,
    pub results: BTreeMap<String, Vec<Value>>,
}

impl ScrapeRun {
    /// Write `{ target_name: [records…] }` as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.results)?;
        std::fs::write(path, json)?;
        info!("Wrote {} record(s) to {:?}", self.report.total_records(), path);
        Ok(())
    }
}

/// Scrapes a list of targets sequentially.
#[derive(Debug, Clone)]
pub struct Scraper {
    orchestrator: FetchOrchestrator,
}

impl Scraper {
    pub fn new(orchestrator: FetchOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Wire the HTTP renderer and transport from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = build_http_client(&settings.http)?;
        let renderer = HttpPageRenderer::new(client.clone(), settings.session.auth_path.clone());
        let bootstrap = SessionBootstrap::new(
            Arc::new(renderer),
            RetryPolicy::from_settings(&settings.session),
        );
        let limiter = Arc::new(RateLimiter::new(
            settings.fetch.rate_limit_permits,
            settings.fetch.rate_limit_window(),
        ));

        let orchestrator = FetchOrchestrator::new(
            bootstrap,
            Arc::new(ReqwestTransport::new(client)),
            limiter,
            FetchConfig::from_settings(settings)?,
        )
        .with_generator(TokenGenerator::new(settings.token.embed_secret_material));

        Ok(Self::new(orchestrator))
    }

    /// Run every target; a failing target never stops the others.
    ///
    /// Targets sharing a name have their records merged.
    pub async fn run(&self, targets: &[SearchTarget], interrupt: &AtomicBool) -> ScrapeRun {
        let started_at = Utc::now();
        let mut reports = Vec::with_capacity(targets.len());
        let mut results: BTreeMap<String, Vec<Value>> = BTreeMap::new();

        for (index, target) in targets.iter().enumerate() {
            if interrupt.load(Ordering::SeqCst) {
                warn!(
                    skipped = targets.len() - index,
                    "Interrupted, skipping remaining targets"
                );
                break;
            }

            info!("Target {}/{}: {}", index + 1, targets.len(), target);
            let outcome = self.orchestrator.run(target, interrupt).await;
            results
                .entry(target.name().to_string())
                .or_default()
                .extend(outcome.records);
            reports.push(outcome.report);
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            targets: reports,
        };
        info!(
            targets = report.targets.len(),
            records = report.total_records(),
            dropped = report.total_pages_dropped(),
            "Run complete"
        );

        ScrapeRun { report, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_default_settings() {
        assert!(Scraper::from_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn test_write_json_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("results.json");
        let now = Utc::now();
        let run = ScrapeRun {
            report: RunReport {
                started_at: now,
                finished_at: now,
                targets: Vec::new(),
            },
            results: BTreeMap::from([(
                "pune".to_string(),
                vec![serde_json::json!({"PROP_ID": "1"})],
            )]),
        };

        run.write_json(&path).unwrap();
        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["pune"][0]["PROP_ID"], "1");
    }

    #[tokio::test]
    async fn test_interrupt_before_start_runs_nothing() {
        let scraper = Scraper::from_settings(&Settings::default()).unwrap();
        let target = SearchTarget::new(
            "https://www.example.com/search/property/rent/pune?city=19",
            crate::fetch::ListingKind::Rent,
        )
        .unwrap();

        let run = scraper.run(&[target], &AtomicBool::new(true)).await;
        assert!(run.report.targets.is_empty());
        assert!(run.results.is_empty());
    }
}
