//! Scrape mode CLI logic
//!
//! Loads configuration, resolves targets, runs the scraper with a Ctrl-C
//! interrupt and writes the collected records.

use anyhow::{Context, Result, bail};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use crate::config::{ConfigLoader, Settings};
use crate::fetch::{ListingKind, Scraper, SearchTarget};

/// Arguments for `scrape`
#[derive(Debug, Args)]
pub struct ScrapeArgs {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Results file, overrides `output.path`
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Only scrape configured targets with these names
    #[arg(short, long = "target", value_name = "NAME")]
    pub targets: Vec<String>,

    /// Ad-hoc search page URL to scrape (repeatable)
    #[arg(short, long = "url", value_name = "URL")]
    pub urls: Vec<String>,

    /// Listing kind for `--url` targets
    #[arg(short, long, value_enum, default_value_t = KindArg::Rent)]
    pub kind: KindArg,

    /// Override `fetch.max_pages`
    #[arg(long, value_name = "PAGES")]
    pub max_pages: Option<u32>,
}

/// Listing kind as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum KindArg {
    Rent,
    Resale,
    Projects,
}

impl From<KindArg> for ListingKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Rent => ListingKind::Rent,
            KindArg::Resale => ListingKind::Resale,
            KindArg::Projects => ListingKind::Projects,
        }
    }
}

/// Load settings and apply CLI overrides on top.
pub fn load_settings(args: &ScrapeArgs) -> Result<Settings> {
    let mut settings = ConfigLoader::new()
        .load(args.config.as_deref())
        .context("Failed to load configuration")?;

    if let Some(output) = &args.output {
        settings.output.path = output.clone();
    }
    if let Some(max_pages) = args.max_pages {
        settings.fetch.max_pages = max_pages;
    }
    settings.validate()?;
    Ok(settings)
}

/// Configured targets filtered by `--target`, followed by `--url` targets.
pub fn resolve_targets(settings: &Settings, args: &ScrapeArgs) -> Result<Vec<SearchTarget>> {
    let mut targets = Vec::new();

    for configured in &settings.targets {
        let target = SearchTarget::from_settings(configured)?;
        if args.targets.is_empty() || args.targets.iter().any(|n| n == target.name()) {
            targets.push(target);
        }
    }

    for name in &args.targets {
        if !targets.iter().any(|t| t.name() == name) {
            warn!("No configured target named {:?}", name);
        }
    }

    for url in &args.urls {
        targets.push(SearchTarget::new(url, args.kind.into())?);
    }

    if targets.is_empty() {
        bail!("No targets to scrape; add [[targets]] to the config or pass --url");
    }
    Ok(targets)
}

/// Run scrape mode with the given arguments
pub async fn run_scrape(args: ScrapeArgs, verbose: bool) -> Result<()> {
    // the configured level is unknown until loaded, so loading logs at info
    let dispatch = super::log_dispatch(verbose, "info");
    let settings = tracing::dispatcher::with_default(&dispatch, || load_settings(&args))?;
    super::init_logging(
        verbose || settings.logging.verbose,
        &settings.logging.level,
    );
    info!("Starting acres-scout v{}", env!("CARGO_PKG_VERSION"));

    let targets = resolve_targets(&settings, &args)?;
    let scraper = Scraper::from_settings(&settings)?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, letting in-flight requests finish");
            interrupted_signal.store(true, Ordering::SeqCst);
        }
    });

    let run = scraper.run(&targets, &interrupted).await;
    run.write_json(&settings.output.path)
        .with_context(|| format!("Failed to write {:?}", settings.output.path))?;

    println!("{}", run.report);
    Ok(())
}
