//! CLI command logic
//!
//! Argument types and the handlers behind each `acres-scout` subcommand.

pub mod scrape;
pub mod token;

pub use scrape::{ScrapeArgs, run_scrape};
pub use token::{InspectArgs, RegenerateArgs, run_inspect, run_regenerate};

use tracing::Dispatch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Stderr subscriber; `RUST_LOG` overrides the chosen level.
pub fn log_dispatch(verbose: bool, default_level: &str) -> Dispatch {
    let level = if verbose { "debug" } else { default_level };
    Dispatch::new(
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| level.into()),
            )
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
    )
}

/// Install [`log_dispatch`] as the global subscriber.
pub fn init_logging(verbose: bool, default_level: &str) {
    // try_init: a subscriber may already be installed when run from tests
    let _ = log_dispatch(verbose, default_level).try_init();
}
