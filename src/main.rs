//! acres-scout command line
//!
//! # Usage
//!
//! ```bash
//! acres-scout scrape --config targets.toml --output results.json
//! acres-scout regenerate --token "$TOKEN" --url "https://host/api?page=2"
//! acres-scout inspect --token "$TOKEN"
//! ```

use clap::{Parser, Subcommand};

use acres_scout::cli::{
    self, InspectArgs, RegenerateArgs, ScrapeArgs, run_inspect, run_regenerate, run_scrape,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "acres-scout")]
struct Cli {
    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape listings for the configured search targets
    Scrape(ScrapeArgs),
    /// Mint a new signed token for a request URL from an existing token
    Regenerate(RegenerateArgs),
    /// Decode a token's header and payload
    Inspect(InspectArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Scrape(args) => run_scrape(args, cli.verbose).await,
        Command::Regenerate(args) => {
            cli::init_logging(cli.verbose, "warn");
            run_regenerate(&args)
        }
        Command::Inspect(args) => {
            cli::init_logging(cli.verbose, "warn");
            run_inspect(&args)
        }
    }
}
