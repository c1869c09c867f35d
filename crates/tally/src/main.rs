//! Tally command-line entry point.

use clap::Parser;
use tally::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present; credentials usually come from there.
    let _ = dotenvy::dotenv();

    tally::init_tracing().map_err(|e| e as Box<dyn std::error::Error>)?;

    let cli = Cli::parse();
    tally::run(cli).await?;

    Ok(())
}
