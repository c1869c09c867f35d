//! Command-line interface.

use crate::{Client, TallyConfig};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tally_core::{Credentials, QueryRequest};
use tally_error::{ConfigError, JsonError, TallyResult};
use tracing::info;

/// Run reporting queries from the command line.
#[derive(Debug, Parser)]
#[command(name = "tally", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file to use instead of the layered defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one reporting query and print the JSON response
    Query(QueryArgs),
}

/// Arguments of `tally query`.
#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    /// Resource (profile/view) identifier, e.g. ga:123456
    #[arg(long)]
    pub resource_id: String,

    /// First day of the reporting window (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: String,

    /// Last day of the reporting window (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: String,

    /// Comma-separated metric names
    #[arg(long)]
    pub metrics: String,

    /// Filter expression
    #[arg(long)]
    pub filters: Option<String>,

    /// Comma-separated dimension names
    #[arg(long)]
    pub dimensions: Option<String>,

    /// Row cap
    #[arg(long)]
    pub max_results: Option<u32>,

    /// Sort expression
    #[arg(long)]
    pub sort: Option<String>,

    /// Override the configured cache lifetime (milliseconds, 0 disables)
    #[arg(long)]
    pub cache_ttl_ms: Option<u64>,

    /// Service account email (optional with a JSON key file)
    #[arg(long, env = "TALLY_SERVICE_ACCOUNT_EMAIL")]
    pub email: Option<String>,

    /// Service account private key: a PEM file or a JSON key file
    #[arg(long, env = "TALLY_SERVICE_ACCOUNT_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// OAuth client identifier, used when no key file is given
    #[arg(long, env = "TALLY_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, env = "TALLY_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// OAuth refresh token
    #[arg(long, env = "TALLY_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Pretty-print the response
    #[arg(long)]
    pub pretty: bool,
}

impl QueryArgs {
    /// Credentials described by these arguments.
    ///
    /// A key file selects a service account; otherwise an OAuth client id is
    /// required.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no credentials were given or the key
    /// file cannot be used.
    pub fn credentials(&self) -> TallyResult<Credentials> {
        if let Some(path) = &self.key_file {
            return service_account(self.email.as_deref(), path);
        }
        match &self.client_id {
            Some(client_id) => Ok(Credentials::OAuthClient {
                client_id: client_id.clone(),
                client_secret: self.client_secret.clone(),
                refresh_token: self.refresh_token.clone(),
            }),
            None => Err(ConfigError::new(
                "No credentials: pass --key-file for a service account or --client-id",
            )
            .into()),
        }
    }

    /// Query request described by these arguments.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the credentials are unusable.
    pub fn to_request(&self) -> TallyResult<QueryRequest> {
        Ok(QueryRequest {
            credentials: self.credentials()?,
            resource_id: self.resource_id.clone(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            metrics: self.metrics.clone(),
            filters: self.filters.clone(),
            dimensions: self.dimensions.clone(),
            max_results: self.max_results,
            sort: self.sort.clone(),
        })
    }

    /// Apply command-line overrides to a loaded configuration.
    pub fn apply(&self, config: TallyConfig) -> TallyConfig {
        match self.cache_ttl_ms {
            Some(ttl) => TallyConfig::new(
                config.client().clone().with_cache_ttl_ms(ttl),
                config.endpoint().clone(),
            ),
            None => config,
        }
    }
}

/// Execute a parsed command line.
///
/// # Errors
///
/// Returns configuration, validation and provider errors unchanged.
pub async fn run(cli: Cli) -> TallyResult<()> {
    let config = match &cli.config {
        Some(path) => TallyConfig::from_file(path)?,
        None => TallyConfig::load()?,
    };

    match cli.command {
        Commands::Query(args) => {
            let client = Client::from_config(&args.apply(config))?;
            let report = client.query(&args.to_request()?).await?;
            info!(resource_id = %args.resource_id, "Query complete");

            let output = if args.pretty {
                serde_json::to_string_pretty(&report)
            } else {
                serde_json::to_string(&report)
            }
            .map_err(|e| JsonError::new(format!("Failed to serialize response: {}", e)))?;
            println!("{}", output);
        }
    }

    Ok(())
}

/// Fields of a downloaded service account JSON key file.
#[derive(Debug, Deserialize)]
struct KeyFile {
    client_email: String,
    private_key: String,
}

fn service_account(email: Option<&str>, path: &Path) -> TallyResult<Credentials> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::new(format!("Failed to read key file {}: {}", path.display(), e))
    })?;

    if contents.trim_start().starts_with('{') {
        let key_file: KeyFile = serde_json::from_str(&contents).map_err(|e| {
            ConfigError::new(format!("Invalid key file {}: {}", path.display(), e))
        })?;
        return Ok(Credentials::ServiceAccount {
            email: email.map(str::to_string).unwrap_or(key_file.client_email),
            key: key_file.private_key,
        });
    }

    let email = email.ok_or_else(|| ConfigError::new("--email is required with a PEM key file"))?;
    Ok(Credentials::ServiceAccount {
        email: email.to_string(),
        key: contents,
    })
}
