//! Configuration loading.
//!
//! Configuration is layered, later sources overriding earlier ones:
//! - Bundled defaults (include_str! from tally.toml)
//! - User config in the home directory (~/.config/tally/tally.toml)
//! - User config in the current directory (./tally.toml)
//! - Environment variables such as `TALLY_CLIENT__CACHE_TTL_MS=900000`

use config::{Config, ConfigBuilder, Environment, File, FileFormat, Map, builder::DefaultState};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tally_core::ClientSettings;
use tally_provider::DEFAULT_SCOPE;
use tally_error::{ConfigError, TallyError, TallyResult};
use tracing::{debug, instrument};

const DEFAULT_CONFIG: &str = include_str!("../../../tally.toml");

const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/analytics/v3/data/ga";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Remote endpoints used by the HTTP provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct EndpointConfig {
    /// Reporting query endpoint
    #[serde(default = "default_api_base_url")]
    api_base_url: String,
    /// OAuth token endpoint for handshakes
    #[serde(default = "default_token_url")]
    token_url: String,
    /// Scope requested by service account assertions
    #[serde(default = "default_scope")]
    scope: String,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            token_url: default_token_url(),
            scope: default_scope(),
        }
    }
}

impl EndpointConfig {
    /// Endpoints pointing at custom URLs, e.g. a local test server.
    pub fn new(api_base_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            token_url: token_url.into(),
            scope: default_scope(),
        }
    }

    /// Request `scope` for service accounts.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

/// Complete tally configuration.
///
/// ```toml
/// [client]
/// cache_ttl_ms = 900000
/// concurrency_limit = 10
///
/// [endpoint]
/// token_url = "https://oauth2.googleapis.com/token"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Getters)]
pub struct TallyConfig {
    /// Executor settings
    #[serde(default)]
    client: ClientSettings,
    /// Provider endpoints
    #[serde(default)]
    endpoint: EndpointConfig,
}

impl TallyConfig {
    /// Assemble a configuration from parts.
    pub fn new(client: ClientSettings, endpoint: EndpointConfig) -> Self {
        Self { client, endpoint }
    }

    /// Load configuration from a single file layered over the bundled
    /// defaults, ignoring user config files and the environment.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> TallyResult<Self> {
        debug!("Loading configuration from file");
        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()));
        Self::finish(builder, &format!("read configuration from {}", path.as_ref().display()))
    }

    /// Load only the defaults bundled with the library.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the bundled defaults fail to parse.
    pub fn bundled() -> TallyResult<Self> {
        let builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));
        Self::finish(builder, "parse bundled configuration")
    }

    /// Load configuration with precedence:
    /// environment > current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and skipped if not found.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tally::TallyConfig;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = TallyConfig::load()?;
    /// println!("limit = {}", config.client().concurrency_limit());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument]
    pub fn load() -> TallyResult<Self> {
        Self::load_with_env(None)
    }

    /// Same layering as [`load`](Self::load), reading the environment layer
    /// from `vars` instead of the process environment when given.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any source fails to parse.
    #[instrument(skip(vars))]
    pub fn load_with_env(vars: Option<Map<String, String>>) -> TallyResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/tally/tally.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("tally").required(false))
            .add_source(
                Environment::with_prefix("TALLY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            );

        Self::finish(builder, "build configuration")
    }

    fn finish(builder: ConfigBuilder<DefaultState>, action: &str) -> TallyResult<Self> {
        let config: Self = builder
            .build()
            .map_err(|e| TallyError::from(ConfigError::new(format!("Failed to {}: {}", action, e))))?
            .try_deserialize()
            .map_err(|e| {
                TallyError::from(ConfigError::new(format!("Failed to parse configuration: {}", e)))
            })?;
        config.client.validate()?;
        Ok(config)
    }
}
