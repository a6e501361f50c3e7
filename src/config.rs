use serde::Deserialize;

use crate::models::common::{Amount, Price};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub oracle: OracleConfig,
    pub issuance: IssuanceConfig,
    #[serde(default)]
    pub sweeper: SweeperConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    // Without a URL the ledger runs in-process only
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleSource {
    Fixed,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    pub source: OracleSource,
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub http_base_url: Option<String>,
    pub fixed_reference_price: Price,
    pub fixed_storage_price: Price,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuanceConfig {
    pub min_credits: i64,
    pub max_credits: i64,
    // Cap on outstanding locked-price liability across active contracts
    #[serde(default)]
    pub exposure_cap: Option<Amount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for environment variable overrides)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(
                config::Environment::with_prefix("GASFUTURES")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
