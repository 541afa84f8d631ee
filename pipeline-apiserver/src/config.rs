use anyhow::Result;
use config::{builder::DefaultState, Config as ConfigLoader, ConfigBuilder, Environment, File};
use pipeline_api::observability::LogConfig;
use pipeline_core::MIN_SECRET_LEN;
use pipeline_storage::PostgresConfig;
use serde::Deserialize;

/// Signing secret used when none is configured. Tokens minted with it are
/// only fit for local development.
const DEVELOPMENT_PAGE_TOKEN_SECRET: &str = "pipeline-api-development-page-token-secret";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub storage: StorageBackend,
    pub database: PostgresConfig,
    pub page_token_secret: Option<String>,
    pub log: LogConfig,
}

impl Config {
    /// Layers `config/default`, `config/local` and `PIPELINE_API_*`
    /// environment variables, later sources winning. Nested keys use `__`,
    /// e.g. `PIPELINE_API_DATABASE__URL`.
    pub fn load() -> Result<Self> {
        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("PIPELINE_API")
                    .prefix_separator("_")
                    .separator("__"),
            );

        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Secret for signing page tokens. Falls back to a fixed development
    /// secret, with a warning, when the configured one is missing or short.
    pub fn page_token_secret(&self) -> String {
        match self.page_token_secret.as_deref() {
            Some(secret) if secret.len() >= MIN_SECRET_LEN => secret.to_string(),
            Some(_) => {
                tracing::warn!(
                    min_len = MIN_SECRET_LEN,
                    "page_token_secret is too short; using the development secret"
                );
                DEVELOPMENT_PAGE_TOKEN_SECRET.to_string()
            }
            None => {
                tracing::warn!("page_token_secret is not set; using the development secret");
                DEVELOPMENT_PAGE_TOKEN_SECRET.to_string()
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8888,
            storage: StorageBackend::default(),
            database: PostgresConfig::default(),
            page_token_secret: None,
            log: LogConfig::default(),
        }
    }
}
