//! Connection settings
//!
//! [`DatabaseConfig`] is read from the `database` section of
//! `config/quarry.toml`, overlaid with `QUARRY__DATABASE__*` environment
//! variables. Missing keys fall back to an in-memory SQLite database.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::mapper::DEFAULT_MAX_RELATION_DEPTH;
use crate::query::{MySqlDialect, PostgresDialect, SqlDialect, SqliteDialect};
use crate::transaction::IsolationLevel;

const CONFIG_FILE: &str = "config/quarry.toml";
const ENV_PREFIX: &str = "QUARRY";

/// Database backend selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Postgres,
    Mysql,
    #[default]
    Sqlite,
}

impl Backend {
    pub fn dialect(self) -> &'static dyn SqlDialect {
        match self {
            Backend::Postgres => &PostgresDialect,
            Backend::Mysql => &MySqlDialect,
            Backend::Sqlite => &SqliteDialect,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_url")]
    pub url: String,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_max_relation_depth")]
    pub max_relation_depth: usize,
    /// Isolation used by `DbClient::execute_transaction_default`
    #[serde(default)]
    pub isolation: IsolationLevel,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: default_db_url(),
            backend: Backend::default(),
            max_relation_depth: default_max_relation_depth(),
            isolation: IsolationLevel::default(),
        }
    }
}

fn default_db_url() -> String {
    ":memory:".to_string()
}

fn default_max_relation_depth() -> usize {
    DEFAULT_MAX_RELATION_DEPTH
}

impl DatabaseConfig {
    /// Load the `database` section from `config/quarry.toml`, overlaid with
    /// `QUARRY__DATABASE__*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // The file exists but cannot be read or parsed: retry with env only
                log::warn!("failed to load {CONFIG_FILE}, falling back to env: {err}");
                Config::builder()
                    .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "failed to load configuration from file ({err}) and env ({env_err})"
                        ))
                    })?
            }
        };

        Self::from_config(&settings)
    }

    /// Read the `database` section of an already built configuration.
    ///
    /// A missing section yields the defaults.
    pub fn from_config(settings: &Config) -> Result<Self, ConfigError> {
        match settings.get::<DatabaseConfig>("database") {
            Ok(db) => Ok(db),
            Err(ConfigError::NotFound(_)) => Ok(DatabaseConfig::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "database configuration is invalid: {e}"
            ))),
        }
    }

    pub fn dialect(&self) -> &'static dyn SqlDialect {
        self.backend.dialect()
    }
}
