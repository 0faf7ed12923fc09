use std::env;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "kiosk.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Seconds to wait for a pool connection before giving up.
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: "sqlite://kiosk.db".to_string(), max_connections: 5, acquire_timeout_secs: 30 }
    }
}

/// Connection settings for the intent classification model.
#[derive(Clone, Debug)]
pub struct OracleConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            model: "gemini-2.0-flash".to_string(),
            timeout_secs: 20,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatConfig {
    /// Sender id allowed to issue `!` side-channel commands.
    pub admin_id: Option<String>,
    pub command_prefix: String,
    pub negotiation_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    /// Products shown per catalog reply.
    pub catalog_limit: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            admin_id: None,
            command_prefix: "!".to_string(),
            negotiation_timeout_secs: 1_800,
            sweep_interval_secs: 300,
            catalog_limit: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BusinessConfig {
    pub name: String,
    pub support_phone: String,
    pub support_email: String,
    pub currency_symbol: String,
    pub free_delivery_minimum: i64,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            name: "Kiosk Store".to_string(),
            support_phone: "+234 800 000 0000".to_string(),
            support_email: "support@kiosk.example".to_string(),
            currency_symbol: "₦".to_string(),
            free_delivery_minimum: 100_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080 }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string(), format: LogFormat::Pretty }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub oracle: OracleConfig,
    pub chat: ChatConfig,
    pub business: BusinessConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Partial config as deserialized from TOML. Absent fields keep defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    oracle: Option<OraclePatch>,
    chat: Option<ChatPatch>,
    business: Option<BusinessPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    acquire_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OraclePatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChatPatch {
    admin_id: Option<String>,
    command_prefix: Option<String>,
    negotiation_timeout_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
    catalog_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BusinessPatch {
    name: Option<String>,
    support_phone: Option<String>,
    support_email: Option<String>,
    currency_symbol: Option<String>,
    free_delivery_minimum: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerPatch {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    filter: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    /// Loads configuration in three layers: built-in defaults, the TOML
    /// file if present, then `KIOSK_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        match std::fs::read_to_string(&path) {
            Ok(raw) => {
                let patch: ConfigPatch = toml::from_str(&raw)
                    .map_err(|source| ConfigError::Parse { path: path.clone(), source })?;
                config.apply_patch(patch);
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(ConfigError::Read { path, source }),
        }

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(acquire_timeout) = database.acquire_timeout_secs {
                self.database.acquire_timeout_secs = acquire_timeout;
            }
        }
        if let Some(oracle) = patch.oracle {
            if let Some(api_key) = oracle.api_key {
                self.oracle.api_key = Some(SecretString::from(api_key));
            }
            if let Some(base_url) = oracle.base_url {
                self.oracle.base_url = base_url;
            }
            if let Some(model) = oracle.model {
                self.oracle.model = model;
            }
            if let Some(timeout_secs) = oracle.timeout_secs {
                self.oracle.timeout_secs = timeout_secs;
            }
        }
        if let Some(chat) = patch.chat {
            if let Some(admin_id) = chat.admin_id {
                self.chat.admin_id = Some(admin_id);
            }
            if let Some(command_prefix) = chat.command_prefix {
                self.chat.command_prefix = command_prefix;
            }
            if let Some(timeout) = chat.negotiation_timeout_secs {
                self.chat.negotiation_timeout_secs = timeout;
            }
            if let Some(interval) = chat.sweep_interval_secs {
                self.chat.sweep_interval_secs = interval;
            }
            if let Some(limit) = chat.catalog_limit {
                self.chat.catalog_limit = limit;
            }
        }
        if let Some(business) = patch.business {
            if let Some(name) = business.name {
                self.business.name = name;
            }
            if let Some(phone) = business.support_phone {
                self.business.support_phone = phone;
            }
            if let Some(email) = business.support_email {
                self.business.support_email = email;
            }
            if let Some(symbol) = business.currency_symbol {
                self.business.currency_symbol = symbol;
            }
            if let Some(minimum) = business.free_delivery_minimum {
                self.business.free_delivery_minimum = minimum;
            }
        }
        if let Some(server) = patch.server {
            if let Some(host) = server.host {
                self.server.host = host;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }
        if let Some(logging) = patch.logging {
            if let Some(filter) = logging.filter {
                self.logging.filter = filter;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(url) = env::var("KIOSK_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(api_key) = env::var("KIOSK_ORACLE_API_KEY") {
            self.oracle.api_key = Some(SecretString::from(api_key));
        }
        if let Ok(base_url) = env::var("KIOSK_ORACLE_BASE_URL") {
            self.oracle.base_url = base_url;
        }
        if let Ok(model) = env::var("KIOSK_ORACLE_MODEL") {
            self.oracle.model = model;
        }
        if let Ok(admin_id) = env::var("KIOSK_ADMIN_ID") {
            self.chat.admin_id = Some(admin_id);
        }
        if let Ok(filter) = env::var("KIOSK_LOG_FILTER") {
            self.logging.filter = filter;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.chat.negotiation_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "chat.negotiation_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.chat.command_prefix.is_empty() {
            return Err(ConfigError::Invalid("chat.command_prefix must not be empty".to_string()));
        }
        if self.business.free_delivery_minimum < 0 {
            return Err(ConfigError::Invalid(
                "business.free_delivery_minimum must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use secrecy::ExposeSecret;

    use super::{AppConfig, LogFormat};

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn defaults_when_file_is_absent() {
        let config =
            AppConfig::load(Some(std::path::Path::new("/nonexistent/kiosk.toml"))).expect("load");
        assert_eq!(config.database.url, "sqlite://kiosk.db");
        assert_eq!(config.chat.negotiation_timeout_secs, 1_800);
        assert_eq!(config.business.currency_symbol, "₦");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn file_values_override_defaults() {
        let file = write_config(
            r#"
            [database]
            url = "sqlite:///tmp/test.db"
            acquire_timeout_secs = 10

            [oracle]
            api_key = "test-key"
            model = "gemini-2.5-flash"

            [chat]
            admin_id = "2348099999999"
            negotiation_timeout_secs = 600

            [logging]
            format = "json"
            "#,
        );

        let config = AppConfig::load(Some(file.path())).expect("load");
        assert_eq!(config.database.url, "sqlite:///tmp/test.db");
        assert_eq!(config.database.acquire_timeout_secs, 10);
        assert_eq!(config.oracle.model, "gemini-2.5-flash");
        assert_eq!(
            config.oracle.api_key.as_ref().map(|key| key.expose_secret().to_string()),
            Some("test-key".to_string())
        );
        assert_eq!(config.chat.admin_id.as_deref(), Some("2348099999999"));
        assert_eq!(config.chat.negotiation_timeout_secs, 600);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = write_config("[chat]\ntime_out = 5\n");
        assert!(AppConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let file = write_config("[chat]\nnegotiation_timeout_secs = 0\n");
        let error = AppConfig::load(Some(file.path())).expect_err("invalid");
        assert!(error.to_string().contains("negotiation_timeout_secs"));
    }
}
