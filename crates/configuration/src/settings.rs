use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
}

/// Parameters for the HTTP listener.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// The interface to bind, e.g. "0.0.0.0".
    pub host: IpAddr,
    pub port: u16,
    /// The single browser origin allowed to call the API with credentials.
    pub cors_origin: String,
    /// Upper bound on the time spent producing one response.
    pub request_timeout_secs: u64,
    /// How long a client may take to send a complete request head.
    pub read_timeout_secs: u64,
    /// How long a keep-alive connection may sit without a request in flight.
    pub idle_timeout_secs: u64,
}

/// Parameters for the analytical database connection pool.
#[derive(Clone, Deserialize)]
pub struct DatabaseSettings {
    /// The connection string. It carries the access credential.
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Log every statement and its bound arguments before execution.
    pub log_queries: bool,
    /// Row cap applied to every series query. 0 means unlimited.
    pub max_rows: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive, used when `RUST_LOG` is not set.
    pub level: String,
}

impl Settings {
    /// Builds the layered configuration from a file path and an environment
    /// snapshot. The file is optional.
    pub fn load(file: &Path, env: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env.get("PORT").filter(|p| !p.is_empty()).cloned();
        let url = env.get("DATABASE_URL").filter(|u| !u.is_empty()).cloned();
        let cors_origin = env.get("CORS_ORIGIN").filter(|o| !o.is_empty()).cloned();

        let builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.cors_origin", "http://localhost:5173")?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("server.read_timeout_secs", 10)?
            .set_default("server.idle_timeout_secs", 60)?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 10)?
            .set_default("database.acquire_timeout_secs", 5)?
            .set_default("database.log_queries", false)?
            .set_default("database.max_rows", 0)?
            .set_default("logging.level", "info")?
            .add_source(config::File::from(file).required(false))
            .add_source(
                config::Environment::with_prefix("FRED")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env.into_iter().collect())),
            )
            .set_override_option("server.port", port)?
            .set_override_option("database.url", url)?
            .set_override_option("server.cors_origin", cors_origin)?
            .build()?;

        let settings = builder.try_deserialize::<Settings>()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "DATABASE_URL must be set.".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be non-zero.".to_string(),
            ));
        }
        if self.server.read_timeout_secs == 0 || self.server.idle_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "server read and idle timeouts must be non-zero.".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be at least 1.".to_string(),
            ));
        }
        Ok(())
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl DatabaseSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

// The URL embeds the access token, so it never reaches the logs.
impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("log_queries", &self.log_queries)
            .field("max_rows", &self.max_rows)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn no_file() -> &'static Path {
        Path::new("does-not-exist.toml")
    }

    #[test]
    fn defaults_apply_when_only_the_credential_is_set() {
        let settings =
            Settings::load(no_file(), env(&[("DATABASE_URL", "postgres://localhost/fred")])).unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.cors_origin, "http://localhost:5173");
        assert_eq!(settings.server.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.server.read_timeout(), Duration::from_secs(10));
        assert_eq!(settings.server.idle_timeout(), Duration::from_secs(60));
        assert_eq!(settings.database.max_connections, 10);
        assert_eq!(settings.database.max_rows, 0);
        assert!(!settings.database.log_queries);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn missing_credential_is_a_validation_error() {
        let err = Settings::load(no_file(), env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));

        let err = Settings::load(no_file(), env(&[("DATABASE_URL", "")])).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn plain_port_variable_overrides_default() {
        let settings = Settings::load(
            no_file(),
            env(&[("DATABASE_URL", "postgres://db/fred"), ("PORT", "9090")]),
        )
        .unwrap();
        assert_eq!(settings.server.port, 9090);
    }

    #[test]
    fn prefixed_variables_reach_nested_sections() {
        let settings = Settings::load(
            no_file(),
            env(&[
                ("DATABASE_URL", "postgres://db/fred"),
                ("FRED__DATABASE__MAX_ROWS", "500"),
                ("FRED__DATABASE__LOG_QUERIES", "true"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.database.max_rows, 500);
        assert!(settings.database.log_queries);
    }

    #[test]
    fn file_values_sit_between_defaults_and_environment() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 7070\ncors_origin = \"https://fred.example\"\n\n[database]\nurl = \"postgres://file/fred\""
        )
        .unwrap();

        let settings = Settings::load(file.path(), env(&[("PORT", "7171")])).unwrap();
        assert_eq!(settings.server.port, 7171);
        assert_eq!(settings.server.cors_origin, "https://fred.example");
        assert_eq!(settings.database.url, "postgres://file/fred");
    }

    #[test]
    fn debug_output_redacts_the_credential() {
        let settings = Settings::load(
            no_file(),
            env(&[("DATABASE_URL", "postgres://user:secret@db/fred")]),
        )
        .unwrap();
        let rendered = format!("{:?}", settings.database);
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn connection_timeouts_can_be_tuned_but_not_disabled() {
        let settings = Settings::load(
            no_file(),
            env(&[
                ("DATABASE_URL", "postgres://db/fred"),
                ("FRED__SERVER__READ_TIMEOUT_SECS", "3"),
                ("FRED__SERVER__IDLE_TIMEOUT_SECS", "15"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.server.read_timeout(), Duration::from_secs(3));
        assert_eq!(settings.server.idle_timeout(), Duration::from_secs(15));

        let err = Settings::load(
            no_file(),
            env(&[
                ("DATABASE_URL", "postgres://db/fred"),
                ("FRED__SERVER__IDLE_TIMEOUT_SECS", "0"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
