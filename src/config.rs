use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;
const DATABASE_FILE: &str = "scrum_board.db";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("PORT must be a number between 1 and 65535, got '{0}'")]
    InvalidPort(String),

    #[error("HOST must be an IP address, got '{0}'")]
    InvalidHost(String),

    #[error("DB_MAX_CONNECTIONS must be a positive number, got '{0}'")]
    InvalidMaxConnections(String),

    #[error("APP_ENV must be 'development' or 'production', got '{0}'")]
    InvalidEnvironment(String),
}

/// Development runs keep the database next to the working directory and log
/// verbosely; packaged runs use the per-user data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" | "" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidEnvironment(value.to_owned())),
        }
    }

    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub environment: Environment,
    pub host: IpAddr,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    /// Read configuration from the process environment, after `.env` has
    /// been loaded.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV") {
            Some(value) => Environment::parse(&value)?,
            None => Environment::Production,
        };

        let host = match lookup("HOST") {
            Some(value) => value
                .trim()
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidHost(value))?,
            None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };

        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .ok_or(ConfigError::InvalidPort(value))?,
            None => DEFAULT_PORT,
        };

        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or(ConfigError::InvalidMaxConnections(value))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| default_database_path(environment).to_string_lossy().into_owned());

        Ok(Config {
            environment,
            host,
            port,
            database_url,
            max_connections,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn default_database_path(environment: Environment) -> PathBuf {
    match environment {
        Environment::Development => PathBuf::from(DATABASE_FILE),
        Environment::Production => dirs::data_dir()
            .map(|dir| dir.join("scrum-board"))
            .or_else(|| dirs::home_dir().map(|home| home.join(".scrum-board")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DATABASE_FILE),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.listen_addr().to_string(), "127.0.0.1:5000");
        assert!(config.database_url.ends_with(DATABASE_FILE));
    }

    #[test]
    fn development_keeps_database_local() {
        let config = config_from(&[("APP_ENV", "development")]).unwrap();
        assert!(config.environment.is_development());
        assert_eq!(config.database_url, DATABASE_FILE);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            ("APP_ENV", "dev"),
            ("HOST", "0.0.0.0"),
            ("PORT", "8088"),
            ("DATABASE_URL", "/tmp/boards.db"),
            ("DB_MAX_CONNECTIONS", "2"),
        ])
        .unwrap();
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:8088");
        assert_eq!(config.database_url, "/tmp/boards.db");
        assert_eq!(config.max_connections, 2);
    }

    #[test]
    fn invalid_values_are_reported() {
        assert_eq!(
            config_from(&[("PORT", "http")]).unwrap_err(),
            ConfigError::InvalidPort("http".into())
        );
        assert_eq!(
            config_from(&[("PORT", "0")]).unwrap_err(),
            ConfigError::InvalidPort("0".into())
        );
        assert_eq!(
            config_from(&[("HOST", "localhost:80")]).unwrap_err(),
            ConfigError::InvalidHost("localhost:80".into())
        );
        assert_eq!(
            config_from(&[("DB_MAX_CONNECTIONS", "0")]).unwrap_err(),
            ConfigError::InvalidMaxConnections("0".into())
        );
        assert!(matches!(
            config_from(&[("APP_ENV", "staging")]),
            Err(ConfigError::InvalidEnvironment(_))
        ));
    }
}
