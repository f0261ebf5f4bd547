use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::errors::ConfigError;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub network: NetworkConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub motd: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "ircd.local".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            motd: "Welcome to this IRC server.".to_owned(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind_address: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_owned(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_clients: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { max_clients: 1024 }
    }
}

impl Config {
    /// Loads and parses the TOML configuration file. The listen port and the
    /// connection password are deliberately absent here: both come from the
    /// command line.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_stand_alone() {
        let config = Config::default();
        assert_eq!(config.network.bind_address, "0.0.0.0");
        assert_eq!(config.limits.max_clients, 1024);
        assert!(!config.server.name.is_empty());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            name = "irc.test.net"
            motd = "hello"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.name, "irc.test.net");
        assert_eq!(config.server.motd, "hello");
        assert_eq!(config.limits.max_clients, 1024);
    }
}
