// src/config.rs
// Server settings read from the environment; every variable is optional.

use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const HOST_VAR: &str = "PENDULUM_HOST";
pub const PORT_VAR: &str = "PENDULUM_PORT";
pub const STATIC_DIR_VAR: &str = "PENDULUM_STATIC_DIR";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be a port number, got {value:?}")]
    InvalidPort { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf, // Directory holding index.html.
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup` instead of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(host) = lookup(HOST_VAR) {
            config.host = host;
        }
        if let Some(port) = lookup(PORT_VAR) {
            config.port = port.trim().parse().map_err(|_| ConfigError::InvalidPort {
                var: PORT_VAR,
                value: port.clone(),
            })?;
        }
        if let Some(dir) = lookup(STATIC_DIR_VAR) {
            config.static_dir = PathBuf::from(dir);
        }
        Ok(config)
    }
}
