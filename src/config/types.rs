//! Root configuration struct.

use serde::{Deserialize, Serialize};

use super::defaults::{default_cors_origins, default_port};
use super::game::GameConfig;
use super::logging::LoggingConfig;
use super::server::ServerConfig;

/// Complete server configuration; every field has a sensible default so an
/// empty config file (or none at all) yields a working server.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Comma-separated allowed CORS origins, or "*" for permissive
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub game: GameConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            cors_origins: default_cors_origins(),
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
            game: GameConfig::default(),
        }
    }
}
