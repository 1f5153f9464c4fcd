//! Configuration module.
//!
//! JSON configuration file with per-field serde defaults; any subset of the
//! tree may be specified. See [`types::Config`] for the root.

pub mod defaults;
pub mod game;
pub mod loader;
pub mod logging;
pub mod server;
pub mod types;

pub use game::GameConfig;
pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use server::ServerConfig;
pub use types::Config;
