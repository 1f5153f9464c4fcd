#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::too_many_lines
)]

//! # Shove Server
//!
//! An in-memory WebSocket game server for a simultaneous-turn grid push game.
//!
//! Zero external dependencies at runtime — no database, no cloud services.
//! Just run the binary; clients create a lobby over HTTP and join it over a
//! persistent WebSocket channel.

/// Server configuration and environment variables
pub mod config;

/// Board, platform and push-resolution engine
pub mod game;

/// Structured logging configuration
pub mod logging;

/// WebSocket message protocol definitions
pub mod protocol;

/// Lobby, player and game-loop orchestration
pub mod server;

/// HTTP routes and WebSocket connection handling
pub mod websocket;
