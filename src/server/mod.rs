// Server module: per-player channels, collectors, lobby FSM and lifecycle

pub mod collector;
pub mod connection;
pub mod lobby;
pub mod lobby_manager;
pub mod player;

pub use collector::{Collected, Collector};
pub use connection::{Connection, ConnectionError};
pub use lobby::{Lobby, LobbyPhase};
pub use lobby_manager::LobbyManager;
pub use player::Player;
