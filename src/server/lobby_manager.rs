use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::config::Config;
use crate::protocol::{JoinCodeMint, LobbyId};

use super::lobby::Lobby;

/// Owns every lobby in the process: creation, lookup by id or join code,
/// and background garbage collection. The only mutator of the lobby maps.
pub struct LobbyManager {
    config: Arc<Config>,
    lobbies_by_id: DashMap<LobbyId, Arc<Lobby>>,
    lobby_id_by_code: DashMap<String, LobbyId>,
    code_mint: Mutex<JoinCodeMint>,
}

impl LobbyManager {
    pub fn new(config: Arc<Config>) -> Arc<Self> {
        let mint = JoinCodeMint::new(config.server.join_code_min_len);
        Arc::new(Self {
            config,
            lobbies_by_id: DashMap::new(),
            lobby_id_by_code: DashMap::new(),
            code_mint: Mutex::new(mint),
        })
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn create_lobby(&self) -> Arc<Lobby> {
        let join_code = {
            let mut mint = self
                .code_mint
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            loop {
                let candidate = mint.generate();
                if !self.lobby_id_by_code.contains_key(&candidate) {
                    break candidate;
                }
                tracing::warn!(code = %candidate, "Join code collision; bumping code length");
                mint.bump_len();
            }
        };

        let lobby = Lobby::new(self.config.clone(), join_code.clone());
        self.lobby_id_by_code.insert(join_code.clone(), lobby.lobby_id());
        self.lobbies_by_id.insert(lobby.lobby_id(), lobby.clone());

        tracing::info!(
            lobby_id = %lobby.lobby_id(),
            join_code = %join_code,
            "Created lobby"
        );
        lobby
    }

    pub fn get_lobby(&self, lobby_id: LobbyId) -> Option<Arc<Lobby>> {
        self.lobbies_by_id
            .get(&lobby_id)
            .map(|entry| entry.value().clone())
    }

    pub fn get_lobby_by_code(&self, code: &str) -> Option<Arc<Lobby>> {
        let code = code.trim().to_ascii_uppercase();
        let lobby_id = *self.lobby_id_by_code.get(&code)?.value();
        self.get_lobby(lobby_id)
    }

    /// Channel endpoint lookup: a UUID resolves by id, anything else is
    /// treated as a join code.
    pub fn resolve(&self, id_or_code: &str) -> Option<Arc<Lobby>> {
        match id_or_code.parse::<LobbyId>() {
            Ok(lobby_id) => self.get_lobby(lobby_id),
            Err(_) => self.get_lobby_by_code(id_or_code),
        }
    }

    pub fn lobby_count(&self) -> usize {
        self.lobbies_by_id.len()
    }

    /// Background task reaping dead lobbies every `gc_interval`.
    pub async fn run_gc(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.server.gc_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // the first tick fires immediately; skip it so young lobbies are not
        // inspected right at startup
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.gc_run_once().await;
        }
    }

    /// Destroy lobbies past their maximum lifespan, plus lobbies past the
    /// minimum lifespan that sit empty. Resets the code mint when anything
    /// was reaped so short codes become available again.
    pub async fn gc_run_once(&self) {
        let now = chrono::Utc::now();
        let candidates: Vec<Arc<Lobby>> = self
            .lobbies_by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut reaped = 0usize;
        for lobby in candidates {
            let age = now.signed_duration_since(lobby.created_at());
            let destroy = age >= self.config.server.max_lobby_lifespan()
                || (age >= self.config.server.min_lobby_lifespan()
                    && lobby.player_count().await == 0);
            if !destroy {
                continue;
            }

            self.lobbies_by_id.remove(&lobby.lobby_id());
            self.lobby_id_by_code.remove(lobby.join_code());
            lobby.shutdown().await;
            reaped += 1;
            tracing::info!(
                lobby_id = %lobby.lobby_id(),
                age_secs = age.num_seconds(),
                "Reaped lobby"
            );
        }

        if reaped > 0 {
            self.code_mint
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .reset_len();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with(server: crate::config::ServerConfig) -> Arc<LobbyManager> {
        let config = Config {
            server,
            ..Config::default()
        };
        LobbyManager::new(Arc::new(config))
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let manager = manager_with(crate::config::ServerConfig::default());
        let lobby = manager.create_lobby();

        assert_eq!(manager.lobby_count(), 1);
        assert!(manager.get_lobby(lobby.lobby_id()).is_some());
        assert!(manager
            .get_lobby_by_code(lobby.join_code())
            .is_some());
        assert!(manager.resolve(&lobby.lobby_id().to_string()).is_some());
        assert!(manager.resolve(lobby.join_code()).is_some());
        assert!(manager.resolve("ZZZZZZZZ").is_none());
    }

    #[tokio::test]
    async fn test_code_lookup_is_case_insensitive() {
        let manager = manager_with(crate::config::ServerConfig::default());
        let lobby = manager.create_lobby();
        let lowered = lobby.join_code().to_ascii_lowercase();
        assert!(manager.get_lobby_by_code(&lowered).is_some());
        assert!(manager.resolve(&format!("  {lowered} ")).is_some());
    }

    #[tokio::test]
    async fn test_codes_are_unique() {
        let manager = manager_with(crate::config::ServerConfig::default());
        let mut codes = std::collections::HashSet::new();
        for _ in 0..50 {
            let lobby = manager.create_lobby();
            assert!(codes.insert(lobby.join_code().to_string()));
        }
    }

    #[tokio::test]
    async fn test_gc_reaps_old_empty_lobbies() {
        let manager = manager_with(crate::config::ServerConfig {
            min_lobby_lifespan_secs: 0,
            ..crate::config::ServerConfig::default()
        });
        let lobby = manager.create_lobby();

        manager.gc_run_once().await;
        assert_eq!(manager.lobby_count(), 0);
        assert!(manager.get_lobby(lobby.lobby_id()).is_none());
        assert!(manager.get_lobby_by_code(lobby.join_code()).is_none());
    }

    #[tokio::test]
    async fn test_gc_spares_young_lobbies() {
        let manager = manager_with(crate::config::ServerConfig::default());
        manager.create_lobby();

        manager.gc_run_once().await;
        assert_eq!(manager.lobby_count(), 1);
    }
}
