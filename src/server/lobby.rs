use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::game::{Board, BoardError, BoardPlatform, Platform, TimelineEventAction};
use crate::protocol::{
    close_codes, ClientMessage, ErrorPayload, LobbyId, PlayerId, PlayerInfo, PlayerMove,
    ServerHelloPayload, ServerMessage, ServerStartGamePayload, SessionId,
};

use super::collector::Collector;
use super::connection::{Connection, ConnectionError};
use super::player::Player;

/// Lobby lifecycle states.
///
/// ```text
/// Empty -> Lobby: first player joins
/// Lobby -> GameRoundStart: host starts the game (pre-game countdown)
/// GameRoundStart -> GameGetPlayerMoves: round opens
/// GameGetPlayerMoves -> GameWaitPlayerReady: moves resolved, clients animate
/// GameWaitPlayerReady -> GameRoundStart: next round
/// GameWaitPlayerReady -> Lobby: game over
/// any -> Shutdown: manager destroys the lobby
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyPhase {
    Empty,
    Lobby,
    GameRoundStart,
    GameGetPlayerMoves,
    GameWaitPlayerReady,
    Shutdown,
}

#[derive(Debug, thiserror::Error)]
enum RoundError {
    #[error("board is missing during an active round")]
    MissingBoard,
    #[error(transparent)]
    Board(#[from] BoardError),
}

struct LobbyInner {
    phase: LobbyPhase,
    host_player_id: Option<PlayerId>,
    players: HashMap<PlayerId, Arc<Player>>,
    board: Option<Board>,
    round_number: u32,
    game_loop: Option<JoinHandle<()>>,
    moves_collector: Option<Arc<Collector<Vec<TimelineEventAction>>>>,
    ready_collector: Option<Arc<Collector<()>>>,
}

impl LobbyInner {
    fn players_by_number(&self) -> Vec<Arc<Player>> {
        let mut players: Vec<Arc<Player>> = self.players.values().cloned().collect();
        players.sort_by_key(|player| player.number());
        players
    }

    fn lowest_unused_number(&self) -> u32 {
        let mut number = 1;
        let used: Vec<u32> = self.players.values().map(|player| player.number()).collect();
        while used.contains(&number) {
            number += 1;
        }
        number
    }
}

/// One lobby = one game. All mutable state lives behind a single lock and is
/// only touched by the lobby's own tasks, making the lobby an actor; board
/// resolution runs under the lock and never suspends, so it is atomic
/// relative to message handling.
pub struct Lobby {
    lobby_id: LobbyId,
    join_code: String,
    created_at: DateTime<Utc>,
    config: Arc<Config>,
    shutdown_token: CancellationToken,
    inner: Mutex<LobbyInner>,
}

impl Lobby {
    pub fn new(config: Arc<Config>, join_code: String) -> Arc<Self> {
        Arc::new(Self {
            lobby_id: LobbyId::new_v4(),
            join_code,
            created_at: Utc::now(),
            config,
            shutdown_token: CancellationToken::new(),
            inner: Mutex::new(LobbyInner {
                phase: LobbyPhase::Empty,
                host_player_id: None,
                players: HashMap::new(),
                board: None,
                round_number: 0,
                game_loop: None,
                moves_collector: None,
                ready_collector: None,
            }),
        })
    }

    pub fn lobby_id(&self) -> LobbyId {
        self.lobby_id
    }

    pub fn join_code(&self) -> &str {
        &self.join_code
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub async fn player_count(&self) -> usize {
        self.inner.lock().await.players.len()
    }

    pub async fn phase(&self) -> LobbyPhase {
        self.inner.lock().await.phase
    }

    pub async fn is_joinable(&self) -> bool {
        matches!(
            self.inner.lock().await.phase,
            LobbyPhase::Empty | LobbyPhase::Lobby
        )
    }

    pub async fn has_session(&self, session_id: SessionId) -> bool {
        self.inner
            .lock()
            .await
            .players
            .values()
            .any(|player| player.session_id() == session_id)
    }

    /// Attach a fresh player to the lobby. Returns `None` when the lobby is
    /// not joinable (the caller closes the channel).
    pub async fn join(self: &Arc<Self>, connection: Arc<Connection>) -> Option<Arc<Player>> {
        let (player, is_host, other_players) = {
            let mut inner = self.inner.lock().await;
            if !matches!(inner.phase, LobbyPhase::Empty | LobbyPhase::Lobby) {
                return None;
            }

            let player = Arc::new(Player::new(inner.lowest_unused_number(), connection));
            let is_host = if inner.host_player_id.is_none() {
                inner.host_player_id = Some(player.player_id());
                true
            } else {
                false
            };
            if inner.phase == LobbyPhase::Empty {
                inner.phase = LobbyPhase::Lobby;
            }

            let other_players: Vec<PlayerInfo> = inner
                .players_by_number()
                .iter()
                .map(|other| other.info())
                .collect();
            inner.players.insert(player.player_id(), player.clone());
            (player, is_host, other_players)
        };

        tracing::info!(
            lobby_id = %self.lobby_id,
            player_id = %player.player_id(),
            player_number = player.number(),
            is_host,
            "Player joined lobby"
        );

        self.spawn_poll_task(&player);

        let hello = ServerMessage::ServerHello(Box::new(ServerHelloPayload {
            session_id: player.session_id(),
            is_host,
            player: player.info(),
            other_players,
        }));
        player.connection().send_silent(&hello).await;

        self.broadcast(
            &ServerMessage::PlayerJoined {
                player: player.info(),
                reconnect: false,
            },
            &[player.player_id()],
        )
        .await;

        Some(player)
    }

    /// Re-attach a disconnected player by session id. Returns `None` on an
    /// unknown session (the caller closes the channel with code 4003).
    pub async fn reconnect(
        self: &Arc<Self>,
        session_id: SessionId,
        connection: Arc<Connection>,
    ) -> Option<Arc<Player>> {
        let player = {
            let inner = self.inner.lock().await;
            inner
                .players
                .values()
                .find(|player| player.session_id() == session_id)
                .cloned()
        }?;

        tracing::info!(
            lobby_id = %self.lobby_id,
            player_id = %player.player_id(),
            "Player reconnected"
        );

        player.replace_connection(connection);
        // replaces and thereby cancels the old poll task's reconnect window
        self.spawn_poll_task(&player);

        self.broadcast(
            &ServerMessage::PlayerJoined {
                player: player.info(),
                reconnect: true,
            },
            &[player.player_id()],
        )
        .await;

        Some(player)
    }

    fn spawn_poll_task(self: &Arc<Self>, player: &Arc<Player>) {
        let lobby = self.clone();
        let player_arc = player.clone();
        let connection = player.connection();
        let task = tokio::spawn(async move {
            player_poll_loop(lobby, player_arc, connection).await;
        });
        player.set_poll_task(Some(task));
    }

    /// Dispatch one message from a player. Called from a task that shields
    /// it from poll-task cancellation, so a reconnect cannot tear a
    /// half-applied transition.
    async fn handle_message(self: &Arc<Self>, player: &Arc<Player>, message: ClientMessage) {
        match message {
            ClientMessage::HostStartGame { platform } => {
                self.msg_host_start_game(player, platform).await;
            }
            ClientMessage::PlayerMoves { moves } => {
                self.msg_player_moves(player, &moves).await;
            }
            ClientMessage::ReadyForNextRound {} => {
                self.msg_ready_for_next_round(player).await;
            }
        }
    }

    async fn msg_host_start_game(
        self: &Arc<Self>,
        player: &Arc<Player>,
        platform_model: BoardPlatform,
    ) {
        let start_payload = {
            let mut inner = self.inner.lock().await;
            if inner.host_player_id != Some(player.player_id()) {
                drop(inner);
                self.reply_error(player, ErrorPayload::must_be_host()).await;
                return;
            }
            if inner.phase != LobbyPhase::Lobby {
                drop(inner);
                self.reply_error(player, ErrorPayload::invalid_lobby_state())
                    .await;
                return;
            }

            let mut board = Board::new(Platform::from_model(&platform_model));
            let player_ids: Vec<PlayerId> = inner
                .players_by_number()
                .iter()
                .map(|p| p.player_id())
                .collect();
            let mut rng = rand::rng();
            let pieces =
                board.place_pieces(&mut rng, &player_ids, self.config.game.pieces_per_player);

            tracing::info!(
                lobby_id = %self.lobby_id,
                players = player_ids.len(),
                pieces = pieces.len(),
                "Host started the game"
            );

            inner.board = Some(board);
            inner.round_number = 0;
            inner.phase = LobbyPhase::GameRoundStart;

            ServerStartGamePayload {
                platform: platform_model,
                players: inner
                    .players_by_number()
                    .iter()
                    .map(|p| p.info())
                    .collect(),
                pieces,
                round_start_in: self.config.game.pre_game_duration_secs,
            }
        };

        self.broadcast(
            &ServerMessage::ServerStartGame(Box::new(start_payload)),
            &[],
        )
        .await;

        let lobby = self.clone();
        let token = self.shutdown_token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = lobby.clone().run_game_loop() => {}
            }
        });
        self.inner.lock().await.game_loop = Some(handle);
    }

    async fn msg_player_moves(self: &Arc<Self>, player: &Arc<Player>, moves: &[PlayerMove]) {
        let error = {
            let inner = self.inner.lock().await;
            if inner.phase != LobbyPhase::GameGetPlayerMoves {
                Some(ErrorPayload::invalid_lobby_state())
            } else {
                let validated = inner
                    .board
                    .as_ref()
                    .map(|board| board.validate_player_moves(player.player_id(), moves));
                match validated {
                    Some(Ok(actions)) => {
                        if let Some(collector) = &inner.moves_collector {
                            collector.collect(player.player_id(), actions);
                        }
                        None
                    }
                    Some(Err(illegal)) => Some(ErrorPayload::illegal_player_move(&illegal)),
                    None => Some(ErrorPayload::invalid_lobby_state()),
                }
            }
        };
        if let Some(payload) = error {
            self.reply_error(player, payload).await;
        }
    }

    async fn msg_ready_for_next_round(self: &Arc<Self>, player: &Arc<Player>) {
        let error = {
            let inner = self.inner.lock().await;
            if inner.phase != LobbyPhase::GameWaitPlayerReady {
                Some(ErrorPayload::invalid_lobby_state())
            } else {
                if let Some(collector) = &inner.ready_collector {
                    collector.collect(player.player_id(), ());
                }
                None
            }
        };
        if let Some(payload) = error {
            self.reply_error(player, payload).await;
        }
    }

    async fn run_game_loop(self: Arc<Self>) {
        tokio::time::sleep(self.config.game.pre_game_duration()).await;

        loop {
            match self.run_round().await {
                Ok(None) => {}
                Ok(Some(_)) => break,
                Err(err) => {
                    // one broken round must not kill the game
                    tracing::error!(
                        lobby_id = %self.lobby_id,
                        error = %err,
                        "Round failed; continuing with the next round"
                    );
                }
            }
        }

        let mut inner = self.inner.lock().await;
        inner.phase = LobbyPhase::Lobby;
        inner.board = None;
        inner.moves_collector = None;
        inner.ready_collector = None;
        tracing::info!(lobby_id = %self.lobby_id, "Game over; lobby reopened");
    }

    /// One iteration of collect-moves, resolve, broadcast-result, wait-ready.
    async fn run_round(self: &Arc<Self>) -> Result<Option<crate::protocol::GameOver>, RoundError> {
        let (collector, round_start) = {
            let mut inner = self.inner.lock().await;
            let board = inner.board.as_ref().ok_or(RoundError::MissingBoard)?;
            let board_state = board.pieces();
            inner.round_number += 1;
            inner.phase = LobbyPhase::GameGetPlayerMoves;
            let collector = Arc::new(Collector::new(inner.players.keys().copied()));
            inner.moves_collector = Some(collector.clone());
            (
                collector,
                ServerMessage::RoundStart {
                    round_number: inner.round_number,
                    round_duration: self.config.game.round_duration_secs,
                    board_state,
                },
            )
        };

        self.broadcast(&round_start, &[]).await;

        let result = collector
            .wait_with_grace(
                self.config.game.round_duration(),
                self.config.game.round_grace(),
            )
            .await;

        for player_id in &result.missing {
            let player = self.inner.lock().await.players.get(player_id).cloned();
            if let Some(player) = player {
                tracing::warn!(
                    lobby_id = %self.lobby_id,
                    %player_id,
                    "Player submitted no moves; closing channel"
                );
                player
                    .connection()
                    .close(close_codes::NO_MOVES_SUBMITTED)
                    .await;
            }
        }

        let mut moves: Vec<TimelineEventAction> =
            result.collected.into_values().flatten().collect();
        moves.sort_by_key(|action| action.piece_id);

        let (round_result, ready_collector, timeline_len, game_over) = {
            let mut inner = self.inner.lock().await;
            let board = inner.board.as_mut().ok_or(RoundError::MissingBoard)?;
            let timeline = board.perform_player_moves(moves)?;
            let game_over = board.game_over_status();
            inner.phase = LobbyPhase::GameWaitPlayerReady;
            let ready_collector = Arc::new(Collector::new(inner.players.keys().copied()));
            inner.ready_collector = Some(ready_collector.clone());
            let timeline_len = timeline.len();
            (
                ServerMessage::RoundResult {
                    timeline,
                    game_over,
                },
                ready_collector,
                timeline_len,
                game_over,
            )
        };

        self.broadcast(&round_result, &[]).await;

        ready_collector
            .wait_up_to(self.config.game.duration_per_event() * timeline_len as u32)
            .await;

        self.inner.lock().await.phase = LobbyPhase::GameRoundStart;
        Ok(game_over)
    }

    /// Drop a player for good: renumber the rest, promote a new host if
    /// needed, satisfy any waiting collector, tell everyone else.
    async fn remove_player(self: &Arc<Self>, player: &Arc<Player>) {
        let left = {
            let mut inner = self.inner.lock().await;
            if inner.players.remove(&player.player_id()).is_none() {
                return;
            }
            let left = player.info();

            let remaining = inner.players_by_number();
            for (index, other) in remaining.iter().enumerate() {
                other.set_number(index as u32 + 1);
            }
            if inner.host_player_id == Some(player.player_id()) {
                inner.host_player_id = remaining.first().map(|p| p.player_id());
            }
            if inner.players.is_empty() {
                inner.host_player_id = None;
                if inner.phase == LobbyPhase::Lobby {
                    inner.phase = LobbyPhase::Empty;
                }
            }

            if let Some(collector) = &inner.moves_collector {
                collector.remove_player(player.player_id());
            }
            if let Some(collector) = &inner.ready_collector {
                collector.remove_player(player.player_id());
            }
            left
        };

        tracing::info!(
            lobby_id = %self.lobby_id,
            player_id = %left.id,
            "Player left lobby"
        );

        self.broadcast(&ServerMessage::PlayerLeft { player: left }, &[])
            .await;
    }

    /// Send to every player (minus `exclude`) in parallel; an individual
    /// failed send is logged and does not fail the broadcast.
    async fn broadcast(&self, message: &ServerMessage, exclude: &[PlayerId]) {
        let recipients: Vec<(PlayerId, Arc<Connection>)> = {
            let inner = self.inner.lock().await;
            inner
                .players
                .values()
                .filter(|player| !exclude.contains(&player.player_id()))
                .map(|player| (player.player_id(), player.connection()))
                .collect()
        };
        if recipients.is_empty() {
            return;
        }

        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(lobby_id = %self.lobby_id, error = %err, "Failed to serialize broadcast");
                return;
            }
        };

        tracing::debug!(
            lobby_id = %self.lobby_id,
            recipients = recipients.len(),
            "Broadcasting message"
        );

        let sends = recipients.iter().map(|(player_id, connection)| {
            let text = text.clone();
            async move { (*player_id, connection.send_text(text).await) }
        });
        for (player_id, outcome) in futures_util::future::join_all(sends).await {
            if let Err(err) = outcome {
                tracing::warn!(
                    lobby_id = %self.lobby_id,
                    %player_id,
                    error = %err,
                    "Failed to send message to player"
                );
            }
        }
    }

    async fn reply_error(&self, player: &Arc<Player>, payload: ErrorPayload) {
        tracing::debug!(
            lobby_id = %self.lobby_id,
            player_id = %player.player_id(),
            kind = %payload.kind,
            "Rejecting player message"
        );
        if !player
            .connection()
            .send_silent(&ServerMessage::Error(payload))
            .await
        {
            tracing::warn!(
                lobby_id = %self.lobby_id,
                player_id = %player.player_id(),
                "Failed to deliver error reply"
            );
        }
    }

    /// Tear the lobby down: stop the game loop, detach every player and
    /// close their channels.
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();

        let (players, game_loop) = {
            let mut inner = self.inner.lock().await;
            inner.phase = LobbyPhase::Shutdown;
            let game_loop = inner.game_loop.take();
            let players: Vec<Arc<Player>> = inner.players.drain().map(|(_, p)| p).collect();
            inner.moves_collector = None;
            inner.ready_collector = None;
            (players, game_loop)
        };

        if let Some(handle) = game_loop {
            handle.abort();
        }

        tracing::info!(lobby_id = %self.lobby_id, players = players.len(), "Lobby shut down");

        for player in players {
            player.set_poll_task(None);
            player.connection().close(close_codes::LOBBY_SHUTDOWN).await;
        }
    }
}

/// Receive loop of one player: messages are dispatched one at a time; a
/// closed channel opens a reconnect window before the player is dropped.
async fn player_poll_loop(lobby: Arc<Lobby>, player: Arc<Player>, connection: Arc<Connection>) {
    loop {
        match connection.receive().await {
            Ok(message) => {
                // run the handler in its own task so cancelling this loop
                // (reconnect, shutdown) cannot interrupt a state transition
                let handler = {
                    let lobby = lobby.clone();
                    let player = player.clone();
                    tokio::spawn(async move { lobby.handle_message(&player, message).await })
                };
                if let Err(err) = handler.await {
                    tracing::error!(
                        player_id = %player.player_id(),
                        error = %err,
                        "Message handler failed"
                    );
                }
            }
            Err(ConnectionError::Invalid(reason)) => {
                tracing::warn!(
                    player_id = %player.player_id(),
                    %reason,
                    "Player sent an invalid message"
                );
                connection.close(close_codes::INVALID_MESSAGE).await;
                break;
            }
            Err(ConnectionError::Closed) => break,
            Err(ConnectionError::Transport(err)) => {
                tracing::warn!(
                    player_id = %player.player_id(),
                    error = %err,
                    "Player channel failed"
                );
                break;
            }
        }
    }

    // reconnect window: a successful reconnect replaces (and thereby
    // cancels) this task before the sleep runs out
    tracing::info!(
        player_id = %player.player_id(),
        window_secs = lobby.config.game.player_reconnect_secs,
        "Player disconnected; holding seat open"
    );
    tokio::time::sleep(lobby.config.game.player_reconnect()).await;
    lobby.remove_player(&player).await;
}
