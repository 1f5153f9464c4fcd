use std::sync::Arc;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::protocol::{close_codes, SessionId};
use crate::server::{Connection, LobbyManager};

#[derive(Debug, Deserialize)]
pub struct JoinQuery {
    session_id: Option<SessionId>,
}

/// Upgrade endpoint for `/lobby/{id_or_code}/join`.
///
/// Rejections known before the upgrade use plain HTTP statuses; the same
/// checks run again on the upgraded channel with application close codes,
/// because lobby state can change between the two.
pub async fn join_lobby(
    State(manager): State<Arc<LobbyManager>>,
    Path(id_or_code): Path<String>,
    Query(query): Query<JoinQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(lobby) = manager.resolve(&id_or_code) else {
        return (StatusCode::NOT_FOUND, "lobby not found").into_response();
    };

    match query.session_id {
        None => {
            if !lobby.is_joinable().await {
                return (StatusCode::CONFLICT, "lobby not joinable").into_response();
            }
        }
        Some(session_id) => {
            if !lobby.has_session(session_id).await {
                return (StatusCode::GONE, "session expired").into_response();
            }
        }
    }

    let session_id = query.session_id;
    ws.on_upgrade(move |socket| handle_lobby_socket(socket, manager, id_or_code, session_id))
}

async fn handle_lobby_socket(
    socket: WebSocket,
    manager: Arc<LobbyManager>,
    id_or_code: String,
    session_id: Option<SessionId>,
) {
    let connection = Arc::new(Connection::new(
        socket,
        manager.config().server.max_message_size,
    ));

    // re-resolve: the lobby may have been reaped since the HTTP check
    let Some(lobby) = manager.resolve(&id_or_code) else {
        connection.close(close_codes::LOBBY_NOT_FOUND).await;
        return;
    };

    match session_id {
        Some(session_id) => {
            if lobby.reconnect(session_id, connection.clone()).await.is_none() {
                connection.close(close_codes::LOBBY_SESSION_EXPIRED).await;
            }
        }
        None => {
            if lobby.join(connection.clone()).await.is_none() {
                connection.close(close_codes::LOBBY_NOT_JOINABLE).await;
            }
        }
    }

    // on success the lobby's poll task owns the connection; returning here
    // leaves the socket open because the halves live inside the Arc
}
