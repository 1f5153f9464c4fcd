use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use serde::Serialize;

use crate::protocol::LobbyId;
use crate::server::LobbyManager;

use super::handler::join_lobby;

/// Create the Axum router: lobby management over HTTP plus the WebSocket
/// join endpoint.
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<LobbyManager>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    // Parse CORS origins
    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/lobby", post(create_lobby))
        .route("/lobby/{lobby_id}", get(lobby_info))
        .route("/lobby/{id_or_code}/join", get(join_lobby))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Serialize)]
struct LobbyResponse {
    lobby_id: LobbyId,
    join_code: String,
}

async fn create_lobby(State(manager): State<Arc<LobbyManager>>) -> Json<LobbyResponse> {
    let lobby = manager.create_lobby();
    Json(LobbyResponse {
        lobby_id: lobby.lobby_id(),
        join_code: lobby.join_code().to_string(),
    })
}

async fn lobby_info(
    State(manager): State<Arc<LobbyManager>>,
    Path(lobby_id): Path<LobbyId>,
) -> Result<Json<LobbyResponse>, StatusCode> {
    let lobby = manager.get_lobby(lobby_id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(LobbyResponse {
        lobby_id: lobby.lobby_id(),
        join_code: lobby.join_code().to_string(),
    }))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
