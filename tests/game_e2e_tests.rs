//! End-to-end game: two players on a 4x1 floor strip, two rounds, the host
//! shoves its own pieces off the platform and the guest wins.


use serial_test::serial;
use shove_server::game::{
    BoardPlatform, BoardPlatformTile, Direction, Outcome, PieceAction, Position, TileType,
};
use shove_server::protocol::{
    ClientMessage, ErrorPayload, PieceId, PlayerId, PlayerMove, PlayerPiecePosition, ServerMessage,
};
use test_helpers::{create_lobby, fast_config, spawn_server, TestClient};

fn floor_strip(len: i32) -> BoardPlatform {
    BoardPlatform {
        tiles: (0..len)
            .map(|x| BoardPlatformTile {
                position: Position::new(x, 0),
                texture_id: "grass".to_string(),
                tile_type: TileType::Floor,
            })
            .collect(),
    }
}

fn piece_of(player_id: PlayerId, board_state: &[PlayerPiecePosition]) -> PieceId {
    board_state
        .iter()
        .find(|piece| piece.player_id == player_id)
        .expect("player has a piece")
        .piece_id
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_full_game_host_eliminates_itself() {
    let (addr, _manager) = spawn_server(fast_config()).await;
    let (lobby_id, _) = create_lobby(addr).await;

    let mut host = TestClient::join(addr, &lobby_id).await;
    let ServerMessage::ServerHello(host_hello) = host.recv().await else {
        panic!("expected server_hello");
    };
    let host_id = host_hello.player.id;

    let mut guest = TestClient::join(addr, &lobby_id).await;
    let ServerMessage::ServerHello(guest_hello) = guest.recv().await else {
        panic!("expected server_hello");
    };
    let guest_id = guest_hello.player.id;

    let ServerMessage::PlayerJoined { .. } = host.recv().await else {
        panic!("expected player_joined");
    };

    // --- start the game on a 4x1 floor strip ---
    let platform = floor_strip(4);
    host.send(&ClientMessage::HostStartGame {
        platform: platform.clone(),
    })
    .await;

    let ServerMessage::ServerStartGame(host_start) = host.recv().await else {
        panic!("expected server_start_game");
    };
    let ServerMessage::ServerStartGame(guest_start) = guest.recv().await else {
        panic!("expected server_start_game");
    };
    assert_eq!(host_start, guest_start);
    assert_eq!(host_start.platform, platform);
    // 4 cells / 2 players => 2 pieces each
    assert_eq!(host_start.pieces.len(), 4);
    assert_eq!(host_start.players.len(), 2);

    // --- round 1: host pushes one of its pieces off the strip ---
    let ServerMessage::RoundStart {
        round_number,
        board_state,
        ..
    } = host.recv().await
    else {
        panic!("expected round_start");
    };
    assert_eq!(round_number, 1);
    assert_eq!(board_state.len(), 4);
    let ServerMessage::RoundStart {
        board_state: guest_board,
        ..
    } = guest.recv().await
    else {
        panic!("expected round_start");
    };
    assert_eq!(guest_board, board_state);

    let host_piece = piece_of(host_id, &board_state);
    host.send(&ClientMessage::PlayerMoves {
        moves: vec![PlayerMove {
            piece_id: host_piece,
            action: PieceAction::MoveUp,
        }],
    })
    .await;
    guest
        .send(&ClientMessage::PlayerMoves { moves: vec![] })
        .await;

    let ServerMessage::RoundResult {
        timeline,
        game_over,
    } = host.recv().await
    else {
        panic!("expected round_result");
    };
    assert_eq!(game_over, None);
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].actions.len(), 1);
    assert_eq!(timeline[0].actions[0].piece_id, host_piece);
    assert_eq!(timeline[0].actions[0].action, PieceAction::MoveUp);
    let [Outcome::Push(push)] = timeline[0].outcomes.as_slice() else {
        panic!("expected a single push outcome");
    };
    assert_eq!(push.pusher_piece_id, host_piece);
    assert!(push.victim_piece_ids.is_empty());
    assert_eq!(push.direction, Direction::Up);

    let ServerMessage::RoundResult {
        timeline: guest_timeline,
        game_over: guest_game_over,
    } = guest.recv().await
    else {
        panic!("expected round_result");
    };
    assert_eq!(guest_timeline, timeline);
    assert_eq!(guest_game_over, None);

    host.send(&ClientMessage::ReadyForNextRound {}).await;
    guest.send(&ClientMessage::ReadyForNextRound {}).await;

    // --- round 2: host shoves its last piece off; the guest wins ---
    let ServerMessage::RoundStart {
        round_number,
        board_state,
        ..
    } = host.recv().await
    else {
        panic!("expected round_start");
    };
    assert_eq!(round_number, 2);
    assert_eq!(board_state.len(), 3);
    let ServerMessage::RoundStart { .. } = guest.recv().await else {
        panic!("expected round_start");
    };

    let host_piece = piece_of(host_id, &board_state);
    host.send(&ClientMessage::PlayerMoves {
        moves: vec![PlayerMove {
            piece_id: host_piece,
            action: PieceAction::MoveDown,
        }],
    })
    .await;
    guest
        .send(&ClientMessage::PlayerMoves { moves: vec![] })
        .await;

    let ServerMessage::RoundResult {
        timeline,
        game_over,
    } = host.recv().await
    else {
        panic!("expected round_result");
    };
    assert_eq!(timeline.len(), 1);
    let [Outcome::Push(push)] = timeline[0].outcomes.as_slice() else {
        panic!("expected a single push outcome");
    };
    assert_eq!(push.direction, Direction::Down);
    let game_over = game_over.expect("game is over");
    assert_eq!(game_over.winner_player_id, Some(guest_id));

    let ServerMessage::RoundResult {
        game_over: guest_game_over,
        ..
    } = guest.recv().await
    else {
        panic!("expected round_result");
    };
    assert_eq!(guest_game_over, Some(game_over));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_illegal_move_gets_error_reply_and_round_continues() {
    let (addr, _manager) = spawn_server(fast_config()).await;
    let (lobby_id, _) = create_lobby(addr).await;

    let mut host = TestClient::join(addr, &lobby_id).await;
    let ServerMessage::ServerHello(host_hello) = host.recv().await else {
        panic!("expected server_hello");
    };
    let mut guest = TestClient::join(addr, &lobby_id).await;
    let ServerMessage::ServerHello(guest_hello) = guest.recv().await else {
        panic!("expected server_hello");
    };
    let _ = host.recv().await; // player_joined

    host.send(&ClientMessage::HostStartGame {
        platform: floor_strip(4),
    })
    .await;
    let _ = host.recv().await; // server_start_game
    let _ = guest.recv().await;

    let ServerMessage::RoundStart { board_state, .. } = host.recv().await else {
        panic!("expected round_start");
    };
    let _ = guest.recv().await;

    // the host tries to move a guest piece
    let guest_piece = piece_of(guest_hello.player.id, &board_state);
    host.send(&ClientMessage::PlayerMoves {
        moves: vec![PlayerMove {
            piece_id: guest_piece,
            action: PieceAction::MoveLeft,
        }],
    })
    .await;

    let ServerMessage::Error(error) = host.recv().await else {
        panic!("expected error reply");
    };
    assert_eq!(error.kind, ErrorPayload::KIND_ILLEGAL_MOVE);
    assert_eq!(
        error.extra["piece_id"],
        serde_json::Value::String(guest_piece.to_string())
    );

    // the round still resolves once both players submit legal moves
    let host_piece = piece_of(host_hello.player.id, &board_state);
    host.send(&ClientMessage::PlayerMoves {
        moves: vec![PlayerMove {
            piece_id: host_piece,
            action: PieceAction::NoAction,
        }],
    })
    .await;
    guest
        .send(&ClientMessage::PlayerMoves { moves: vec![] })
        .await;

    let ServerMessage::RoundResult { timeline, .. } = host.recv().await else {
        panic!("expected round_result");
    };
    assert!(timeline.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_lobby_not_joinable_during_game() {
    let (addr, _manager) = spawn_server(fast_config()).await;
    let (lobby_id, _) = create_lobby(addr).await;

    let mut host = TestClient::join(addr, &lobby_id).await;
    let _ = host.recv().await; // hello

    host.send(&ClientMessage::HostStartGame {
        platform: floor_strip(4),
    })
    .await;
    let _ = host.recv().await; // server_start_game

    TestClient::connect_refused(addr, &format!("/lobby/{lobby_id}/join"), 409).await;
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_missing_moves_close_with_4103() {
    let mut config = fast_config();
    config.game.round_grace_secs = 0.05;
    let (addr, _manager) = spawn_server(config).await;
    let (lobby_id, _) = create_lobby(addr).await;

    let mut host = TestClient::join(addr, &lobby_id).await;
    let _ = host.recv().await; // hello

    host.send(&ClientMessage::HostStartGame {
        platform: floor_strip(4),
    })
    .await;
    let _ = host.recv().await; // server_start_game
    let _ = host.recv().await; // round_start

    // submit nothing; the grace window expires
    let (code, reason) = host.recv_close().await;
    assert_eq!(code, 4103);
    assert_eq!(reason, "no moves submitted");
}
