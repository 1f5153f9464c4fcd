//! Benchmarks for the push-resolution engine.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use uuid::Uuid;

use shove_server::game::{Board, PieceAction, Platform, Position};
use shove_server::protocol::{PlayerMove, PlayerPiecePosition};

/// A wide board full of long push chains: `rows` pushers, each dragging
/// `chain_len` victims.
fn chain_board(rows: i32, chain_len: i32) -> (Board, Vec<PlayerMove>) {
    let player_id = Uuid::new_v4();
    let mut board = Board::new(Platform::rectangle(
        Position::new(0, 0),
        Position::new(chain_len + 8, rows - 1),
    ));
    let mut moves = Vec::new();

    for y in 0..rows {
        for x in 0..=chain_len {
            let piece_id = Uuid::new_v4();
            assert!(board.insert_piece(PlayerPiecePosition {
                player_id,
                piece_id,
                position: Position::new(x, y),
            }));
            if x == 0 {
                moves.push(PlayerMove {
                    piece_id,
                    action: PieceAction::MoveRight,
                });
            }
        }
    }

    (board, moves)
}

fn bench_push_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_resolution");

    for (rows, chain_len) in [(4i32, 4i32), (16, 8), (32, 16)] {
        let (board, moves) = chain_board(rows, chain_len);
        let player_id = board.pieces()[0].player_id;
        let actions = board
            .validate_player_moves(player_id, &moves)
            .expect("bench moves are legal");

        group.bench_function(format!("{rows}x{chain_len}_chains"), |b| {
            b.iter_batched(
                || (board.clone(), actions.clone()),
                |(mut board, actions)| {
                    board
                        .perform_player_moves(actions)
                        .expect("bench board resolves")
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_push_resolution);
criterion_main!(benches);
