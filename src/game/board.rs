use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use rand::RngExt;

use crate::protocol::{GameOver, PieceId, PlayerId, PlayerMove, PlayerPiecePosition};

use super::grid::{Direction, Position};
use super::platform::Platform;
use super::timeline::{
    MoveConflictOutcomePayload, Outcome, PushConflictOutcomePayload, PushOutcomePayload,
    TimelineEvent, TimelineEventAction,
};

/// A move rejected during validation. Returned as a value so the dispatch
/// layer can translate it into an error reply on the channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal move for piece {piece_id}: {reason}")]
pub struct IllegalMove {
    pub piece_id: PieceId,
    pub reason: &'static str,
}

/// Internal resolution invariant violation. The board is left untouched by
/// the failing event; the caller aborts the current round iteration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("push resolution staged conflicting occupancy at ({}, {})", position.x, position.y)]
    ResolutionInvariant { position: Position },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PieceInformation {
    player_id: PlayerId,
    piece_id: PieceId,
}

enum DetectedPushConflicts {
    None,
    /// Head-on pairs found at the minimum distance. These preempt everything
    /// else in the event.
    HeadOn(Vec<PushConflictOutcomePayload>),
    /// Many-pushers-one-victim groups at the minimum distance.
    ManyToOne(Vec<PushConflictOutcomePayload>),
}

/// Piece storage plus the simultaneous-move resolution engine.
///
/// Invariant: at most one piece per position at rest. All iteration that
/// influences emitted timelines runs over ordered structures so resolution
/// is a pure function of the move set.
#[derive(Debug, Clone)]
pub struct Board {
    platform: Platform,
    piece_by_position: HashMap<Position, PieceInformation>,
    // secondary index; reverse lookups are frequent during chain growth
    position_by_piece_id: HashMap<PieceId, Position>,
}

impl Board {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            piece_by_position: HashMap::new(),
            position_by_piece_id: HashMap::new(),
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn piece_count(&self) -> usize {
        self.piece_by_position.len()
    }

    pub fn piece_by_id(&self, piece_id: PieceId) -> Option<PlayerPiecePosition> {
        let position = *self.position_by_piece_id.get(&piece_id)?;
        let info = self.piece_by_position.get(&position)?;
        Some(PlayerPiecePosition {
            player_id: info.player_id,
            piece_id: info.piece_id,
            position,
        })
    }

    pub fn piece_at_position(&self, position: Position) -> Option<PlayerPiecePosition> {
        let info = self.piece_by_position.get(&position)?;
        Some(PlayerPiecePosition {
            player_id: info.player_id,
            piece_id: info.piece_id,
            position,
        })
    }

    /// All pieces, sorted by piece id so broadcast payloads are stable.
    pub fn pieces(&self) -> Vec<PlayerPiecePosition> {
        let mut pieces: Vec<PlayerPiecePosition> = self
            .piece_by_position
            .iter()
            .map(|(&position, info)| PlayerPiecePosition {
                player_id: info.player_id,
                piece_id: info.piece_id,
                position,
            })
            .collect();
        pieces.sort_by_key(|piece| piece.piece_id);
        pieces
    }

    /// Returns false (and changes nothing) when the position is taken.
    pub fn insert_piece(&mut self, piece: PlayerPiecePosition) -> bool {
        if self.piece_by_position.contains_key(&piece.position) {
            return false;
        }
        self.piece_by_position.insert(
            piece.position,
            PieceInformation {
                player_id: piece.player_id,
                piece_id: piece.piece_id,
            },
        );
        self.position_by_piece_id
            .insert(piece.piece_id, piece.position);
        true
    }

    /// Randomly distribute starting pieces.
    ///
    /// On a finite platform the per-player count is capped at
    /// `available / players`; if even that is zero, a random subset of
    /// players gets one piece each.
    pub fn place_pieces<R: RngExt>(
        &mut self,
        rng: &mut R,
        player_ids: &[PlayerId],
        pieces_per_player: u32,
    ) -> Vec<PlayerPiecePosition> {
        let player_count = player_ids.len() as u64;
        let mut per_player = u64::from(pieces_per_player);
        if let (Some(available), true) = (self.platform.on_board_positions(), player_count > 0) {
            per_player = per_player.min(available / player_count);
        }

        let placements: Vec<PlayerId> = if per_player == 0 {
            let available = self
                .platform
                .on_board_positions()
                .unwrap_or(player_count)
                .min(player_count) as usize;
            let mut ids = player_ids.to_vec();
            shuffle(rng, &mut ids);
            ids.truncate(available);
            ids
        } else {
            player_ids
                .iter()
                .flat_map(|&id| std::iter::repeat(id).take(per_player as usize))
                .collect()
        };

        let mut exclude: HashSet<Position> = self.piece_by_position.keys().copied().collect();
        let mut placed = Vec::with_capacity(placements.len());
        for player_id in placements {
            let Some(position) = self.platform.random_position_on_board(rng, &exclude) else {
                break;
            };
            exclude.insert(position);
            let piece = PlayerPiecePosition {
                player_id,
                piece_id: PieceId::new_v4(),
                position,
            };
            self.insert_piece(piece.clone());
            placed.push(piece);
        }
        placed
    }

    /// Some(GameOver) once at most one player still owns pieces.
    pub fn game_over_status(&self) -> Option<GameOver> {
        let players: BTreeSet<PlayerId> = self
            .piece_by_position
            .values()
            .map(|info| info.player_id)
            .collect();
        match players.len() {
            0 => Some(GameOver {
                winner_player_id: None,
            }),
            1 => Some(GameOver {
                winner_player_id: players.iter().next().copied(),
            }),
            _ => None,
        }
    }

    /// Check a player's planned moves against piece existence and ownership.
    pub fn validate_player_moves(
        &self,
        player_id: PlayerId,
        planned_moves: &[PlayerMove],
    ) -> Result<Vec<TimelineEventAction>, IllegalMove> {
        planned_moves
            .iter()
            .map(|planned| {
                let piece = self.piece_by_id(planned.piece_id).ok_or(IllegalMove {
                    piece_id: planned.piece_id,
                    reason: "piece not found",
                })?;
                if piece.player_id != player_id {
                    return Err(IllegalMove {
                        piece_id: planned.piece_id,
                        reason: "piece not owned by this player",
                    });
                }
                Ok(TimelineEventAction {
                    player_id: piece.player_id,
                    piece_id: planned.piece_id,
                    action: planned.action,
                })
            })
            .collect()
    }

    /// Resolve one round of simultaneous moves into an ordered timeline.
    ///
    /// Runs event iterations until the move set is exhausted: grow victim
    /// chains until the shortest chains complete, settle push conflicts
    /// (head-on pairs preempt many-to-one groups), settle convergence
    /// conflicts on shared target cells, then execute the surviving pushes
    /// atomically. Pieces whose staged position leaves the platform are
    /// removed.
    pub fn perform_player_moves(
        &mut self,
        moves: Vec<TimelineEventAction>,
    ) -> Result<Vec<TimelineEvent>, BoardError> {
        let mut action_by_piece_id: BTreeMap<PieceId, TimelineEventAction> = BTreeMap::new();
        let mut remaining_moves: BTreeMap<PieceId, Direction> = BTreeMap::new();
        for action in moves {
            if let Some(direction) = action.action.as_direction() {
                remaining_moves.insert(action.piece_id, direction);
            }
            action_by_piece_id.insert(action.piece_id, action);
        }

        let mut events = Vec::new();
        while !remaining_moves.is_empty() {
            match self.perform_move_event(&action_by_piece_id, &mut remaining_moves)? {
                Some(event) => events.push(event),
                // every surviving mover's piece is gone; nothing left to resolve
                None => break,
            }
        }
        Ok(events)
    }

    fn perform_move_event(
        &mut self,
        action_by_piece_id: &BTreeMap<PieceId, TimelineEventAction>,
        remaining_moves: &mut BTreeMap<PieceId, Direction>,
    ) -> Result<Option<TimelineEvent>, BoardError> {
        let mut event = TimelineEvent::new();

        let mut chains: BTreeMap<PieceId, Vec<PieceId>> = BTreeMap::new();
        let victim_chain_length = self.isolate_complete_push_chains(remaining_moves, &mut chains);
        if chains.is_empty() {
            return Ok(None);
        }

        // Chains that run into another pusher are truncated right before it;
        // the terminator must itself move this event for the truncated chain
        // to have a free target cell.
        let mut terminator_by_pusher: BTreeMap<PieceId, PieceId> = BTreeMap::new();

        match find_push_conflicts(
            &mut chains,
            remaining_moves,
            victim_chain_length,
            &mut terminator_by_pusher,
        ) {
            DetectedPushConflicts::HeadOn(outcomes) => {
                for payload in outcomes {
                    for &piece_id in &payload.piece_ids {
                        event.actions.push(action_by_piece_id[&piece_id].clone());
                        remaining_moves.remove(&piece_id);
                        chains.remove(&piece_id);
                    }
                    event.outcomes.push(Outcome::PushConflict(payload));
                }
                return Ok(Some(event));
            }
            DetectedPushConflicts::ManyToOne(outcomes) => {
                for payload in outcomes {
                    for &piece_id in &payload.piece_ids {
                        event.actions.push(action_by_piece_id[&piece_id].clone());
                        remaining_moves.remove(&piece_id);
                        chains.remove(&piece_id);
                    }
                    event.outcomes.push(Outcome::PushConflict(payload));
                }
            }
            DetectedPushConflicts::None => {}
        }

        // Convergence: several chains targeting the same empty cell.
        let mut pushers_by_target: BTreeMap<Position, Vec<PieceId>> = BTreeMap::new();
        for (&pusher_piece_id, chain) in &chains {
            let Some(pusher_piece) = self.piece_by_id(pusher_piece_id) else {
                return Err(BoardError::ResolutionInvariant {
                    position: Position::default(),
                });
            };
            let direction = remaining_moves[&pusher_piece_id];
            let target = pusher_piece
                .position
                .offset_in_direction(direction, chain.len() as u32);
            pushers_by_target.entry(target).or_default().push(pusher_piece_id);
        }
        for (target, pushers) in pushers_by_target {
            if pushers.len() < 2 {
                continue;
            }
            for piece_id in &pushers {
                event.actions.push(action_by_piece_id[piece_id].clone());
                remaining_moves.remove(piece_id);
                chains.remove(piece_id);
            }
            event.outcomes.push(Outcome::MoveConflict(MoveConflictOutcomePayload {
                piece_ids: pushers,
                collision_point: target,
            }));
        }

        // Withhold chains whose truncation point no longer moves this event;
        // their target cell stays occupied. The move is retried next event.
        loop {
            let withheld: Vec<PieceId> = chains
                .keys()
                .filter(|&pusher| {
                    terminator_by_pusher
                        .get(pusher)
                        .is_some_and(|terminator| !chains.contains_key(terminator))
                })
                .copied()
                .collect();
            if withheld.is_empty() {
                break;
            }
            for pusher in withheld {
                chains.remove(&pusher);
            }
        }

        let mut push_outcomes = Vec::with_capacity(chains.len());
        for (&pusher_piece_id, chain) in &chains {
            event
                .actions
                .push(action_by_piece_id[&pusher_piece_id].clone());
            let payload = PushOutcomePayload {
                pusher_piece_id,
                victim_piece_ids: chain[1..].to_vec(),
                direction: remaining_moves[&pusher_piece_id],
            };
            event.outcomes.push(Outcome::Push(payload.clone()));
            push_outcomes.push(payload);
        }
        for pusher_piece_id in chains.keys() {
            remaining_moves.remove(pusher_piece_id);
        }

        self.execute_push_outcomes(&push_outcomes)?;
        Ok(Some(event))
    }

    /// Grow every mover's victim chain in lockstep until at least one chain
    /// ends on an empty cell. Returns the victim count of the chains that
    /// completed; movers whose piece disappeared in an earlier event are
    /// silently dropped.
    fn isolate_complete_push_chains(
        &self,
        remaining_moves: &mut BTreeMap<PieceId, Direction>,
        complete_chains: &mut BTreeMap<PieceId, Vec<PieceId>>,
    ) -> u32 {
        let mut incomplete_chains: BTreeMap<PieceId, Vec<PieceId>> = BTreeMap::new();
        let mut victim_chain_length: u32 = 0;

        while !remaining_moves.is_empty() {
            let mut finished = false;
            let pushers: Vec<(PieceId, Direction)> = remaining_moves
                .iter()
                .map(|(&piece_id, &direction)| (piece_id, direction))
                .collect();

            for (pusher_piece_id, push_direction) in pushers {
                let Some(pusher_piece) = self.piece_by_id(pusher_piece_id) else {
                    remaining_moves.remove(&pusher_piece_id);
                    incomplete_chains.remove(&pusher_piece_id);
                    continue;
                };
                let chain = incomplete_chains
                    .entry(pusher_piece_id)
                    .or_insert_with(|| vec![pusher_piece_id]);

                let victim_position = pusher_piece
                    .position
                    .offset_in_direction(push_direction, victim_chain_length + 1);
                if let Some(victim) = self.piece_at_position(victim_position) {
                    chain.push(victim.piece_id);
                    continue;
                }

                complete_chains.insert(pusher_piece_id, chain.clone());
                finished = true;
            }

            if finished {
                break;
            }
            victim_chain_length += 1;
        }

        victim_chain_length
    }

    /// Stage every pushed piece's next cell, validate the staging, then
    /// apply it in one shot. Staged cells that leave the platform delete the
    /// piece. A staging clash means an upstream resolution bug; the board is
    /// left untouched in that case.
    fn execute_push_outcomes(
        &mut self,
        pushes: &[PushOutcomePayload],
    ) -> Result<(), BoardError> {
        if pushes.is_empty() {
            return Ok(());
        }

        let mut staged_moves: Vec<(Position, Position)> = Vec::new();
        for push in pushes {
            let chain_piece_ids =
                std::iter::once(push.pusher_piece_id).chain(push.victim_piece_ids.iter().copied());
            for piece_id in chain_piece_ids {
                let Some(&old_position) = self.position_by_piece_id.get(&piece_id) else {
                    return Err(BoardError::ResolutionInvariant {
                        position: Position::default(),
                    });
                };
                let new_position = old_position.offset_in_direction(push.direction, 1);
                staged_moves.push((old_position, new_position));
            }
        }

        let vacated: HashSet<Position> = staged_moves.iter().map(|&(old, _)| old).collect();
        if vacated.len() != staged_moves.len() {
            // some piece was staged twice
            return Err(BoardError::ResolutionInvariant {
                position: staged_moves[0].0,
            });
        }
        let mut staged_targets: HashSet<Position> = HashSet::new();
        for &(_, new) in &staged_moves {
            if !staged_targets.insert(new)
                || (self.piece_by_position.contains_key(&new) && !vacated.contains(&new))
            {
                return Err(BoardError::ResolutionInvariant { position: new });
            }
        }

        let mut landed: Vec<(Position, PieceInformation)> = Vec::new();
        for &(old, new) in &staged_moves {
            let Some(info) = self.piece_by_position.remove(&old) else {
                return Err(BoardError::ResolutionInvariant { position: old });
            };
            self.position_by_piece_id.remove(&info.piece_id);
            if self.platform.is_position_on_board(new) {
                landed.push((new, info));
            }
        }
        for (position, info) in landed {
            self.position_by_piece_id.insert(info.piece_id, position);
            self.piece_by_position.insert(position, info);
        }
        Ok(())
    }
}

/// Scan the completed chains for push conflicts at the shortest distance.
///
/// Every chain is truncated at the first other-mover it contains (recorded
/// in `terminator_by_pusher`). Opposed movers form head-on pairs meeting at
/// `victim_chain_length / 2`; distinct movers whose chains reach the same
/// victim at the same (minimal) depth form a many-to-one group. Only groups
/// at the globally shortest distance conflict this event.
fn find_push_conflicts(
    chains: &mut BTreeMap<PieceId, Vec<PieceId>>,
    remaining_moves: &BTreeMap<PieceId, Direction>,
    victim_chain_length: u32,
    terminator_by_pusher: &mut BTreeMap<PieceId, PieceId>,
) -> DetectedPushConflicts {
    if victim_chain_length == 0 {
        return DetectedPushConflicts::None;
    }

    fn update_global_min(current: &mut Option<u32>, candidate: u32) {
        if current.map_or(true, |existing| candidate < existing) {
            *current = Some(candidate);
        }
    }

    let mut global_min_distance: Option<u32> = None;
    let mut head_on_collisions: BTreeMap<(PieceId, PieceId), u32> = BTreeMap::new();
    let mut victim_to_pushers: BTreeMap<PieceId, (u32, Vec<PieceId>)> = BTreeMap::new();

    let pusher_ids: Vec<PieceId> = chains.keys().copied().collect();
    for pusher_piece_id in pusher_ids {
        let victims: Vec<PieceId> = chains[&pusher_piece_id][1..].to_vec();
        for (victim_index, &victim_piece_id) in victims.iter().enumerate() {
            let chain_idx = victim_index as u32 + 1;

            if chains.contains_key(&victim_piece_id) {
                // ran into another mover: cut the chain right before it
                if let Some(chain) = chains.get_mut(&pusher_piece_id) {
                    chain.truncate(chain_idx as usize);
                }
                terminator_by_pusher.insert(pusher_piece_id, victim_piece_id);

                let pair = ordered_pair(pusher_piece_id, victim_piece_id);
                if head_on_collisions.contains_key(&pair) {
                    break;
                }
                let pusher_direction = remaining_moves[&pusher_piece_id];
                let other_direction = remaining_moves[&victim_piece_id];
                if pusher_direction != other_direction.opposite() {
                    break;
                }
                let min_distance = victim_chain_length / 2;
                head_on_collisions.insert(pair, min_distance);
                update_global_min(&mut global_min_distance, min_distance);
                break;
            }

            let entry = victim_to_pushers
                .entry(victim_piece_id)
                .or_insert_with(|| (chain_idx, Vec::new()));
            if chain_idx < entry.0 {
                *entry = (chain_idx, vec![pusher_piece_id]);
            } else if chain_idx == entry.0 {
                entry.1.push(pusher_piece_id);
            }
            if entry.1.len() >= 2 {
                let distance = entry.0;
                update_global_min(&mut global_min_distance, distance);
            }
        }
    }

    let Some(global_min_distance) = global_min_distance else {
        return DetectedPushConflicts::None;
    };

    let mut head_on_outcomes = Vec::new();
    for (&(first, second), &distance) in &head_on_collisions {
        if distance == global_min_distance {
            head_on_outcomes.push(PushConflictOutcomePayload {
                piece_ids: vec![first, second],
                collision_point: None,
            });
        }
    }
    if !head_on_outcomes.is_empty() {
        return DetectedPushConflicts::HeadOn(head_on_outcomes);
    }

    let mut many_to_one = Vec::new();
    for (distance, pushers) in victim_to_pushers.values() {
        if *distance == global_min_distance && pushers.len() >= 2 {
            many_to_one.push(PushConflictOutcomePayload {
                piece_ids: pushers.clone(),
                collision_point: None,
            });
        }
    }
    if many_to_one.is_empty() {
        DetectedPushConflicts::None
    } else {
        DetectedPushConflicts::ManyToOne(many_to_one)
    }
}

fn ordered_pair(a: PieceId, b: PieceId) -> (PieceId, PieceId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn shuffle<T, R: RngExt>(rng: &mut R, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        items.swap(i, rng.random_range(0..=i));
    }
}
