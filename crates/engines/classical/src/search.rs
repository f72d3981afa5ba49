//! Iterative deepening negascout with quiescence search.

use std::sync::Arc;

use chess_core::{
    MAX_MOVES, Move, MoveList, PieceKind, Position, TimeControl, Undo, check_evasions,
    is_legal, legal_moves_into, pseudo_legal_captures, pseudo_legal_captures_and_checks,
    pseudo_legal_moves,
};
use thiserror::Error;
use tracing::debug;

use crate::eval::{evaluate, piece_value};
use crate::listener::{PvInfo, SearchListener};
use crate::tt::{Bound, TranspositionTable};

/// Score of being mated at the root; mate in `n` plies scores `MATE0 - n`.
pub const MATE0: i32 = 32000;
pub const MAX_SEARCH_DEPTH: u32 = 64;
const MAX_PLY: usize = 128;
const INFINITE: i32 = MATE0 + 1;
/// Scores beyond this are mate scores.
const MATE_BOUND: i32 = MATE0 - 1000;
const STATS_INTERVAL_MS: u64 = 1000;

const HASH_MOVE_SCORE: i32 = 1_000_000;
const CAPTURE_SCORE: i32 = 100_000;
const KILLER_SCORE: i32 = 90_000;

/// The search was aborted by a stop request, the clock or the node limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("search stopped")]
pub struct StopSearch;

pub struct Search {
    pos: Position,
    /// Hashes of the positions before the current one, oldest first
    history: Vec<u64>,
    tt: Arc<TranspositionTable>,
    listener: Option<Box<dyn SearchListener>>,
    tc: TimeControl,
    nodes: u64,
    max_nodes: Option<u64>,
    max_depth: u32,
    /// Depth of the iteration in progress
    iter_depth: u32,
    last_stats_ms: u64,
    killers: Vec<[Move; 2]>,
    strength: u32,
    random_seed: u64,
}

impl Search {
    pub fn new(
        pos: Position,
        hash_history: Vec<u64>,
        tt: Arc<TranspositionTable>,
        listener: Option<Box<dyn SearchListener>>,
        tc: TimeControl,
    ) -> Self {
        Search {
            pos,
            history: hash_history,
            tt,
            listener,
            tc,
            nodes: 0,
            max_nodes: None,
            max_depth: MAX_SEARCH_DEPTH,
            iter_depth: 0,
            last_stats_ms: 0,
            killers: vec![[Move::NONE; 2]; MAX_PLY],
            strength: 1000,
            random_seed: 0,
        }
    }

    /// Reset to a new root position with its game history.
    pub fn init(&mut self, pos: Position, hash_history: Vec<u64>) {
        self.pos = pos;
        self.history = hash_history;
        self.killers.fill([Move::NONE; 2]);
        self.nodes = 0;
    }

    /// Play weaker: `strength` 1000 is full strength, lower values add a
    /// seeded, position-dependent evaluation error.
    pub fn set_strength(&mut self, strength: u32, random_seed: u64) {
        self.strength = strength.min(1000);
        self.random_seed = random_seed;
    }

    pub fn position(&self) -> &Position {
        &self.pos
    }

    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Search `root_moves` (legal moves of the root) with increasing depth
    /// until the depth or node limit, the time window or a stop request.
    /// Limits set on the [`TimeControl`] while the search runs are applied
    /// on top of `max_depth` and `max_nodes`; the tighter one wins.
    /// Returns the best move of the deepest useful iteration, None only when
    /// `root_moves` is empty.
    pub fn iterative_deepening(
        &mut self,
        root_moves: &MoveList,
        max_depth: Option<u32>,
        max_nodes: Option<u64>,
    ) -> Option<Move> {
        let mut moves: Vec<Move> = root_moves.to_vec();
        if moves.is_empty() {
            return None;
        }
        self.tt.new_search();
        self.nodes = 0;
        self.last_stats_ms = 0;
        self.max_nodes = max_nodes;
        self.max_depth = max_depth.unwrap_or(MAX_SEARCH_DEPTH).clamp(1, MAX_SEARCH_DEPTH);

        // Seed ordering with the hash move from an earlier search
        if let Some(e) = self.tt.probe(self.pos.position_hash())
            && let Some(i) = moves.iter().position(|&m| m == e.best_move)
        {
            moves[..=i].rotate_right(1);
        }

        for depth in 1..=MAX_SEARCH_DEPTH {
            if depth > 1 && depth > self.depth_limit() {
                break;
            }
            self.iter_depth = depth;
            if let Some(l) = self.listener.as_mut() {
                l.notify_depth(depth);
            }
            let score = match self.search_root(&mut moves, depth as i32) {
                Ok(score) => score,
                Err(StopSearch) => break,
            };
            self.report_pv(depth, score, Bound::Exact, moves[0]);
            debug!(depth, score, nodes = self.nodes, best = %moves[0], "iteration done");
            if self.tc.is_stopped() || self.tc.min_time_reached() {
                break;
            }
            // A mate inside the searched horizon cannot be improved on
            if score_is_mate(score) && mate_plies(score) < depth as i32 {
                break;
            }
        }
        self.send_stats();
        Some(moves[0])
    }

    /// One root iteration. Improvements are moved to the front of `moves`,
    /// so `moves[0]` is the best move found so far even when stopped.
    ///
    /// A later move that fails high on the null window is reported as a
    /// lower bound before its re-search. The root window is never capped
    /// from above, so no upper bound report exists.
    fn search_root(&mut self, moves: &mut [Move], depth: i32) -> Result<i32, StopSearch> {
        let mut alpha = -INFINITE;
        let beta = INFINITE;
        let mut best = -INFINITE;
        for i in 0..moves.len() {
            let mv = moves[i];
            if i > 0 && self.tc.check_time() {
                return Err(StopSearch);
            }
            if let Some(l) = self.listener.as_mut() {
                l.notify_curr_move(mv, i + 1);
            }

            let mut undo = self.make(mv);
            let gives_check = chess_core::in_check(&self.pos);
            let new_depth = depth - 1 + gives_check as i32;
            let mut result = if i == 0 {
                self.nega_scout(-beta, -alpha, 1, new_depth, gives_check).map(|s| -s)
            } else {
                self.nega_scout(-alpha - 1, -alpha, 1, new_depth, gives_check).map(|s| -s)
            };
            if i > 0
                && let Ok(s) = result
                && s > alpha
            {
                // PV extraction walks from the root
                self.unmake(mv, undo);
                self.report_pv(depth as u32, s, Bound::Lower, mv);
                undo = self.make(mv);
                result = self.nega_scout(-beta, -alpha, 1, new_depth, gives_check).map(|s| -s);
            }
            self.unmake(mv, undo);
            let score = result?;

            if score > best {
                best = score;
                moves[..=i].rotate_right(1);
                if i > 0 {
                    self.report_pv(depth as u32, score, Bound::Exact, mv);
                }
            }
            alpha = alpha.max(score);
        }
        self.tt
            .store(self.pos.position_hash(), moves[0], score_to_tt(best, 0), depth, Bound::Exact);
        Ok(best)
    }

    /// Negascout (principal variation search) from the current position.
    ///
    /// `in_check` must tell whether the side to move is in check. Depth is
    /// extended by one ply for moves that give check; at depth 0 the search
    /// continues with [`Search::quiesce`].
    pub fn nega_scout(
        &mut self,
        mut alpha: i32,
        mut beta: i32,
        ply: usize,
        depth: i32,
        in_check: bool,
    ) -> Result<i32, StopSearch> {
        self.poll()?;
        if ply > 0 {
            if self.is_repetition() || self.pos.is_insufficient_material() {
                return Ok(0);
            }
            if self.pos.is_fifty_move_draw() && !(in_check && self.no_legal_moves()) {
                return Ok(0);
            }
            // Mate distance pruning
            alpha = alpha.max(-(MATE0 - ply as i32));
            beta = beta.min(MATE0 - ply as i32 - 1);
            if alpha >= beta {
                return Ok(alpha);
            }
        }
        if ply >= MAX_PLY - 1 {
            return Ok(self.evaluate());
        }

        let hash = self.pos.position_hash();
        let mut hash_move = Move::NONE;
        if let Some(e) = self.tt.probe(hash) {
            hash_move = e.best_move;
            if ply > 0 && e.depth >= depth {
                let score = score_from_tt(e.score, ply);
                let cutoff = match e.bound {
                    Bound::Exact => true,
                    Bound::Lower => score >= beta,
                    Bound::Upper => score <= alpha,
                };
                if cutoff {
                    return Ok(score);
                }
            }
        }

        if depth <= 0 {
            return self.quiesce(alpha, beta, ply, in_check, true);
        }

        let mut list = MoveList::new();
        if in_check {
            check_evasions(&self.pos, &mut list);
        } else {
            pseudo_legal_moves(&self.pos, &mut list);
        }
        let mut scores = [0i32; MAX_MOVES];
        self.score_moves(&list, &mut scores, hash_move, ply);

        let alpha0 = alpha;
        let mover = self.pos.side_to_move;
        let mut best = -INFINITE;
        let mut best_move = Move::NONE;
        let mut legal = 0;
        for i in 0..list.len() {
            pick_next(&mut list, &mut scores, i);
            let mv = list[i];
            let is_quiet = self.is_quiet(mv);

            let undo = self.make(mv);
            if self.pos.in_check(mover) {
                self.unmake(mv, undo);
                continue;
            }
            legal += 1;
            let gives_check = chess_core::in_check(&self.pos);
            let new_depth = depth - 1 + gives_check as i32;
            let result = if legal == 1 {
                self.nega_scout(-beta, -alpha, ply + 1, new_depth, gives_check)
                    .map(|s| -s)
            } else {
                self.nega_scout(-alpha - 1, -alpha, ply + 1, new_depth, gives_check)
                    .and_then(|s| {
                        if -s > alpha && -s < beta {
                            self.nega_scout(-beta, -alpha, ply + 1, new_depth, gives_check)
                        } else {
                            Ok(s)
                        }
                    })
                    .map(|s| -s)
            };
            self.unmake(mv, undo);
            let score = result?;

            if score > best {
                best = score;
                best_move = mv;
            }
            if score > alpha {
                alpha = score;
                if alpha >= beta {
                    if is_quiet {
                        self.add_killer(mv, ply);
                    }
                    break;
                }
            }
        }

        if legal == 0 {
            return Ok(if in_check { -(MATE0 - ply as i32) } else { 0 });
        }
        let bound = if best >= beta {
            Bound::Lower
        } else if best > alpha0 {
            Bound::Exact
        } else {
            Bound::Upper
        };
        self.tt
            .store(hash, best_move, score_to_tt(best, ply), depth, bound);
        Ok(best)
    }

    /// Captures-only search to settle tactical sequences. Checks are
    /// answered with a full evasion search; `with_checks` also tries
    /// quiet checking moves.
    fn quiesce(
        &mut self,
        mut alpha: i32,
        beta: i32,
        ply: usize,
        in_check: bool,
        with_checks: bool,
    ) -> Result<i32, StopSearch> {
        if ply >= MAX_PLY - 1 {
            return Ok(self.evaluate());
        }
        let mut best = -INFINITE;
        let mut list = MoveList::new();
        if in_check {
            check_evasions(&self.pos, &mut list);
        } else {
            best = self.evaluate();
            if best >= beta {
                return Ok(best);
            }
            alpha = alpha.max(best);
            if with_checks {
                pseudo_legal_captures_and_checks(&self.pos, &mut list);
            } else {
                pseudo_legal_captures(&self.pos, &mut list);
            }
        }
        let mut scores = [0i32; MAX_MOVES];
        self.score_moves(&list, &mut scores, Move::NONE, ply);

        let mover = self.pos.side_to_move;
        let mut legal = 0;
        for i in 0..list.len() {
            pick_next(&mut list, &mut scores, i);
            let mv = list[i];
            let undo = self.make(mv);
            if self.pos.in_check(mover) {
                self.unmake(mv, undo);
                continue;
            }
            legal += 1;
            let gives_check = chess_core::in_check(&self.pos);
            let result = self.poll().and_then(|_| {
                self.quiesce(-beta, -alpha, ply + 1, gives_check, false)
                    .map(|s| -s)
            });
            self.unmake(mv, undo);
            let score = result?;

            if score > best {
                best = score;
                if score > alpha {
                    alpha = score;
                    if alpha >= beta {
                        break;
                    }
                }
            }
        }
        if in_check && legal == 0 {
            return Ok(-(MATE0 - ply as i32));
        }
        Ok(best)
    }

    fn make(&mut self, mv: Move) -> Undo {
        self.history.push(self.pos.position_hash());
        self.pos.make_move(mv)
    }

    fn unmake(&mut self, mv: Move, undo: Undo) {
        self.pos.unmake_move(mv, undo);
        self.history.pop();
    }

    fn depth_limit(&self) -> u32 {
        self.tc.depth_limit().map_or(self.max_depth, |d| d.min(self.max_depth))
    }

    fn node_limit(&self) -> Option<u64> {
        match (self.max_nodes, self.tc.node_limit()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Count a node and check the stop conditions.
    #[inline]
    fn poll(&mut self) -> Result<(), StopSearch> {
        self.nodes += 1;
        if self.node_limit().is_some_and(|max| self.nodes >= max) || self.tc.is_stopped() {
            return Err(StopSearch);
        }
        if self.tc.should_check_time(self.nodes) {
            if self.tc.check_time() || self.iter_depth > self.depth_limit() {
                return Err(StopSearch);
            }
            let elapsed = self.tc.elapsed().as_millis() as u64;
            if elapsed >= self.last_stats_ms + STATS_INTERVAL_MS {
                self.last_stats_ms = elapsed;
                self.send_stats();
            }
        }
        Ok(())
    }

    /// Repetition of a position since the last irreversible move.
    fn is_repetition(&self) -> bool {
        let key = self.pos.position_hash();
        let window = (self.pos.halfmove_clock as usize).min(self.history.len());
        self.history[self.history.len() - window..]
            .iter()
            .rev()
            .skip(1)
            .step_by(2)
            .any(|&h| h == key)
    }

    fn no_legal_moves(&mut self) -> bool {
        let mut list = MoveList::new();
        legal_moves_into(&mut self.pos, &mut list);
        list.is_empty()
    }

    fn evaluate(&self) -> i32 {
        let score = evaluate(&self.pos);
        if self.strength >= 1000 {
            return score;
        }
        let amplitude = ((1000 - self.strength) / 2) as i64;
        let h = mix(self.pos.position_hash() ^ self.random_seed);
        let noise = (h % (2 * amplitude as u64 + 1)) as i64 - amplitude;
        (score as i64 + noise).clamp(-MATE_BOUND as i64 + 1, MATE_BOUND as i64 - 1) as i32
    }

    fn is_quiet(&self, mv: Move) -> bool {
        mv.promo.is_none() && self.pos.piece_at(mv.to).is_none() && !self.is_en_passant(mv)
    }

    fn is_en_passant(&self, mv: Move) -> bool {
        Some(mv.to) == self.pos.en_passant
            && self
                .pos
                .piece_at(mv.from)
                .is_some_and(|p| p.kind == PieceKind::Pawn)
    }

    /// Hash move first, then captures by MVV/LVA, then killers.
    fn score_moves(&self, list: &MoveList, scores: &mut [i32], hash_move: Move, ply: usize) {
        let killers = self.killers[ply.min(MAX_PLY - 1)];
        for (i, &mv) in list.iter().enumerate() {
            scores[i] = if mv == hash_move {
                HASH_MOVE_SCORE
            } else if let Some(victim) = self.pos.piece_at(mv.to) {
                let attacker = self.pos.piece_at(mv.from).map_or(0, |p| piece_value(p.kind));
                CAPTURE_SCORE + 10 * piece_value(victim.kind) - attacker / 10
            } else if self.is_en_passant(mv) {
                CAPTURE_SCORE + 10 * piece_value(PieceKind::Pawn) - 10
            } else if let Some(promo) = mv.promo {
                CAPTURE_SCORE + piece_value(promo)
            } else if mv == killers[0] {
                KILLER_SCORE
            } else if mv == killers[1] {
                KILLER_SCORE - 1
            } else {
                0
            };
        }
    }

    fn add_killer(&mut self, mv: Move, ply: usize) {
        let slot = &mut self.killers[ply.min(MAX_PLY - 1)];
        if slot[0] != mv {
            slot[1] = slot[0];
            slot[0] = mv;
        }
    }

    /// Follow best moves through the table, stopping at illegal moves and
    /// repeated positions.
    fn extract_pv(&mut self, first: Move, max_len: usize) -> Vec<Move> {
        let mut pv = vec![first];
        let mut undos = Vec::new();
        let mut seen = vec![self.pos.position_hash()];
        undos.push((first, self.pos.make_move(first)));
        while pv.len() < max_len {
            let hash = self.pos.position_hash();
            if seen.contains(&hash) {
                break;
            }
            seen.push(hash);
            let Some(e) = self.tt.probe(hash) else { break };
            let mv = e.best_move;
            if !is_legal(&mut self.pos, mv) {
                break;
            }
            pv.push(mv);
            undos.push((mv, self.pos.make_move(mv)));
        }
        for (mv, undo) in undos.into_iter().rev() {
            self.pos.unmake_move(mv, undo);
        }
        pv
    }

    fn report_pv(&mut self, depth: u32, score: i32, bound: Bound, best: Move) {
        if self.listener.is_none() {
            return;
        }
        let pv = self.extract_pv(best, depth as usize + 8);
        let time_ms = self.tc.elapsed().as_millis() as u64;
        let is_mate = score_is_mate(score);
        let info = PvInfo {
            depth,
            score: if is_mate { mate_in_moves(score) } else { score },
            time_ms,
            nodes: self.nodes,
            nps: nps(self.nodes, time_ms),
            is_mate,
            upper_bound: bound == Bound::Upper,
            lower_bound: bound == Bound::Lower,
            pv,
        };
        if let Some(l) = self.listener.as_mut() {
            l.notify_pv(&info);
        }
    }

    fn send_stats(&mut self) {
        let time_ms = self.tc.elapsed().as_millis() as u64;
        let nodes = self.nodes;
        if let Some(l) = self.listener.as_mut() {
            l.notify_stats(nodes, nps(nodes, time_ms), time_ms);
        }
    }
}

/// Bring the best remaining move to `start`.
fn pick_next(list: &mut MoveList, scores: &mut [i32], start: usize) {
    let mut best = start;
    for j in start + 1..list.len() {
        if scores[j] > scores[best] {
            best = j;
        }
    }
    list.swap(start, best);
    scores.swap(start, best);
}

fn score_is_mate(score: i32) -> bool {
    score.abs() > MATE_BOUND
}

/// Plies to the mate for a mate score.
fn mate_plies(score: i32) -> i32 {
    MATE0 - score.abs()
}

/// Moves to mate, negative when the side to move gets mated.
fn mate_in_moves(score: i32) -> i32 {
    if score > 0 {
        (mate_plies(score) + 1) / 2
    } else {
        -(mate_plies(score) / 2)
    }
}

/// Mate scores are stored relative to the node, not the root.
fn score_to_tt(score: i32, ply: usize) -> i32 {
    if score > MATE_BOUND {
        score + ply as i32
    } else if score < -MATE_BOUND {
        score - ply as i32
    } else {
        score
    }
}

fn score_from_tt(score: i32, ply: usize) -> i32 {
    if score > MATE_BOUND {
        score - ply as i32
    } else if score < -MATE_BOUND {
        score + ply as i32
    } else {
        score
    }
}

fn nps(nodes: u64, time_ms: u64) -> u64 {
    if time_ms == 0 { 0 } else { nodes * 1000 / time_ms }
}

/// splitmix64 finaliser
fn mix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod search_tests;
