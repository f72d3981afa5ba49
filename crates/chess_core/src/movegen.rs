//! Move generation and legality checks.
//!
//! Generators write pseudo-legal moves into a caller-owned [`MoveList`];
//! [`remove_illegal`] then filters out moves that leave the mover's king
//! attacked. Piece order within a list is fixed (queens, rooks, bishops,
//! king, knights, castling, pawns) so identical positions always yield
//! identical sequences.

use crate::attacks::*;
use crate::bitboard::Bitboard;
use crate::board::{CastlingRights, Position};
use crate::types::*;

const PIECE_ORDER: [PieceKind; 5] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::King,
    PieceKind::Knight,
];

/// Attack set of a non-pawn piece.
#[inline(always)]
fn piece_attacks(kind: PieceKind, sq: u8, occupied: Bitboard) -> Bitboard {
    match kind {
        PieceKind::Knight => knight_attacks(sq),
        PieceKind::Bishop => bishop_attacks(sq, occupied),
        PieceKind::Rook => rook_attacks(sq, occupied),
        PieceKind::Queen => queen_attacks(sq, occupied),
        PieceKind::King => king_attacks(sq),
        PieceKind::Pawn => Bitboard::EMPTY,
    }
}

/// Per-side pawn geometry.
struct PawnDirs {
    /// Index delta of a single push
    up: i8,
    /// Rank a single push must land on to allow a double push
    double_rank: Bitboard,
    /// Rank where pawns promote
    last_rank: Bitboard,
}

#[inline(always)]
fn pawn_dirs(side: Color) -> PawnDirs {
    match side {
        Color::White => PawnDirs {
            up: 8,
            double_rank: Bitboard::RANK_3,
            last_rank: Bitboard::RANK_8,
        },
        Color::Black => PawnDirs {
            up: -8,
            double_rank: Bitboard::RANK_6,
            last_rank: Bitboard::RANK_1,
        },
    }
}

/// Which pawn moves a generator wants.
#[derive(Clone, Copy)]
struct PawnTargets {
    /// Allowed destinations for pushes
    push: Bitboard,
    /// Allowed destinations for captures
    capture: Bitboard,
    /// Rook and bishop promotions as well as queen and knight
    all_promotions: bool,
    /// Include the en-passant capture
    en_passant: bool,
}

/// Add one move per set bit of `mask`, origin found by stepping back `delta`.
#[inline]
fn add_pawn_moves_by_mask(
    list: &mut MoveList,
    mask: Bitboard,
    delta: i8,
    promote: bool,
    all: bool,
) {
    for to in mask {
        let from = (to as i8 - delta) as u8;
        if promote {
            list.add_move(from, to, Some(PieceKind::Queen));
            if all {
                list.add_move(from, to, Some(PieceKind::Rook));
                list.add_move(from, to, Some(PieceKind::Bishop));
            }
            list.add_move(from, to, Some(PieceKind::Knight));
        } else {
            list.add_move(from, to, None);
        }
    }
}

fn add_pawn_moves(pos: &Position, list: &mut MoveList, pawns: Bitboard, t: PawnTargets) {
    let us = pos.side_to_move;
    let d = pawn_dirs(us);
    let empty = !pos.occupied();

    let single = pawns.shift(d.up) & empty;
    let double = (single & d.double_rank).shift(d.up) & empty & t.push;
    let single = single & t.push;
    add_pawn_moves_by_mask(list, single & !d.last_rank, d.up, false, false);
    add_pawn_moves_by_mask(list, single & d.last_rank, d.up, true, t.all_promotions);
    add_pawn_moves_by_mask(list, double, 2 * d.up, false, false);

    let them = pos.color_bb(us.other()) & t.capture;
    for (mask, delta) in [
        (pawns & Bitboard::NOT_FILE_H, d.up + 1),
        (pawns & Bitboard::NOT_FILE_A, d.up - 1),
    ] {
        let hits = mask.shift(delta) & them;
        add_pawn_moves_by_mask(list, hits & !d.last_rank, delta, false, false);
        add_pawn_moves_by_mask(list, hits & d.last_rank, delta, true, t.all_promotions);
    }

    if t.en_passant
        && let Some(ep) = pos.en_passant
    {
        for from in pawn_attacks(ep, us.other()) & pawns {
            list.add_move(from, ep, None);
        }
    }
}

/// Moves of queens, rooks, bishops, king and knights onto `targets`.
///
/// `extra` widens the targets for pieces standing on its `sources` squares.
fn add_piece_moves(
    pos: &Position,
    list: &mut MoveList,
    targets: impl Fn(PieceKind) -> Bitboard,
    sources: Bitboard,
    extra: Bitboard,
) {
    let us = pos.side_to_move;
    let occupied = pos.occupied();
    for kind in PIECE_ORDER {
        let allowed = targets(kind);
        for from in pos.pieces(us, kind) {
            let mut dest = allowed;
            if sources.contains(from) {
                dest |= extra;
            }
            for to in piece_attacks(kind, from, occupied) & dest {
                list.add_move(from, to, None);
            }
        }
    }
}

/// Castling moves with empty path, rook on its square and king not passing
/// through an attacked square. The destination is left to [`remove_illegal`].
fn add_castling(pos: &Position, list: &mut MoveList) {
    let us = pos.side_to_move;
    let home: u8 = if us == Color::White { 4 } else { 60 };
    if pos.king_sq(us) != Some(home) {
        return;
    }
    let occupied = pos.occupied();
    let rook = Some(Piece::new(us, PieceKind::Rook));
    let kingside = CastlingRights::kingside(us);
    let queenside = CastlingRights::queenside(us);
    if !pos.castling.has(kingside | queenside) || sq_attacked(pos, home, occupied) {
        return;
    }

    if pos.castling.has(kingside)
        && (Bitboard(0x60u64 << (home - 4)) & occupied).is_empty()
        && pos.piece_at(home + 3) == rook
        && !sq_attacked(pos, home + 1, occupied)
    {
        list.add_move(home, home + 2, None);
    }
    if pos.castling.has(queenside)
        && (Bitboard(0x0Eu64 << (home - 4)) & occupied).is_empty()
        && pos.piece_at(home - 4) == rook
        && !sq_attacked(pos, home - 1, occupied)
    {
        list.add_move(home, home - 2, None);
    }
}

/// Every pseudo-legal move for the side to move, all promotions included.
pub fn pseudo_legal_moves(pos: &Position, list: &mut MoveList) {
    let us = pos.side_to_move;
    let not_own = !pos.color_bb(us);
    add_piece_moves(pos, list, |_| not_own, Bitboard::EMPTY, Bitboard::EMPTY);
    add_castling(pos, list);
    add_pawn_moves(
        pos,
        list,
        pos.pieces(us, PieceKind::Pawn),
        PawnTargets {
            push: Bitboard::ALL,
            capture: Bitboard::ALL,
            all_promotions: true,
            en_passant: true,
        },
    );
}

/// Captures, en passant and queen/knight promotions.
pub fn pseudo_legal_captures(pos: &Position, list: &mut MoveList) {
    let us = pos.side_to_move;
    let them = pos.color_bb(us.other());
    add_piece_moves(pos, list, |_| them, Bitboard::EMPTY, Bitboard::EMPTY);
    add_pawn_moves(
        pos,
        list,
        pos.pieces(us, PieceKind::Pawn),
        PawnTargets {
            push: pawn_dirs(us).last_rank,
            capture: Bitboard::ALL,
            all_promotions: false,
            en_passant: true,
        },
    );
}

/// Our pieces standing alone between one of our sliders and `king`.
fn discovered_check_candidates(pos: &Position, king: u8) -> Bitboard {
    let us = pos.side_to_move;
    let occupied = pos.occupied();
    let queens = pos.pieces(us, PieceKind::Queen);
    let snipers = (rook_attacks(king, Bitboard::EMPTY)
        & (pos.pieces(us, PieceKind::Rook) | queens))
        | (bishop_attacks(king, Bitboard::EMPTY) & (pos.pieces(us, PieceKind::Bishop) | queens));

    let mut candidates = Bitboard::EMPTY;
    for sniper in snipers {
        let blockers = between(sniper, king) & occupied;
        if blockers.any() && !blockers.more_than_one() {
            candidates |= blockers & pos.color_bb(us);
        }
    }
    candidates
}

/// Captures plus moves that may give check.
///
/// Over-includes quiet moves of pieces that could uncover a check, and all
/// castling moves. Rook and bishop under-promotions are never produced.
pub fn pseudo_legal_captures_and_checks(pos: &Position, list: &mut MoveList) {
    let us = pos.side_to_move;
    let them = us.other();
    pseudo_legal_captures(pos, list);

    let Some(king) = pos.king_sq(them) else {
        return;
    };
    let occupied = pos.occupied();
    let empty = !occupied;
    let discoverers = discovered_check_candidates(pos, king);

    let checks = |kind: PieceKind| match kind {
        PieceKind::King => Bitboard::EMPTY,
        _ => piece_attacks(kind, king, occupied) & empty,
    };
    add_piece_moves(pos, list, checks, discoverers, empty);
    add_castling(pos, list);

    // Quiet pawn pushes that attack the king or step off a discovery line.
    // Promotions were already produced by the capture generator.
    let d = pawn_dirs(us);
    let pawns = pos.pieces(us, PieceKind::Pawn);
    let quiet = !d.last_rank;
    let direct = PawnTargets {
        push: pawn_attacks(king, them) & quiet,
        capture: Bitboard::EMPTY,
        all_promotions: false,
        en_passant: false,
    };
    add_pawn_moves(pos, list, pawns & !discoverers, direct);
    add_pawn_moves(
        pos,
        list,
        pawns & discoverers,
        PawnTargets {
            push: quiet,
            ..direct
        },
    );
}

/// Moves that may resolve a check: king steps to unattacked squares, and for
/// a single checker, captures of it or interpositions on its line.
pub fn check_evasions(pos: &Position, list: &mut MoveList) {
    let us = pos.side_to_move;
    let them = us.other();
    let Some(king) = pos.king_sq(us) else {
        return;
    };
    let occupied = pos.occupied();
    let own = pos.color_bb(us);
    let checkers = pos.attackers_to(king, them, occupied);

    let mut valid = Bitboard::EMPTY;
    let single = checkers.any() && !checkers.more_than_one();
    if let Some(checker) = checkers.lsb()
        && single
    {
        valid = between(king, checker) | Bitboard::from_square(checker);
    }
    let without_king = occupied ^ Bitboard::from_square(king);
    for kind in PIECE_ORDER {
        for from in pos.pieces(us, kind) {
            if kind == PieceKind::King {
                for to in king_attacks(from) & !own {
                    if !sq_attacked(pos, to, without_king) {
                        list.add_move(from, to, None);
                    }
                }
            } else if single {
                for to in piece_attacks(kind, from, occupied) & valid {
                    list.add_move(from, to, None);
                }
            }
        }
    }
    if !single {
        return;
    }

    let mut en_passant = false;
    if let Some(ep) = pos.en_passant {
        let victim = if us == Color::White { ep - 8 } else { ep + 8 };
        en_passant = checkers.contains(victim) || valid.contains(ep);
    }
    add_pawn_moves(
        pos,
        list,
        pos.pieces(us, PieceKind::Pawn),
        PawnTargets {
            push: valid & !checkers,
            capture: checkers,
            all_promotions: true,
            en_passant,
        },
    );
}

/// Drop every move that leaves the mover's king attacked.
pub fn remove_illegal(pos: &mut Position, list: &mut MoveList) {
    let mover = pos.side_to_move;
    list.retain(|mv| {
        let undo = pos.make_move(mv);
        let illegal = pos.in_check(mover);
        pos.unmake_move(mv, undo);
        !illegal
    });
}

/// True if `mv` is pseudo-legal here and does not leave the king attacked.
///
/// Safe to call with moves from hash tables or killer slots that may belong
/// to another position.
pub fn is_legal(pos: &mut Position, mv: Move) -> bool {
    if mv.is_none() {
        return false;
    }
    match pos.piece_at(mv.from) {
        Some(pc) if pc.color == pos.side_to_move => {}
        _ => return false,
    }
    let mut list = MoveList::new();
    if in_check(pos) {
        check_evasions(pos, &mut list);
    } else {
        pseudo_legal_moves(pos, &mut list);
    }
    if !list.contains(mv) {
        return false;
    }
    let mover = pos.side_to_move;
    let undo = pos.make_move(mv);
    let legal = !pos.in_check(mover);
    pos.unmake_move(mv, undo);
    legal
}

/// True if the side to move is in check.
#[inline]
pub fn in_check(pos: &Position) -> bool {
    pos.in_check(pos.side_to_move)
}

/// True if `sq` is attacked by the side not to move under `occupied`.
#[inline]
pub fn sq_attacked(pos: &Position, sq: u8, occupied: Bitboard) -> bool {
    pos.is_square_attacked_with(sq, pos.side_to_move.other(), occupied)
}

/// True if the side to move could capture the opponent's king.
pub fn can_take_king(pos: &Position) -> bool {
    let us = pos.side_to_move;
    match pos.king_sq(us.other()) {
        Some(k) => pos.is_square_attacked(k, us),
        None => false,
    }
}

/// True if playing the pseudo-legal `mv` attacks the opponent's king.
pub fn gives_check(pos: &Position, mv: Move) -> bool {
    let us = pos.side_to_move;
    let Some(king) = pos.king_sq(us.other()) else {
        return false;
    };
    let Some(moved) = pos.piece_at(mv.from) else {
        return false;
    };
    let kind = match mv.promo {
        Some(p) if moved.kind == PieceKind::Pawn => p,
        _ => moved.kind,
    };

    let mut occupied = pos.occupied();
    occupied.clear(mv.from);
    occupied.set(mv.to);
    if moved.kind == PieceKind::Pawn
        && Some(mv.to) == pos.en_passant
        && pos.piece_at(mv.to).is_none()
    {
        occupied.clear(if us == Color::White { mv.to - 8 } else { mv.to + 8 });
    }

    let direct = match kind {
        PieceKind::Pawn => pawn_attacks(mv.to, us).contains(king),
        PieceKind::King => false,
        _ => piece_attacks(kind, mv.to, occupied).contains(king),
    };
    if direct {
        return true;
    }

    if moved.kind == PieceKind::King && mv.from.abs_diff(mv.to) == 2 {
        let (rook_from, rook_to) = if mv.to > mv.from {
            (mv.from + 3, mv.from + 1)
        } else {
            (mv.from - 4, mv.from - 1)
        };
        occupied.clear(rook_from);
        occupied.set(rook_to);
        if rook_attacks(rook_to, occupied).contains(king) {
            return true;
        }
    }

    let queens = pos.pieces(us, PieceKind::Queen);
    let diag = (pos.pieces(us, PieceKind::Bishop) | queens) & occupied;
    let ortho = (pos.pieces(us, PieceKind::Rook) | queens) & occupied;
    (bishop_attacks(king, occupied) & diag).any() || (rook_attacks(king, occupied) & ortho).any()
}

/// Generate all legal moves into `list`, using evasions when in check.
pub fn legal_moves_into(pos: &mut Position, list: &mut MoveList) {
    list.clear();
    if in_check(pos) {
        check_evasions(pos, list);
    } else {
        pseudo_legal_moves(pos, list);
    }
    remove_illegal(pos, list);
}

/// Generate all legal moves, returning a freshly allocated vector.
pub fn legal_moves(pos: &Position) -> Vec<Move> {
    let mut tmp = pos.clone();
    let mut list = MoveList::new();
    legal_moves_into(&mut tmp, &mut list);
    list.to_vec()
}

#[cfg(test)]
#[path = "movegen_tests.rs"]
mod movegen_tests;
