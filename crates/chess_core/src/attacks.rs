//! Pre-computed attack tables.
//!
//! - Knight and king attacks (constant)
//! - Pawn attacks indexed by side, so attack queries take the side as a value
//! - Sliding attacks from ray tables, stopping at the first blocker per ray

use crate::bitboard::Bitboard;
use crate::types::Color;

/// Ray directions as (file step, rank step): N, NE, E, SE, S, SW, W, NW.
pub const DIRECTIONS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

const ROOK_DIRS: [usize; 4] = [0, 2, 4, 6];
const BISHOP_DIRS: [usize; 4] = [1, 3, 5, 7];

const fn on_board(file: i8, rank: i8) -> bool {
    file >= 0 && file < 8 && rank >= 0 && rank < 8
}

/// Attack table for a piece that jumps by fixed (file, rank) offsets.
const fn leaper_table(deltas: &[(i8, i8)]) -> [Bitboard; 64] {
    let mut table = [Bitboard::EMPTY; 64];
    let mut sq = 0;
    while sq < 64 {
        let file = (sq % 8) as i8;
        let rank = (sq / 8) as i8;
        let mut bits = 0u64;
        let mut i = 0;
        while i < deltas.len() {
            let (f, r) = (file + deltas[i].0, rank + deltas[i].1);
            if on_board(f, r) {
                bits |= 1u64 << ((r * 8 + f) as u32);
            }
            i += 1;
        }
        table[sq] = Bitboard(bits);
        sq += 1;
    }
    table
}

pub static KNIGHT_ATTACKS: [Bitboard; 64] = leaper_table(&[
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
]);

pub static KING_ATTACKS: [Bitboard; 64] = leaper_table(&DIRECTIONS);

/// `PAWN_ATTACKS[side][sq]`: squares a pawn of `side` on `sq` attacks.
pub static PAWN_ATTACKS: [[Bitboard; 64]; 2] = [
    leaper_table(&[(-1, 1), (1, 1)]),
    leaper_table(&[(-1, -1), (1, -1)]),
];

/// `RAYS[dir][sq]`: every square from `sq` toward `DIRECTIONS[dir]`, excluding `sq`.
pub static RAYS: [[Bitboard; 64]; 8] = {
    let mut rays = [[Bitboard::EMPTY; 64]; 8];
    let mut dir = 0;
    while dir < 8 {
        let (df, dr) = DIRECTIONS[dir];
        let mut sq = 0;
        while sq < 64 {
            let mut f = (sq % 8) as i8 + df;
            let mut r = (sq / 8) as i8 + dr;
            let mut bits = 0u64;
            while on_board(f, r) {
                bits |= 1u64 << ((r * 8 + f) as u32);
                f += df;
                r += dr;
            }
            rays[dir][sq] = Bitboard(bits);
            sq += 1;
        }
        dir += 1;
    }
    rays
};

#[inline(always)]
pub fn pawn_attacks(sq: u8, side: Color) -> Bitboard {
    PAWN_ATTACKS[side.idx()][sq as usize]
}

#[inline(always)]
pub fn knight_attacks(sq: u8) -> Bitboard {
    KNIGHT_ATTACKS[sq as usize]
}

#[inline(always)]
pub fn king_attacks(sq: u8) -> Bitboard {
    KING_ATTACKS[sq as usize]
}

/// Attacks along one ray, including the first blocker.
///
/// Directions 0..=2 and 7 run toward higher square indices, so their nearest
/// blocker is the lowest set bit; the rest use the highest set bit.
#[inline(always)]
fn ray_attacks(dir: usize, sq: u8, occupied: Bitboard) -> Bitboard {
    let ray = RAYS[dir][sq as usize];
    let blockers = ray & occupied;
    let nearest = if dir <= 2 || dir == 7 {
        blockers.lsb()
    } else {
        blockers.msb()
    };
    match nearest {
        Some(b) => ray & !RAYS[dir][b as usize],
        None => ray,
    }
}

#[inline]
pub fn bishop_attacks(sq: u8, occupied: Bitboard) -> Bitboard {
    BISHOP_DIRS
        .iter()
        .fold(Bitboard::EMPTY, |acc, &d| acc | ray_attacks(d, sq, occupied))
}

#[inline]
pub fn rook_attacks(sq: u8, occupied: Bitboard) -> Bitboard {
    ROOK_DIRS
        .iter()
        .fold(Bitboard::EMPTY, |acc, &d| acc | ray_attacks(d, sq, occupied))
}

#[inline]
pub fn queen_attacks(sq: u8, occupied: Bitboard) -> Bitboard {
    bishop_attacks(sq, occupied) | rook_attacks(sq, occupied)
}

/// Direction index leading from `from` to `to`, if the squares share a line.
#[inline]
pub fn direction_between(from: u8, to: u8) -> Option<usize> {
    (0..8).find(|&d| RAYS[d][from as usize].contains(to))
}

/// Squares strictly between `a` and `b`; empty unless they share a line.
#[inline]
pub fn between(a: u8, b: u8) -> Bitboard {
    match direction_between(a, b) {
        Some(d) => RAYS[d][a as usize] & !RAYS[d][b as usize] & !Bitboard::from_square(b),
        None => Bitboard::EMPTY,
    }
}

#[cfg(test)]
#[path = "attacks_tests.rs"]
mod attacks_tests;
