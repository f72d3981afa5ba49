//! Long-algebraic move text and `position` command parsing.

use crate::board::Position;
use crate::error::{ChessError, ChessResult};
use crate::movegen::legal_moves;
use crate::types::*;

pub fn move_to_uci(mv: Move) -> String {
    mv.to_string()
}

/// Resolve move text such as `e2e4` or `a7a8q` against the legal moves of
/// `pos`. Returns None for malformed or illegal text.
pub fn parse_uci_move(pos: &Position, txt: &str) -> Option<Move> {
    let txt = txt.trim();
    if !(4..=5).contains(&txt.len()) || !txt.is_ascii() {
        return None;
    }
    let from = coord_to_sq(&txt[0..2])?;
    let to = coord_to_sq(&txt[2..4])?;
    let promo = match txt.chars().nth(4) {
        Some(c) => match PieceKind::from_char(c)? {
            PieceKind::Pawn | PieceKind::King => return None,
            kind => Some(kind),
        },
        None => None,
    };
    let mv = Move { from, to, promo };
    legal_moves(pos).into_iter().find(|&m| m == mv)
}

/// Parse the arguments of a `position` command:
/// `startpos [moves ...]` or `fen <fields> [moves ...]`.
///
/// Returns the start position together with the moves played from it, so
/// callers can rebuild repetition history.
pub fn parse_position(args: &[&str]) -> ChessResult<(Position, Vec<Move>)> {
    let moves_at = args.iter().position(|&a| a == "moves").unwrap_or(args.len());
    let (setup, moves) = args.split_at(moves_at);

    let start = match setup.first() {
        Some(&"startpos") => Position::startpos(),
        Some(&"fen") => Position::from_fen(&setup[1..].join(" "))?,
        Some(other) => {
            return Err(ChessError::InvalidPositionCommand {
                reason: format!("unknown setup '{other}'"),
            });
        }
        None => {
            return Err(ChessError::InvalidPositionCommand {
                reason: "missing startpos or fen".to_string(),
            });
        }
    };

    let mut pos = start.clone();
    let mut played = Vec::new();
    for txt in moves.iter().skip(1) {
        let mv = parse_uci_move(&pos, txt).ok_or_else(|| ChessError::InvalidMove {
            text: txt.to_string(),
        })?;
        pos.make_move(mv);
        played.push(mv);
    }
    Ok((start, played))
}

#[cfg(test)]
#[path = "uci_tests.rs"]
mod uci_tests;
