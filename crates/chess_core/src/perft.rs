//! Legal move path enumeration for validating the move generator.

use crate::board::Position;
use crate::movegen::legal_moves_into;
use crate::types::{Move, MoveList};

/// Count leaf nodes of the legal move tree `depth` plies deep.
pub fn perft(pos: &mut Position, depth: u8) -> u64 {
    fn inner(pos: &mut Position, depth: u8, layers: &mut [MoveList]) -> u64 {
        let Some((buf, rest)) = layers.split_first_mut() else {
            return 1;
        };
        legal_moves_into(pos, buf);
        if rest.is_empty() {
            return buf.len() as u64;
        }

        let mut nodes = 0u64;
        for i in 0..buf.len() {
            let mv = buf[i];
            let undo = pos.make_move(mv);
            nodes += inner(pos, depth - 1, rest);
            pos.unmake_move(mv, undo);
        }
        nodes
    }

    let mut layers = vec![MoveList::new(); depth as usize];
    inner(pos, depth, &mut layers)
}

/// Per-root-move node counts, for locating generator bugs.
pub fn divide(pos: &mut Position, depth: u8) -> Vec<(Move, u64)> {
    let mut roots = MoveList::new();
    legal_moves_into(pos, &mut roots);
    roots
        .iter()
        .map(|&mv| {
            let undo = pos.make_move(mv);
            let n = perft(pos, depth.saturating_sub(1));
            pos.unmake_move(mv, undo);
            (mv, n)
        })
        .collect()
}
