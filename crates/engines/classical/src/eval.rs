//! Material and centralisation evaluation using bitboards.

use chess_core::{Color, PieceKind, Position, file_of, rank_of};

/// Material values in centipawns, indexed by PieceKind::idx().
/// Order: Pawn, Knight, Bishop, Rook, Queen, King
const PIECE_VALUES: [i32; 6] = [100, 320, 330, 500, 900, 0];

/// Centipawns per step towards the centre, same indexing.
const CENTRE_WEIGHTS: [i32; 6] = [3, 5, 3, 1, 2, 0];

pub fn piece_value(kind: PieceKind) -> i32 {
    PIECE_VALUES[kind.idx()]
}

/// 0 in a corner, 6 on the four centre squares.
#[inline]
fn centrality(sq: u8) -> i32 {
    let file_dist = (2 * file_of(sq) as i32 - 7).abs() / 2;
    let rank_dist = (2 * rank_of(sq) as i32 - 7).abs() / 2;
    6 - file_dist - rank_dist
}

fn side_score(pos: &Position, color: Color) -> i32 {
    let mut score = 0;
    for kind in PieceKind::ALL {
        let bb = pos.pieces(color, kind);
        score += PIECE_VALUES[kind.idx()] * bb.popcount() as i32;
        let weight = CENTRE_WEIGHTS[kind.idx()];
        if weight != 0 {
            score += bb.map(|sq| weight * centrality(sq)).sum::<i32>();
        }
    }
    score
}

/// Evaluates the position from the side-to-move's perspective.
///
/// Returns a score in centipawns:
/// - Positive = good for side to move
/// - Negative = bad for side to move
/// - 0 = equal position
pub fn evaluate(pos: &Position) -> i32 {
    let score = side_score(pos, Color::White) - side_score(pos, Color::Black);
    if pos.side_to_move == Color::White {
        score
    } else {
        -score
    }
}
