//! Board state: per-piece bitboards kept in step with a square mailbox.

use crate::attacks::{bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks};
use crate::bitboard::Bitboard;
use crate::error::{ChessError, ChessResult};
use crate::types::*;
use crate::zobrist::ZOBRIST;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Castling rights as a 4-bit mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const WHITE_KINGSIDE: u8 = 1;
    pub const WHITE_QUEENSIDE: u8 = 2;
    pub const BLACK_KINGSIDE: u8 = 4;
    pub const BLACK_QUEENSIDE: u8 = 8;
    pub const ALL: CastlingRights = CastlingRights(15);
    pub const NONE: CastlingRights = CastlingRights(0);

    #[inline(always)]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline(always)]
    pub fn has(self, right: u8) -> bool {
        self.0 & right != 0
    }

    #[inline(always)]
    pub fn add(&mut self, right: u8) {
        self.0 |= right;
    }

    #[inline(always)]
    pub fn remove(&mut self, rights: u8) {
        self.0 &= !rights;
    }

    pub fn kingside(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_KINGSIDE,
            Color::Black => Self::BLACK_KINGSIDE,
        }
    }

    pub fn queenside(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_QUEENSIDE,
            Color::Black => Self::BLACK_QUEENSIDE,
        }
    }
}

/// Rights lost when a piece leaves or lands on the square.
const fn castle_mask(sq: u8) -> u8 {
    match sq {
        0 => CastlingRights::WHITE_QUEENSIDE,
        4 => CastlingRights::WHITE_KINGSIDE | CastlingRights::WHITE_QUEENSIDE,
        7 => CastlingRights::WHITE_KINGSIDE,
        56 => CastlingRights::BLACK_QUEENSIDE,
        60 => CastlingRights::BLACK_KINGSIDE | CastlingRights::BLACK_QUEENSIDE,
        63 => CastlingRights::BLACK_KINGSIDE,
        _ => 0,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    board: [Option<Piece>; 64],
    pieces: [[Bitboard; 6]; 2],
    colors: [Bitboard; 2],
    piece_hash: u64,
    pub side_to_move: Color,
    pub castling: CastlingRights,
    /// Square behind a pawn that just advanced two ranks, set only when an
    /// enemy pawn can capture onto it.
    pub en_passant: Option<u8>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

/// State needed to take a move back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Undo {
    pub captured: Option<Piece>,
    pub captured_sq: u8,
    pub castling: CastlingRights,
    pub en_passant: Option<u8>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl Position {
    fn empty() -> Self {
        Position {
            board: [None; 64],
            pieces: [[Bitboard::EMPTY; 6]; 2],
            colors: [Bitboard::EMPTY; 2],
            piece_hash: 0,
            side_to_move: Color::White,
            castling: CastlingRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    pub fn startpos() -> Self {
        let mut p = Position::empty();
        let back = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        for (f, &kind) in back.iter().enumerate() {
            let f = f as u8;
            p.put_piece(f, Piece::new(Color::White, kind));
            p.put_piece(8 + f, Piece::new(Color::White, PieceKind::Pawn));
            p.put_piece(48 + f, Piece::new(Color::Black, PieceKind::Pawn));
            p.put_piece(56 + f, Piece::new(Color::Black, kind));
        }
        p.castling = CastlingRights::ALL;
        p
    }

    /// Parse Forsyth-Edwards Notation. Move counters are optional.
    pub fn from_fen(fen: &str) -> ChessResult<Self> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(ChessError::fen(fen, "expected at least 4 fields"));
        }

        let mut pos = Position::empty();
        let ranks: Vec<&str> = parts[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(ChessError::fen(fen, "board needs 8 ranks"));
        }
        for (rank_idx, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_idx as i8;
            let mut file: i8 = 0;
            for ch in rank_str.chars() {
                if let Some(d) = ch.to_digit(10) {
                    file += d as i8;
                } else {
                    let kind = PieceKind::from_char(ch)
                        .ok_or_else(|| ChessError::fen(fen, format!("bad piece '{ch}'")))?;
                    let color = if ch.is_ascii_uppercase() {
                        Color::White
                    } else {
                        Color::Black
                    };
                    let s = sq(file, rank)
                        .ok_or_else(|| ChessError::fen(fen, "too many squares in rank"))?;
                    if kind == PieceKind::Pawn && (rank == 0 || rank == 7) {
                        return Err(ChessError::fen(fen, "pawn on first or last rank"));
                    }
                    pos.put_piece(s, Piece::new(color, kind));
                    file += 1;
                }
                if file > 8 {
                    return Err(ChessError::fen(fen, "too many squares in rank"));
                }
            }
            if file != 8 {
                return Err(ChessError::fen(fen, "too few squares in rank"));
            }
        }

        pos.side_to_move = match parts[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(ChessError::fen(fen, format!("bad side to move '{other}'"))),
        };

        if parts[2] != "-" {
            for c in parts[2].chars() {
                let right = match c {
                    'K' => CastlingRights::WHITE_KINGSIDE,
                    'Q' => CastlingRights::WHITE_QUEENSIDE,
                    'k' => CastlingRights::BLACK_KINGSIDE,
                    'q' => CastlingRights::BLACK_QUEENSIDE,
                    _ => return Err(ChessError::fen(fen, format!("bad castling flag '{c}'"))),
                };
                pos.castling.add(right);
            }
        }
        pos.drop_impossible_castling();

        if parts[3] != "-" {
            let ep = coord_to_sq(parts[3])
                .ok_or_else(|| ChessError::fen(fen, format!("bad en passant '{}'", parts[3])))?;
            // Kept only when capturable, matching what make_move records
            let us = pos.side_to_move;
            let ep_rank = if us == Color::White { 5 } else { 2 };
            if rank_of(ep) == ep_rank
                && (pawn_attacks(ep, us.other()) & pos.pieces(us, PieceKind::Pawn)).any()
            {
                pos.en_passant = Some(ep);
            }
        }

        if let Some(h) = parts.get(4) {
            pos.halfmove_clock = h
                .parse()
                .map_err(|_| ChessError::fen(fen, "bad halfmove clock"))?;
        }
        if let Some(f) = parts.get(5) {
            pos.fullmove_number = f
                .parse()
                .map_err(|_| ChessError::fen(fen, "bad fullmove number"))?;
        }

        for color in [Color::White, Color::Black] {
            if pos.pieces(color, PieceKind::King).popcount() != 1 {
                return Err(ChessError::fen(fen, "each side needs exactly one king"));
            }
        }
        if pos.in_check(pos.side_to_move.other()) {
            return Err(ChessError::fen(fen, "side not to move is in check"));
        }
        Ok(pos)
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(90);
        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                match self.board[(rank * 8 + file) as usize] {
                    Some(pc) => {
                        if empty > 0 {
                            fen.push(char::from(b'0' + empty));
                            empty = 0;
                        }
                        fen.push(pc.to_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push(char::from(b'0' + empty));
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push_str(match self.side_to_move {
            Color::White => " w ",
            Color::Black => " b ",
        });

        let flags: String = [
            (CastlingRights::WHITE_KINGSIDE, 'K'),
            (CastlingRights::WHITE_QUEENSIDE, 'Q'),
            (CastlingRights::BLACK_KINGSIDE, 'k'),
            (CastlingRights::BLACK_QUEENSIDE, 'q'),
        ]
        .iter()
        .filter(|(r, _)| self.castling.has(*r))
        .map(|&(_, c)| c)
        .collect();
        fen.push_str(if flags.is_empty() { "-" } else { &flags });

        fen.push(' ');
        match self.en_passant {
            Some(ep) => fen.push_str(&sq_to_coord(ep)),
            None => fen.push('-'),
        }
        fen.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));
        fen
    }

    /// Castling flags whose king or rook is off its home square are dropped.
    fn drop_impossible_castling(&mut self) {
        let checks = [
            (CastlingRights::WHITE_KINGSIDE, Color::White, 4, 7),
            (CastlingRights::WHITE_QUEENSIDE, Color::White, 4, 0),
            (CastlingRights::BLACK_KINGSIDE, Color::Black, 60, 63),
            (CastlingRights::BLACK_QUEENSIDE, Color::Black, 60, 56),
        ];
        for (right, color, king, rook) in checks {
            let ok = self.piece_at(king) == Some(Piece::new(color, PieceKind::King))
                && self.piece_at(rook) == Some(Piece::new(color, PieceKind::Rook));
            if !ok {
                self.castling.remove(right);
            }
        }
    }

    #[inline(always)]
    pub fn piece_at(&self, sq: u8) -> Option<Piece> {
        self.board[sq as usize]
    }

    #[inline(always)]
    pub fn pieces(&self, color: Color, kind: PieceKind) -> Bitboard {
        self.pieces[color.idx()][kind.idx()]
    }

    #[inline(always)]
    pub fn color_bb(&self, color: Color) -> Bitboard {
        self.colors[color.idx()]
    }

    #[inline(always)]
    pub fn occupied(&self) -> Bitboard {
        self.colors[0] | self.colors[1]
    }

    #[inline(always)]
    pub fn king_sq(&self, color: Color) -> Option<u8> {
        self.pieces(color, PieceKind::King).lsb()
    }

    #[inline(always)]
    fn put_piece(&mut self, sq: u8, pc: Piece) {
        debug_assert!(self.board[sq as usize].is_none());
        self.board[sq as usize] = Some(pc);
        self.pieces[pc.color.idx()][pc.kind.idx()].set(sq);
        self.colors[pc.color.idx()].set(sq);
        self.piece_hash ^= ZOBRIST.piece_key(pc, sq);
    }

    #[inline(always)]
    fn remove_piece(&mut self, sq: u8) -> Option<Piece> {
        let pc = self.board[sq as usize].take()?;
        self.pieces[pc.color.idx()][pc.kind.idx()].clear(sq);
        self.colors[pc.color.idx()].clear(sq);
        self.piece_hash ^= ZOBRIST.piece_key(pc, sq);
        Some(pc)
    }

    /// Zobrist hash of pieces, side to move, castling rights and en-passant file.
    pub fn position_hash(&self) -> u64 {
        let mut h = self.piece_hash ^ ZOBRIST.castling_key(self.castling.bits());
        if self.side_to_move == Color::Black {
            h ^= ZOBRIST.side_to_move;
        }
        if let Some(ep) = self.en_passant {
            h ^= ZOBRIST.ep_key(ep % 8);
        }
        h
    }

    pub fn in_check(&self, c: Color) -> bool {
        match self.king_sq(c) {
            Some(k) => self.is_square_attacked(k, c.other()),
            None => false,
        }
    }

    #[inline]
    pub fn is_square_attacked(&self, target: u8, by: Color) -> bool {
        self.is_square_attacked_with(target, by, self.occupied())
    }

    /// Attack test against a caller-supplied occupancy, so sliders can be
    /// probed through squares that are about to be vacated.
    #[inline]
    pub fn is_square_attacked_with(&self, target: u8, by: Color, occupied: Bitboard) -> bool {
        let p = &self.pieces[by.idx()];
        if (knight_attacks(target) & p[PieceKind::Knight.idx()] & occupied).any() {
            return true;
        }
        if (king_attacks(target) & p[PieceKind::King.idx()]).any() {
            return true;
        }
        // A pawn of `by` attacks target iff a pawn of the other side on target
        // would attack that pawn's square.
        if (pawn_attacks(target, by.other()) & p[PieceKind::Pawn.idx()] & occupied).any() {
            return true;
        }
        let queens = p[PieceKind::Queen.idx()];
        let diag = (p[PieceKind::Bishop.idx()] | queens) & occupied;
        if diag.any() && (bishop_attacks(target, occupied) & diag).any() {
            return true;
        }
        let ortho = (p[PieceKind::Rook.idx()] | queens) & occupied;
        ortho.any() && (rook_attacks(target, occupied) & ortho).any()
    }

    /// Every piece of `by` attacking `target` under `occupied`.
    pub fn attackers_to(&self, target: u8, by: Color, occupied: Bitboard) -> Bitboard {
        let p = &self.pieces[by.idx()];
        let queens = p[PieceKind::Queen.idx()];
        ((knight_attacks(target) & p[PieceKind::Knight.idx()])
            | (king_attacks(target) & p[PieceKind::King.idx()])
            | (pawn_attacks(target, by.other()) & p[PieceKind::Pawn.idx()])
            | (bishop_attacks(target, occupied) & (p[PieceKind::Bishop.idx()] | queens))
            | (rook_attacks(target, occupied) & (p[PieceKind::Rook.idx()] | queens)))
            & occupied
    }

    /// Apply a pseudo-legal move. Castling and en passant are recognised from
    /// the board.
    ///
    /// # Panics
    /// If the origin square is empty.
    pub fn make_move(&mut self, mv: Move) -> Undo {
        let us = self.side_to_move;
        let them = us.other();
        let moved = self
            .remove_piece(mv.from)
            .expect("make_move: no piece on origin square");

        let mut captured_sq = mv.to;
        if moved.kind == PieceKind::Pawn
            && Some(mv.to) == self.en_passant
            && self.board[mv.to as usize].is_none()
        {
            captured_sq = if us == Color::White { mv.to - 8 } else { mv.to + 8 };
        }

        let undo = Undo {
            captured: self.remove_piece(captured_sq),
            captured_sq,
            castling: self.castling,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
        };

        let placed = match mv.promo {
            Some(kind) if moved.kind == PieceKind::Pawn => Piece::new(us, kind),
            _ => moved,
        };
        self.put_piece(mv.to, placed);

        if moved.kind == PieceKind::King && mv.from.abs_diff(mv.to) == 2 {
            let (rook_from, rook_to) = castle_rook_squares(mv);
            if let Some(rook) = self.remove_piece(rook_from) {
                self.put_piece(rook_to, rook);
            }
        }

        self.castling.remove(castle_mask(mv.from) | castle_mask(mv.to));

        self.en_passant = None;
        if moved.kind == PieceKind::Pawn && mv.from.abs_diff(mv.to) == 16 {
            let ep = (mv.from + mv.to) / 2;
            if (pawn_attacks(ep, us) & self.pieces(them, PieceKind::Pawn)).any() {
                self.en_passant = Some(ep);
            }
        }

        if moved.kind == PieceKind::Pawn || undo.captured.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        if us == Color::Black {
            self.fullmove_number += 1;
        }
        self.side_to_move = them;
        undo
    }

    pub fn unmake_move(&mut self, mv: Move, undo: Undo) {
        self.side_to_move = self.side_to_move.other();
        let us = self.side_to_move;

        if let Some(pc) = self.remove_piece(mv.to) {
            let original = if mv.promo.is_some() {
                Piece::new(us, PieceKind::Pawn)
            } else {
                pc
            };
            self.put_piece(mv.from, original);

            if pc.kind == PieceKind::King && mv.from.abs_diff(mv.to) == 2 {
                let (rook_from, rook_to) = castle_rook_squares(mv);
                if let Some(rook) = self.remove_piece(rook_to) {
                    self.put_piece(rook_from, rook);
                }
            }
        }
        if let Some(captured) = undo.captured {
            self.put_piece(undo.captured_sq, captured);
        }

        self.castling = undo.castling;
        self.en_passant = undo.en_passant;
        self.halfmove_clock = undo.halfmove_clock;
        self.fullmove_number = undo.fullmove_number;
    }

    pub fn is_fifty_move_draw(&self) -> bool {
        self.halfmove_clock >= 100
    }

    /// No pawns, rooks or queens, and either a single minor piece or only
    /// bishops all standing on one square colour.
    pub fn is_insufficient_material(&self) -> bool {
        let both = |k: PieceKind| self.pieces(Color::White, k) | self.pieces(Color::Black, k);
        if (both(PieceKind::Pawn) | both(PieceKind::Rook) | both(PieceKind::Queen)).any() {
            return false;
        }
        let knights = both(PieceKind::Knight);
        let bishops = both(PieceKind::Bishop);
        if (knights | bishops).popcount() <= 1 {
            return true;
        }
        const DARK: u64 = 0xAA55_AA55_AA55_AA55;
        knights.is_empty() && (bishops.0 & DARK == 0 || bishops.0 & !DARK == 0)
    }
}

/// Rook origin and destination for a castling king move.
fn castle_rook_squares(mv: Move) -> (u8, u8) {
    if mv.to > mv.from {
        (mv.from + 3, mv.from + 1)
    } else {
        (mv.from - 4, mv.from - 1)
    }
}

#[cfg(test)]
#[path = "board_tests.rs"]
mod board_tests;
