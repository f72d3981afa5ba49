//! Chess rules core: bitboards, positions, legal move generation, perft and
//! the search clock shared by engines and protocol front ends.

pub mod attacks;
pub mod bitboard;
pub mod board;
pub mod error;
pub mod movegen;
pub mod perft;
pub mod time_control;
pub mod types;
pub mod uci;
pub mod zobrist;

pub use attacks::*;
pub use bitboard::*;
pub use board::*;
pub use error::*;
pub use movegen::*;
pub use perft::{divide, perft};
pub use time_control::*;
pub use types::*;
pub use uci::*;
pub use zobrist::ZOBRIST;
