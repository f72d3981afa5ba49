//! Classical Chess Engine
//!
//! Iterative deepening negascout over a material and centralisation
//! evaluation, sharing a lockless transposition table with its caller.
//!
//! The search runs on whatever thread calls
//! [`Search::iterative_deepening`]; stopping is cooperative through the
//! [`chess_core::TimeControl`] handle given at construction.

pub mod aligned;
pub mod eval;
pub mod listener;
pub mod search;
pub mod tt;

pub use eval::evaluate;
pub use listener::{PvInfo, SearchListener};
pub use search::{MATE0, MAX_SEARCH_DEPTH, Search, StopSearch};
pub use tt::{Bound, TranspositionTable, TtEntry};
