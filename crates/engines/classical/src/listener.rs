//! Progress callbacks from a running search.

use chess_core::Move;

/// Principal variation report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvInfo {
    pub depth: u32,
    /// Centipawns, or moves to mate (negative when getting mated) if
    /// `is_mate` is set
    pub score: i32,
    pub time_ms: u64,
    pub nodes: u64,
    pub nps: u64,
    pub is_mate: bool,
    /// Score is an upper bound (fail low)
    pub upper_bound: bool,
    /// Score is a lower bound (fail high)
    pub lower_bound: bool,
    pub pv: Vec<Move>,
}

/// Receiver for search progress. Called on the search thread, so
/// implementations should return quickly.
pub trait SearchListener: Send {
    /// A new iteration with this nominal depth has started.
    fn notify_depth(&mut self, depth: u32);

    /// The root move `mv` (1-based `move_nr`) is being searched.
    fn notify_curr_move(&mut self, mv: Move, move_nr: usize);

    fn notify_pv(&mut self, info: &PvInfo);

    fn notify_stats(&mut self, nodes: u64, nps: u64, time_ms: u64);
}
