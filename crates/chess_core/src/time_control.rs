//! Search parameters, think-time allocation and the shared search clock.
//!
//! [`compute_time_limit`] turns a caller's search command into a
//! [`SearchBudget`]; [`TimeControl`] is the cheap-to-clone handle the search
//! thread polls to know when to stop.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::types::Move;

/// Upper bound for any think time, so limits fit a signed 32-bit ms counter.
pub const MAX_TIME_LIMIT_MS: u32 = i32::MAX as u32;

/// Moves assumed left in the game when the caller gives no moves-to-go.
const DEFAULT_MOVES_TO_GO: u32 = 999;
/// Never plan for more than this many moves ahead.
const MAX_PLANNED_MOVES: u32 = 45;
/// Expected fraction of ponder searches that end in a ponder hit.
const PONDER_HIT_RATE: f64 = 0.35;
/// Time kept in reserve on the clock, in ms.
const MAX_SAFETY_MARGIN_MS: i64 = 1000;

/// Caller-supplied search command. Times are milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    /// Restrict the root to these moves (empty = no restriction)
    pub search_moves: Vec<Move>,
    pub w_time: Option<i64>,
    pub b_time: Option<i64>,
    pub w_inc: i64,
    pub b_inc: i64,
    pub moves_to_go: Option<u32>,
    pub depth: Option<u32>,
    /// Search for a mate in this many moves
    pub mate: Option<u32>,
    pub nodes: Option<u64>,
    pub move_time: Option<i64>,
    pub infinite: bool,
    pub ponder: bool,
}

/// Think time window: the search may stop after `min_ms` and must stop by
/// `max_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimit {
    pub min_ms: u32,
    pub max_ms: u32,
}

impl TimeLimit {
    /// Both bounds set to the same value, clamped to `1..=MAX_TIME_LIMIT_MS`.
    pub fn fixed(ms: i64) -> Self {
        let ms = clamp(ms, 1, MAX_TIME_LIMIT_MS as i64) as u32;
        TimeLimit {
            min_ms: ms,
            max_ms: ms,
        }
    }
}

/// Concrete stopping conditions for one search. All None means the search
/// only ends on an explicit stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchBudget {
    pub time: Option<TimeLimit>,
    pub max_depth: Option<u32>,
    pub max_nodes: Option<u64>,
}

impl SearchBudget {
    pub fn is_unbounded(&self) -> bool {
        self.time.is_none() && self.max_depth.is_none() && self.max_nodes.is_none()
    }
}

/// `val` limited to `[min, max]`. Expects `min <= max`; with an empty range
/// values below `min` give `min` and all others give `max`.
pub fn clamp<T: PartialOrd>(val: T, min: T, max: T) -> T {
    if val < min {
        min
    } else if val > max {
        max
    } else {
        val
    }
}

/// Derive the search budget for the side to move.
///
/// Precedence: infinite, depth, mate, fixed move time, node count, clock.
/// With `ponder_mode` set the clock budget assumes some of the thinking will
/// happen on the opponent's time and plans for fewer remaining moves.
pub fn compute_time_limit(params: &SearchParams, white_to_move: bool, ponder_mode: bool) -> SearchBudget {
    let mut budget = SearchBudget::default();
    if params.infinite {
        return budget;
    }
    if let Some(depth) = params.depth.filter(|&d| d > 0) {
        budget.max_depth = Some(depth);
    } else if let Some(mate) = params.mate.filter(|&m| m > 0) {
        budget.max_depth = Some(mate.saturating_mul(2) - 1);
    } else if let Some(ms) = params.move_time.filter(|&t| t > 0) {
        budget.time = Some(TimeLimit::fixed(ms));
    } else if let Some(nodes) = params.nodes.filter(|&n| n > 0) {
        budget.max_nodes = Some(nodes);
    } else {
        let (time, inc) = if white_to_move {
            (params.w_time, params.w_inc)
        } else {
            (params.b_time, params.b_inc)
        };
        if let Some(time) = time {
            budget.time = Some(clock_limit(time, inc, params.moves_to_go, ponder_mode));
        }
    }
    budget
}

fn clock_limit(time: i64, inc: i64, moves_to_go: Option<u32>, ponder_mode: bool) -> TimeLimit {
    let time = time.max(0);
    let inc = inc.max(0);
    let mut moves = moves_to_go
        .filter(|&m| m > 0)
        .unwrap_or(DEFAULT_MOVES_TO_GO)
        .min(MAX_PLANNED_MOVES);
    if ponder_mode {
        moves = ((moves as f64) * (1.0 - PONDER_HIT_RATE)).ceil() as u32;
    }
    let moves = moves.max(1) as i64;

    let margin = MAX_SAFETY_MARGIN_MS.min(time / 10 * 9);
    let share = time
        .saturating_add(inc.saturating_mul(moves - 1))
        .saturating_sub(margin)
        / moves;
    let min = (share as f64 * 1.1) as i64;
    let max = (min as f64 * 3.0) as i64;

    // Never plan past the reserve, never below 1 ms
    let upper = clamp(time - margin, 1, MAX_TIME_LIMIT_MS as i64);
    TimeLimit {
        min_ms: clamp(min, 1, upper) as u32,
        max_ms: clamp(max, 1, upper) as u32,
    }
}

#[derive(Debug, Default)]
struct Clock {
    start: Option<Instant>,
    limit: Option<TimeLimit>,
}

/// Thread-safe search clock and stop flag.
///
/// Clones share state, so the controller keeps one handle and the search
/// thread another. `is_stopped()` is a relaxed atomic load and cheap enough
/// to call at every node.
#[derive(Debug, Clone)]
pub struct TimeControl {
    stopped: Arc<AtomicBool>,
    clock: Arc<RwLock<Clock>>,
    /// 0 means no limit
    depth_limit: Arc<AtomicU32>,
    /// 0 means no limit
    node_limit: Arc<AtomicU64>,
    /// Clock is read every this many nodes
    check_interval: u64,
}

impl TimeControl {
    pub fn new(limit: Option<TimeLimit>) -> Self {
        Self {
            stopped: Arc::new(AtomicBool::new(false)),
            clock: Arc::new(RwLock::new(Clock { start: None, limit })),
            depth_limit: Arc::new(AtomicU32::new(0)),
            node_limit: Arc::new(AtomicU64::new(0)),
            check_interval: 1024,
        }
    }

    /// Start the clock and clear the stop flag.
    pub fn start(&self) {
        self.clock
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .start = Some(Instant::now());
        self.stopped.store(false, Ordering::Release);
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Replace the time window and restart the clock from now.
    pub fn set_limit(&self, limit: Option<TimeLimit>) {
        let mut clock = self.clock.write().unwrap_or_else(PoisonError::into_inner);
        clock.limit = limit;
        clock.start = Some(Instant::now());
    }

    pub fn limit(&self) -> Option<TimeLimit> {
        self.clock.read().unwrap_or_else(PoisonError::into_inner).limit
    }

    /// Depth and node limits the running search picks up while it works,
    /// so a ponder hit can hand over the limits of the real search.
    pub fn set_search_limits(&self, max_depth: Option<u32>, max_nodes: Option<u64>) {
        self.depth_limit.store(max_depth.unwrap_or(0), Ordering::Release);
        self.node_limit.store(max_nodes.unwrap_or(0), Ordering::Release);
    }

    #[inline]
    pub fn depth_limit(&self) -> Option<u32> {
        Some(self.depth_limit.load(Ordering::Relaxed)).filter(|&d| d > 0)
    }

    /// Counted from the start of the search, pondering included.
    #[inline]
    pub fn node_limit(&self) -> Option<u64> {
        Some(self.node_limit.load(Ordering::Relaxed)).filter(|&n| n > 0)
    }

    /// Read the clock; sets the stop flag once `max_ms` has passed.
    pub fn check_time(&self) -> bool {
        if self.is_stopped() {
            return true;
        }
        let clock = self.clock.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(limit) = clock.limit
            && let Some(start) = clock.start
            && start.elapsed() >= Duration::from_millis(limit.max_ms as u64)
        {
            self.stop();
            return true;
        }
        false
    }

    /// True once `min_ms` has passed; always false without a time window.
    pub fn min_time_reached(&self) -> bool {
        let clock = self.clock.read().unwrap_or_else(PoisonError::into_inner);
        match (clock.limit, clock.start) {
            (Some(limit), Some(start)) => start.elapsed() >= Duration::from_millis(limit.min_ms as u64),
            _ => false,
        }
    }

    #[inline]
    pub fn should_check_time(&self, nodes: u64) -> bool {
        nodes % self.check_interval == 0
    }

    pub fn elapsed(&self) -> Duration {
        self.clock
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .start
            .map(|s| s.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Time left before `max_ms` (None without a time window).
    pub fn remaining(&self) -> Option<Duration> {
        let max = Duration::from_millis(self.limit()?.max_ms as u64);
        Some(max.saturating_sub(self.elapsed()))
    }
}

impl Default for TimeControl {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
#[path = "time_control_tests.rs"]
mod time_control_tests;
