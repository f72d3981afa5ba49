//! Turns search progress into UCI `info` lines.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use classical_engine::{PvInfo, SearchListener};
use chess_core::Move;
use tracing::warn;

/// Protocol output shared between the controller and the search thread.
pub type SharedOutput = Arc<Mutex<dyn Write + Send>>;

/// `currmove` lines are noise for short searches.
const CURRMOVE_DELAY: Duration = Duration::from_secs(1);

/// Write one protocol line and flush it.
pub fn send_line(out: &SharedOutput, line: &str) {
    let mut w = out.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = writeln!(w, "{line}").and_then(|_| w.flush()) {
        warn!(error = %e, "failed to write protocol output");
    }
}

pub fn format_depth(depth: u32) -> String {
    format!("info depth {depth}")
}

pub fn format_curr_move(mv: Move, move_nr: usize) -> String {
    format!("info currmove {mv} currmovenumber {move_nr}")
}

pub fn format_pv(info: &PvInfo) -> String {
    let mut line = format!("info depth {} score ", info.depth);
    if info.is_mate {
        line.push_str(&format!("mate {}", info.score));
    } else {
        line.push_str(&format!("cp {}", info.score));
    }
    if info.upper_bound {
        line.push_str(" upperbound");
    } else if info.lower_bound {
        line.push_str(" lowerbound");
    }
    line.push_str(&format!(
        " time {} nodes {} nps {}",
        info.time_ms, info.nodes, info.nps
    ));
    if !info.pv.is_empty() {
        line.push_str(" pv");
        for mv in &info.pv {
            line.push_str(&format!(" {mv}"));
        }
    }
    line
}

pub fn format_stats(nodes: u64, nps: u64, time_ms: u64) -> String {
    format!("info nodes {nodes} nps {nps} time {time_ms}")
}

pub struct UciSearchListener {
    out: SharedOutput,
    started: Instant,
}

impl UciSearchListener {
    pub fn new(out: SharedOutput) -> Self {
        UciSearchListener {
            out,
            started: Instant::now(),
        }
    }
}

impl SearchListener for UciSearchListener {
    fn notify_depth(&mut self, depth: u32) {
        send_line(&self.out, &format_depth(depth));
    }

    fn notify_curr_move(&mut self, mv: Move, move_nr: usize) {
        if self.started.elapsed() >= CURRMOVE_DELAY {
            send_line(&self.out, &format_curr_move(mv, move_nr));
        }
    }

    fn notify_pv(&mut self, info: &PvInfo) {
        send_line(&self.out, &format_pv(info));
    }

    fn notify_stats(&mut self, nodes: u64, nps: u64, time_ms: u64) {
        send_line(&self.out, &format_stats(nodes, nps, time_ms));
    }
}
