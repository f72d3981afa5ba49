//! Search thread controller.
//!
//! [`EngineControl`] runs on the protocol thread and owns at most one
//! background search thread. Searches are started without blocking; the
//! thread reports `bestmove` itself once the search is over and neither
//! pondering nor infinite mode holds the answer back. [`EngineControl::stop_search`]
//! is the only call that waits for the thread.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chess_core::{
    Color, Move, MoveList, Position, SearchBudget, SearchParams, TimeControl, TimeLimit,
    compute_time_limit, is_legal, legal_moves_into,
};
use classical_engine::{Search, TranspositionTable};
use tracing::{debug, error, info, warn};

use crate::listener::{SharedOutput, UciSearchListener, send_line};
use crate::options::{self, EngineOptions, OptionChange};

const SEARCH_STACK_SIZE: usize = 16 * 1024 * 1024;

/// How often a finished search rechecks whether it may report.
const REPORT_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Idle,
    Searching,
    Pondering,
    Stopping,
}

/// Flags shared with the search thread. Each has a single writer.
#[derive(Debug, Default)]
struct Flags {
    /// Hold the result until ponder hit or stop
    ponder: AtomicBool,
    /// Hold the result until stop
    infinite: AtomicBool,
    /// The thread drops its own handle when done; cleared by a joining stop
    should_detach: AtomicBool,
    stopping: AtomicBool,
}

struct ActiveSearch {
    handle: JoinHandle<()>,
    tc: TimeControl,
}

type SearchSlot = Arc<Mutex<Option<ActiveSearch>>>;

fn lock_slot(slot: &Mutex<Option<ActiveSearch>>) -> MutexGuard<'_, Option<ActiveSearch>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Work handed to the search thread.
struct SearchJob {
    pos: Position,
    history: Vec<u64>,
    root_moves: MoveList,
    max_depth: Option<u32>,
    max_nodes: Option<u64>,
    /// False when the only answer is already known
    run_search: bool,
    strength: u32,
    seed: u64,
}

/// Shared handles the search thread keeps.
struct SearchContext {
    out: SharedOutput,
    tt: Arc<TranspositionTable>,
    slot: SearchSlot,
    flags: Arc<Flags>,
    tc: TimeControl,
}

pub struct EngineControl {
    out: SharedOutput,
    tt: Arc<TranspositionTable>,
    options: EngineOptions,
    slot: SearchSlot,
    flags: Arc<Flags>,
    /// Applied when the current ponder session gets a ponder hit
    ponder_budget: SearchBudget,
    /// The pondered position has at most one legal move
    ponder_forced: bool,
    pending_hash_mb: Option<usize>,
    game_seed: u64,
}

impl EngineControl {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self::with_options(out, EngineOptions::default())
    }

    pub fn with_options(out: impl Write + Send + 'static, options: EngineOptions) -> Self {
        let options = options.clamped();
        let out: SharedOutput = Arc::new(Mutex::new(out));
        let tt = Arc::new(TranspositionTable::new(TranspositionTable::log2_for_megabytes(
            options.hash_mb,
        )));
        let game_seed = pick_seed(&options);
        EngineControl {
            out,
            tt,
            options,
            slot: Arc::new(Mutex::new(None)),
            flags: Arc::new(Flags::default()),
            ponder_budget: SearchBudget::default(),
            ponder_forced: false,
            pending_hash_mb: None,
            game_seed,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn transposition_table(&self) -> &TranspositionTable {
        &self.tt
    }

    /// Write a protocol line to the engine output.
    pub fn send(&self, line: &str) {
        send_line(&self.out, line);
    }

    /// Advertise the recognised options.
    pub fn print_options(out: &mut impl Write) -> io::Result<()> {
        options::print_options(out)
    }

    pub fn state(&self) -> ControlState {
        if self.flags.stopping.load(Ordering::Acquire) {
            return ControlState::Stopping;
        }
        match *lock_slot(&self.slot) {
            None => ControlState::Idle,
            Some(_) if self.flags.ponder.load(Ordering::Acquire) => ControlState::Pondering,
            Some(_) => ControlState::Searching,
        }
    }

    /// No search thread is attached.
    pub fn is_idle(&self) -> bool {
        lock_slot(&self.slot).is_none()
    }

    /// Search `start` after `moves` within the limits of `params`.
    ///
    /// With at most one legal move and a bounded search the answer is
    /// reported at once without starting a thread.
    pub fn start_search(&mut self, start: &Position, moves: &[Move], params: &SearchParams) {
        self.stop_if_running();
        let (pos, history) = setup_position(start, moves);
        let budget = self.budget_for(&pos, params);
        let root_moves = root_moves(&pos, &params.search_moves);
        let infinite = budget.is_unbounded();
        info!(fen = %pos.to_fen(), ?budget, root_moves = root_moves.len(), "start search");

        if !infinite && root_moves.len() <= 1 {
            report_best_move(&self.out, &self.tt, &pos, root_moves.first().copied());
            return;
        }

        self.flags.ponder.store(false, Ordering::Release);
        self.flags.infinite.store(infinite, Ordering::Release);
        let job = SearchJob {
            pos,
            history,
            root_moves,
            max_depth: budget.max_depth,
            max_nodes: budget.max_nodes,
            run_search: true,
            strength: self.options.strength,
            seed: self.game_seed,
        };
        self.start_thread(job, budget.time);
    }

    /// Think on the opponent's time. `moves` already contains the expected
    /// reply; the budget of `params` is held back until [`Self::ponder_hit`].
    pub fn start_ponder(&mut self, start: &Position, moves: &[Move], params: &SearchParams) {
        self.stop_if_running();
        let (pos, history) = setup_position(start, moves);
        self.ponder_budget = self.budget_for(&pos, params);
        let root_moves = root_moves(&pos, &params.search_moves);
        self.ponder_forced = root_moves.len() <= 1;
        let run_search = match root_moves.len() {
            0 => false,
            1 => self.options.ponder_single_move,
            _ => true,
        };
        info!(fen = %pos.to_fen(), root_moves = root_moves.len(), run_search, "start ponder");

        self.flags.ponder.store(true, Ordering::Release);
        self.flags.infinite.store(false, Ordering::Release);
        let job = SearchJob {
            pos,
            history,
            root_moves,
            max_depth: None,
            max_nodes: None,
            run_search,
            strength: self.options.strength,
            seed: self.game_seed,
        };
        self.start_thread(job, None);
    }

    /// The expected reply was played: keep searching the same tree under the
    /// real budget. The clock restarts at the hit; depth and node limits
    /// count the nodes searched while pondering. A bounded search with at
    /// most one legal move answers at once. Ignored when not pondering.
    pub fn ponder_hit(&mut self) {
        if !self.flags.ponder.load(Ordering::Acquire) {
            debug!("ponderhit while not pondering, ignored");
            return;
        }
        let slot = lock_slot(&self.slot);
        let budget = self.ponder_budget;
        if let Some(active) = slot.as_ref() {
            active.tc.set_search_limits(budget.max_depth, budget.max_nodes);
            active.tc.set_limit(budget.time);
            if self.ponder_forced && !budget.is_unbounded() {
                active.tc.stop();
            }
            // infinite first, so the thread never sees both flags clear early
            self.flags.infinite.store(budget.is_unbounded(), Ordering::Release);
            self.flags.ponder.store(false, Ordering::Release);
            active.handle.thread().unpark();
        } else {
            self.flags.ponder.store(false, Ordering::Release);
        }
        info!(?budget, forced = self.ponder_forced, "ponder hit");
    }

    /// Stop the search and wait for its thread. The thread reports its
    /// `bestmove` before it exits.
    pub fn stop_search(&mut self) {
        self.flags.infinite.store(false, Ordering::Release);
        self.flags.ponder.store(false, Ordering::Release);
        self.stop_thread();
        if let Some(mb) = self.pending_hash_mb.take() {
            self.setup_tt(mb);
        }
    }

    /// Forget the previous game: stops any search and clears the table.
    pub fn new_game(&mut self) {
        self.stop_search();
        self.tt.clear();
        self.game_seed = pick_seed(&self.options);
        info!("new game");
    }

    /// Apply `setoption`. Unknown names and bad values are logged and
    /// ignored.
    pub fn set_option(&mut self, name: &str, value: &str) {
        match self.options.set(name, value) {
            Ok(Some(change)) => {
                info!(option = name, value, "option set");
                match change {
                    OptionChange::Hash(mb) => self.setup_tt(mb),
                    OptionChange::RandomSeed(_) => self.game_seed = pick_seed(&self.options),
                    _ => {}
                }
            }
            Ok(None) => debug!(option = name, "unknown option ignored"),
            Err(e) => warn!(error = %e, "option rejected"),
        }
    }

    /// Move stored for the position after `best`, if it is legal there.
    pub fn get_ponder_move(&self, pos: &Position, best: Move) -> Option<Move> {
        ponder_move(&self.tt, pos, best)
    }

    fn budget_for(&self, pos: &Position, params: &SearchParams) -> SearchBudget {
        let mut budget =
            compute_time_limit(params, pos.side_to_move == Color::White, self.options.ponder);
        if self.options.analyse_mode {
            budget.time = None;
        }
        budget
    }

    fn stop_if_running(&mut self) {
        if !self.is_idle() {
            warn!("search requested while another is active, stopping it first");
        }
        self.stop_search();
    }

    /// Rebuild the table at the new size, or remember the size until the
    /// controller is idle.
    fn setup_tt(&mut self, mb: usize) {
        if !self.is_idle() {
            info!(mb, "hash resize deferred until the search ends");
            self.pending_hash_mb = Some(mb);
            return;
        }
        let log2 = TranspositionTable::log2_for_megabytes(mb);
        if self.tt.entries() != 1usize << log2 {
            self.tt = Arc::new(TranspositionTable::new(log2));
            info!(mb, entries = self.tt.entries(), "transposition table resized");
        }
    }

    fn start_thread(&mut self, job: SearchJob, time: Option<TimeLimit>) {
        let tc = TimeControl::new(time);
        tc.start();
        let ctx = SearchContext {
            out: Arc::clone(&self.out),
            tt: Arc::clone(&self.tt),
            slot: Arc::clone(&self.slot),
            flags: Arc::clone(&self.flags),
            tc: tc.clone(),
        };
        let fallback = (job.pos.clone(), job.root_moves.first().copied());

        // Held until the handle is stored, so the thread cannot detach early
        let mut slot = lock_slot(&self.slot);
        self.flags.should_detach.store(true, Ordering::Release);
        let spawned = thread::Builder::new()
            .name("search".to_string())
            .stack_size(SEARCH_STACK_SIZE)
            .spawn(move || run_search_thread(job, ctx));
        match spawned {
            Ok(handle) => *slot = Some(ActiveSearch { handle, tc }),
            Err(e) => {
                drop(slot);
                error!(error = %e, "failed to spawn search thread");
                self.flags.ponder.store(false, Ordering::Release);
                self.flags.infinite.store(false, Ordering::Release);
                report_best_move(&self.out, &self.tt, &fallback.0, fallback.1);
            }
        }
    }

    fn stop_thread(&self) {
        let active = {
            let mut slot = lock_slot(&self.slot);
            self.flags.should_detach.store(false, Ordering::Release);
            slot.take()
        };
        if let Some(active) = active {
            self.flags.stopping.store(true, Ordering::Release);
            active.tc.stop();
            active.handle.thread().unpark();
            if active.handle.join().is_err() {
                error!("search thread panicked");
            }
            self.flags.stopping.store(false, Ordering::Release);
            debug!("search thread joined");
        }
    }
}

impl Drop for EngineControl {
    fn drop(&mut self) {
        self.flags.infinite.store(false, Ordering::Release);
        self.flags.ponder.store(false, Ordering::Release);
        self.stop_thread();
    }
}

fn pick_seed(options: &EngineOptions) -> u64 {
    match options.random_seed {
        0 => rand::random::<u64>(),
        seed => seed,
    }
}

/// Play `moves` from `start`, returning the reached position and the hashes
/// of the positions before it. Stops at the first illegal move.
fn setup_position(start: &Position, moves: &[Move]) -> (Position, Vec<u64>) {
    let mut pos = start.clone();
    let mut history = Vec::with_capacity(moves.len());
    for &mv in moves {
        if !is_legal(&mut pos, mv) {
            warn!(%mv, fen = %pos.to_fen(), "illegal move in game history, ignoring the rest");
            break;
        }
        history.push(pos.position_hash());
        pos.make_move(mv);
    }
    (pos, history)
}

/// Legal moves of `pos`, restricted to `search_moves` when that leaves any.
fn root_moves(pos: &Position, search_moves: &[Move]) -> MoveList {
    let mut scratch = pos.clone();
    let mut list = MoveList::new();
    legal_moves_into(&mut scratch, &mut list);
    if !search_moves.is_empty() {
        let mut filtered = list.clone();
        filtered.filter(search_moves);
        if filtered.is_empty() {
            warn!("no legal searchmoves, searching all moves");
        } else {
            list = filtered;
        }
    }
    list
}

pub(crate) fn ponder_move(tt: &TranspositionTable, pos: &Position, best: Move) -> Option<Move> {
    let mut pos = pos.clone();
    if !is_legal(&mut pos, best) {
        return None;
    }
    pos.make_move(best);
    let entry = tt.probe(pos.position_hash())?;
    is_legal(&mut pos, entry.best_move).then_some(entry.best_move)
}

fn report_best_move(out: &SharedOutput, tt: &TranspositionTable, pos: &Position, best: Option<Move>) {
    let line = match best {
        Some(mv) => match ponder_move(tt, pos, mv) {
            Some(reply) => format!("bestmove {mv} ponder {reply}"),
            None => format!("bestmove {mv}"),
        },
        None => "bestmove 0000".to_string(),
    };
    debug!(%line, "search result");
    send_line(out, &line);
}

fn run_search_thread(job: SearchJob, ctx: SearchContext) {
    let best = if job.run_search && !job.root_moves.is_empty() {
        let listener = Box::new(UciSearchListener::new(Arc::clone(&ctx.out)));
        let mut search = Search::new(
            job.pos.clone(),
            job.history,
            Arc::clone(&ctx.tt),
            Some(listener),
            ctx.tc.clone(),
        );
        search.set_strength(job.strength, job.seed);
        search.iterative_deepening(&job.root_moves, job.max_depth, job.max_nodes)
    } else {
        job.root_moves.first().copied()
    };

    while ctx.flags.ponder.load(Ordering::Acquire) || ctx.flags.infinite.load(Ordering::Acquire) {
        thread::park_timeout(REPORT_POLL);
    }
    report_best_move(&ctx.out, &ctx.tt, &job.pos, best);

    let mut slot = lock_slot(&ctx.slot);
    if ctx.flags.should_detach.load(Ordering::Acquire) {
        // Dropping our own handle detaches the thread
        slot.take();
    }
}
