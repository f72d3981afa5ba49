mod common;

use std::thread;
use std::time::{Duration, Instant};

use chess_core::{Position, SearchParams, legal_moves, parse_uci_move};
use classical_engine::TranspositionTable;
use common::{Output, wait_until};
use uci_engine::{ControlState, EngineControl, EngineOptions};

const WAIT: Duration = Duration::from_secs(10);

/// White's only legal move is Kxg2.
const ONE_REPLY_FEN: &str = "7k/8/8/8/8/8/6q1/7K w - - 0 1";
const MATED_FEN: &str = "7k/6Q1/6K1/8/8/8/8/8 b - - 0 1";

fn small_options() -> EngineOptions {
    EngineOptions {
        hash_mb: 1,
        random_seed: 1,
        ..EngineOptions::default()
    }
}

fn control() -> (EngineControl, Output) {
    let out = Output::default();
    (EngineControl::with_options(out.clone(), small_options()), out)
}

fn infinite() -> SearchParams {
    SearchParams {
        infinite: true,
        ..SearchParams::default()
    }
}

fn depth(d: u32) -> SearchParams {
    SearchParams {
        depth: Some(d),
        ..SearchParams::default()
    }
}

fn best_move(line: &str) -> &str {
    line.split_whitespace().nth(1).unwrap()
}

#[test]
fn test_start_stop_stress() {
    let (mut ec, out) = control();
    let pos = Position::startpos();
    for _ in 0..1000 {
        ec.start_search(&pos, &[], &infinite());
        assert_ne!(ec.state(), ControlState::Idle);
        ec.stop_search();
        assert_eq!(ec.state(), ControlState::Idle);
    }
    assert_eq!(out.count("bestmove"), 1000);
    ec.start_search(&pos, &[], &depth(2));
    assert!(out.wait_for("bestmove", WAIT).is_some());
}

#[test]
fn test_bounded_search_reports_on_its_own() {
    let (mut ec, out) = control();
    let pos = Position::startpos();
    ec.start_search(&pos, &[], &depth(3));
    let line = out.wait_for("bestmove", WAIT).expect("search finished");
    assert!(legal_moves(&pos).iter().any(|m| m.to_string() == best_move(&line)));
    assert!(wait_until(WAIT, || ec.is_idle()), "thread detached after reporting");
    assert!(out.count("info depth 3") >= 1);

    // Stopping an idle controller is harmless
    ec.stop_search();
    assert_eq!(out.count("bestmove"), 1);
}

#[test]
fn test_infinite_search_waits_for_stop() {
    let (mut ec, out) = control();
    // Mate in one: the search finishes early but must not answer yet
    let pos = Position::from_fen("6k1/5ppp/8/8/8/8/5PPP/4Q1K1 w - - 0 1").unwrap();
    ec.start_search(&pos, &[], &infinite());
    thread::sleep(Duration::from_millis(200));
    assert_eq!(out.count("bestmove"), 0);
    assert_eq!(ec.state(), ControlState::Searching);

    ec.stop_search();
    assert_eq!(out.last("bestmove").as_deref().map(best_move), Some("e1e8"));
    assert!(ec.is_idle());
}

#[test]
fn test_ponder_hit_keeps_searching_same_tree() {
    let (mut ec, out) = control();
    let start = Position::startpos();
    let moves = vec![parse_uci_move(&start, "e2e4").unwrap()];
    let params = SearchParams {
        w_time: Some(2_000),
        b_time: Some(2_000),
        ponder: true,
        ..SearchParams::default()
    };

    ec.start_ponder(&start, &moves, &params);
    assert_eq!(ec.state(), ControlState::Pondering);
    thread::sleep(Duration::from_millis(150));
    assert_eq!(out.count("bestmove"), 0, "no answer while pondering");
    assert!(ec.transposition_table().hashfull() > 0);

    ec.ponder_hit();
    assert_eq!(ec.state(), ControlState::Searching);
    let line = out.wait_for("bestmove", WAIT).expect("time-bounded after ponder hit");
    let mut after = start.clone();
    after.make_move(moves[0]);
    assert!(legal_moves(&after).iter().any(|m| m.to_string() == best_move(&line)));
    let first_iterations = out.lines().iter().filter(|l| *l == "info depth 1").count();
    assert_eq!(first_iterations, 1, "tree search was not restarted");
}

#[test]
fn test_ponder_stop_reports() {
    let (mut ec, out) = control();
    let pos = Position::startpos();
    ec.start_ponder(&pos, &[], &SearchParams::default());
    thread::sleep(Duration::from_millis(50));
    ec.stop_search();
    assert_eq!(out.count("bestmove"), 1);
    assert_eq!(ec.state(), ControlState::Idle);
}

#[test]
fn test_ponder_hit_while_idle_is_ignored() {
    let (mut ec, out) = control();
    ec.ponder_hit();
    assert_eq!(ec.state(), ControlState::Idle);
    assert!(out.lines().is_empty());
}

#[test]
fn test_single_move_reported_immediately() {
    let (mut ec, out) = control();
    let pos = Position::from_fen(ONE_REPLY_FEN).unwrap();
    let params = SearchParams {
        w_time: Some(60_000),
        ..SearchParams::default()
    };
    ec.start_search(&pos, &[], &params);
    assert!(ec.is_idle());
    assert_eq!(out.last("bestmove").as_deref().map(best_move), Some("h1g2"));
    assert_eq!(out.count("info depth"), 0, "no search was run");
}

#[test]
fn test_single_move_ponder_policy() {
    let pos = Position::from_fen(ONE_REPLY_FEN).unwrap();

    // Default policy still searches while pondering
    let (mut ec, out) = control();
    ec.start_ponder(&pos, &[], &SearchParams::default());
    assert!(out.wait_for("info depth", WAIT).is_some());
    ec.stop_search();
    assert_eq!(out.last("bestmove").as_deref().map(best_move), Some("h1g2"));

    // Disabled: wait for the ponder hit without searching
    let out = Output::default();
    let mut ec = EngineControl::with_options(
        out.clone(),
        EngineOptions {
            ponder_single_move: false,
            ..small_options()
        },
    );
    let params = SearchParams {
        w_time: Some(10_000),
        ponder: true,
        ..SearchParams::default()
    };
    ec.start_ponder(&pos, &[], &params);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(ec.state(), ControlState::Pondering);
    assert!(out.lines().is_empty());
    ec.ponder_hit();
    let line = out.wait_for("bestmove", WAIT).unwrap();
    assert_eq!(best_move(&line), "h1g2");
    assert_eq!(out.count("info depth"), 0);
}

#[test]
fn test_ponder_hit_with_single_reply_answers_at_once() {
    let (mut ec, out) = control();
    // Kh2 is forced, but the position is rich enough to keep the search busy
    let pos = Position::from_fen("k7/8/8/8/8/8/5PP1/r5K1 w - - 0 1").unwrap();
    let params = SearchParams {
        w_time: Some(60_000),
        b_time: Some(60_000),
        ponder: true,
        ..SearchParams::default()
    };
    ec.start_ponder(&pos, &[], &params);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(out.count("bestmove"), 0);

    let hit = Instant::now();
    ec.ponder_hit();
    let line = out.wait_for("bestmove", WAIT).unwrap();
    assert!(hit.elapsed() < Duration::from_secs(1), "took {:?}", hit.elapsed());
    assert_eq!(best_move(&line), "g1h2");
    assert!(wait_until(WAIT, || ec.is_idle()));
}

#[test]
fn test_ponder_hit_applies_depth_and_node_limits() {
    let (mut ec, out) = control();
    let pos = Position::startpos();
    let params = SearchParams {
        depth: Some(2),
        ponder: true,
        ..SearchParams::default()
    };
    ec.start_ponder(&pos, &[], &params);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(out.count("bestmove"), 0, "limits wait for the hit");
    ec.ponder_hit();
    assert!(out.wait_for("bestmove", WAIT).is_some(), "depth limit ended the search");
    assert!(wait_until(WAIT, || ec.is_idle()));

    let out = Output::default();
    let mut ec = EngineControl::with_options(out.clone(), small_options());
    let params = SearchParams {
        nodes: Some(1_000),
        ponder: true,
        ..SearchParams::default()
    };
    ec.start_ponder(&pos, &[], &params);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(out.count("bestmove"), 0);
    ec.ponder_hit();
    assert!(out.wait_for("bestmove", WAIT).is_some(), "node limit ended the search");
}

#[test]
fn test_no_legal_moves_reports_null_move() {
    let (mut ec, out) = control();
    let pos = Position::from_fen(MATED_FEN).unwrap();
    ec.start_search(&pos, &[], &depth(3));
    assert_eq!(out.last("bestmove").as_deref(), Some("bestmove 0000"));

    ec.start_search(&pos, &[], &infinite());
    thread::sleep(Duration::from_millis(20));
    assert_eq!(out.count("bestmove"), 1);
    ec.stop_search();
    assert_eq!(out.count("bestmove 0000"), 2);
}

#[test]
fn test_hash_resize_deferred_while_searching() {
    let (mut ec, out) = control();
    let before = ec.transposition_table().entries();
    ec.start_search(&Position::startpos(), &[], &infinite());
    ec.set_option("Hash", "4");
    assert_eq!(ec.options().hash_mb, 4);
    assert_eq!(ec.transposition_table().entries(), before);

    ec.stop_search();
    assert_eq!(out.count("bestmove"), 1);
    assert_eq!(
        ec.transposition_table().entries(),
        1 << TranspositionTable::log2_for_megabytes(4)
    );
}

#[test]
fn test_hash_resize_when_idle() {
    let (mut ec, _out) = control();
    ec.set_option("hash", "2");
    assert_eq!(
        ec.transposition_table().entries(),
        1 << TranspositionTable::log2_for_megabytes(2)
    );
    ec.set_option("Hash", "not a number");
    assert_eq!(ec.options().hash_mb, 2);
}

#[test]
fn test_analyse_mode_drops_time_limits() {
    let (mut ec, out) = control();
    ec.set_option("UCI_AnalyseMode", "true");
    let params = SearchParams {
        move_time: Some(10),
        ..SearchParams::default()
    };
    ec.start_search(&Position::startpos(), &[], &params);
    thread::sleep(Duration::from_millis(150));
    assert_eq!(out.count("bestmove"), 0);
    ec.stop_search();
    assert_eq!(out.count("bestmove"), 1);
}

#[test]
fn test_searchmoves_restrict_root() {
    let (mut ec, out) = control();
    let pos = Position::startpos();
    let params = SearchParams {
        search_moves: vec![
            parse_uci_move(&pos, "a2a3").unwrap(),
            parse_uci_move(&pos, "h2h3").unwrap(),
        ],
        depth: Some(3),
        ..SearchParams::default()
    };
    ec.start_search(&pos, &[], &params);
    let line = out.wait_for("bestmove", WAIT).unwrap();
    assert!(["a2a3", "h2h3"].contains(&best_move(&line)), "{line}");
}

#[test]
fn test_new_game_stops_search_and_clears_table() {
    let (mut ec, out) = control();
    ec.start_search(&Position::startpos(), &[], &infinite());
    thread::sleep(Duration::from_millis(50));
    ec.new_game();
    assert!(ec.is_idle());
    assert_eq!(out.count("bestmove"), 1);
    assert_eq!(ec.transposition_table().hashfull(), 0);
}

#[test]
fn test_ponder_move_from_table() {
    let (mut ec, out) = control();
    let pos = Position::startpos();
    ec.start_search(&pos, &[], &depth(4));
    let line = out.wait_for("bestmove", WAIT).unwrap();
    let best = parse_uci_move(&pos, best_move(&line)).unwrap();

    let reply = ec.get_ponder_move(&pos, best).expect("reply stored in the table");
    let mut after = pos.clone();
    after.make_move(best);
    assert!(legal_moves(&after).contains(&reply));
    assert!(line.ends_with(&format!("ponder {reply}")));
    assert_eq!(ec.get_ponder_move(&pos, reply), None, "not legal for white");
}

#[test]
fn test_game_history_feeds_search() {
    let (mut ec, out) = control();
    let start = Position::startpos();
    let mut pos = start.clone();
    let mut moves = Vec::new();
    for txt in ["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6"] {
        let mv = parse_uci_move(&pos, txt).unwrap();
        pos.make_move(mv);
        moves.push(mv);
    }
    ec.start_search(&start, &moves, &depth(3));
    let line = out.wait_for("bestmove", WAIT).unwrap();
    assert!(legal_moves(&pos).iter().any(|m| m.to_string() == best_move(&line)));
}
