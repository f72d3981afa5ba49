//! Move generator throughput, split by generator.
//!
//! Usage:
//!   cargo run --release --example movegen_bench -p chess_core

use chess_core::{
    ChessError, MoveList, Position, check_evasions, in_check, pseudo_legal_captures,
    pseudo_legal_captures_and_checks, pseudo_legal_moves, remove_illegal,
};
use std::time::{Duration, Instant};

const TEST_POSITIONS: &[(&str, &str)] = &[
    ("Start", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
    (
        "Kiwipete",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    ),
    (
        "Promotions",
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    ),
    ("Rook endgame", "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1"),
    (
        "Double check",
        "r1bqkb1r/pppp1Npp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K2R b KQkq - 0 1",
    ),
    (
        "Single check",
        "rnbqkbnr/ppp2ppp/8/1B1pp3/4P3/8/PPPP1PPP/RNBQK1NR b KQkq - 1 3",
    ),
];

const ITERATIONS: usize = 100_000;

fn time_it(pos: &mut Position, mut generate: impl FnMut(&mut Position, &mut MoveList)) -> (f64, Duration) {
    let mut list = MoveList::new();
    let mut generated = 0usize;
    let start = Instant::now();
    for _ in 0..ITERATIONS {
        list.clear();
        generate(pos, &mut list);
        generated += list.len();
    }
    (generated as f64 / ITERATIONS as f64, start.elapsed())
}

fn main() -> Result<(), ChessError> {
    println!("=== Move Generation Benchmark ===");
    println!("Iterations per position: {ITERATIONS}");
    println!();

    let mut total = Duration::ZERO;
    for (name, fen) in TEST_POSITIONS {
        let mut pos = Position::from_fen(fen)?;
        println!("{name}");

        let runs: Vec<(&str, (f64, Duration))> = if in_check(&pos) {
            vec![
                ("evasions", time_it(&mut pos, |p, l| check_evasions(p, l))),
                (
                    "legal",
                    time_it(&mut pos, |p, l| {
                        check_evasions(p, l);
                        remove_illegal(p, l);
                    }),
                ),
            ]
        } else {
            vec![
                ("pseudo-legal", time_it(&mut pos, |p, l| pseudo_legal_moves(p, l))),
                ("captures", time_it(&mut pos, |p, l| pseudo_legal_captures(p, l))),
                (
                    "captures+checks",
                    time_it(&mut pos, |p, l| pseudo_legal_captures_and_checks(p, l)),
                ),
                (
                    "legal",
                    time_it(&mut pos, |p, l| {
                        pseudo_legal_moves(p, l);
                        remove_illegal(p, l);
                    }),
                ),
            ]
        };

        for (label, (per_pos, elapsed)) in runs {
            total += elapsed;
            let pps = ITERATIONS as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
            println!("  {label:.<20} {per_pos:>5.1} moves/pos, {pps:>10.0} pos/sec ({elapsed:>8.3?})");
        }
    }

    println!();
    println!("{:=<70}", "");
    println!("TOTAL: {total:.3?}");
    Ok(())
}
