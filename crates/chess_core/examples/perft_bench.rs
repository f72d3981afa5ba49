//! Perft benchmark.
//!
//! Usage:
//!   cargo run --release --example perft_bench -p chess_core -- [depth] [fen] [divide]
//!
//! With a FEN the single position is searched; a trailing `divide` prints the
//! node count below each root move.

use chess_core::{ChessError, Position, START_FEN, divide, perft};
use std::env;
use std::time::{Duration, Instant};

const TEST_POSITIONS: &[(&str, &str)] = &[
    ("Starting position", START_FEN),
    (
        "Kiwipete",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    ),
    ("Position 3", "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1"),
    (
        "Position 4",
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    ),
    (
        "Position 5",
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    ),
];

fn nps(nodes: u64, elapsed: Duration) -> f64 {
    nodes as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
}

fn main() -> Result<(), ChessError> {
    let args: Vec<String> = env::args().collect();
    let depth: u8 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(5);

    match args.get(2) {
        Some(fen) => run_single_position(fen, depth, args.get(3).is_some_and(|a| a == "divide")),
        None => run_all_positions(depth),
    }
}

fn run_single_position(fen: &str, depth: u8, show_divide: bool) -> Result<(), ChessError> {
    let mut pos = Position::from_fen(fen)?;
    println!("Position: {fen}");
    println!("Depth: {depth}");
    println!();

    let start = Instant::now();
    let nodes = if show_divide {
        let split = divide(&mut pos, depth);
        for (mv, count) in &split {
            println!("{mv}: {count}");
        }
        split.iter().map(|(_, n)| n).sum()
    } else {
        perft(&mut pos, depth)
    };
    let elapsed = start.elapsed();

    println!("Nodes: {nodes}");
    println!("Time: {elapsed:.3?}");
    println!("NPS: {:.0}", nps(nodes, elapsed));
    Ok(())
}

fn run_all_positions(depth: u8) -> Result<(), ChessError> {
    println!("=== Perft Benchmark Suite ===");
    println!("Depth: {depth}");
    println!();

    let mut total_nodes = 0u64;
    let mut total_time = Duration::ZERO;
    for (name, fen) in TEST_POSITIONS {
        let mut pos = Position::from_fen(fen)?;
        print!("{name:.<30}");

        let start = Instant::now();
        let nodes = perft(&mut pos, depth);
        let elapsed = start.elapsed();
        total_nodes += nodes;
        total_time += elapsed;

        println!(" {nodes:>12} nodes in {elapsed:>8.3?} ({:>10.0} nps)", nps(nodes, elapsed));
    }

    println!();
    println!("{:=<70}", "");
    println!(
        "TOTAL: {total_nodes} nodes in {total_time:.3?} ({:.0} nps)",
        nps(total_nodes, total_time)
    );
    Ok(())
}
