//! Argument parsing for the `go` and `setoption` commands.

use chess_core::{Position, SearchParams, parse_uci_move};
use tracing::warn;

const GO_KEYWORDS: [&str; 12] = [
    "searchmoves",
    "ponder",
    "wtime",
    "btime",
    "winc",
    "binc",
    "movestogo",
    "depth",
    "nodes",
    "mate",
    "movetime",
    "infinite",
];

fn number<T: std::str::FromStr>(key: &str, tok: Option<&&str>) -> Option<T> {
    let tok = tok?;
    let parsed = tok.parse::<T>().ok();
    if parsed.is_none() {
        warn!(key, value = *tok, "ignoring unparsable go argument");
    }
    parsed
}

/// Parse the arguments of `go`. `pos` is the position being searched, used
/// to resolve `searchmoves`. Malformed values are skipped.
pub fn parse_go(args: &[&str], pos: &Position) -> SearchParams {
    let mut params = SearchParams::default();
    let mut i = 0;
    while i < args.len() {
        let key = args[i];
        let next = args.get(i + 1);
        let mut consumed = 1;
        match key {
            "searchmoves" => {
                while let Some(&txt) = args.get(i + consumed) {
                    if GO_KEYWORDS.contains(&txt) {
                        break;
                    }
                    match parse_uci_move(pos, txt) {
                        Some(mv) => params.search_moves.push(mv),
                        None => warn!(mv = txt, "ignoring illegal searchmove"),
                    }
                    consumed += 1;
                }
            }
            "ponder" => params.ponder = true,
            "infinite" => params.infinite = true,
            "wtime" => {
                params.w_time = number(key, next);
                consumed = 2;
            }
            "btime" => {
                params.b_time = number(key, next);
                consumed = 2;
            }
            "winc" => {
                params.w_inc = number(key, next).unwrap_or(0);
                consumed = 2;
            }
            "binc" => {
                params.b_inc = number(key, next).unwrap_or(0);
                consumed = 2;
            }
            "movestogo" => {
                params.moves_to_go = number(key, next);
                consumed = 2;
            }
            "depth" => {
                params.depth = number(key, next);
                consumed = 2;
            }
            "nodes" => {
                params.nodes = number(key, next);
                consumed = 2;
            }
            "mate" => {
                params.mate = number(key, next);
                consumed = 2;
            }
            "movetime" => {
                params.move_time = number(key, next);
                consumed = 2;
            }
            other => warn!(token = other, "unknown go argument"),
        }
        i += consumed;
    }
    params
}

/// Split `name <id...> [value <x...>]` into name and value. Both may contain
/// spaces; a missing value (button options) gives an empty string.
pub fn parse_setoption(args: &[&str]) -> Option<(String, String)> {
    #[derive(PartialEq)]
    enum Mode {
        Skip,
        Name,
        Value,
    }

    let mut name = Vec::new();
    let mut value = Vec::new();
    let mut mode = Mode::Skip;
    for &tok in args {
        match tok {
            "name" if mode == Mode::Skip => mode = Mode::Name,
            "value" if mode == Mode::Name => mode = Mode::Value,
            _ if mode == Mode::Name => name.push(tok),
            _ if mode == Mode::Value => value.push(tok),
            _ => {}
        }
    }
    if name.is_empty() {
        return None;
    }
    Some((name.join(" "), value.join(" ")))
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod protocol_tests;
