//! UCI command dispatch on top of [`EngineControl`].

use chess_core::{Move, Position, parse_position};
use tracing::{debug, warn};

use crate::engine_control::EngineControl;
use crate::protocol::{parse_go, parse_setoption};

pub const ENGINE_NAME: &str = "ChessLab Classical";
pub const ENGINE_AUTHOR: &str = "ChessLab";

pub struct UciSession {
    control: EngineControl,
    start: Position,
    moves: Vec<Move>,
    /// `start` after `moves`
    current: Position,
}

impl UciSession {
    pub fn new(control: EngineControl) -> Self {
        UciSession {
            control,
            start: Position::startpos(),
            moves: Vec::new(),
            current: Position::startpos(),
        }
    }

    pub fn control(&self) -> &EngineControl {
        &self.control
    }

    /// Handle one input line. Returns true on `quit`.
    pub fn handle_command(&mut self, line: &str) -> bool {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&cmd, args)) = parts.split_first() else {
            return false;
        };
        debug!(line = line.trim(), "command");

        match cmd {
            "uci" => {
                self.control.send(&format!("id name {ENGINE_NAME}"));
                self.control.send(&format!("id author {ENGINE_AUTHOR}"));
                let mut text = Vec::new();
                match EngineControl::print_options(&mut text) {
                    Ok(()) => {
                        for line in String::from_utf8_lossy(&text).lines() {
                            self.control.send(line);
                        }
                    }
                    Err(e) => warn!(error = %e, "cannot format options"),
                }
                self.control.send("uciok");
            }
            "isready" => self.control.send("readyok"),
            "setoption" => match parse_setoption(args) {
                Some((name, value)) => self.control.set_option(&name, &value),
                None => warn!(line, "setoption without name"),
            },
            "ucinewgame" => {
                self.control.new_game();
                self.set_position(Position::startpos(), Vec::new());
            }
            "position" => match parse_position(args) {
                Ok((start, moves)) => self.set_position(start, moves),
                Err(e) => {
                    warn!(error = %e, "bad position command");
                    self.control.send(&format!("info string position error: {e}"));
                }
            },
            "go" => {
                let params = parse_go(args, &self.current);
                if params.ponder {
                    self.control.start_ponder(&self.start, &self.moves, &params);
                } else {
                    self.control.start_search(&self.start, &self.moves, &params);
                }
            }
            "stop" => self.control.stop_search(),
            "ponderhit" => self.control.ponder_hit(),
            "quit" => {
                self.control.stop_search();
                return true;
            }
            other => debug!(command = other, "unknown command ignored"),
        }
        false
    }

    fn set_position(&mut self, start: Position, moves: Vec<Move>) {
        let mut current = start.clone();
        for &mv in &moves {
            current.make_move(mv);
        }
        self.start = start;
        self.moves = moves;
        self.current = current;
    }
}
