//! Error types for position setup and move text.

use thiserror::Error;

/// Errors from parsing external text into positions and moves.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    /// FEN string that cannot describe a position
    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    /// Move text that is malformed or not legal in the position
    #[error("Invalid move '{text}'")]
    InvalidMove { text: String },

    /// Position command that is neither `startpos` nor `fen`
    #[error("Invalid position command: {reason}")]
    InvalidPositionCommand { reason: String },
}

/// Result type alias for chess core operations
pub type ChessResult<T> = Result<T, ChessError>;

impl ChessError {
    pub(crate) fn fen(fen: &str, reason: impl Into<String>) -> Self {
        ChessError::InvalidFen {
            fen: fen.to_string(),
            reason: reason.into(),
        }
    }
}
