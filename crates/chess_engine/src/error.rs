//! Error types for chess engine
//!
//! Provides custom error types for position parsing and textual input
//! (squares, promotion letters). Move legality is not an error: illegal
//! moves are reported as `None` by [`crate::rules::RulesEngine::make_move`].

use thiserror::Error;

/// Errors that can occur in the chess engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessEngineError {
    /// Position notation could not be parsed
    #[error("Malformed position `{notation}`: {reason}")]
    MalformedPosition { notation: String, reason: String },

    /// Square text is not `a1`..`h8`
    #[error("Invalid square: {square:?} (expected a1-h8)")]
    InvalidSquare { square: String },

    /// Piece letter is not one of p, n, b, r, q, k
    #[error("Invalid piece kind: {symbol:?}")]
    InvalidPieceKind { symbol: String },
}

impl ChessEngineError {
    pub(crate) fn malformed(notation: &str, reason: impl Into<String>) -> Self {
        ChessEngineError::MalformedPosition {
            notation: notation.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for chess engine operations
pub type ChessEngineResult<T> = Result<T, ChessEngineError>;
