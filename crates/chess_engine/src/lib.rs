//! # Chess rules engine
//!
//! Board representation, position notation, legal move generation and game
//! termination rules. No search or evaluation: this crate only answers "what
//! is legal here?" and "is the game over?".
//!
//! ## Module Organization
//!
//! - `types` - colors, pieces, squares, moves, results
//! - `board` - [`Board`] and the six-field position notation codec
//! - `move_gen` - pseudo-legal generation per piece, legality filter, move application
//! - `rules` - [`RulesEngine`]: applies moves, keeps history, detects termination
//! - `setup` - shuffled chess960 starting positions
//!
//! ## Example
//!
//! ```
//! use chess_engine::{RulesEngine, Square};
//!
//! let mut engine = RulesEngine::new();
//! let e2: Square = "e2".parse().unwrap();
//! let e4: Square = "e4".parse().unwrap();
//! assert!(engine.make_move(e2, e4, None).is_some());
//! assert_eq!(
//!     engine.notation(),
//!     "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
//! );
//! ```

pub mod board;
pub mod constants;
pub mod error;
pub mod move_gen;
pub mod rules;
pub mod setup;
pub mod types;

pub use board::{Board, CastleSide, CastlingRights};
pub use constants::INITIAL_POSITION;
pub use error::{ChessEngineError, ChessEngineResult};
pub use rules::RulesEngine;
pub use types::{Color, GameResult, Move, Piece, PieceKind, Square};
