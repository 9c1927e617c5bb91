//! # Chess Engine Constants
//!
//! Direction tables for move generation and the fixed squares the rules refer to.
//!
//! Offsets are `(file_delta, rank_delta)` pairs applied through
//! [`crate::types::Square::offset`], which returns `None` when a step leaves the
//! board. This avoids the wrap-around checks a flat `index + 8` scheme would need.

/// Position notation of the standard starting position
pub const INITIAL_POSITION: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Knight jumps
pub const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

/// One-step king moves
pub const KING_OFFSETS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

/// Rook rays (N, E, S, W)
pub const ROOK_DIRECTIONS: [(i8, i8); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

/// Bishop rays (NE, SE, SW, NW)
pub const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

/// Central squares of king-of-the-hill as (file, rank): d4, e4, d5, e5
pub const HILL_SQUARES: [(u8, u8); 4] = [(3, 3), (4, 3), (3, 4), (4, 4)];

/// Halfmove clock value at which the fifty-move rule ends the game
pub const FIFTY_MOVE_HALFMOVES: u32 = 100;

/// Occurrences of a position that make it a threefold repetition
pub const REPETITION_LIMIT: usize = 3;

/// Checks that end a three-check game
pub const THREE_CHECK_LIMIT: u8 = 3;

/// Files (0-based) of the king and rooks for castling
pub const KING_START_FILE: u8 = 4;
pub const KING_SIDE_ROOK_FILE: u8 = 7;
pub const QUEEN_SIDE_ROOK_FILE: u8 = 0;
