//! Knight move generation
//!
//! Knights jump in an L-shape, two squares one way and one square
//! perpendicular. They ignore blockers and may land on any square not held by
//! their own side.

use crate::board::Board;
use crate::constants::KNIGHT_OFFSETS;
use crate::types::{Move, Piece, Square};

use super::sliding::generate_step_moves;

/// Generate knight moves from `from`
pub fn generate_knight_moves(board: &Board, from: Square, knight: Piece, moves: &mut Vec<Move>) {
    generate_step_moves(board, from, knight, &KNIGHT_OFFSETS, moves);
}
