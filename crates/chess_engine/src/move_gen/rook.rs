//! Rook move generation (orthogonal rays)

use crate::board::Board;
use crate::constants::ROOK_DIRECTIONS;
use crate::types::{Move, Piece, Square};

use super::sliding::generate_sliding_moves;

pub fn generate_rook_moves(board: &Board, from: Square, rook: Piece, moves: &mut Vec<Move>) {
    generate_sliding_moves(board, from, rook, &ROOK_DIRECTIONS, moves);
}
