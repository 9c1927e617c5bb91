//! Queen move generation
//!
//! A queen is a rook and a bishop on the same square: both ray sets are cast.

use crate::board::Board;
use crate::constants::{BISHOP_DIRECTIONS, ROOK_DIRECTIONS};
use crate::types::{Move, Piece, Square};

use super::sliding::generate_sliding_moves;

pub fn generate_queen_moves(board: &Board, from: Square, queen: Piece, moves: &mut Vec<Move>) {
    generate_sliding_moves(board, from, queen, &ROOK_DIRECTIONS, moves);
    generate_sliding_moves(board, from, queen, &BISHOP_DIRECTIONS, moves);
}
