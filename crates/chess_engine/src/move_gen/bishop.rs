//! Bishop move generation (diagonal rays)

use crate::board::Board;
use crate::constants::BISHOP_DIRECTIONS;
use crate::types::{Move, Piece, Square};

use super::sliding::generate_sliding_moves;

pub fn generate_bishop_moves(board: &Board, from: Square, bishop: Piece, moves: &mut Vec<Move>) {
    generate_sliding_moves(board, from, bishop, &BISHOP_DIRECTIONS, moves);
}
