//! Sliding and stepping move generation
//!
//! Common functionality for pieces whose moves are a list of directions.
//!
//! ## Algorithm
//!
//! - **Sliders** (bishop, rook, queen): walk each direction one square at a
//!   time. Empty squares are quiet moves; the first occupied square ends the
//!   ray and is included as a capture when it holds an enemy piece.
//! - **Steppers** (knight, king): each offset is a single candidate, kept
//!   when it stays on the board and is not occupied by a friendly piece.

use crate::board::Board;
use crate::types::{Move, Piece, Square};

/// Cast one ray per direction from `from`
///
/// # Arguments
///
/// * `board` - The current position
/// * `from` - Square of the sliding piece
/// * `piece` - The moving piece
/// * `directions` - `(file, rank)` steps to repeat
/// * `moves` - Output vector to append moves to
pub fn generate_sliding_moves(
    board: &Board,
    from: Square,
    piece: Piece,
    directions: &[(i8, i8)],
    moves: &mut Vec<Move>,
) {
    for &(df, dr) in directions {
        let mut current = from;
        while let Some(next) = current.offset(df, dr) {
            match board.piece_at(next) {
                None => moves.push(Move::new(from, next, piece, None)),
                Some(other) => {
                    if other.color != piece.color {
                        moves.push(Move::new(from, next, piece, Some(other)));
                    }
                    break;
                }
            }
            current = next;
        }
    }
}

/// One candidate per offset, skipping squares held by `piece`'s own side
pub fn generate_step_moves(
    board: &Board,
    from: Square,
    piece: Piece,
    offsets: &[(i8, i8)],
    moves: &mut Vec<Move>,
) {
    for &(df, dr) in offsets {
        let Some(to) = from.offset(df, dr) else {
            continue;
        };
        match board.piece_at(to) {
            Some(other) if other.color == piece.color => {}
            captured => moves.push(Move::new(from, to, piece, captured)),
        }
    }
}
