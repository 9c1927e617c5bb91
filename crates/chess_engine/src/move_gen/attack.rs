//! Attack detection and check queries
//!
//! Answers "is this square attacked by that side?" without generating full move
//! lists. Castling generation and the legality filter both depend on it.
//!
//! ## Algorithm
//!
//! Every piece of the attacking color is asked whether its capture pattern
//! reaches the target square. Pawns attack diagonally only, sliders stop at the
//! first occupied square, knights and kings use their fixed offsets. En passant
//! and castling never attack anything, so they are not considered.

use crate::board::Board;
use crate::constants::{BISHOP_DIRECTIONS, KING_OFFSETS, KNIGHT_OFFSETS, ROOK_DIRECTIONS};
use crate::types::{Color, PieceKind, Square};

/// Check if `square` is attacked by any piece of `by_color`
///
/// # Arguments
///
/// * `board` - Position to inspect
/// * `square` - Target square
/// * `by_color` - Side whose pieces might attack
///
/// # Returns
///
/// `true` if at least one piece of `by_color` could capture on `square`
pub fn is_square_attacked(board: &Board, square: Square, by_color: Color) -> bool {
    board
        .pieces()
        .filter(|(_, piece)| piece.color == by_color)
        .any(|(from, piece)| match piece.kind {
            PieceKind::Pawn => can_pawn_attack(from, square, by_color),
            PieceKind::Knight => can_step_attack(from, square, &KNIGHT_OFFSETS),
            PieceKind::King => can_step_attack(from, square, &KING_OFFSETS),
            PieceKind::Bishop => can_ray_attack(board, from, square, &BISHOP_DIRECTIONS),
            PieceKind::Rook => can_ray_attack(board, from, square, &ROOK_DIRECTIONS),
            PieceKind::Queen => {
                can_ray_attack(board, from, square, &BISHOP_DIRECTIONS)
                    || can_ray_attack(board, from, square, &ROOK_DIRECTIONS)
            }
        })
}

/// Pawns capture one file sideways, one rank forward
fn can_pawn_attack(from: Square, to: Square, color: Color) -> bool {
    [-1, 1]
        .iter()
        .any(|&df| from.offset(df, color.pawn_direction()) == Some(to))
}

fn can_step_attack(from: Square, to: Square, offsets: &[(i8, i8)]) -> bool {
    offsets
        .iter()
        .any(|&(df, dr)| from.offset(df, dr) == Some(to))
}

/// Walk each ray until it leaves the board, reaches `to`, or hits a blocker
fn can_ray_attack(board: &Board, from: Square, to: Square, directions: &[(i8, i8)]) -> bool {
    for &(df, dr) in directions {
        let mut current = from;
        while let Some(next) = current.offset(df, dr) {
            if next == to {
                return true;
            }
            if board.piece_at(next).is_some() {
                break;
            }
            current = next;
        }
    }
    false
}

/// Check if the king of `color` is attacked
///
/// A board without that king is never in check.
pub fn is_in_check(board: &Board, color: Color) -> bool {
    board
        .king_square(color)
        .is_some_and(|king| is_square_attacked(board, king, color.opposite()))
}
