//! Pawn move generation
//!
//! Handles pawn-specific move generation including:
//! - Single and double forward pushes
//! - Diagonal captures
//! - En passant onto the board's target square
//! - Promotion, one candidate per promotion kind
//!
//! ## Pawn Movement Rules
//!
//! - **Forward push**: one square toward the opponent, onto an empty square
//! - **Double push**: from the second rank (seventh for Black), both squares empty
//! - **Captures**: one square diagonally forward, onto an enemy piece
//! - **En passant**: diagonally onto the en passant target, taking the enemy pawn
//!   that stands beside the mover
//! - **Promotion**: any move onto the last rank is emitted four times, in the
//!   order queen, rook, bishop, knight

use crate::board::Board;
use crate::types::{Move, Piece, PieceKind, Square};

/// Generate pawn moves from `from`
///
/// # Arguments
///
/// * `board` - The current position
/// * `from` - Square of the pawn
/// * `pawn` - The pawn itself (carries its color)
/// * `moves` - Output vector to append moves to
pub fn generate_pawn_moves(board: &Board, from: Square, pawn: Piece, moves: &mut Vec<Move>) {
    let color = pawn.color;
    let dir = color.pawn_direction();
    let start_rank = match dir {
        1 => 1,
        _ => 6,
    };

    if let Some(one) = from.offset(0, dir) {
        if board.piece_at(one).is_none() {
            push_with_promotions(Move::new(from, one, pawn, None), moves);

            if from.rank() == start_rank {
                if let Some(two) = one.offset(0, dir) {
                    if board.piece_at(two).is_none() {
                        moves.push(Move::new(from, two, pawn, None));
                    }
                }
            }
        }
    }

    for df in [-1, 1] {
        let Some(target) = from.offset(df, dir) else {
            continue;
        };
        match board.piece_at(target) {
            Some(victim) if victim.color != color => {
                push_with_promotions(Move::new(from, target, pawn, Some(victim)), moves);
            }
            Some(_) => {}
            None if board.en_passant() == Some(target) => {
                let beside = Square::new(target.file(), from.rank()).and_then(|sq| board.piece_at(sq));
                if let Some(victim) = beside {
                    if victim.kind == PieceKind::Pawn && victim.color != color {
                        let mut mv = Move::new(from, target, pawn, Some(victim));
                        mv.is_en_passant = true;
                        moves.push(mv);
                    }
                }
            }
            None => {}
        }
    }
}

/// Expand a move onto the last rank into one move per promotion kind
fn push_with_promotions(mv: Move, moves: &mut Vec<Move>) {
    let last_rank = mv.piece.color.opposite().back_rank();
    if mv.to.rank() != last_rank {
        moves.push(mv);
        return;
    }
    for kind in PieceKind::PROMOTIONS {
        moves.push(Move {
            promotion: Some(kind),
            ..mv
        });
    }
}
