//! King move generation
//!
//! Handles king steps and castling.
//!
//! ## King Movement Rules
//!
//! - One square in any direction, not onto a friendly piece
//! - Squares left attacked are removed later by the legality filter
//!
//! ## Castling
//!
//! Castling is generated here, not by the filter, because all of these must hold:
//! - The castling right for that side is still set (rights are revoked when the
//!   king or the corner rook moves, so the board is never scanned for history)
//! - King on its start square and a friendly rook on the corner
//! - Every square between king and rook is empty
//! - The king is not in check, and neither the square it crosses nor the one it
//!   lands on is attacked

use crate::board::{Board, CastleSide};
use crate::constants::{KING_OFFSETS, KING_SIDE_ROOK_FILE, KING_START_FILE, QUEEN_SIDE_ROOK_FILE};
use crate::types::{Move, Piece, PieceKind, Square};

use super::attack::is_square_attacked;
use super::sliding::generate_step_moves;

/// Generate one-square king moves from `from` (no castling)
pub fn generate_king_moves(board: &Board, from: Square, king: Piece, moves: &mut Vec<Move>) {
    generate_step_moves(board, from, king, &KING_OFFSETS, moves);
}

/// Generate castling moves for the king on `from`
pub fn generate_castling_moves(board: &Board, from: Square, king: Piece, moves: &mut Vec<Move>) {
    let color = king.color;
    let rank = color.back_rank();
    if from.rank() != rank || from.file() != KING_START_FILE {
        return;
    }
    let enemy = color.opposite();
    if is_square_attacked(board, from, enemy) {
        return;
    }

    for side in [CastleSide::King, CastleSide::Queen] {
        if !board.castling().has(color, side) {
            continue;
        }
        let (rook_file, between, path): (u8, &[u8], [u8; 2]) = match side {
            CastleSide::King => (KING_SIDE_ROOK_FILE, &[5, 6], [5, 6]),
            CastleSide::Queen => (QUEEN_SIDE_ROOK_FILE, &[1, 2, 3], [3, 2]),
        };

        let rook_home = Square::new(rook_file, rank).and_then(|sq| board.piece_at(sq));
        if rook_home != Some(Piece::new(PieceKind::Rook, color)) {
            continue;
        }

        let clear = between
            .iter()
            .filter_map(|&file| Square::new(file, rank))
            .all(|sq| board.piece_at(sq).is_none());
        if !clear {
            continue;
        }

        let safe = path
            .iter()
            .filter_map(|&file| Square::new(file, rank))
            .all(|sq| !is_square_attacked(board, sq, enemy));
        if !safe {
            continue;
        }

        if let Some(to) = Square::new(path[1], rank) {
            let mut mv = Move::new(from, to, king, None);
            mv.is_castling = true;
            moves.push(mv);
        }
    }
}
