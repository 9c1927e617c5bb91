//! Starting positions
//!
//! The standard setup lives on [`Board::starting_position`]. This module adds
//! the shuffled back rank used by the chess960 variant.
//!
//! ## Chess960 shuffle
//!
//! The rank is filled in a fixed order so the constraints hold by construction
//! rather than by rejection sampling:
//!
//! 1. one bishop on a random light square, one on a random dark square
//! 2. the queen on any remaining square
//! 3. both knights on remaining squares
//! 4. the last three squares become rook, king, rook from left to right
//!
//! Black mirrors White's files. The resulting board carries no castling rights.

use rand::Rng;

use crate::board::{Board, CastlingRights};
use crate::types::PieceKind;

/// Draw a chess960 back rank, files a through h
pub fn chess960_back_rank<R: Rng + ?Sized>(rng: &mut R) -> [PieceKind; 8] {
    let mut rank: [Option<PieceKind>; 8] = [None; 8];

    let light = 2 * rng.random_range(0..4) + 1;
    let dark = 2 * rng.random_range(0..4);
    rank[light] = Some(PieceKind::Bishop);
    rank[dark] = Some(PieceKind::Bishop);

    for kind in [PieceKind::Queen, PieceKind::Knight, PieceKind::Knight] {
        let free: Vec<usize> = (0..8).filter(|&file| rank[file].is_none()).collect();
        let pick = free[rng.random_range(0..free.len())];
        rank[pick] = Some(kind);
    }

    let mut remaining = [PieceKind::Rook, PieceKind::King, PieceKind::Rook].into_iter();
    for slot in rank.iter_mut().filter(|slot| slot.is_none()) {
        *slot = remaining.next();
    }

    rank.map(|slot| slot.unwrap_or(PieceKind::Rook))
}

/// Full chess960 starting board
pub fn chess960_position<R: Rng + ?Sized>(rng: &mut R) -> Board {
    let back = chess960_back_rank(rng);
    let mut board = Board::empty();
    board.place_back_ranks(&back);
    board.set_castling(CastlingRights::NONE);
    board
}
