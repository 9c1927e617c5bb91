//! Legal move generation and move application
//!
//! Generation runs in two passes:
//!
//! 1. **Pseudo-legal**: each piece family produces its candidate moves in its own
//!    submodule (`pawn`, `knight`, `bishop`, `rook`, `queen`, `king`), ignoring
//!    whether the mover's king is left attacked.
//! 2. **Legal filter**: every candidate is applied to a copy of the board and
//!    dropped if the mover's king is then attacked.
//!
//! Castling is the one exception that checks attacks while generating, since its
//! transit squares must also be safe and the filter only looks at the final
//! king square.
//!
//! [`apply_move_to_board`] is the single place where a move mutates a position;
//! both the legality check and [`crate::rules::RulesEngine::make_move`] go through
//! it.

use crate::board::{Board, CastleSide};
use crate::constants::{KING_SIDE_ROOK_FILE, QUEEN_SIDE_ROOK_FILE};
use crate::types::{Color, Move, Piece, PieceKind, Square};

mod attack;
mod bishop;
mod king;
mod knight;
mod pawn;
mod queen;
mod rook;
mod sliding;

pub use attack::{is_in_check, is_square_attacked};

/// Candidate moves for the piece on `from`, before the self-check filter
///
/// Returns an empty list for an empty square or a piece whose side is not to
/// move.
pub fn pseudo_legal_moves(board: &Board, from: Square) -> Vec<Move> {
    let mut moves = Vec::new();
    let Some(piece) = board.piece_at(from) else {
        return moves;
    };
    if piece.color != board.turn() {
        return moves;
    }

    match piece.kind {
        PieceKind::Pawn => pawn::generate_pawn_moves(board, from, piece, &mut moves),
        PieceKind::Knight => knight::generate_knight_moves(board, from, piece, &mut moves),
        PieceKind::Bishop => bishop::generate_bishop_moves(board, from, piece, &mut moves),
        PieceKind::Rook => rook::generate_rook_moves(board, from, piece, &mut moves),
        PieceKind::Queen => queen::generate_queen_moves(board, from, piece, &mut moves),
        PieceKind::King => {
            king::generate_king_moves(board, from, piece, &mut moves);
            king::generate_castling_moves(board, from, piece, &mut moves);
        }
    }
    moves
}

/// Legal moves for the piece on `from`
///
/// Each pseudo-legal move is played on a copy of `board`; it survives only if
/// the mover's king is not attacked afterwards.
pub fn legal_moves(board: &Board, from: Square) -> Vec<Move> {
    pseudo_legal_moves(board, from)
        .into_iter()
        .filter(|mv| !leaves_king_attacked(board, mv))
        .collect()
}

/// Every legal move for the side to move, ordered by origin square
pub fn all_legal_moves(board: &Board) -> Vec<Move> {
    let turn = board.turn();
    board
        .pieces()
        .filter(|(_, piece)| piece.color == turn)
        .flat_map(|(sq, _)| legal_moves(board, sq))
        .collect()
}

/// Whether the side to move has at least one legal move
pub fn has_legal_move(board: &Board) -> bool {
    let turn = board.turn();
    board
        .pieces()
        .filter(|(_, piece)| piece.color == turn)
        .any(|(sq, _)| {
            pseudo_legal_moves(board, sq)
                .iter()
                .any(|mv| !leaves_king_attacked(board, mv))
        })
}

/// `to` is among the legal destinations of the piece on `from`
pub fn is_valid_move(board: &Board, from: Square, to: Square) -> bool {
    legal_moves(board, from).iter().any(|mv| mv.to == to)
}

fn leaves_king_attacked(board: &Board, mv: &Move) -> bool {
    let mut trial = *board;
    apply_move_to_board(&mut trial, mv);
    is_in_check(&trial, mv.piece.color)
}

/// Play `mv` on `board`
///
/// The move is trusted: callers pass moves produced by this module. Side
/// effects, in order:
///
/// - halfmove clock reset on pawn moves and captures, incremented otherwise
/// - en passant victim removed from beside the destination
/// - rook relocated for castling
/// - piece placed on `to` (promoted kind if any), `from` cleared
/// - en passant target set only after a double pawn push
/// - castling rights revoked for king moves and for any move from or onto a
///   rook corner
/// - side to move flipped, fullmove number bumped after Black moves
///
/// Both counters saturate at `u32::MAX`.
pub fn apply_move_to_board(board: &mut Board, mv: &Move) {
    let color = mv.piece.color;

    if mv.piece.kind == PieceKind::Pawn || mv.captured.is_some() {
        board.set_halfmove_clock(0);
    } else {
        board.set_halfmove_clock(board.halfmove_clock().saturating_add(1));
    }

    if mv.is_en_passant {
        if let Some(victim) = Square::new(mv.to.file(), mv.from.rank()) {
            board.set_piece(victim, None);
        }
    }

    if mv.is_castling {
        let rank = color.back_rank();
        let (rook_from, rook_to) = if mv.to.file() > mv.from.file() {
            (KING_SIDE_ROOK_FILE, 5)
        } else {
            (QUEEN_SIDE_ROOK_FILE, 3)
        };
        if let (Some(rook_from), Some(rook_to)) =
            (Square::new(rook_from, rank), Square::new(rook_to, rank))
        {
            let rook = board.piece_at(rook_from);
            board.set_piece(rook_from, None);
            board.set_piece(rook_to, rook);
        }
    }

    let placed = match mv.promotion {
        Some(kind) => Piece::new(kind, color),
        None => mv.piece,
    };
    board.set_piece(mv.to, Some(placed));
    board.set_piece(mv.from, None);

    let double_push = mv.piece.kind == PieceKind::Pawn && mv.from.rank().abs_diff(mv.to.rank()) == 2;
    board.set_en_passant(if double_push {
        Square::new(mv.from.file(), (mv.from.rank() + mv.to.rank()) / 2)
    } else {
        None
    });

    if mv.piece.kind == PieceKind::King {
        board.castling_mut().revoke_all(color);
    }
    for sq in [mv.from, mv.to] {
        revoke_rook_corner(board, sq);
    }

    board.set_turn(color.opposite());
    if color == Color::Black {
        board.set_fullmove_number(board.fullmove_number().saturating_add(1));
    }
}

/// A move touching a1/h1/a8/h8 costs the matching right
fn revoke_rook_corner(board: &mut Board, sq: Square) {
    let owner = match sq.rank() {
        0 => Color::White,
        7 => Color::Black,
        _ => return,
    };
    let side = match sq.file() {
        QUEEN_SIDE_ROOK_FILE => CastleSide::Queen,
        KING_SIDE_ROOK_FILE => CastleSide::King,
        _ => return,
    };
    board.castling_mut().revoke(owner, side);
}
