//! Rules engine: move application and game termination
//!
//! [`RulesEngine`] owns one [`Board`] plus the list of every position reached
//! so far (seeded with the starting one). It is the only way the session layer
//! changes a position, so the history it keeps is complete and repetition can
//! be judged from it alone.
//!
//! # Termination order
//!
//! [`RulesEngine::game_result`] reports the first condition that holds, in this
//! order:
//!
//! 1. checkmate
//! 2. stalemate
//! 3. insufficient material
//! 4. threefold repetition
//! 5. fifty-move rule
//!
//! Insufficient material is deliberately coarse: bare kings, a single minor
//! piece, or exactly two bishops (whatever their square colors) count as dead.

use crate::board::Board;
use crate::constants::{FIFTY_MOVE_HALFMOVES, REPETITION_LIMIT};
use crate::error::ChessEngineResult;
use crate::move_gen::{
    all_legal_moves, apply_move_to_board, has_legal_move, is_in_check, legal_moves,
};
use crate::types::{Color, GameResult, Move, PieceKind, Square};

/// A position plus everything needed to judge how the game ends
#[derive(Debug, Clone)]
pub struct RulesEngine {
    board: Board,
    position_history: Vec<String>,
}

impl Default for RulesEngine {
    fn default() -> Self {
        RulesEngine::new()
    }
}

impl RulesEngine {
    /// Engine at the standard starting position
    pub fn new() -> Self {
        RulesEngine::from_board(Board::starting_position())
    }

    /// Engine starting from an arbitrary position
    pub fn from_board(board: Board) -> Self {
        RulesEngine {
            position_history: vec![board.to_notation()],
            board,
        }
    }

    /// Engine starting from position notation
    pub fn from_notation(notation: &str) -> ChessEngineResult<Self> {
        Ok(RulesEngine::from_board(Board::load(notation)?))
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Notation of the current position
    pub fn notation(&self) -> String {
        self.board.to_notation()
    }

    pub fn turn(&self) -> Color {
        self.board.turn()
    }

    /// Every position reached, oldest first
    pub fn position_history(&self) -> &[String] {
        &self.position_history
    }

    /// Legal moves of the piece on `from`
    pub fn legal_moves(&self, from: Square) -> Vec<Move> {
        legal_moves(&self.board, from)
    }

    pub fn all_legal_moves(&self) -> Vec<Move> {
        all_legal_moves(&self.board)
    }

    /// Apply the move `from` → `to` if it is legal
    ///
    /// When the move promotes, `promotion` picks the new piece and defaults to a
    /// queen; a promotion kind that is not a legal target rejects the move. For
    /// non-promoting moves `promotion` is ignored.
    ///
    /// # Returns
    ///
    /// The applied move annotated with `is_check`/`is_checkmate`, or `None` if
    /// the move was rejected (the position is then unchanged).
    pub fn make_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> Option<Move> {
        let candidates: Vec<Move> = legal_moves(&self.board, from)
            .into_iter()
            .filter(|mv| mv.to == to)
            .collect();

        let first = candidates.first()?;
        let mut chosen = if first.promotion.is_some() {
            let kind = promotion.unwrap_or(PieceKind::Queen);
            *candidates.iter().find(|mv| mv.promotion == Some(kind))?
        } else {
            *first
        };

        apply_move_to_board(&mut self.board, &chosen);
        chosen.is_check = self.is_check();
        chosen.is_checkmate = chosen.is_check && !has_legal_move(&self.board);
        self.position_history.push(self.board.to_notation());
        Some(chosen)
    }

    /// Side to move is in check
    pub fn is_check(&self) -> bool {
        is_in_check(&self.board, self.board.turn())
    }

    /// Side to move is in check and has no legal move
    pub fn is_checkmate(&self) -> bool {
        self.is_check() && !has_legal_move(&self.board)
    }

    /// Side to move is not in check and has no legal move
    pub fn is_stalemate(&self) -> bool {
        !self.is_check() && !has_legal_move(&self.board)
    }

    /// No mating material left on the board
    pub fn is_insufficient_material(&self) -> bool {
        let others: Vec<PieceKind> = self
            .board
            .pieces()
            .map(|(_, piece)| piece.kind)
            .filter(|kind| *kind != PieceKind::King)
            .collect();

        match others.as_slice() {
            [] => true,
            [single] => single.is_minor(),
            [a, b] => *a == PieceKind::Bishop && *b == PieceKind::Bishop,
            _ => false,
        }
    }

    /// The current position (placement, turn, castling, en passant) has
    /// occurred at least three times
    pub fn is_threefold_repetition(&self) -> bool {
        let current = self.board.position_key();
        let seen = self
            .position_history
            .iter()
            .filter(|notation| position_key_of(notation) == current)
            .count();
        seen >= REPETITION_LIMIT
    }

    /// 100 plies without a pawn move or capture
    pub fn is_fifty_move_rule(&self) -> bool {
        self.board.halfmove_clock() >= FIFTY_MOVE_HALFMOVES
    }

    /// First terminal condition that holds, if any
    pub fn game_result(&self) -> Option<GameResult> {
        let can_move = has_legal_move(&self.board);
        let in_check = self.is_check();
        if !can_move && in_check {
            Some(GameResult::Checkmate)
        } else if !can_move {
            Some(GameResult::Stalemate)
        } else if self.is_insufficient_material() {
            Some(GameResult::InsufficientMaterial)
        } else if self.is_threefold_repetition() {
            Some(GameResult::ThreefoldRepetition)
        } else if self.is_fifty_move_rule() {
            Some(GameResult::FiftyMoveRule)
        } else {
            None
        }
    }
}

fn position_key_of(notation: &str) -> String {
    notation.split(' ').take(4).collect::<Vec<_>>().join(" ")
}
