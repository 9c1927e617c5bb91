//! Board representation and position notation codec
//!
//! Provides the [`Board`] value type and its conversion to and from the
//! six-field position notation:
//!
//! ```text
//! rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1
//! placement            turn castling ep halfmove fullmove
//! ```
//!
//! `Board` is `Copy`. Legality checks clone it, apply a candidate move and ask
//! whether the mover's king is attacked, so the whole position has to stay a
//! flat value with no heap data.
//!
//! Parsing is strict: anything that is not a well-formed position with exactly
//! one king per side yields [`ChessEngineError::MalformedPosition`].

use std::fmt;
use std::str::FromStr;

use crate::constants::INITIAL_POSITION;
use crate::error::{ChessEngineError, ChessEngineResult};
use crate::types::{Color, Piece, PieceKind, Square};

/// Which wing a castling move goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastleSide {
    King,
    Queen,
}

/// The four castling flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CastlingRights {
    pub white_king_side: bool,
    pub white_queen_side: bool,
    pub black_king_side: bool,
    pub black_queen_side: bool,
}

impl CastlingRights {
    /// All four rights granted
    pub const ALL: CastlingRights = CastlingRights {
        white_king_side: true,
        white_queen_side: true,
        black_king_side: true,
        black_queen_side: true,
    };

    /// No rights at all
    pub const NONE: CastlingRights = CastlingRights {
        white_king_side: false,
        white_queen_side: false,
        black_king_side: false,
        black_queen_side: false,
    };

    pub fn has(&self, color: Color, side: CastleSide) -> bool {
        match (color, side) {
            (Color::White, CastleSide::King) => self.white_king_side,
            (Color::White, CastleSide::Queen) => self.white_queen_side,
            (Color::Black, CastleSide::King) => self.black_king_side,
            (Color::Black, CastleSide::Queen) => self.black_queen_side,
        }
    }

    pub fn revoke(&mut self, color: Color, side: CastleSide) {
        match (color, side) {
            (Color::White, CastleSide::King) => self.white_king_side = false,
            (Color::White, CastleSide::Queen) => self.white_queen_side = false,
            (Color::Black, CastleSide::King) => self.black_king_side = false,
            (Color::Black, CastleSide::Queen) => self.black_queen_side = false,
        }
    }

    /// Drop both rights of one side
    pub fn revoke_all(&mut self, color: Color) {
        self.revoke(color, CastleSide::King);
        self.revoke(color, CastleSide::Queen);
    }

    /// Castling field text (`KQkq`, `Kq`, `-`, ...)
    pub fn to_notation(&self) -> String {
        let mut text = String::with_capacity(4);
        if self.white_king_side {
            text.push('K');
        }
        if self.white_queen_side {
            text.push('Q');
        }
        if self.black_king_side {
            text.push('k');
        }
        if self.black_queen_side {
            text.push('q');
        }
        if text.is_empty() {
            text.push('-');
        }
        text
    }

    /// Parse the castling field; `None` on unknown or repeated letters
    pub fn from_notation(field: &str) -> Option<CastlingRights> {
        if field == "-" {
            return Some(CastlingRights::NONE);
        }
        if field.is_empty() {
            return None;
        }
        let mut rights = CastlingRights::NONE;
        for c in field.chars() {
            let flag = match c {
                'K' => &mut rights.white_king_side,
                'Q' => &mut rights.white_queen_side,
                'k' => &mut rights.black_king_side,
                'q' => &mut rights.black_queen_side,
                _ => return None,
            };
            if *flag {
                return None;
            }
            *flag = true;
        }
        Some(rights)
    }
}

/// A complete chess position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    squares: [Option<Piece>; 64],
    turn: Color,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl Default for Board {
    fn default() -> Self {
        Board::starting_position()
    }
}

impl Board {
    /// Board with no pieces, white to move, no rights
    pub fn empty() -> Self {
        Board {
            squares: [None; 64],
            turn: Color::White,
            castling: CastlingRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// The standard starting position
    pub fn starting_position() -> Self {
        let mut board = Board::empty();
        let back = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        board.place_back_ranks(&back);
        board.castling = CastlingRights::ALL;
        debug_assert_eq!(board.to_notation(), INITIAL_POSITION);
        board
    }

    /// Put `back` on ranks 1 and 8 and pawns on ranks 2 and 7
    pub(crate) fn place_back_ranks(&mut self, back: &[PieceKind; 8]) {
        for (file, kind) in back.iter().enumerate() {
            let file = file as u8;
            for color in [Color::White, Color::Black] {
                let pawn_rank = match color {
                    Color::White => 1,
                    Color::Black => 6,
                };
                if let Some(sq) = Square::new(file, color.back_rank()) {
                    self.set_piece(sq, Some(Piece::new(*kind, color)));
                }
                if let Some(sq) = Square::new(file, pawn_rank) {
                    self.set_piece(sq, Some(Piece::new(PieceKind::Pawn, color)));
                }
            }
        }
    }

    /// Parse a six-field position
    ///
    /// # Errors
    ///
    /// [`ChessEngineError::MalformedPosition`] when any field is missing or
    /// invalid, or when either side does not have exactly one king.
    pub fn load(notation: &str) -> ChessEngineResult<Board> {
        let bad = |reason: &str| ChessEngineError::malformed(notation, reason);

        let fields: Vec<&str> = notation.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(bad("expected 6 space-separated fields"));
        }

        let mut board = Board::empty();

        let rows: Vec<&str> = fields[0].split('/').collect();
        if rows.len() != 8 {
            return Err(bad("placement must have 8 ranks"));
        }
        for (row_index, row) in rows.iter().enumerate() {
            let rank = 7 - row_index as u8;
            let mut file: u8 = 0;
            for c in row.chars() {
                if let Some(run) = c.to_digit(10) {
                    if run == 0 || run > 8 {
                        return Err(bad("empty-square run must be 1-8"));
                    }
                    file += run as u8;
                } else {
                    let piece =
                        Piece::from_notation_char(c).ok_or_else(|| bad("unknown piece letter"))?;
                    let sq = Square::new(file, rank).ok_or_else(|| bad("rank overflows 8 files"))?;
                    board.set_piece(sq, Some(piece));
                    file += 1;
                }
                if file > 8 {
                    return Err(bad("rank overflows 8 files"));
                }
            }
            if file != 8 {
                return Err(bad("rank does not cover 8 files"));
            }
        }

        board.turn = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(bad("side to move must be w or b")),
        };

        board.castling =
            CastlingRights::from_notation(fields[2]).ok_or_else(|| bad("invalid castling field"))?;

        board.en_passant = match fields[3] {
            "-" => None,
            text => {
                let sq: Square = text
                    .parse()
                    .map_err(|_| bad("invalid en passant square"))?;
                let expected_rank = match board.turn {
                    Color::White => 5,
                    Color::Black => 2,
                };
                if sq.rank() != expected_rank {
                    return Err(bad("en passant square must be behind the pawn that just moved"));
                }
                Some(sq)
            }
        };

        board.halfmove_clock = parse_counter(fields[4])
            .ok_or_else(|| bad("halfmove clock must be a non-negative integer"))?;
        board.fullmove_number = parse_counter(fields[5])
            .ok_or_else(|| bad("fullmove number must be a positive integer"))?;
        if board.fullmove_number == 0 {
            return Err(bad("fullmove number must be a positive integer"));
        }

        for color in [Color::White, Color::Black] {
            let kings = board
                .pieces()
                .filter(|(_, p)| p.color == color && p.kind == PieceKind::King)
                .count();
            if kings != 1 {
                return Err(bad("each side needs exactly one king"));
            }
        }

        Ok(board)
    }

    /// Six-field notation of this position
    pub fn to_notation(&self) -> String {
        let mut placement = String::with_capacity(72);
        for rank in (0..8u8).rev() {
            let mut run = 0;
            for file in 0..8u8 {
                match Square::new(file, rank).and_then(|sq| self.piece_at(sq)) {
                    Some(piece) => {
                        if run > 0 {
                            placement.push_str(&run.to_string());
                            run = 0;
                        }
                        placement.push(piece.notation_char());
                    }
                    None => run += 1,
                }
            }
            if run > 0 {
                placement.push_str(&run.to_string());
            }
            if rank > 0 {
                placement.push('/');
            }
        }

        let en_passant = self
            .en_passant
            .map(|sq| sq.to_string())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "{} {} {} {} {} {}",
            placement,
            self.turn.notation_char(),
            self.castling.to_notation(),
            en_passant,
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    /// First four notation fields: identity of a position for repetition
    pub fn position_key(&self) -> String {
        let full = self.to_notation();
        full.split(' ').take(4).collect::<Vec<_>>().join(" ")
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()]
    }

    #[inline]
    pub fn set_piece(&mut self, sq: Square, piece: Option<Piece>) {
        self.squares[sq.index()] = piece;
    }

    /// Occupied squares, a1 upward
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.piece_at(sq).map(|p| (sq, p)))
    }

    /// Square of `color`'s king, if it has one
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces()
            .find(|(_, p)| p.kind == PieceKind::King && p.color == color)
            .map(|(sq, _)| sq)
    }

    #[inline]
    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn set_turn(&mut self, color: Color) {
        self.turn = color;
    }

    #[inline]
    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    pub fn castling_mut(&mut self) -> &mut CastlingRights {
        &mut self.castling
    }

    pub fn set_castling(&mut self, rights: CastlingRights) {
        self.castling = rights;
    }

    #[inline]
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    pub fn set_en_passant(&mut self, sq: Option<Square>) {
        self.en_passant = sq;
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn set_halfmove_clock(&mut self, value: u32) {
        self.halfmove_clock = value;
    }

    #[inline]
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    pub fn set_fullmove_number(&mut self, value: u32) {
        self.fullmove_number = value;
    }
}

impl FromStr for Board {
    type Err = ChessEngineError;

    fn from_str(s: &str) -> ChessEngineResult<Self> {
        Board::load(s)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_notation())
    }
}

/// Plain decimal digits only; `str::parse` would also take a leading `+`
fn parse_counter(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
