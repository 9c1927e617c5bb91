//! # Chess Engine Core Types
//!
//! ## Overview
//!
//! Value types shared by every layer of the engine: colors, piece kinds, pieces,
//! squares, moves and terminal game results. Everything here is `Copy` (except
//! [`GameResult`] text helpers) so the board can be duplicated cheaply for
//! legality checks.
//!
//! ## Square Indexing
//!
//! Squares are stored as a single `u8` index where:
//! - `index = rank * 8 + file`
//! - `a1 = 0`, `h1 = 7`, `a8 = 56`, `h8 = 63`
//!
//! File and rank are both zero-based (`file 0 = a`, `rank 0 = 1`). Conversion to
//! and from algebraic text (`"e4"`) goes through [`Square::from_str`] and
//! [`std::fmt::Display`].
//!
//! ## Pieces as a Closed Sum Type
//!
//! A piece is a `(PieceKind, Color)` pair. Every dispatch on piece behavior is an
//! exhaustive `match` over [`PieceKind`], so there is no way for external input to
//! smuggle an unknown piece code into the engine: text is converted at the edge by
//! [`Piece::from_notation_char`] and rejected if it is not one of the twelve letters.

use std::fmt;
use std::str::FromStr;

use crate::error::{ChessEngineError, ChessEngineResult};

/// Side to move / piece owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// The other side
    #[inline]
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Stable array index (white = 0, black = 1)
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }

    /// Rank (0-based) holding this color's king and rooks at the start
    #[inline]
    pub fn back_rank(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    /// Rank delta of a forward pawn step
    #[inline]
    pub fn pawn_direction(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    /// Side-to-move field of the position notation
    pub fn notation_char(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

/// Kind of a chess piece, independent of color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// Promotion candidates, in the order they are generated
    pub const PROMOTIONS: [PieceKind; 4] = [
        PieceKind::Queen,
        PieceKind::Rook,
        PieceKind::Bishop,
        PieceKind::Knight,
    ];

    /// Lowercase notation letter
    pub fn to_char(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }

    /// Parse a notation letter in either case
    pub fn from_char(c: char) -> Option<PieceKind> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceKind::Pawn),
            'n' => Some(PieceKind::Knight),
            'b' => Some(PieceKind::Bishop),
            'r' => Some(PieceKind::Rook),
            'q' => Some(PieceKind::Queen),
            'k' => Some(PieceKind::King),
            _ => None,
        }
    }

    /// Knights and bishops
    #[inline]
    pub fn is_minor(self) -> bool {
        matches!(self, PieceKind::Knight | PieceKind::Bishop)
    }

    /// Whether a pawn may promote into this kind
    #[inline]
    pub fn is_promotion_target(self) -> bool {
        Self::PROMOTIONS.contains(&self)
    }
}

impl FromStr for PieceKind {
    type Err = ChessEngineError;

    fn from_str(s: &str) -> ChessEngineResult<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => PieceKind::from_char(c),
            _ => None,
        }
        .ok_or_else(|| ChessEngineError::InvalidPieceKind {
            symbol: s.to_string(),
        })
    }
}

/// A colored piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    #[inline]
    pub const fn new(kind: PieceKind, color: Color) -> Self {
        Piece { kind, color }
    }

    /// Placement letter: uppercase for white, lowercase for black
    pub fn notation_char(self) -> char {
        let c = self.kind.to_char();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    /// Inverse of [`Piece::notation_char`]; `None` for anything that is not one
    /// of the twelve piece letters
    pub fn from_notation_char(c: char) -> Option<Piece> {
        let kind = PieceKind::from_char(c)?;
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece::new(kind, color))
    }
}

/// A board square, `index = rank * 8 + file`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    /// Build from zero-based file and rank; `None` when off the board
    #[inline]
    pub fn new(file: u8, rank: u8) -> Option<Square> {
        if file < 8 && rank < 8 {
            Some(Square(rank * 8 + file))
        } else {
            None
        }
    }

    /// Build from a 0-63 index
    #[inline]
    pub fn from_index(index: usize) -> Option<Square> {
        if index < 64 {
            Some(Square(index as u8))
        } else {
            None
        }
    }

    /// Iterate a1, b1, ..., h8
    pub fn all() -> impl Iterator<Item = Square> {
        (0u8..64).map(Square)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn file(self) -> u8 {
        self.0 % 8
    }

    #[inline]
    pub fn rank(self) -> u8 {
        self.0 / 8
    }

    /// Step by a file/rank delta, `None` when it leaves the board
    #[inline]
    pub fn offset(self, file_delta: i8, rank_delta: i8) -> Option<Square> {
        let file = self.file() as i8 + file_delta;
        let rank = self.rank() as i8 + rank_delta;
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Square::new(file as u8, rank as u8)
        } else {
            None
        }
    }

    /// True for the light squares (a1 is dark)
    #[inline]
    pub fn is_light(self) -> bool {
        (self.file() + self.rank()) % 2 == 1
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            (b'a' + self.file()) as char,
            (b'1' + self.rank()) as char
        )
    }
}

impl FromStr for Square {
    type Err = ChessEngineError;

    fn from_str(s: &str) -> ChessEngineResult<Self> {
        let invalid = || ChessEngineError::InvalidSquare {
            square: s.to_string(),
        };
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(invalid());
        }
        let file = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        Square::new(file, rank).ok_or_else(invalid)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Square {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Square {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A fully described move
///
/// Produced by move generation with `is_check`/`is_checkmate` unset; the rules
/// engine fills those in after the move has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    pub captured: Option<Piece>,
    pub promotion: Option<PieceKind>,
    pub is_castling: bool,
    pub is_en_passant: bool,
    pub is_check: bool,
    pub is_checkmate: bool,
}

impl Move {
    /// Ordinary move or capture of whatever stands on `to`
    pub fn new(from: Square, to: Square, piece: Piece, captured: Option<Piece>) -> Self {
        Move {
            from,
            to,
            piece,
            captured,
            promotion: None,
            is_castling: false,
            is_en_passant: false,
            is_check: false,
            is_checkmate: false,
        }
    }

    /// Coordinate text such as `e2e4` or `e7e8q`
    pub fn uci(&self) -> String {
        match self.promotion {
            Some(kind) => format!("{}{}{}", self.from, self.to, kind.to_char()),
            None => format!("{}{}", self.from, self.to),
        }
    }
}

/// How a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum GameResult {
    Checkmate,
    Timeout,
    Resignation,
    DrawAgreement,
    Stalemate,
    InsufficientMaterial,
    ThreefoldRepetition,
    FiftyMoveRule,
    ThreeCheck,
    KingOfTheHill,
}

impl GameResult {
    /// Results that never have a winner
    pub fn is_draw(self) -> bool {
        matches!(
            self,
            GameResult::DrawAgreement
                | GameResult::Stalemate
                | GameResult::InsufficientMaterial
                | GameResult::ThreefoldRepetition
                | GameResult::FiftyMoveRule
        )
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            GameResult::Checkmate => "checkmate",
            GameResult::Timeout => "timeout",
            GameResult::Resignation => "resignation",
            GameResult::DrawAgreement => "draw-agreement",
            GameResult::Stalemate => "stalemate",
            GameResult::InsufficientMaterial => "insufficient-material",
            GameResult::ThreefoldRepetition => "threefold-repetition",
            GameResult::FiftyMoveRule => "fifty-move-rule",
            GameResult::ThreeCheck => "three-check",
            GameResult::KingOfTheHill => "king-of-the-hill",
        };
        f.write_str(text)
    }
}
