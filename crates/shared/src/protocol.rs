//! Wire protocol for the realtime game channel
//!
//! Every frame is one JSON object tagged by `"type"`:
//!
//! ```json
//! {"type":"move","game_id":"…","user_id":"alice","from":"e2","to":"e4","promotion":null}
//! {"type":"clock_update","game_id":"…","white_remaining_ms":59000,"black_remaining_ms":60000}
//! ```
//!
//! [`ClientMessage`] flows client → server, [`ServerMessage`] server → client.
//! Game state always travels as a complete [`GameSnapshot`] so a client that
//! missed frames can resynchronise from the next one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use chess_engine::{Color, GameResult, Move, PieceKind, Square};

/// Player identifier, chosen at registration
pub type UserId = String;

/// Game session identifier
pub type GameId = Uuid;

/// Rule set and pace of a game
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum GameMode {
    Classical,
    Rapid,
    Blitz,
    Bullet,
    Chess960,
    ThreeCheck,
    KingOfTheHill,
    Crazyhouse,
}

impl GameMode {
    /// Clock used when a request does not name one
    pub fn default_time_control(self) -> TimeControl {
        match self {
            GameMode::Classical => TimeControl::untimed(),
            GameMode::Rapid => TimeControl::fischer(900_000, 5_000),
            GameMode::Blitz => TimeControl::fischer(300_000, 2_000),
            GameMode::Bullet => TimeControl::fischer(60_000, 1_000),
            GameMode::Chess960
            | GameMode::ThreeCheck
            | GameMode::KingOfTheHill
            | GameMode::Crazyhouse => TimeControl::fischer(600_000, 2_000),
        }
    }
}

/// How the increment is credited after a move
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum IncrementFormat {
    /// Full increment added after every move
    #[default]
    Fischer,
    /// Refund of the time used, capped at the increment
    Bronstein,
    /// No increment
    Simple,
}

/// Initial time and increment, in milliseconds
///
/// `initial_ms == 0` means the game is untimed and can never be lost on time.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeControl {
    pub initial_ms: u64,
    #[serde(default)]
    pub increment_ms: u64,
    #[serde(default)]
    pub format: IncrementFormat,
}

impl TimeControl {
    pub fn fischer(initial_ms: u64, increment_ms: u64) -> Self {
        TimeControl {
            initial_ms,
            increment_ms,
            format: IncrementFormat::Fischer,
        }
    }

    pub fn untimed() -> Self {
        TimeControl {
            initial_ms: 0,
            increment_ms: 0,
            format: IncrementFormat::Simple,
        }
    }

    pub fn is_untimed(&self) -> bool {
        self.initial_ms == 0
    }
}

/// Lifecycle of a session
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Active,
    Completed,
}

/// A seated player as seen by clients
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlayerInfo {
    pub id: UserId,
    pub username: String,
    pub rating: i32,
    pub color: Color,
}

/// Extra state carried only by variants that need it
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum VariantState {
    /// Checks received by each side
    ThreeCheck { white_checks: u8, black_checks: u8 },
    /// Pieces each side has captured
    Crazyhouse {
        white_pool: Vec<PieceKind>,
        black_pool: Vec<PieceKind>,
    },
}

impl VariantState {
    /// Initial slot for `mode`, `None` for modes without extra state
    pub fn for_mode(mode: GameMode) -> Option<VariantState> {
        match mode {
            GameMode::ThreeCheck => Some(VariantState::ThreeCheck {
                white_checks: 0,
                black_checks: 0,
            }),
            GameMode::Crazyhouse => Some(VariantState::Crazyhouse {
                white_pool: Vec::new(),
                black_pool: Vec::new(),
            }),
            _ => None,
        }
    }

    /// Count a check against `checked`; returns that side's new tally
    pub fn record_check(&mut self, checked: Color) -> Option<u8> {
        match self {
            VariantState::ThreeCheck {
                white_checks,
                black_checks,
            } => {
                let tally = match checked {
                    Color::White => white_checks,
                    Color::Black => black_checks,
                };
                *tally += 1;
                Some(*tally)
            }
            VariantState::Crazyhouse { .. } => None,
        }
    }

    /// Add a captured piece to `capturer`'s pool
    pub fn record_capture(&mut self, capturer: Color, kind: PieceKind) {
        if let VariantState::Crazyhouse {
            white_pool,
            black_pool,
        } = self
        {
            match capturer {
                Color::White => white_pool.push(kind),
                Color::Black => black_pool.push(kind),
            }
        }
    }
}

/// Complete public state of one game
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GameSnapshot {
    pub id: GameId,
    pub white: PlayerInfo,
    pub black: PlayerInfo,
    pub mode: GameMode,
    pub time_control: TimeControl,
    /// Position notation of the current board
    pub position: String,
    pub turn: Color,
    pub status: GameStatus,
    pub white_remaining_ms: u64,
    pub black_remaining_ms: u64,
    /// Moves in coordinate form (`e2e4`, `e7e8q`)
    pub moves: Vec<String>,
    pub winner_id: Option<UserId>,
    pub result: Option<GameResult>,
    pub variant: Option<VariantState>,
    pub draw_offer_from: Option<UserId>,
    pub half_move_clock: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Rating movement of one player after a rated game
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RatingChange {
    pub user_id: UserId,
    pub old_rating: i32,
    pub new_rating: i32,
}

/// Client → server commands
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        game_id: GameId,
        user_id: UserId,
    },
    Move {
        game_id: GameId,
        user_id: UserId,
        from: Square,
        to: Square,
        #[serde(default)]
        promotion: Option<PieceKind>,
    },
    Resign {
        game_id: GameId,
        user_id: UserId,
    },
    OfferDraw {
        game_id: GameId,
        user_id: UserId,
    },
    AcceptDraw {
        game_id: GameId,
        user_id: UserId,
    },
    MatchmakingEnqueue {
        user_id: UserId,
        mode: GameMode,
        #[serde(default)]
        time_control: Option<TimeControl>,
    },
    MatchmakingLeave {
        user_id: UserId,
    },
    Spectate {
        game_id: GameId,
        user_id: UserId,
    },
    Unspectate {
        game_id: GameId,
    },
}

/// Server → client events
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Joined {
        game: GameSnapshot,
    },
    Start {
        game: GameSnapshot,
    },
    MoveApplied {
        #[serde(rename = "move")]
        mv: Move,
        game: GameSnapshot,
    },
    ClockUpdate {
        game_id: GameId,
        white_remaining_ms: u64,
        black_remaining_ms: u64,
    },
    DrawOffered {
        game_id: GameId,
        from_user_id: UserId,
    },
    End {
        game: GameSnapshot,
    },
    MatchFound {
        game: GameSnapshot,
    },
    Queued {
        mode: GameMode,
        time_control: TimeControl,
    },
    MatchmakingLeft,
    RatingsUpdated {
        game_id: GameId,
        changes: Vec<RatingChange>,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}
