//! Command rejections
//!
//! A rejected command never changes session state. The gateway reports it to
//! the originating connection only; the REST layer maps it to a status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chess_engine::ChessEngineError;
use serde_json::json;
use shared::protocol::{GameId, UserId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("game {0} not found")]
    GameNotFound(GameId),

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("user {0} is not playing in this game")]
    NotAParticipant(UserId),

    #[error("a game needs two different players")]
    SamePlayer,

    #[error("not your turn")]
    NotYourTurn,

    #[error("illegal move {from}{to}")]
    IllegalMove { from: String, to: String },

    #[error("game is not active")]
    GameNotActive,

    #[error("game has already started")]
    AlreadyStarted,

    #[error("no draw offer from your opponent is pending")]
    NoDrawOffer,

    #[error("username {0} is already taken")]
    UsernameTaken(String),

    #[error("username must be 1-32 characters with no surrounding whitespace")]
    InvalidUsername,

    #[error(transparent)]
    Engine(#[from] ChessEngineError),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    pub fn status(&self) -> StatusCode {
        match self {
            SessionError::GameNotFound(_) | SessionError::UserNotFound(_) => StatusCode::NOT_FOUND,
            SessionError::NotAParticipant(_) => StatusCode::FORBIDDEN,
            SessionError::UsernameTaken(_)
            | SessionError::AlreadyStarted
            | SessionError::GameNotActive => StatusCode::CONFLICT,
            SessionError::NotYourTurn
            | SessionError::SamePlayer
            | SessionError::IllegalMove { .. }
            | SessionError::NoDrawOffer
            | SessionError::InvalidUsername
            | SessionError::Engine(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
