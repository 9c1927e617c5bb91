//! REST routes
//!
//! | Method | Path                          | Purpose                          |
//! |--------|-------------------------------|----------------------------------|
//! | GET    | `/health`                     | liveness check                   |
//! | GET    | `/ws`                         | realtime channel upgrade         |
//! | POST   | `/users`                      | register a player                |
//! | GET    | `/users/{id}`                 | player profile and counters      |
//! | POST   | `/games`                      | create a game between two users  |
//! | POST   | `/games/{id}/join`            | claim a seat                     |
//! | GET    | `/games/active`               | games in progress                |
//! | GET    | `/games/history?user_id=`     | one player's games, newest first |
//! | GET    | `/games/{id}`                 | one game                         |
//! | GET    | `/leaderboard?limit=`         | top players by rating            |
//!
//! Errors are [`SessionError`]s rendered as `{"error": "..."}` with a status
//! code chosen by [`SessionError::status`].

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use chess_engine::Color;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::protocol::{GameId, GameMode, GameSnapshot, TimeControl, UserId};

use crate::config::ServerConfig;
use crate::error::{SessionError, SessionResult};
use crate::gateway::Gateway;
use crate::registry::SessionRegistry;
use crate::users::{LeaderboardEntry, User, UserDirectory};
use crate::ws;

const DEFAULT_LEADERBOARD_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub registry: Arc<SessionRegistry>,
    pub users: Arc<UserDirectory>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let users = Arc::new(UserDirectory::new(config.default_rating));
        let gateway = Arc::new(Gateway::new(
            Arc::clone(&registry),
            Arc::clone(&users),
            config,
        ));
        AppState {
            gateway,
            registry,
            users,
        }
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
}

#[derive(Deserialize)]
pub struct CreateGameRequest {
    pub white_id: UserId,
    pub black_id: UserId,
    pub mode: GameMode,
    #[serde(default)]
    pub time_control: Option<TimeControl>,
}

#[derive(Deserialize)]
pub struct JoinGameRequest {
    pub user_id: UserId,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub user_id: UserId,
}

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: chrono::DateTime<Utc>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::ws_handler))
        .route("/users", post(register_user))
        .route("/users/{id}", get(get_user))
        .route("/games", post(create_game))
        .route("/games/active", get(active_games))
        .route("/games/history", get(game_history))
        .route("/games/{id}", get(get_game))
        .route("/games/{id}/join", post(join_game))
        .route("/leaderboard", get(leaderboard))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> SessionResult<(StatusCode, Json<User>)> {
    let user = state.users.register(&payload.username)?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> SessionResult<Json<User>> {
    state.users.get(&id).map(Json)
}

async fn create_game(
    State(state): State<AppState>,
    Json(payload): Json<CreateGameRequest>,
) -> SessionResult<(StatusCode, Json<GameSnapshot>)> {
    if payload.white_id == payload.black_id {
        return Err(SessionError::SamePlayer);
    }
    let white = state.users.player_info(&payload.white_id, Color::White)?;
    let black = state.users.player_info(&payload.black_id, Color::Black)?;
    let time_control = payload
        .time_control
        .unwrap_or_else(|| payload.mode.default_time_control());
    let session = state
        .registry
        .create(white, black, payload.mode, time_control);
    let snapshot = session.lock().snapshot(Instant::now());
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn join_game(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
    Json(payload): Json<JoinGameRequest>,
) -> SessionResult<Json<GameSnapshot>> {
    state
        .gateway
        .join_seat(id, &payload.user_id, Instant::now())
        .map(Json)
}

async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
) -> SessionResult<Json<GameSnapshot>> {
    state.registry.snapshot(id, Instant::now()).map(Json)
}

async fn active_games(State(state): State<AppState>) -> Json<Vec<GameSnapshot>> {
    Json(state.registry.list_active(Instant::now()))
}

async fn game_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<GameSnapshot>> {
    Json(state.registry.list_by_user(&query.user_id, Instant::now()))
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Json<Value> {
    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    let entries: Vec<LeaderboardEntry> = state.users.leaderboard(limit);
    Json(json!({ "leaderboard": entries }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_game_request_defaults() {
        let json = r#"{"white_id": "a", "black_id": "b", "mode": "blitz"}"#;
        let request: CreateGameRequest = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(request.mode, GameMode::Blitz);
        assert!(request.time_control.is_none());
    }

    #[test]
    fn test_create_game_request_with_clock() {
        let json = r#"{"white_id": "a", "black_id": "b", "mode": "rapid",
            "time_control": {"initial_ms": 600000, "increment_ms": 3000, "format": "bronstein"}}"#;
        let request: CreateGameRequest = serde_json::from_str(json).expect("Should deserialize");
        let tc = request.time_control.unwrap();
        assert_eq!(tc.initial_ms, 600_000);
        assert_eq!(tc.format, shared::protocol::IncrementFormat::Bronstein);
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok",
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&response).expect("Should serialize");
        assert_eq!(json["status"], "ok");
        assert!(json["timestamp"].is_string());
    }
}
