//! Owner of every live game session
//!
//! The map itself sits behind a `RwLock` that is only held long enough to
//! insert, remove or clone out an `Arc`. Each session has its own `Mutex`, so
//! commands on different games never wait for each other and all mutation of
//! one game is serialized.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chess_engine::setup::chess960_position;
use chess_engine::Board;
use parking_lot::{Mutex, RwLock};
use shared::protocol::{GameId, GameMode, GameSnapshot, GameStatus, PlayerInfo, TimeControl};
use tracing::info;
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};
use crate::session::GameSession;

pub type SharedSession = Arc<Mutex<GameSession>>;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<GameId, SharedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `waiting` session; chess960 gets a shuffled back rank
    pub fn create(
        &self,
        white: PlayerInfo,
        black: PlayerInfo,
        mode: GameMode,
        time_control: TimeControl,
    ) -> SharedSession {
        let board = match mode {
            GameMode::Chess960 => chess960_position(&mut rand::rng()),
            _ => Board::starting_position(),
        };
        let id = Uuid::new_v4();
        info!(
            game_id = %id,
            white = %white.id,
            black = %black.id,
            ?mode,
            position = %board,
            "game created"
        );
        let session = Arc::new(Mutex::new(GameSession::new(
            id,
            white,
            black,
            mode,
            time_control,
            board,
        )));
        self.sessions.write().insert(id, Arc::clone(&session));
        session
    }

    pub fn get(&self, id: GameId) -> Option<SharedSession> {
        self.sessions.read().get(&id).cloned()
    }

    /// Run `f` with exclusive access to one session
    pub fn with_session<T>(
        &self,
        id: GameId,
        f: impl FnOnce(&mut GameSession) -> SessionResult<T>,
    ) -> SessionResult<T> {
        let session = self.get(id).ok_or(SessionError::GameNotFound(id))?;
        let mut guard = session.lock();
        f(&mut guard)
    }

    /// Snapshot of one game
    pub fn snapshot(&self, id: GameId, now: Instant) -> SessionResult<GameSnapshot> {
        self.with_session(id, |session| Ok(session.snapshot(now)))
    }

    /// Every session, cloned out so no lock on the map is held by the caller
    pub fn all(&self) -> Vec<SharedSession> {
        self.sessions.read().values().cloned().collect()
    }

    /// Ids of games currently in `active`
    pub fn active_ids(&self) -> Vec<GameId> {
        self.all()
            .into_iter()
            .filter_map(|session| {
                let guard = session.lock();
                (guard.status() == GameStatus::Active).then(|| guard.id())
            })
            .collect()
    }

    pub fn list_active(&self, now: Instant) -> Vec<GameSnapshot> {
        self.list_where(now, |session| session.status() == GameStatus::Active)
    }

    /// All games `user` plays in, newest first
    pub fn list_by_user(&self, user: &str, now: Instant) -> Vec<GameSnapshot> {
        self.list_where(now, |session| session.is_participant(user))
    }

    fn list_where(
        &self,
        now: Instant,
        keep: impl Fn(&GameSession) -> bool,
    ) -> Vec<GameSnapshot> {
        let mut games: Vec<GameSnapshot> = self
            .all()
            .into_iter()
            .filter_map(|session| {
                let guard = session.lock();
                keep(&guard).then(|| guard.snapshot(now))
            })
            .collect();
        games.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        games
    }

    pub fn retire(&self, id: GameId) -> bool {
        self.sessions.write().remove(&id).is_some()
    }

    /// Drop games that are over or never started
    ///
    /// A completed game goes once it ended at least `retention` before `now`;
    /// a game still `waiting` goes once it was created that long ago. Active
    /// games are never retired.
    pub fn retire_expired(&self, retention: Duration, now: Instant) -> Vec<GameId> {
        let expired: Vec<GameId> = self
            .all()
            .into_iter()
            .filter_map(|session| {
                let guard = session.lock();
                let since = match guard.status() {
                    GameStatus::Completed => guard.completed_instant()?,
                    GameStatus::Waiting => guard.created_instant(),
                    GameStatus::Active => return None,
                };
                (now.saturating_duration_since(since) >= retention).then(|| guard.id())
            })
            .collect();
        if !expired.is_empty() {
            let mut sessions = self.sessions.write();
            for id in &expired {
                sessions.remove(id);
            }
            info!(count = expired.len(), "retired expired games");
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_engine::Color;

    fn player(id: &str) -> PlayerInfo {
        PlayerInfo {
            id: id.into(),
            username: id.into(),
            rating: 1200,
            color: Color::White,
        }
    }

    #[test]
    fn test_create_assigns_colors_and_waits() {
        let registry = SessionRegistry::new();
        let session = registry.create(player("a"), player("b"), GameMode::Blitz, TimeControl::fischer(60_000, 0));
        let snap = session.lock().snapshot(Instant::now());
        assert_eq!(snap.status, GameStatus::Waiting);
        assert_eq!(snap.white.color, Color::White);
        assert_eq!(snap.black.color, Color::Black);
        assert_eq!(snap.position, chess_engine::INITIAL_POSITION);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_chess960_uses_shuffled_rank_without_castling() {
        let registry = SessionRegistry::new();
        let session = registry.create(player("a"), player("b"), GameMode::Chess960, TimeControl::fischer(60_000, 0));
        let position = session.lock().snapshot(Instant::now()).position;
        let fields: Vec<&str> = position.split(' ').collect();
        assert_eq!(fields[2], "-");
        assert_eq!(&fields[0][9..25], "pppppppp/8/8/8/8");
    }

    #[test]
    fn test_unknown_game() {
        let registry = SessionRegistry::new();
        let id = Uuid::new_v4();
        assert_eq!(
            registry.snapshot(id, Instant::now()).unwrap_err(),
            SessionError::GameNotFound(id)
        );
    }

    #[test]
    fn test_listing_and_retirement() {
        let registry = SessionRegistry::new();
        let t0 = Instant::now();
        let first = registry.create(player("a"), player("b"), GameMode::Blitz, TimeControl::fischer(60_000, 0));
        let second = registry.create(player("a"), player("c"), GameMode::Blitz, TimeControl::fischer(60_000, 0));
        let first_id = first.lock().id();

        {
            let mut game = first.lock();
            game.join("a", t0).unwrap();
            game.join("b", t0).unwrap();
        }
        assert_eq!(registry.active_ids(), vec![first_id]);
        assert_eq!(registry.list_by_user("a", t0).len(), 2);
        assert_eq!(registry.list_by_user("c", t0).len(), 1);

        first.lock().resign("b", t0).unwrap();
        assert!(registry.list_active(t0).is_empty());

        let retention = Duration::from_secs(60);
        let second_id = second.lock().id();
        second.lock().join("a", t0).unwrap();
        second.lock().join("c", t0).unwrap();
        assert!(registry.retire_expired(retention, t0 + Duration::from_secs(59)).is_empty());
        assert_eq!(registry.retire_expired(retention, t0 + Duration::from_secs(60)), vec![first_id]);
        // active games stay however old they are
        assert!(registry.retire_expired(retention, t0 + Duration::from_secs(86_400)).is_empty());
        assert!(registry.retire(second_id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unstarted_games_expire() {
        let registry = SessionRegistry::new();
        let session = registry.create(player("a"), player("b"), GameMode::Blitz, TimeControl::fischer(60_000, 0));
        let id = session.lock().id();
        let created = session.lock().created_instant();
        let retention = Duration::from_secs(60);

        assert!(registry.retire_expired(retention, created + Duration::from_secs(30)).is_empty());
        assert_eq!(registry.retire_expired(retention, created + retention), vec![id]);
        assert!(registry.is_empty());
    }
}
