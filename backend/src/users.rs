//! In-memory player directory
//!
//! Holds each registered player's rating and game counters. Ratings change
//! only through [`UserDirectory::record_game`], which updates both players of a
//! game under a single lock.

use std::collections::HashMap;

use chess_engine::Color;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use shared::protocol::{PlayerInfo, RatingChange, UserId};
use tracing::info;
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};
use crate::rating::{RatedOutcome, RatingUpdater};

const MAX_USERNAME_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub rating: i32,
    pub games_played: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub games_drawn: u32,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn player_info(&self, color: Color) -> PlayerInfo {
        PlayerInfo {
            id: self.id.clone(),
            username: self.username.clone(),
            rating: self.rating,
            color,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: UserId,
    pub username: String,
    pub rating: i32,
    pub games_played: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub games_drawn: u32,
}

pub struct UserDirectory {
    users: RwLock<HashMap<UserId, User>>,
    default_rating: i32,
}

impl UserDirectory {
    pub fn new(default_rating: i32) -> Self {
        UserDirectory {
            users: RwLock::new(HashMap::new()),
            default_rating,
        }
    }

    /// Create a user with the default rating
    pub fn register(&self, username: &str) -> SessionResult<User> {
        if username.is_empty()
            || username.len() > MAX_USERNAME_LEN
            || username.trim() != username
        {
            return Err(SessionError::InvalidUsername);
        }

        let mut users = self.users.write();
        if users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(username))
        {
            return Err(SessionError::UsernameTaken(username.to_string()));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            rating: self.default_rating,
            games_played: 0,
            games_won: 0,
            games_lost: 0,
            games_drawn: 0,
            created_at: Utc::now(),
        };
        users.insert(user.id.clone(), user.clone());
        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    pub fn get(&self, id: &str) -> SessionResult<User> {
        self.users
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::UserNotFound(id.to_string()))
    }

    /// Seat description for `id` playing `color`
    pub fn player_info(&self, id: &str, color: Color) -> SessionResult<PlayerInfo> {
        self.get(id).map(|user| user.player_info(color))
    }

    /// Apply one finished game to both players' counters and ratings
    pub fn record_game(
        &self,
        white: &str,
        black: &str,
        outcome: RatedOutcome,
        ratings: &RatingUpdater,
    ) -> SessionResult<Vec<RatingChange>> {
        let mut users = self.users.write();
        let white_rating = users
            .get(white)
            .map(|u| u.rating)
            .ok_or_else(|| SessionError::UserNotFound(white.to_string()))?;
        let black_rating = users
            .get(black)
            .map(|u| u.rating)
            .ok_or_else(|| SessionError::UserNotFound(black.to_string()))?;

        let (white_new, black_new) = ratings.update_ratings(white_rating, black_rating, outcome);
        let results = [
            (white, white_rating, white_new, outcome == RatedOutcome::FirstWins),
            (black, black_rating, black_new, outcome == RatedOutcome::SecondWins),
        ];

        let mut changes = Vec::with_capacity(2);
        for (id, old_rating, new_rating, won) in results {
            if let Some(user) = users.get_mut(id) {
                user.rating = new_rating;
                user.games_played += 1;
                match (outcome, won) {
                    (RatedOutcome::Draw, _) => user.games_drawn += 1,
                    (_, true) => user.games_won += 1,
                    (_, false) => user.games_lost += 1,
                }
                changes.push(RatingChange {
                    user_id: id.to_string(),
                    old_rating,
                    new_rating,
                });
            }
        }
        Ok(changes)
    }

    /// Top `limit` users by rating, ties broken by username
    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let users = self.users.read();
        let mut ranked: Vec<&User> = users.values().collect();
        ranked.sort_by(|a, b| b.rating.cmp(&a.rating).then_with(|| a.username.cmp(&b.username)));
        ranked
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, user)| LeaderboardEntry {
                rank: index + 1,
                user_id: user.id.clone(),
                username: user.username.clone(),
                rating: user.rating,
                games_played: user.games_played,
                games_won: user.games_won,
                games_lost: user.games_lost,
                games_drawn: user.games_drawn,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
