//! Game server: sessions, clocks, matchmaking, ratings and the realtime gateway.
//!
//! ## Module Organization
//!
//! - `config` - environment-driven server settings
//! - `error` - command rejections and their HTTP mapping
//! - `clock` - per-color clock accounting
//! - `session` - one clocked game and its state machine
//! - `registry` - owner of all live sessions
//! - `matchmaking` - rating-banded pairing queue
//! - `rating` - Elo updates
//! - `users` - in-memory player directory and leaderboard
//! - `gateway` - command dispatch and event fan-out
//! - `ws` - WebSocket transport onto the gateway
//! - `api` - REST routes

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod matchmaking;
pub mod rating;
pub mod registry;
pub mod session;
pub mod users;
pub mod ws;
