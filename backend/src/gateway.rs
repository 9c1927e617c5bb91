//! Realtime gateway: inbound commands in, game events out
//!
//! The gateway is transport-agnostic. A transport registers each client with
//! [`Gateway::connect`], handing over the sending half of an unbounded channel,
//! then feeds decoded [`ClientMessage`]s to [`Gateway::handle`]. Everything the
//! client should see arrives on that channel as [`ServerMessage`]s.
//!
//! # Rooms
//!
//! Each game has a room of subscribed connections: players who sent `join`
//! and spectators who sent `spectate`. Game events go to the whole room;
//! rejections go only to the connection that sent the command.
//!
//! # Locking
//!
//! Events for a game are published while its session lock is held, so every
//! subscriber sees them in the order the session produced them. Locks are
//! always taken in the order session → rooms → connections.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chess_engine::Color;
use parking_lot::{Mutex, RwLock};
use shared::protocol::{
    ClientMessage, GameId, GameMode, GameSnapshot, ServerMessage, TimeControl, UserId,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::SessionResult;
use crate::matchmaking::{MatchOutcome, Matchmaker, MatchmakingRequest};
use crate::rating::{RatedOutcome, RatingUpdater};
use crate::registry::SessionRegistry;
use crate::session::{DrawOffer, GameSession, JoinOutcome, MoveOutcome};
use crate::users::UserDirectory;

pub type ConnectionId = u64;

/// Sending half of a connection's event stream
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

struct Connection {
    outbox: Outbox,
    user_id: Option<UserId>,
    /// Games this connection joined as a player
    seats: HashSet<GameId>,
}

#[derive(Default)]
struct Room {
    players: HashSet<ConnectionId>,
    spectators: HashSet<ConnectionId>,
    last_clock_broadcast: Option<Instant>,
}

impl Room {
    fn members(&self) -> impl Iterator<Item = &ConnectionId> {
        self.players.iter().chain(self.spectators.iter())
    }
}

pub struct Gateway {
    registry: Arc<SessionRegistry>,
    users: Arc<UserDirectory>,
    matchmaker: Matchmaker,
    ratings: RatingUpdater,
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    rooms: Mutex<HashMap<GameId, Room>>,
    next_connection: AtomicU64,
    clock_broadcast_interval: Duration,
    completed_retention: Duration,
}

impl Gateway {
    pub fn new(
        registry: Arc<SessionRegistry>,
        users: Arc<UserDirectory>,
        config: &ServerConfig,
    ) -> Self {
        Gateway {
            registry,
            users,
            matchmaker: Matchmaker::new(config.rating_band),
            ratings: RatingUpdater::new(config.rating_k_factor),
            connections: RwLock::new(HashMap::new()),
            rooms: Mutex::new(HashMap::new()),
            next_connection: AtomicU64::new(1),
            clock_broadcast_interval: config.clock_broadcast_interval,
            completed_retention: config.completed_retention,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn users(&self) -> &Arc<UserDirectory> {
        &self.users
    }

    pub fn matchmaker(&self) -> &Matchmaker {
        &self.matchmaker
    }

    /// Register a client; its events will be sent to `outbox`
    pub fn connect(&self, outbox: Outbox) -> ConnectionId {
        let id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        self.connections.write().insert(
            id,
            Connection {
                outbox,
                user_id: None,
                seats: HashSet::new(),
            },
        );
        info!(connection = id, "connection opened");
        id
    }

    /// Forget a client
    ///
    /// When this was the user's last connection, the disconnect counts as
    /// resignation in every active game the connection was seated in and
    /// withdraws the user from matchmaking.
    pub fn disconnect(&self, conn: ConnectionId, now: Instant) {
        let Some(connection) = self.connections.write().remove(&conn) else {
            return;
        };
        {
            let mut rooms = self.rooms.lock();
            for room in rooms.values_mut() {
                room.players.remove(&conn);
                room.spectators.remove(&conn);
            }
        }
        info!(connection = conn, user_id = ?connection.user_id, "connection closed");

        let Some(user) = connection.user_id else {
            return;
        };
        let still_connected = self
            .connections
            .read()
            .values()
            .any(|other| other.user_id.as_deref() == Some(user.as_str()));
        if still_connected {
            debug!(connection = conn, user_id = %user, "user still connected elsewhere");
            return;
        }
        self.matchmaker.remove_from_queue(&user);

        for game_id in connection.seats {
            let _ = self.registry.with_session(game_id, |session| {
                if session.resign(&user, now).is_ok() {
                    info!(game_id = %game_id, user_id = %user, "player disconnected, resigned");
                    self.finish(session, now);
                }
                Ok(())
            });
        }
    }

    /// Handle one command from `conn` at the current time
    pub fn handle(&self, conn: ConnectionId, message: ClientMessage) {
        self.handle_at(conn, message, Instant::now());
    }

    /// Handle one command from `conn` as of `now`
    pub fn handle_at(&self, conn: ConnectionId, message: ClientMessage, now: Instant) {
        if let Err(err) = self.dispatch(conn, message, now) {
            debug!(connection = conn, error = %err, "command rejected");
            self.send(conn, ServerMessage::error(err.to_string()));
        }
    }

    fn dispatch(&self, conn: ConnectionId, message: ClientMessage, now: Instant) -> SessionResult<()> {
        match message {
            ClientMessage::Join { game_id, user_id } => self.join(conn, game_id, &user_id, now),
            ClientMessage::Move {
                game_id,
                user_id,
                from,
                to,
                promotion,
            } => self.registry.with_session(game_id, |session| {
                match session.make_move(&user_id, from, to, promotion, now)? {
                    MoveOutcome::Applied { mv, completed } => {
                        self.broadcast(
                            game_id,
                            ServerMessage::MoveApplied {
                                mv,
                                game: session.snapshot(now),
                            },
                        );
                        self.broadcast_clock(session, now);
                        if completed {
                            self.finish(session, now);
                        }
                    }
                    MoveOutcome::Flagged => self.finish(session, now),
                }
                Ok(())
            }),
            ClientMessage::Resign { game_id, user_id } => {
                self.registry.with_session(game_id, |session| {
                    session.resign(&user_id, now)?;
                    self.finish(session, now);
                    Ok(())
                })
            }
            ClientMessage::OfferDraw { game_id, user_id } => {
                self.registry.with_session(game_id, |session| {
                    match session.offer_draw(&user_id, now)? {
                        DrawOffer::Pending => self.broadcast(
                            game_id,
                            ServerMessage::DrawOffered {
                                game_id,
                                from_user_id: user_id.clone(),
                            },
                        ),
                        DrawOffer::Agreed => self.finish(session, now),
                    }
                    Ok(())
                })
            }
            ClientMessage::AcceptDraw { game_id, user_id } => {
                self.registry.with_session(game_id, |session| {
                    session.accept_draw(&user_id, now)?;
                    self.finish(session, now);
                    Ok(())
                })
            }
            ClientMessage::MatchmakingEnqueue {
                user_id,
                mode,
                time_control,
            } => self.enqueue(conn, &user_id, mode, time_control, now),
            ClientMessage::MatchmakingLeave { user_id } => {
                let removed = self.matchmaker.remove_from_queue(&user_id);
                debug!(user_id = %user_id, removed, "matchmaking left");
                self.send(conn, ServerMessage::MatchmakingLeft);
                Ok(())
            }
            ClientMessage::Spectate { game_id, user_id } => {
                self.registry.with_session(game_id, |session| {
                    self.rooms
                        .lock()
                        .entry(game_id)
                        .or_default()
                        .spectators
                        .insert(conn);
                    debug!(game_id = %game_id, user_id = %user_id, connection = conn, "spectating");
                    self.send(conn, ServerMessage::Joined { game: session.snapshot(now) });
                    Ok(())
                })
            }
            ClientMessage::Unspectate { game_id } => {
                if let Some(room) = self.rooms.lock().get_mut(&game_id) {
                    room.spectators.remove(&conn);
                }
                Ok(())
            }
        }
    }

    fn join(&self, conn: ConnectionId, game_id: GameId, user: &str, now: Instant) -> SessionResult<()> {
        self.registry.with_session(game_id, |session| {
            let outcome = session.join(user, now)?;
            self.rooms
                .lock()
                .entry(game_id)
                .or_default()
                .players
                .insert(conn);
            if let Some(connection) = self.connections.write().get_mut(&conn) {
                connection.user_id = Some(user.to_string());
                connection.seats.insert(game_id);
            }
            self.send(conn, ServerMessage::Joined { game: session.snapshot(now) });
            if outcome == JoinOutcome::Started {
                self.broadcast(game_id, ServerMessage::Start { game: session.snapshot(now) });
            }
            Ok(())
        })
    }

    /// Seat `user` without a realtime connection (REST join)
    pub fn join_seat(&self, game_id: GameId, user: &str, now: Instant) -> SessionResult<GameSnapshot> {
        self.registry.with_session(game_id, |session| {
            if session.join(user, now)? == JoinOutcome::Started {
                self.broadcast(game_id, ServerMessage::Start { game: session.snapshot(now) });
            }
            Ok(session.snapshot(now))
        })
    }

    fn enqueue(
        &self,
        conn: ConnectionId,
        user_id: &str,
        mode: GameMode,
        time_control: Option<TimeControl>,
        now: Instant,
    ) -> SessionResult<()> {
        let user = self.users.get(user_id)?;
        if let Some(connection) = self.connections.write().get_mut(&conn) {
            connection.user_id = Some(user.id.clone());
        }
        let time_control = time_control.unwrap_or_else(|| mode.default_time_control());
        let request = MatchmakingRequest {
            player: user.player_info(Color::White),
            mode,
            time_control,
            enqueued_at: now,
        };

        match self.matchmaker.find_or_enqueue(request) {
            MatchOutcome::Queued => {
                self.send(conn, ServerMessage::Queued { mode, time_control });
            }
            MatchOutcome::Matched(partner) => {
                let white = user.player_info(Color::White);
                let black = partner.player;
                let black_id = black.id.clone();
                let shared = self.registry.create(white, black, mode, time_control);
                let mut session = shared.lock();
                let game_id = session.id();
                session.join(&user.id, now)?;
                session.join(&black_id, now)?;

                let mut seated = vec![conn];
                {
                    let mut connections = self.connections.write();
                    for (id, connection) in connections.iter_mut() {
                        if *id == conn || connection.user_id.as_deref() == Some(black_id.as_str()) {
                            connection.seats.insert(game_id);
                            if *id != conn {
                                seated.push(*id);
                            }
                        }
                    }
                }
                self.rooms
                    .lock()
                    .entry(game_id)
                    .or_default()
                    .players
                    .extend(seated.iter().copied());

                let game = session.snapshot(now);
                for id in &seated {
                    self.send(*id, ServerMessage::MatchFound { game: game.clone() });
                }
                self.broadcast(game_id, ServerMessage::Start { game });
            }
        }
        Ok(())
    }

    /// Publish the end of a game and settle ratings
    ///
    /// Called exactly once per game, by whichever path completed it.
    fn finish(&self, session: &GameSession, now: Instant) {
        let game_id = session.id();
        self.broadcast(game_id, ServerMessage::End { game: session.snapshot(now) });

        let white = &session.player(Color::White).id;
        let black = &session.player(Color::Black).id;
        let outcome = match (session.result(), session.winner_id()) {
            (None, _) => return,
            (Some(_), Some(winner)) if winner == white => RatedOutcome::FirstWins,
            (Some(_), Some(_)) => RatedOutcome::SecondWins,
            (Some(_), None) => RatedOutcome::Draw,
        };
        match self.users.record_game(white, black, outcome, &self.ratings) {
            Ok(changes) => {
                info!(game_id = %game_id, ?outcome, "ratings updated");
                self.broadcast(game_id, ServerMessage::RatingsUpdated { game_id, changes });
            }
            Err(err) => warn!(game_id = %game_id, error = %err, "ratings not updated"),
        }
    }

    fn broadcast_clock(&self, session: &GameSession, now: Instant) {
        let (white_remaining_ms, black_remaining_ms) = session.clock_ms(now);
        let game_id = session.id();
        if let Some(room) = self.rooms.lock().get_mut(&game_id) {
            room.last_clock_broadcast = Some(now);
        }
        self.broadcast(
            game_id,
            ServerMessage::ClockUpdate {
                game_id,
                white_remaining_ms,
                black_remaining_ms,
            },
        );
    }

    /// One pass of the shared clock sweep
    ///
    /// Ends flagged games, sends periodic clock updates and retires games that
    /// finished, or were never started, longer ago than the retention window.
    /// A game removed while the sweep runs is skipped.
    pub fn sweep_clocks_at(&self, now: Instant) {
        for game_id in self.registry.active_ids() {
            let _ = self.registry.with_session(game_id, |session| {
                if session.check_timeout(now) {
                    self.finish(session, now);
                } else if self.clock_broadcast_due(game_id, now) {
                    self.broadcast_clock(session, now);
                }
                Ok(())
            });
        }

        let retired = self
            .registry
            .retire_expired(self.completed_retention, now);
        if !retired.is_empty() {
            let mut rooms = self.rooms.lock();
            for id in retired {
                rooms.remove(&id);
            }
        }
    }

    fn clock_broadcast_due(&self, game_id: GameId, now: Instant) -> bool {
        self.rooms.lock().get(&game_id).is_some_and(|room| {
            room.last_clock_broadcast.is_none_or(|last| {
                now.saturating_duration_since(last) >= self.clock_broadcast_interval
            })
        })
    }

    fn broadcast(&self, game_id: GameId, message: ServerMessage) {
        let members: Vec<ConnectionId> = match self.rooms.lock().get(&game_id) {
            Some(room) => room.members().copied().collect(),
            None => return,
        };
        let connections = self.connections.read();
        for id in members {
            if let Some(connection) = connections.get(&id) {
                let _ = connection.outbox.send(message.clone());
            }
        }
    }

    fn send(&self, conn: ConnectionId, message: ServerMessage) {
        if let Some(connection) = self.connections.read().get(&conn) {
            if connection.outbox.send(message).is_err() {
                debug!(connection = conn, "outbox closed");
            }
        }
    }

    fn send_to_user(&self, user: &str, message: ServerMessage) {
        let connections = self.connections.read();
        for connection in connections.values() {
            if connection.user_id.as_deref() == Some(user) {
                let _ = connection.outbox.send(message.clone());
            }
        }
    }

    /// Number of open connections
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }
}

/// Drive [`Gateway::sweep_clocks_at`] every `interval` on the tokio runtime
pub fn spawn_clock_sweep(gateway: Arc<Gateway>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            gateway.sweep_clocks_at(Instant::now());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_engine::{GameResult, Square};
    use shared::protocol::GameStatus;
    use std::thread;

    fn setup() -> (Gateway, UserId, UserId) {
        let users = Arc::new(UserDirectory::new(1200));
        let alice = users.register("alice").unwrap().id;
        let bob = users.register("bob").unwrap().id;
        let gateway = Gateway::new(
            Arc::new(SessionRegistry::new()),
            users,
            &ServerConfig::default(),
        );
        (gateway, alice, bob)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn sq(text: &str) -> Square {
        text.parse().unwrap()
    }

    #[test]
    fn test_rejection_goes_to_sender_only() {
        let (gateway, alice, _) = setup();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = gateway.connect(tx);
        let missing = uuid::Uuid::new_v4();
        gateway.handle(conn, ClientMessage::Join { game_id: missing, user_id: alice });
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ServerMessage::Error { message } if message.contains("not found")));
    }

    fn match_alice_and_bob(
        gateway: &Gateway,
        alice: &str,
        bob: &str,
        t0: Instant,
    ) -> (ConnectionId, ConnectionId, mpsc::UnboundedReceiver<ServerMessage>, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        let a = gateway.connect(tx_a);
        let b = gateway.connect(tx_b);
        for (conn, user) in [(a, alice), (b, bob)] {
            gateway.handle_at(
                conn,
                ClientMessage::MatchmakingEnqueue { user_id: user.to_string(), mode: GameMode::Blitz, time_control: None },
                t0,
            );
        }
        (a, b, rx_a, rx_b)
    }

    #[test]
    fn test_matchmaking_seats_both_and_starts() {
        let (gateway, alice, bob) = setup();
        let t0 = Instant::now();
        let (a, _b, mut rx_a, mut rx_b) = match_alice_and_bob(&gateway, &alice, &bob, t0);

        let events_a = drain(&mut rx_a);
        let events_b = drain(&mut rx_b);
        assert!(matches!(events_a.first(), Some(ServerMessage::Queued { .. })));
        let game = match (&events_a[1..], &events_b[..]) {
            (
                [ServerMessage::MatchFound { game: ga }, ServerMessage::Start { .. }],
                [ServerMessage::MatchFound { game: gb }, ServerMessage::Start { .. }],
            ) => {
                assert_eq!(ga.id, gb.id);
                gb.clone()
            }
            other => panic!("unexpected events {other:?}"),
        };
        assert_eq!(game.status, GameStatus::Active);
        // the arriving player takes white
        assert_eq!(game.white.id, bob);
        assert_eq!(game.black.id, alice);

        // an explicit join afterwards just resends the state
        gateway.handle_at(a, ClientMessage::Join { game_id: game.id, user_id: alice.clone() }, t0);
        assert!(matches!(drain(&mut rx_a).as_slice(), [ServerMessage::Joined { .. }]));
        assert!(drain(&mut rx_b).is_empty());
    }

    #[test]
    fn test_matched_game_abandoned_by_both_is_retired() {
        let (gateway, alice, bob) = setup();
        let t0 = Instant::now();
        let (a, b, _rx_a, _rx_b) = match_alice_and_bob(&gateway, &alice, &bob, t0);
        assert_eq!(gateway.registry().len(), 1);

        gateway.disconnect(a, t0);
        gateway.disconnect(b, t0);
        assert!(gateway.registry().list_active(t0).is_empty());

        gateway.sweep_clocks_at(t0 + ServerConfig::default().completed_retention);
        assert!(gateway.registry().is_empty());
    }

    #[test]
    fn test_second_connection_keeps_user_in_play() {
        let (gateway, alice, bob) = setup();
        let t0 = Instant::now();
        let (tx_spare, _rx_spare) = mpsc::unbounded_channel();
        let spare = gateway.connect(tx_spare);
        gateway.handle_at(
            spare,
            ClientMessage::MatchmakingEnqueue { user_id: alice.clone(), mode: GameMode::Blitz, time_control: None },
            t0,
        );
        let (a, _b, _rx_a, _rx_b) = match_alice_and_bob(&gateway, &alice, &bob, t0);
        let game_id = gateway.registry().active_ids()[0];

        // alice still has the spare socket open
        gateway.disconnect(a, t0);
        let snapshot = gateway.registry().snapshot(game_id, t0).unwrap();
        assert_eq!(snapshot.status, GameStatus::Active);

        gateway.disconnect(spare, t0);
        let snapshot = gateway.registry().snapshot(game_id, t0).unwrap();
        assert_eq!(snapshot.result, Some(GameResult::Resignation));
        assert_eq!(snapshot.winner_id.as_deref(), Some(bob.as_str()));
    }

    #[test]
    fn test_disconnect_resigns_active_game() {
        let (gateway, alice, bob) = setup();
        let registry = Arc::clone(gateway.registry());
        let white = gateway.users().player_info(&alice, Color::White).unwrap();
        let black = gateway.users().player_info(&bob, Color::Black).unwrap();
        let game_id = registry
            .create(white, black, GameMode::Rapid, TimeControl::fischer(60_000, 0))
            .lock()
            .id();

        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = gateway.connect(tx_a);
        let b = gateway.connect(tx_b);
        let t0 = Instant::now();
        gateway.handle_at(a, ClientMessage::Join { game_id, user_id: alice.clone() }, t0);
        gateway.handle_at(b, ClientMessage::Join { game_id, user_id: bob.clone() }, t0);
        drain(&mut rx_b);

        gateway.disconnect(a, t0);
        let events = drain(&mut rx_b);
        let end = events.iter().find_map(|e| match e {
            ServerMessage::End { game } => Some(game.clone()),
            _ => None,
        });
        let end = end.expect("end event");
        assert_eq!(end.result, Some(GameResult::Resignation));
        assert_eq!(end.winner_id.as_deref(), Some(bob.as_str()));
        assert!(events.iter().any(|e| matches!(e, ServerMessage::RatingsUpdated { .. })));
        assert_eq!(gateway.users().get(&bob).unwrap().rating, 1216);
        assert_eq!(gateway.connection_count(), 1);
    }

    #[test]
    fn test_spectator_receives_moves() {
        let (gateway, alice, bob) = setup();
        let white = gateway.users().player_info(&alice, Color::White).unwrap();
        let black = gateway.users().player_info(&bob, Color::Black).unwrap();
        let game_id = gateway
            .registry()
            .create(white, black, GameMode::Rapid, TimeControl::fischer(60_000, 0))
            .lock()
            .id();
        let t0 = Instant::now();
        gateway.join_seat(game_id, &alice, t0).unwrap();
        gateway.join_seat(game_id, &bob, t0).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let watcher = gateway.connect(tx);
        gateway.handle_at(watcher, ClientMessage::Spectate { game_id, user_id: "watcher".into() }, t0);
        assert!(matches!(drain(&mut rx).as_slice(), [ServerMessage::Joined { .. }]));

        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let a = gateway.connect(tx_a);
        gateway.handle_at(
            a,
            ClientMessage::Move { game_id, user_id: alice.clone(), from: sq("e2"), to: sq("e4"), promotion: None },
            t0,
        );
        // not subscribed, so only the spectator hears about it
        assert!(drain(&mut rx_a).is_empty());
        let events = drain(&mut rx);
        assert!(matches!(
            events.as_slice(),
            [ServerMessage::MoveApplied { .. }, ServerMessage::ClockUpdate { .. }]
        ));

        gateway.handle_at(watcher, ClientMessage::Unspectate { game_id }, t0);
        gateway.handle_at(
            a,
            ClientMessage::Move { game_id, user_id: bob.clone(), from: sq("e7"), to: sq("e5"), promotion: None },
            t0,
        );
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_move_racing_timeout_ends_game_once() {
        //! A late move and the sweep both see the flag; only one of them may
        //! publish the end of the game
        for _ in 0..20 {
            let (gateway, alice, bob) = setup();
            let gateway = Arc::new(gateway);
            let white = gateway.users().player_info(&alice, Color::White).unwrap();
            let black = gateway.users().player_info(&bob, Color::Black).unwrap();
            let game_id = gateway
                .registry()
                .create(white, black, GameMode::Bullet, TimeControl::fischer(1_000, 0))
                .lock()
                .id();
            let t0 = Instant::now();
            let (tx, mut rx) = mpsc::unbounded_channel();
            let watcher = gateway.connect(tx);
            gateway.handle_at(watcher, ClientMessage::Spectate { game_id, user_id: "w".into() }, t0);
            gateway.join_seat(game_id, &alice, t0).unwrap();
            gateway.join_seat(game_id, &bob, t0).unwrap();

            let late = t0 + Duration::from_millis(1_500);
            let (tx_a, _rx_a) = mpsc::unbounded_channel();
            let a = gateway.connect(tx_a);
            let mover = {
                let gateway = Arc::clone(&gateway);
                let alice = alice.clone();
                thread::spawn(move || {
                    gateway.handle_at(
                        a,
                        ClientMessage::Move { game_id, user_id: alice, from: sq("e2"), to: sq("e4"), promotion: None },
                        late,
                    );
                })
            };
            let sweeper = {
                let gateway = Arc::clone(&gateway);
                thread::spawn(move || gateway.sweep_clocks_at(late))
            };
            mover.join().unwrap();
            sweeper.join().unwrap();

            let events = drain(&mut rx);
            let ends: Vec<&GameSnapshot> = events
                .iter()
                .filter_map(|e| match e {
                    ServerMessage::End { game } => Some(game),
                    _ => None,
                })
                .collect();
            assert_eq!(ends.len(), 1);
            assert_eq!(ends[0].result, Some(GameResult::Timeout));
            assert_eq!(ends[0].winner_id.as_deref(), Some(bob.as_str()));
            assert!(!events.iter().any(|e| matches!(e, ServerMessage::MoveApplied { .. })));
        }
    }

    #[test]
    fn test_sweep_retires_finished_games() {
        let (gateway, alice, bob) = setup();
        let white = gateway.users().player_info(&alice, Color::White).unwrap();
        let black = gateway.users().player_info(&bob, Color::Black).unwrap();
        let game_id = gateway
            .registry()
            .create(white, black, GameMode::Rapid, TimeControl::fischer(60_000, 0))
            .lock()
            .id();
        let t0 = Instant::now();
        gateway.join_seat(game_id, &alice, t0).unwrap();
        gateway.join_seat(game_id, &bob, t0).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = gateway.connect(tx);
        gateway.handle_at(conn, ClientMessage::Resign { game_id, user_id: bob.clone() }, t0);
        // not subscribed, so nothing arrives on this connection
        assert!(drain(&mut rx).is_empty());
        assert_eq!(gateway.users().get(&alice).unwrap().games_won, 1);

        gateway.sweep_clocks_at(t0 + Duration::from_secs(1));
        assert_eq!(gateway.registry().len(), 1);
        gateway.sweep_clocks_at(t0 + ServerConfig::default().completed_retention);
        assert!(gateway.registry().is_empty());
    }

    #[test]
    fn test_draw_offer_and_acceptance() {
        let (gateway, alice, bob) = setup();
        let white = gateway.users().player_info(&alice, Color::White).unwrap();
        let black = gateway.users().player_info(&bob, Color::Black).unwrap();
        let game_id = gateway
            .registry()
            .create(white, black, GameMode::Rapid, TimeControl::fischer(60_000, 0))
            .lock()
            .id();
        let t0 = Instant::now();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = gateway.connect(tx_a);
        let b = gateway.connect(tx_b);
        gateway.handle_at(a, ClientMessage::Join { game_id, user_id: alice.clone() }, t0);
        gateway.handle_at(b, ClientMessage::Join { game_id, user_id: bob.clone() }, t0);
        drain(&mut rx_a);
        drain(&mut rx_b);

        gateway.handle_at(b, ClientMessage::AcceptDraw { game_id, user_id: bob.clone() }, t0);
        assert!(matches!(drain(&mut rx_b).as_slice(), [ServerMessage::Error { .. }]));
        assert!(drain(&mut rx_a).is_empty());

        gateway.handle_at(a, ClientMessage::OfferDraw { game_id, user_id: alice.clone() }, t0);
        assert!(matches!(
            drain(&mut rx_b).as_slice(),
            [ServerMessage::DrawOffered { from_user_id, .. }] if *from_user_id == alice
        ));
        gateway.handle_at(b, ClientMessage::AcceptDraw { game_id, user_id: bob.clone() }, t0);
        let events = drain(&mut rx_a);
        assert!(matches!(
            events.as_slice(),
            [ServerMessage::DrawOffered { .. }, ServerMessage::End { game }, ServerMessage::RatingsUpdated { .. }]
                if game.result == Some(GameResult::DrawAgreement)
        ));
        assert_eq!(gateway.users().get(&alice).unwrap().rating, 1200);
    }

    #[test]
    fn test_crossing_draw_offers_end_the_game() {
        let (gateway, alice, bob) = setup();
        let t0 = Instant::now();
        let (a, b, mut rx_a, _rx_b) = match_alice_and_bob(&gateway, &alice, &bob, t0);
        let game_id = gateway.registry().active_ids()[0];
        drain(&mut rx_a);

        gateway.handle_at(a, ClientMessage::OfferDraw { game_id, user_id: alice.clone() }, t0);
        gateway.handle_at(b, ClientMessage::OfferDraw { game_id, user_id: bob.clone() }, t0);
        let events = drain(&mut rx_a);
        assert!(matches!(
            events.as_slice(),
            [ServerMessage::DrawOffered { .. }, ServerMessage::End { game }, ServerMessage::RatingsUpdated { .. }]
                if game.result == Some(GameResult::DrawAgreement)
        ));
    }

    #[test]
    fn test_periodic_clock_updates() {
        let (gateway, alice, bob) = setup();
        let white = gateway.users().player_info(&alice, Color::White).unwrap();
        let black = gateway.users().player_info(&bob, Color::Black).unwrap();
        let game_id = gateway
            .registry()
            .create(white, black, GameMode::Rapid, TimeControl::fischer(60_000, 0))
            .lock()
            .id();
        let t0 = Instant::now();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = gateway.connect(tx);
        gateway.handle_at(conn, ClientMessage::Join { game_id, user_id: alice.clone() }, t0);
        gateway.join_seat(game_id, &bob, t0).unwrap();
        drain(&mut rx);

        let interval = ServerConfig::default().clock_broadcast_interval;
        gateway.sweep_clocks_at(t0);
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [ServerMessage::ClockUpdate { white_remaining_ms: 60_000, .. }]
        ));
        gateway.sweep_clocks_at(t0 + interval / 2);
        assert!(drain(&mut rx).is_empty());
        gateway.sweep_clocks_at(t0 + interval);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn test_leave_queue_is_acknowledged() {
        let (gateway, alice, _) = setup();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = gateway.connect(tx);
        gateway.handle(
            conn,
            ClientMessage::MatchmakingEnqueue { user_id: alice.clone(), mode: GameMode::Bullet, time_control: None },
        );
        assert!(gateway.matchmaker().is_queued(&alice));
        gateway.handle(conn, ClientMessage::MatchmakingLeave { user_id: alice.clone() });
        assert!(!gateway.matchmaker().is_queued(&alice));
        let events = drain(&mut rx);
        assert!(matches!(events.last(), Some(ServerMessage::MatchmakingLeft)));

        gateway.handle(
            conn,
            ClientMessage::MatchmakingEnqueue { user_id: "ghost".into(), mode: GameMode::Bullet, time_control: None },
        );
        assert!(matches!(drain(&mut rx).as_slice(), [ServerMessage::Error { .. }]));
    }
}
