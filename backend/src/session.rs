//! One clocked game between two players
//!
//! # Lifecycle
//!
//! ```text
//! waiting --(both seats joined)--> active --(mate | draw rule | variant win |
//!                                            flag | resignation | agreed draw)--> completed
//! ```
//!
//! `completed` is terminal. Every path into it goes through
//! [`GameSession::complete`], which refuses a second transition, so whichever
//! of a move and a clock flag reaches the session first decides the result and
//! the other becomes a no-op.
//!
//! Methods that depend on time take `now` explicitly; callers pass
//! `Instant::now()` in production and fixed instants in tests.

use std::time::Instant;

use chrono::{DateTime, Utc};
use chess_engine::constants::{HILL_SQUARES, THREE_CHECK_LIMIT};
use chess_engine::{Board, Color, GameResult, Move, PieceKind, RulesEngine, Square};
use shared::protocol::{
    GameId, GameMode, GameSnapshot, GameStatus, PlayerInfo, TimeControl, UserId, VariantState,
};
use tracing::{debug, info};

use crate::clock::GameClock;
use crate::error::{SessionError, SessionResult};

/// Result of a seat being claimed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Seat taken (or re-taken), game not started by this join
    Seated,
    /// This join filled the second seat and started the clocks
    Started,
}

/// Result of an accepted move command
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// The move was played; `completed` is set when it ended the game
    Applied { mv: Move, completed: bool },
    /// The mover had already run out of time; the game ended on the flag
    Flagged,
}

/// Result of a draw offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOffer {
    /// Waiting for the opponent
    Pending,
    /// The opponent had already offered; the game is drawn
    Agreed,
}

#[derive(Debug)]
pub struct GameSession {
    id: GameId,
    white: PlayerInfo,
    black: PlayerInfo,
    mode: GameMode,
    time_control: TimeControl,
    engine: RulesEngine,
    status: GameStatus,
    seated: [bool; 2],
    clock: GameClock,
    moves: Vec<Move>,
    winner: Option<Color>,
    result: Option<GameResult>,
    variant: Option<VariantState>,
    draw_offer: Option<Color>,
    created_at: DateTime<Utc>,
    created_instant: Instant,
    completed_at: Option<DateTime<Utc>>,
    completed_instant: Option<Instant>,
}

impl GameSession {
    /// New session in `waiting` at `board`
    pub fn new(
        id: GameId,
        mut white: PlayerInfo,
        mut black: PlayerInfo,
        mode: GameMode,
        time_control: TimeControl,
        board: Board,
    ) -> Self {
        white.color = Color::White;
        black.color = Color::Black;
        GameSession {
            id,
            white,
            black,
            mode,
            time_control,
            engine: RulesEngine::from_board(board),
            status: GameStatus::Waiting,
            seated: [false; 2],
            clock: GameClock::new(time_control),
            moves: Vec::new(),
            winner: None,
            result: None,
            variant: VariantState::for_mode(mode),
            draw_offer: None,
            created_at: Utc::now(),
            created_instant: Instant::now(),
            completed_at: None,
            completed_instant: None,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn result(&self) -> Option<GameResult> {
        self.result
    }

    pub fn engine(&self) -> &RulesEngine {
        &self.engine
    }

    pub fn player(&self, color: Color) -> &PlayerInfo {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    /// Color `user` plays, if they are in this game
    pub fn color_of(&self, user: &str) -> Option<Color> {
        if self.white.id == user {
            Some(Color::White)
        } else if self.black.id == user {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn is_participant(&self, user: &str) -> bool {
        self.color_of(user).is_some()
    }

    pub fn winner_id(&self) -> Option<&UserId> {
        self.winner.map(|color| &self.player(color).id)
    }

    /// When the game ended, for retention
    pub fn completed_instant(&self) -> Option<Instant> {
        self.completed_instant
    }

    /// When the session was created, for expiring games nobody started
    pub fn created_instant(&self) -> Instant {
        self.created_instant
    }

    /// Claim `user`'s seat; the second seat filled starts the game
    pub fn join(&mut self, user: &str, now: Instant) -> SessionResult<JoinOutcome> {
        let color = self
            .color_of(user)
            .ok_or_else(|| SessionError::NotAParticipant(user.to_string()))?;
        self.seated[color.index()] = true;

        if self.status == GameStatus::Waiting && self.seated.iter().all(|s| *s) {
            self.start(now)?;
            return Ok(JoinOutcome::Started);
        }
        Ok(JoinOutcome::Seated)
    }

    /// `waiting` → `active`; anchors the side-to-move's clock at `now`
    pub fn start(&mut self, now: Instant) -> SessionResult<()> {
        if self.status != GameStatus::Waiting {
            return Err(SessionError::AlreadyStarted);
        }
        self.status = GameStatus::Active;
        self.clock.start(self.engine.turn(), now);
        info!(game_id = %self.id, white = %self.white.id, black = %self.black.id, "game started");
        Ok(())
    }

    /// Submit a move for `user`
    ///
    /// # Errors
    ///
    /// Rejected (with no state change) when the game is not active, `user`
    /// is not seated here, it is not their turn, or the move is illegal.
    pub fn make_move(
        &mut self,
        user: &str,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
        now: Instant,
    ) -> SessionResult<MoveOutcome> {
        if self.status != GameStatus::Active {
            return Err(SessionError::GameNotActive);
        }
        let mover = self
            .color_of(user)
            .ok_or_else(|| SessionError::NotAParticipant(user.to_string()))?;
        if mover != self.engine.turn() {
            return Err(SessionError::NotYourTurn);
        }

        if self.clock.is_flagged(now) == Some(mover) {
            self.complete(Some(mover.opposite()), GameResult::Timeout, now);
            return Ok(MoveOutcome::Flagged);
        }

        let mv = self
            .engine
            .make_move(from, to, promotion)
            .ok_or_else(|| SessionError::IllegalMove {
                from: from.to_string(),
                to: to.to_string(),
            })?;

        self.clock.record_move(mover, now);
        self.moves.push(mv);
        self.draw_offer = None;
        debug!(game_id = %self.id, user_id = %user, mv = %mv.uci(), "move applied");

        let mut checks_against = None;
        if let Some(variant) = self.variant.as_mut() {
            if let Some(captured) = mv.captured {
                variant.record_capture(mover, captured.kind);
            }
            if mv.is_check {
                checks_against = variant.record_check(mover.opposite());
            }
        }
        if checks_against.is_some_and(|n| n >= THREE_CHECK_LIMIT) {
            self.complete(Some(mover), GameResult::ThreeCheck, now);
        }

        if self.mode == GameMode::KingOfTheHill
            && mv.piece.kind == PieceKind::King
            && HILL_SQUARES.contains(&(mv.to.file(), mv.to.rank()))
        {
            self.complete(Some(mover), GameResult::KingOfTheHill, now);
        }

        if let Some(result) = self.engine.game_result() {
            let winner = (result == GameResult::Checkmate).then_some(mover);
            self.complete(winner, result, now);
        }

        Ok(MoveOutcome::Applied {
            mv,
            completed: self.status == GameStatus::Completed,
        })
    }

    /// `user` gives up; the opponent wins
    pub fn resign(&mut self, user: &str, now: Instant) -> SessionResult<()> {
        if self.status != GameStatus::Active {
            return Err(SessionError::GameNotActive);
        }
        let color = self
            .color_of(user)
            .ok_or_else(|| SessionError::NotAParticipant(user.to_string()))?;
        self.complete(Some(color.opposite()), GameResult::Resignation, now);
        Ok(())
    }

    /// Record a draw offer from `user`; it lapses when any move is played
    ///
    /// Offering while the opponent's offer is pending agrees to the draw.
    pub fn offer_draw(&mut self, user: &str, now: Instant) -> SessionResult<DrawOffer> {
        if self.status != GameStatus::Active {
            return Err(SessionError::GameNotActive);
        }
        let color = self
            .color_of(user)
            .ok_or_else(|| SessionError::NotAParticipant(user.to_string()))?;
        if self.draw_offer == Some(color.opposite()) {
            self.complete(None, GameResult::DrawAgreement, now);
            return Ok(DrawOffer::Agreed);
        }
        self.draw_offer = Some(color);
        Ok(DrawOffer::Pending)
    }

    /// Accept the opponent's pending offer
    pub fn accept_draw(&mut self, user: &str, now: Instant) -> SessionResult<()> {
        if self.status != GameStatus::Active {
            return Err(SessionError::GameNotActive);
        }
        let color = self
            .color_of(user)
            .ok_or_else(|| SessionError::NotAParticipant(user.to_string()))?;
        if self.draw_offer != Some(color.opposite()) {
            return Err(SessionError::NoDrawOffer);
        }
        self.complete(None, GameResult::DrawAgreement, now);
        Ok(())
    }

    /// End the game on time if the running side has flagged
    ///
    /// Returns `true` only when this call performed the transition.
    pub fn check_timeout(&mut self, now: Instant) -> bool {
        if self.status != GameStatus::Active {
            return false;
        }
        match self.clock.is_flagged(now) {
            Some(flagged) => self.complete(Some(flagged.opposite()), GameResult::Timeout, now),
            None => false,
        }
    }

    /// The single transition into `completed`
    ///
    /// Returns `false` without touching anything if the game already ended.
    fn complete(&mut self, winner: Option<Color>, result: GameResult, now: Instant) -> bool {
        if self.status == GameStatus::Completed {
            return false;
        }
        self.clock.stop(now);
        self.status = GameStatus::Completed;
        self.winner = winner;
        self.result = Some(result);
        self.draw_offer = None;
        self.completed_at = Some(Utc::now());
        self.completed_instant = Some(now);
        info!(
            game_id = %self.id,
            result = %result,
            winner = winner.map(|c| self.player(c).id.as_str()).unwrap_or("none"),
            "game completed"
        );
        true
    }

    /// Remaining time for both sides as of `now`, in milliseconds
    pub fn clock_ms(&self, now: Instant) -> (u64, u64) {
        (
            self.clock.remaining_ms(Color::White, now),
            self.clock.remaining_ms(Color::Black, now),
        )
    }

    /// Public view of the game as of `now`
    pub fn snapshot(&self, now: Instant) -> GameSnapshot {
        let (white_remaining_ms, black_remaining_ms) = self.clock_ms(now);
        GameSnapshot {
            id: self.id,
            white: self.white.clone(),
            black: self.black.clone(),
            mode: self.mode,
            time_control: self.time_control,
            position: self.engine.notation(),
            turn: self.engine.turn(),
            status: self.status,
            white_remaining_ms,
            black_remaining_ms,
            moves: self.moves.iter().map(Move::uci).collect(),
            winner_id: self.winner_id().cloned(),
            result: self.result,
            variant: self.variant.clone(),
            draw_offer_from: self.draw_offer.map(|c| self.player(c).id.clone()),
            half_move_clock: self.engine.board().halfmove_clock(),
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    fn player(id: &str, color: Color) -> PlayerInfo {
        PlayerInfo {
            id: id.to_string(),
            username: id.to_string(),
            rating: 1200,
            color,
        }
    }

    fn sq(text: &str) -> Square {
        text.parse().unwrap()
    }

    fn session_at(mode: GameMode, tc: TimeControl, notation: &str, t0: Instant) -> GameSession {
        let board = Board::load(notation).unwrap();
        let mut session = GameSession::new(
            Uuid::new_v4(),
            player("alice", Color::White),
            player("bob", Color::Black),
            mode,
            tc,
            board,
        );
        assert_eq!(session.join("alice", t0).unwrap(), JoinOutcome::Seated);
        assert_eq!(session.join("bob", t0).unwrap(), JoinOutcome::Started);
        session
    }

    fn standard(t0: Instant) -> GameSession {
        session_at(
            GameMode::Blitz,
            TimeControl::fischer(300_000, 0),
            chess_engine::INITIAL_POSITION,
            t0,
        )
    }

    fn play(session: &mut GameSession, t: Instant, moves: &[(&str, &str)]) -> Vec<MoveOutcome> {
        moves
            .iter()
            .enumerate()
            .map(|(i, (from, to))| {
                let user = if session.engine().turn() == Color::White { "alice" } else { "bob" };
                session
                    .make_move(user, sq(from), sq(to), None, t + Duration::from_millis(i as u64))
                    .unwrap()
            })
            .collect()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    #[test]
    fn test_waiting_until_both_seats_filled() {
        let t0 = Instant::now();
        let mut session = GameSession::new(
            Uuid::new_v4(),
            player("alice", Color::White),
            player("bob", Color::Black),
            GameMode::Rapid,
            TimeControl::fischer(60_000, 0),
            Board::starting_position(),
        );
        assert_eq!(session.status(), GameStatus::Waiting);
        assert_eq!(
            session.make_move("alice", sq("e2"), sq("e4"), None, t0),
            Err(SessionError::GameNotActive)
        );
        assert_eq!(
            session.join("mallory", t0),
            Err(SessionError::NotAParticipant("mallory".into()))
        );
        session.join("alice", t0).unwrap();
        session.join("alice", t0).unwrap();
        assert_eq!(session.status(), GameStatus::Waiting);
        assert_eq!(session.join("bob", t0).unwrap(), JoinOutcome::Started);
        assert_eq!(session.status(), GameStatus::Active);
        assert_eq!(session.start(t0), Err(SessionError::AlreadyStarted));
    }

    #[test]
    fn test_turn_and_participant_checks() {
        let t0 = Instant::now();
        let mut s = standard(t0);
        assert_eq!(
            s.make_move("bob", sq("e7"), sq("e5"), None, t0),
            Err(SessionError::NotYourTurn)
        );
        assert_eq!(
            s.make_move("eve", sq("e2"), sq("e4"), None, t0),
            Err(SessionError::NotAParticipant("eve".into()))
        );
        assert!(matches!(
            s.make_move("alice", sq("e2"), sq("e5"), None, t0),
            Err(SessionError::IllegalMove { .. })
        ));
        assert!(s.snapshot(t0).moves.is_empty());
    }

    #[test]
    fn test_checkmate_names_mover_winner() {
        let t0 = Instant::now();
        let mut s = standard(t0);
        let outcomes = play(
            &mut s,
            t0,
            &[("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")],
        );
        assert!(matches!(outcomes.last(), Some(MoveOutcome::Applied { completed: true, .. })));
        let snap = s.snapshot(t0);
        assert_eq!(snap.status, GameStatus::Completed);
        assert_eq!(snap.result, Some(GameResult::Checkmate));
        assert_eq!(snap.winner_id.as_deref(), Some("bob"));
        assert_eq!(snap.moves, vec!["f2f3", "e7e5", "g2g4", "d8h4"]);
    }

    #[test]
    fn test_draw_result_has_no_winner() {
        let t0 = Instant::now();
        let mut s = session_at(
            GameMode::Blitz,
            TimeControl::fischer(60_000, 0),
            "4k3/8/8/8/8/8/3n4/4K3 w - - 0 1",
            t0,
        );
        play(&mut s, t0, &[("e1", "d2")]);
        assert_eq!(s.result(), Some(GameResult::InsufficientMaterial));
        assert_eq!(s.winner_id(), None);
    }

    // ========================================================================
    // Clocks
    // ========================================================================

    #[test]
    fn test_timeout_ends_game_for_opponent() {
        let t0 = Instant::now();
        let mut s = session_at(
            GameMode::Bullet,
            TimeControl::fischer(1_000, 0),
            chess_engine::INITIAL_POSITION,
            t0,
        );
        assert!(!s.check_timeout(t0 + Duration::from_millis(999)));
        assert!(s.check_timeout(t0 + Duration::from_millis(1_000)));
        assert_eq!(s.result(), Some(GameResult::Timeout));
        assert_eq!(s.winner_id().map(String::as_str), Some("bob"));

        assert_eq!(
            s.make_move("alice", sq("e2"), sq("e4"), None, t0 + Duration::from_millis(1_001)),
            Err(SessionError::GameNotActive)
        );
        assert!(!s.check_timeout(t0 + Duration::from_millis(2_000)));
    }

    #[test]
    fn test_move_after_flag_loses_on_time() {
        let t0 = Instant::now();
        let mut s = session_at(
            GameMode::Bullet,
            TimeControl::fischer(1_000, 0),
            chess_engine::INITIAL_POSITION,
            t0,
        );
        let outcome = s
            .make_move("alice", sq("e2"), sq("e4"), None, t0 + Duration::from_millis(1_500))
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Flagged);
        assert_eq!(s.result(), Some(GameResult::Timeout));
        assert!(s.snapshot(t0).moves.is_empty());
    }

    #[test]
    fn test_clock_debits_mover_and_credits_increment() {
        let t0 = Instant::now();
        let mut s = session_at(
            GameMode::Blitz,
            TimeControl::fischer(60_000, 1_000),
            chess_engine::INITIAL_POSITION,
            t0,
        );
        let t1 = t0 + Duration::from_millis(5_000);
        s.make_move("alice", sq("e2"), sq("e4"), None, t1).unwrap();
        assert_eq!(s.clock_ms(t1), (56_000, 60_000));
        assert_eq!(s.clock_ms(t1 + Duration::from_millis(2_000)), (56_000, 58_000));
    }

    // ========================================================================
    // Resignation and draws
    // ========================================================================

    #[test]
    fn test_resign() {
        let t0 = Instant::now();
        let mut s = standard(t0);
        s.resign("bob", t0).unwrap();
        assert_eq!(s.result(), Some(GameResult::Resignation));
        assert_eq!(s.winner_id().map(String::as_str), Some("alice"));
        assert_eq!(s.resign("alice", t0), Err(SessionError::GameNotActive));
    }

    #[test]
    fn test_draw_needs_opponent_offer() {
        let t0 = Instant::now();
        let mut s = standard(t0);
        assert_eq!(s.accept_draw("bob", t0), Err(SessionError::NoDrawOffer));
        assert_eq!(s.offer_draw("alice", t0), Ok(DrawOffer::Pending));
        assert_eq!(s.accept_draw("alice", t0), Err(SessionError::NoDrawOffer));
        assert_eq!(s.snapshot(t0).draw_offer_from.as_deref(), Some("alice"));
        s.accept_draw("bob", t0).unwrap();
        assert_eq!(s.result(), Some(GameResult::DrawAgreement));
        assert_eq!(s.winner_id(), None);
    }

    #[test]
    fn test_draw_offer_lapses_after_move() {
        let t0 = Instant::now();
        let mut s = standard(t0);
        s.offer_draw("alice", t0).unwrap();
        play(&mut s, t0, &[("e2", "e4")]);
        assert_eq!(s.accept_draw("bob", t0), Err(SessionError::NoDrawOffer));
    }

    #[test]
    fn test_crossing_offers_agree_to_draw() {
        //! The second offer does not overwrite the first; it accepts it
        let t0 = Instant::now();
        let mut s = standard(t0);
        assert_eq!(s.offer_draw("alice", t0), Ok(DrawOffer::Pending));
        assert_eq!(s.offer_draw("alice", t0), Ok(DrawOffer::Pending));
        assert_eq!(s.offer_draw("bob", t0), Ok(DrawOffer::Agreed));
        assert_eq!(s.status(), GameStatus::Completed);
        assert_eq!(s.result(), Some(GameResult::DrawAgreement));
        assert_eq!(s.winner_id(), None);
        assert_eq!(s.offer_draw("alice", t0), Err(SessionError::GameNotActive));
    }

    // ========================================================================
    // Variants
    // ========================================================================

    #[test]
    fn test_three_check() {
        let t0 = Instant::now();
        let mut s = session_at(
            GameMode::ThreeCheck,
            TimeControl::fischer(60_000, 0),
            "4k3/8/8/8/8/8/8/4K2Q w - - 0 1",
            t0,
        );
        play(
            &mut s,
            t0,
            &[("h1", "h8"), ("e8", "d7"), ("h8", "h3"), ("d7", "d8")],
        );
        assert_eq!(s.status(), GameStatus::Active);
        assert_eq!(
            s.snapshot(t0).variant,
            Some(VariantState::ThreeCheck {
                white_checks: 0,
                black_checks: 2
            })
        );
        play(&mut s, t0, &[("h3", "h8")]);
        assert_eq!(s.result(), Some(GameResult::ThreeCheck));
        assert_eq!(s.winner_id().map(String::as_str), Some("alice"));
    }

    #[test]
    fn test_king_of_the_hill() {
        let t0 = Instant::now();
        let mut s = session_at(
            GameMode::KingOfTheHill,
            TimeControl::fischer(60_000, 0),
            "4k3/p7/8/8/8/3K4/P7/8 w - - 0 1",
            t0,
        );
        play(&mut s, t0, &[("d3", "e4")]);
        assert_eq!(s.result(), Some(GameResult::KingOfTheHill));
        assert_eq!(s.winner_id().map(String::as_str), Some("alice"));
    }

    #[test]
    fn test_hill_means_nothing_in_standard_chess() {
        let t0 = Instant::now();
        let mut s = session_at(
            GameMode::Blitz,
            TimeControl::fischer(60_000, 0),
            "4k3/p7/8/8/8/3K4/P7/8 w - - 0 1",
            t0,
        );
        play(&mut s, t0, &[("d3", "e4")]);
        assert_eq!(s.status(), GameStatus::Active);
        assert_eq!(s.snapshot(t0).variant, None);
    }

    #[test]
    fn test_crazyhouse_pool() {
        let t0 = Instant::now();
        let mut s = session_at(
            GameMode::Crazyhouse,
            TimeControl::fischer(60_000, 0),
            chess_engine::INITIAL_POSITION,
            t0,
        );
        play(&mut s, t0, &[("e2", "e4"), ("d7", "d5"), ("e4", "d5")]);
        assert_eq!(
            s.snapshot(t0).variant,
            Some(VariantState::Crazyhouse {
                white_pool: vec![PieceKind::Pawn],
                black_pool: vec![],
            })
        );
    }
}
