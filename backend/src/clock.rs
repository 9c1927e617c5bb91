//! Chess clock with Fischer, Bronstein and simple increments
//!
//! Remaining time is never decremented by a fixed amount per tick. Instead the
//! clock remembers which side is running and since which [`Instant`]; every
//! query computes `stored - (now - since)`. A late or skipped sweep therefore
//! cannot make a clock drift, it only delays when a flag is noticed.
//!
//! # Increment formats
//!
//! After the mover's elapsed time is debited:
//!
//! - **Fischer**: the full increment is added
//! - **Bronstein**: `min(elapsed, increment)` is added back, so a move never
//!   gains time
//! - **Simple**: nothing is added
//!
//! A time control with `initial_ms == 0` is untimed: nothing runs and no side
//! can flag.

use std::time::{Duration, Instant};

use chess_engine::Color;
use shared::protocol::{IncrementFormat, TimeControl};

/// Per-color remaining time for one game
#[derive(Debug, Clone)]
pub struct GameClock {
    time_control: TimeControl,
    remaining: [Duration; 2],
    running: Option<(Color, Instant)>,
}

impl GameClock {
    pub fn new(time_control: TimeControl) -> Self {
        let initial = Duration::from_millis(time_control.initial_ms);
        GameClock {
            time_control,
            remaining: [initial, initial],
            running: None,
        }
    }

    pub fn is_untimed(&self) -> bool {
        self.time_control.is_untimed()
    }

    /// Start `side`'s clock at `now`
    pub fn start(&mut self, side: Color, now: Instant) {
        if !self.is_untimed() {
            self.running = Some((side, now));
        }
    }

    /// Side whose clock is running
    pub fn running_side(&self) -> Option<Color> {
        self.running.map(|(side, _)| side)
    }

    /// Time left for `color` as of `now`
    pub fn remaining(&self, color: Color, now: Instant) -> Duration {
        let stored = self.remaining[color.index()];
        match self.running {
            Some((side, since)) if side == color => {
                stored.saturating_sub(now.saturating_duration_since(since))
            }
            _ => stored,
        }
    }

    pub fn remaining_ms(&self, color: Color, now: Instant) -> u64 {
        self.remaining(color, now).as_millis() as u64
    }

    /// The running side has no time left
    pub fn is_flagged(&self, now: Instant) -> Option<Color> {
        let (side, _) = self.running?;
        self.remaining(side, now).is_zero().then_some(side)
    }

    /// Debit `mover`'s thinking time, credit the increment, start the opponent
    pub fn record_move(&mut self, mover: Color, now: Instant) {
        let Some((side, since)) = self.running else {
            return;
        };
        if side != mover {
            return;
        }
        let elapsed = now.saturating_duration_since(since);
        let increment = Duration::from_millis(self.time_control.increment_ms);
        let slot = &mut self.remaining[mover.index()];
        *slot = slot.saturating_sub(elapsed);
        *slot += match self.time_control.format {
            IncrementFormat::Fischer => increment,
            IncrementFormat::Bronstein => elapsed.min(increment),
            IncrementFormat::Simple => Duration::ZERO,
        };
        self.running = Some((mover.opposite(), now));
    }

    /// Freeze both clocks at their values as of `now`
    pub fn stop(&mut self, now: Instant) {
        if let Some((side, _)) = self.running {
            self.remaining[side.index()] = self.remaining(side, now);
            self.running = None;
        }
    }
}
