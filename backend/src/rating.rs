//! Elo rating updates
//!
//! ```text
//! expected(a, b) = 1 / (1 + 10^((b - a) / 400))
//! new            = old + round(K * (actual - expected))
//! ```
//!
//! `actual` is 1 for a win, 0.5 for a draw and 0 for a loss. Halves round
//! upward (`-7.5` becomes `-7`), so two equal players trading a win move by
//! the same amount in opposite directions.

/// Default K-factor
pub const DEFAULT_K_FACTOR: f64 = 32.0;

/// Result of a game from the first player's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatedOutcome {
    FirstWins,
    SecondWins,
    Draw,
}

impl RatedOutcome {
    fn scores(self) -> (f64, f64) {
        match self {
            RatedOutcome::FirstWins => (1.0, 0.0),
            RatedOutcome::SecondWins => (0.0, 1.0),
            RatedOutcome::Draw => (0.5, 0.5),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RatingUpdater {
    k_factor: f64,
}

impl Default for RatingUpdater {
    fn default() -> Self {
        RatingUpdater::new(DEFAULT_K_FACTOR)
    }
}

impl RatingUpdater {
    pub fn new(k_factor: f64) -> Self {
        RatingUpdater { k_factor }
    }

    pub fn k_factor(&self) -> f64 {
        self.k_factor
    }

    /// Probability-like score `a` is expected to take against `b`
    pub fn expected_score(&self, a: i32, b: i32) -> f64 {
        1.0 / (1.0 + 10f64.powf(f64::from(b - a) / 400.0))
    }

    /// `rating` after scoring `score` against `opponent`
    pub fn new_rating(&self, rating: i32, opponent: i32, score: f64) -> i32 {
        let delta = self.k_factor * (score - self.expected_score(rating, opponent));
        rating + (delta + 0.5).floor() as i32
    }

    /// New ratings of both players from one game
    pub fn update_ratings(&self, first: i32, second: i32, outcome: RatedOutcome) -> (i32, i32) {
        let (first_score, second_score) = outcome.scores();
        (
            self.new_rating(first, second, first_score),
            self.new_rating(second, first, second_score),
        )
    }
}
