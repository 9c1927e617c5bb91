//! Rating-banded pairing queue
//!
//! Requests wait in a queue per `(mode, time control)`. An arriving player is
//! paired with the first waiting request in the same queue whose rating is
//! within the band; there is no search for the closest rating. Match-or-enqueue
//! happens under one lock, so two players arriving together can never both
//! end up queued, nor can one waiting request be handed to both of them.

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;
use shared::protocol::{GameMode, PlayerInfo, TimeControl};
use tracing::{debug, info};

/// Default largest rating gap that may be paired
pub const DEFAULT_RATING_BAND: i32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueKey {
    pub mode: GameMode,
    pub time_control: TimeControl,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchmakingRequest {
    pub player: PlayerInfo,
    pub mode: GameMode,
    pub time_control: TimeControl,
    pub enqueued_at: Instant,
}

impl MatchmakingRequest {
    pub fn key(&self) -> QueueKey {
        QueueKey {
            mode: self.mode,
            time_control: self.time_control,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Paired with this previously waiting request, now removed from the queue
    Matched(MatchmakingRequest),
    /// No partner yet; the request is waiting
    Queued,
}

pub struct Matchmaker {
    queues: Mutex<HashMap<QueueKey, Vec<MatchmakingRequest>>>,
    rating_band: i32,
}

impl Default for Matchmaker {
    fn default() -> Self {
        Matchmaker::new(DEFAULT_RATING_BAND)
    }
}

impl Matchmaker {
    pub fn new(rating_band: i32) -> Self {
        Matchmaker {
            queues: Mutex::new(HashMap::new()),
            rating_band,
        }
    }

    /// Pair `request` with a waiting player or queue it
    ///
    /// A player has at most one waiting request: any earlier one is replaced.
    pub fn find_or_enqueue(&self, request: MatchmakingRequest) -> MatchOutcome {
        let mut queues = self.queues.lock();
        remove_player(&mut queues, &request.player.id);

        let key = request.key();
        let queue = queues.entry(key).or_default();
        let partner = queue.iter().position(|waiting| {
            (waiting.player.rating - request.player.rating).abs() <= self.rating_band
        });

        match partner {
            Some(index) => {
                let partner = queue.remove(index);
                info!(
                    user_id = %request.player.id,
                    opponent = %partner.player.id,
                    mode = ?key.mode,
                    "matchmaking paired"
                );
                MatchOutcome::Matched(partner)
            }
            None => {
                debug!(user_id = %request.player.id, mode = ?key.mode, "matchmaking queued");
                queue.push(request);
                MatchOutcome::Queued
            }
        }
    }

    /// Look for a partner for `player` without queueing anyone
    ///
    /// The partner, if found, is removed from the queue.
    pub fn find_match(
        &self,
        player: &PlayerInfo,
        mode: GameMode,
        time_control: TimeControl,
    ) -> Option<MatchmakingRequest> {
        let mut queues = self.queues.lock();
        let queue = queues.get_mut(&QueueKey { mode, time_control })?;
        let index = queue.iter().position(|waiting| {
            waiting.player.id != player.id
                && (waiting.player.rating - player.rating).abs() <= self.rating_band
        })?;
        Some(queue.remove(index))
    }

    /// Withdraw `user`; `false` if they were not waiting
    pub fn remove_from_queue(&self, user: &str) -> bool {
        remove_player(&mut self.queues.lock(), user)
    }

    pub fn is_queued(&self, user: &str) -> bool {
        self.queues
            .lock()
            .values()
            .any(|queue| queue.iter().any(|r| r.player.id == user))
    }

    /// Waiting requests across all queues
    pub fn len(&self) -> usize {
        self.queues.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn remove_player(queues: &mut HashMap<QueueKey, Vec<MatchmakingRequest>>, user: &str) -> bool {
    let mut removed = false;
    for queue in queues.values_mut() {
        let before = queue.len();
        queue.retain(|r| r.player.id != user);
        removed |= queue.len() != before;
    }
    queues.retain(|_, queue| !queue.is_empty());
    removed
}
