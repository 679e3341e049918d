//! Loss detection
//!
//! CLEAR -> PENDING when a tile settles above the loss line, PENDING -> CLEAR
//! if it drops back below (or gets merged away) before the grace delay runs
//! out, PENDING -> GAME_OVER otherwise. Only a continue leaves GAME_OVER.

use serde::{Deserialize, Serialize};

use super::body::{Body, BodyId, BodyLabel};
use super::game::GameTimer;
use super::timers::{Scheduler, TimerHandle};
use super::world::PhysicsWorld;
use crate::tuning::Tuning;

/// Loss detector state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossState {
    Clear,
    /// Grace timer running
    Pending,
    GameOver,
}

/// A state change worth telling the game about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossTransition {
    Armed,
    Cleared,
    GameOver,
}

/// True when some dynamic tile rests above the loss line
pub fn is_overflowing(bodies: &[Body], loss_line_y: f32, settle_speed: f32) -> bool {
    bodies
        .iter()
        .filter(|b| b.is_live_tile())
        .any(|b| b.pos.y < loss_line_y && b.vel.y.abs() < settle_speed)
}

/// The topmost `ceil(n / 2)` tiles, topmost first
pub fn topmost_half(bodies: &[Body]) -> Vec<BodyId> {
    let mut tiles: Vec<&Body> = bodies
        .iter()
        .filter(|b| b.label == BodyLabel::Tile)
        .collect();
    tiles.sort_by(|a, b| a.pos.y.total_cmp(&b.pos.y).then(a.id.cmp(&b.id)));
    let count = tiles.len().div_ceil(2);
    tiles.iter().take(count).map(|b| b.id).collect()
}

/// Watches for settled overflow and arms the game-over delay
#[derive(Debug, Clone)]
pub struct LossDetector {
    state: LossState,
    pending: Option<TimerHandle>,
    loss_line_y: f32,
    settle_speed: f32,
    grace_ms: u64,
}

impl LossDetector {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            state: LossState::Clear,
            pending: None,
            loss_line_y: tuning.loss_line_y,
            settle_speed: tuning.settle_speed,
            grace_ms: tuning.loss_grace_ms,
        }
    }

    pub fn state(&self) -> LossState {
        self.state
    }

    pub fn is_game_over(&self) -> bool {
        self.state == LossState::GameOver
    }

    /// Deadline of the running grace timer
    pub fn deadline(&self, timers: &Scheduler<GameTimer>) -> Option<u64> {
        self.pending.and_then(|h| timers.due_at(h))
    }

    /// Post-step check against the current bodies
    pub fn observe(
        &mut self,
        bodies: &[Body],
        timers: &mut Scheduler<GameTimer>,
        now_ms: u64,
    ) -> Option<LossTransition> {
        let overflowing = is_overflowing(bodies, self.loss_line_y, self.settle_speed);
        match self.state {
            LossState::Clear if overflowing => {
                self.pending = Some(timers.schedule(now_ms, self.grace_ms, GameTimer::LossDeadline));
                self.state = LossState::Pending;
                Some(LossTransition::Armed)
            }
            LossState::Pending if !overflowing => {
                self.disarm(timers);
                self.state = LossState::Clear;
                Some(LossTransition::Cleared)
            }
            _ => None,
        }
    }

    /// Handle a fired grace timer
    pub fn on_timer(&mut self, handle: TimerHandle) -> Option<LossTransition> {
        if self.state == LossState::Pending && self.pending == Some(handle) {
            self.pending = None;
            self.state = LossState::GameOver;
            Some(LossTransition::GameOver)
        } else {
            None
        }
    }

    /// Clear the top half of the well and resume play.
    ///
    /// Returns the removed tiles, or `None` if the game is not over.
    pub fn continue_play<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        timers: &mut Scheduler<GameTimer>,
    ) -> Option<Vec<BodyId>> {
        if self.state != LossState::GameOver {
            return None;
        }
        let removed = topmost_half(world.bodies());
        for &id in &removed {
            world.remove_body(id);
        }
        self.disarm(timers);
        self.state = LossState::Clear;
        Some(removed)
    }

    /// Back to CLEAR with no timer (teardown)
    pub fn reset(&mut self, timers: &mut Scheduler<GameTimer>) {
        self.disarm(timers);
        self.state = LossState::Clear;
    }

    fn disarm(&mut self, timers: &mut Scheduler<GameTimer>) {
        if let Some(handle) = self.pending.take() {
            timers.cancel(handle);
        }
    }
}
