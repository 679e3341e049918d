//! Spawn control: aiming, dropping, and picking the next tile

use glam::Vec2;
use rand::Rng;
use rand::distr::{Distribution, weighted::WeightedIndex};

use super::game::GameTimer;
use super::timers::{Scheduler, TimerHandle};
use crate::error::TuningError;
use crate::tiles::{MIN_TILE_VALUE, radius_for};
use crate::tuning::{SpawnWeight, Tuning};

/// Weighted random choice of the next tile value
#[derive(Debug, Clone)]
pub struct TilePicker {
    values: Vec<u32>,
    dist: WeightedIndex<u32>,
}

impl TilePicker {
    pub fn new(weights: &[SpawnWeight]) -> Result<Self, TuningError> {
        let dist = WeightedIndex::new(weights.iter().map(|w| w.weight))
            .map_err(|e| TuningError::invalid("spawn_weights", e.to_string()))?;
        Ok(Self {
            values: weights.iter().map(|w| w.value).collect(),
            dist,
        })
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        self.values[self.dist.sample(rng)]
    }
}

/// A tile that was just released
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileDrop {
    pub value: u32,
    pub pos: Vec2,
}

/// Drop position, next-tile preview, and the drop cooldown
#[derive(Debug, Clone)]
pub struct SpawnControl {
    picker: TilePicker,
    next_value: u32,
    aim_x: f32,
    spawn_y: f32,
    world_width: f32,
    cooldown_ms: u64,
    pop_ms: u64,
    cooldown: Option<TimerHandle>,
    popping: Option<TimerHandle>,
}

impl SpawnControl {
    pub fn new(tuning: &Tuning) -> Result<Self, TuningError> {
        Ok(Self::with_picker(tuning, TilePicker::new(&tuning.spawn_weights)?))
    }

    /// Build around an already validated picker
    pub fn with_picker(tuning: &Tuning, picker: TilePicker) -> Self {
        Self {
            picker,
            next_value: MIN_TILE_VALUE,
            aim_x: tuning.world_width / 2.0,
            spawn_y: tuning.spawn_y,
            world_width: tuning.world_width,
            cooldown_ms: tuning.drop_cooldown_ms,
            pop_ms: tuning.preview_pop_ms,
            cooldown: None,
            popping: None,
        }
    }

    /// Clamp `x` so a tile of `value` stays fully inside the well
    pub fn clamp_x(&self, x: f32, value: u32) -> f32 {
        let r = radius_for(value);
        x.clamp(r, (self.world_width - r).max(r))
    }

    /// Move the drop position (clamped for the next tile).
    ///
    /// Non-finite positions are ignored and the previous aim stays.
    pub fn aim(&mut self, x: f32) {
        if !x.is_finite() {
            log::debug!("Ignoring non-finite aim {}", x);
            return;
        }
        self.aim_x = self.clamp_x(x, self.next_value);
    }

    pub fn aim_x(&self) -> f32 {
        self.aim_x
    }

    pub fn next_value(&self) -> u32 {
        self.next_value
    }

    /// Where the next tile would appear
    pub fn preview_pos(&self) -> Vec2 {
        Vec2::new(self.clamp_x(self.aim_x, self.next_value), self.spawn_y)
    }

    pub fn can_drop(&self) -> bool {
        self.cooldown.is_none()
    }

    /// Preview "pop" animation is running
    pub fn is_popping(&self) -> bool {
        self.popping.is_some()
    }

    /// Release the next tile if the cooldown allows it.
    ///
    /// Picks the following value and arms the cooldown and preview-pop timers.
    pub fn take_drop<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        timers: &mut Scheduler<GameTimer>,
        now_ms: u64,
    ) -> Option<TileDrop> {
        if !self.can_drop() {
            return None;
        }

        let drop = TileDrop {
            value: self.next_value,
            pos: self.preview_pos(),
        };

        self.next_value = self.picker.pick(rng);
        if let Some(handle) = self.popping.take() {
            timers.cancel(handle);
        }
        self.popping = Some(timers.schedule(now_ms, self.pop_ms, GameTimer::PreviewPopEnd));
        self.cooldown = Some(timers.schedule(now_ms, self.cooldown_ms, GameTimer::DropReady));

        Some(drop)
    }

    /// Handle a fired spawn timer
    pub fn on_timer(&mut self, handle: TimerHandle, timer: GameTimer) {
        match timer {
            GameTimer::DropReady if self.cooldown == Some(handle) => self.cooldown = None,
            GameTimer::PreviewPopEnd if self.popping == Some(handle) => self.popping = None,
            _ => {}
        }
    }

    /// Forget timer handles (the scheduler was cleared)
    pub fn reset_timers(&mut self) {
        self.cooldown = None;
        self.popping = None;
    }
}
