//! One play-through: world, spawning, merging, loss detection
//!
//! Advances on a fixed timestep. Each step runs, in order: physics, merges
//! for every pair that started touching, the post-step loss check, then any
//! timers that came due. Tiles created by a merge can only merge again on
//! a later step.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::body::{BodyId, BodySpec};
use super::loss::{LossDetector, LossState, LossTransition};
use super::merge::{MergeOutcome, MergeRules, resolve_merges};
use super::spawn::{SpawnControl, TilePicker};
use super::timers::Scheduler;
use super::world::{CircleWorld, PhysicsWorld};
use crate::consts::{MAX_SUBSTEPS, SIM_DT, SIM_HZ};
use crate::error::TuningError;
use crate::tiles::MIN_TILE_VALUE;
use crate::tuning::Tuning;

/// Deferred tasks owned by a game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameTimer {
    /// Drop cooldown over
    DropReady,
    /// Next-tile preview animation over
    PreviewPopEnd,
    /// Loss grace delay over
    LossDeadline,
}

/// Audio cue for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SoundCue {
    Drop,
    Merge { value: u32 },
    GameOver,
    Button,
}

/// Partial stats change; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsUpdate {
    pub score: Option<u64>,
    pub merges: Option<u32>,
    pub highest_tile: Option<u32>,
    pub is_game_over: Option<bool>,
}

/// Something that happened during a game
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    Dropped { id: BodyId, value: u32, pos: Vec2 },
    Merged(MergeOutcome),
    StatsChanged(StatsUpdate),
    LossArmed { deadline_ms: u64 },
    LossCleared,
    GameOver,
    Continued { removed: usize },
    Sound(SoundCue),
}

/// A single game
pub struct Game<W: PhysicsWorld = CircleWorld> {
    id: u64,
    seed: u64,
    world: W,
    rng: Pcg32,
    rules: MergeRules,
    spawn: SpawnControl,
    loss: LossDetector,
    timers: Scheduler<GameTimer>,
    score: u64,
    merges: u32,
    highest_tile: u32,
    time_ticks: u64,
    accumulator: f32,
    running: bool,
    events: Vec<GameEvent>,
}

impl Game<CircleWorld> {
    /// Start a game on the built-in circle world
    pub fn new(id: u64, seed: u64, tuning: &Tuning) -> Result<Self, TuningError> {
        let picker = TilePicker::new(&tuning.spawn_weights)?;
        Ok(Self::with_parts(id, seed, tuning, CircleWorld::new(tuning), picker))
    }
}

impl<W: PhysicsWorld> Game<W> {
    /// Start a game on any physics world with a picker validated up front
    pub fn with_parts(id: u64, seed: u64, tuning: &Tuning, world: W, picker: TilePicker) -> Self {
        log::info!("Game {} started (seed {})", id, seed);
        Self {
            id,
            seed,
            world,
            rng: Pcg32::seed_from_u64(seed),
            rules: MergeRules::from_tuning(tuning),
            spawn: SpawnControl::with_picker(tuning, picker),
            loss: LossDetector::new(tuning),
            timers: Scheduler::new(),
            score: 0,
            merges: 0,
            highest_tile: MIN_TILE_VALUE,
            time_ticks: 0,
            accumulator: 0.0,
            running: true,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Simulation clock (ms since the game started)
    pub fn now_ms(&self) -> u64 {
        self.time_ticks * 1000 / SIM_HZ as u64
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    /// Direct world access for scripted setups
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn merges(&self) -> u32 {
        self.merges
    }

    pub fn highest_tile(&self) -> u32 {
        self.highest_tile
    }

    pub fn loss_state(&self) -> LossState {
        self.loss.state()
    }

    pub fn is_game_over(&self) -> bool {
        self.loss.is_game_over()
    }

    /// False once torn down
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn next_value(&self) -> u32 {
        self.spawn.next_value()
    }

    pub fn preview_pos(&self) -> Vec2 {
        self.spawn.preview_pos()
    }

    pub fn is_popping(&self) -> bool {
        self.spawn.is_popping()
    }

    /// Whether a drop would be accepted right now
    pub fn can_drop(&self) -> bool {
        self.running && !self.loss.is_game_over() && self.spawn.can_drop()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Move the drop position
    pub fn aim(&mut self, x: f32) {
        if self.running && !self.loss.is_game_over() {
            self.spawn.aim(x);
        }
    }

    /// Drop the next tile. Ignored during the cooldown, after game over,
    /// or after teardown.
    pub fn drop_tile(&mut self) -> Option<BodyId> {
        if !self.running || self.loss.is_game_over() {
            return None;
        }
        let now = self.now_ms();
        let drop = self.spawn.take_drop(&mut self.rng, &mut self.timers, now)?;
        let id = self.world.add_body(BodySpec::tile(drop.value, drop.pos));

        log::debug!("Dropped {} at x={:.0}", drop.value, drop.pos.x);
        self.events.push(GameEvent::Dropped {
            id,
            value: drop.value,
            pos: drop.pos,
        });
        self.events.push(GameEvent::Sound(SoundCue::Drop));
        Some(id)
    }

    /// Run as many fixed steps as `dt` seconds of real time cover.
    ///
    /// Returns the number of steps taken.
    pub fn advance(&mut self, dt: f32) -> u32 {
        if !self.running || self.loss.is_game_over() || !dt.is_finite() {
            return 0;
        }
        // Clamp long frames (tab switches) to avoid a spiral of death
        self.accumulator += dt.clamp(0.0, 0.1);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.step();
            self.accumulator -= SIM_DT;
            substeps += 1;
            if self.loss.is_game_over() {
                self.accumulator = 0.0;
                break;
            }
        }
        substeps
    }

    /// Advance exactly one fixed step
    pub fn step(&mut self) {
        if !self.running || self.loss.is_game_over() {
            return;
        }
        self.time_ticks += 1;
        let now = self.now_ms();

        let step = self.world.step(SIM_DT);
        for merge in resolve_merges(&mut self.world, &step.collision_start, &self.rules) {
            self.apply_merge(merge);
        }

        match self.loss.observe(self.world.bodies(), &mut self.timers, now) {
            Some(LossTransition::Armed) => {
                let deadline_ms = self.loss.deadline(&self.timers).unwrap_or(now);
                log::debug!("Overflow detected, game over at {}ms unless cleared", deadline_ms);
                self.events.push(GameEvent::LossArmed { deadline_ms });
            }
            Some(LossTransition::Cleared) => {
                log::debug!("Overflow cleared");
                self.events.push(GameEvent::LossCleared);
            }
            _ => {}
        }

        self.fire_timers(now);
    }

    fn fire_timers(&mut self, now: u64) {
        for (handle, timer) in self.timers.drain_due(now) {
            match timer {
                GameTimer::DropReady | GameTimer::PreviewPopEnd => {
                    self.spawn.on_timer(handle, timer);
                }
                GameTimer::LossDeadline => {
                    if self.loss.on_timer(handle) == Some(LossTransition::GameOver) {
                        log::info!("Game {} over with score {}", self.id, self.score);
                        self.events.push(GameEvent::StatsChanged(StatsUpdate {
                            is_game_over: Some(true),
                            ..Default::default()
                        }));
                        self.events.push(GameEvent::GameOver);
                        self.events.push(GameEvent::Sound(SoundCue::GameOver));
                    }
                }
            }
        }
    }

    fn apply_merge(&mut self, merge: MergeOutcome) {
        self.score += merge.points;
        self.merges += 1;
        if merge.new_value > self.highest_tile {
            self.highest_tile = merge.new_value;
        }

        self.events.push(GameEvent::Merged(merge));
        self.events.push(GameEvent::Sound(SoundCue::Merge {
            value: merge.new_value,
        }));
        self.events.push(GameEvent::StatsChanged(StatsUpdate {
            score: Some(self.score),
            merges: Some(self.merges),
            highest_tile: Some(self.highest_tile),
            is_game_over: None,
        }));
    }

    /// Clear the top half of the well and resume after a game over.
    ///
    /// Returns how many tiles were removed, or `None` if the game is not over.
    pub fn continue_play(&mut self) -> Option<usize> {
        if !self.running {
            return None;
        }
        let removed = self.loss.continue_play(&mut self.world, &mut self.timers)?.len();
        log::info!("Game {} continued, removed {} tiles", self.id, removed);

        self.events.push(GameEvent::Continued { removed });
        self.events.push(GameEvent::StatsChanged(StatsUpdate {
            is_game_over: Some(false),
            ..Default::default()
        }));
        Some(removed)
    }

    /// Stop the game for good: cancel every timer and drop every body
    pub fn teardown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.loss.reset(&mut self.timers);
        self.timers.clear();
        self.spawn.reset_timers();
        self.world.clear();
        self.events.clear();
        log::info!("Game {} torn down", self.id);
    }

    /// Take all events raised since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::body::BodySpec;

    fn game() -> Game {
        Game::new(1, 12345, &Tuning::default()).unwrap()
    }

    fn step_n(game: &mut Game, n: usize) {
        for _ in 0..n {
            game.step();
        }
    }

    fn merged(events: &[GameEvent]) -> Vec<MergeOutcome> {
        events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Merged(m) => Some(*m),
                _ => None,
            })
            .collect()
    }

    /// A tile balanced on a big static circle, resting just above the loss line
    fn overflowing_game() -> Game {
        let mut game = game();
        game.world_mut()
            .add_body(BodySpec::obstacle(Vec2::new(225.0, 420.0), 240.0));
        game.world_mut()
            .add_body(BodySpec::tile(2, Vec2::new(225.0, 180.0 - 25.0)));
        game
    }

    #[test]
    fn test_drop_spawns_tile_and_cooldown_is_noop() {
        let mut game = game();
        game.aim(300.0);
        let id = game.drop_tile().unwrap();
        assert_eq!(game.world().bodies().len(), 1);
        assert_eq!(game.world().body(id).unwrap().pos, Vec2::new(300.0, 100.0));

        let before: Vec<_> = game.world().bodies().iter().map(|b| (b.id, b.pos)).collect();
        let next = game.next_value();
        assert!(game.drop_tile().is_none());
        let after: Vec<_> = game.world().bodies().iter().map(|b| (b.id, b.pos)).collect();
        assert_eq!(before, after);
        assert_eq!(game.next_value(), next);

        // 150ms = 9 steps at 60 Hz
        step_n(&mut game, 9);
        assert!(game.can_drop());
        assert!(game.drop_tile().is_some());
    }

    #[test]
    fn test_two_fours_merge_in_game() {
        let mut game = game();
        game.world_mut().add_body(BodySpec::tile(4, Vec2::new(200.0, 665.0)));
        game.world_mut().add_body(BodySpec::tile(4, Vec2::new(260.0, 665.0)));

        game.step();
        let events = game.drain_events();
        let merges = merged(&events);
        assert_eq!(merges.len(), 1);
        assert_eq!(merges[0].new_value, 8);
        assert!((merges[0].point.x - 230.0).abs() < 0.01);

        assert_eq!(game.score(), 8);
        assert_eq!(game.merges(), 1);
        assert_eq!(game.highest_tile(), 8);
        assert_eq!(game.world().tile_count(), 1);
        assert_eq!(game.world().bodies()[0].value, 8);
        assert!(events.contains(&GameEvent::Sound(SoundCue::Merge { value: 8 })));
        assert!(events.contains(&GameEvent::StatsChanged(StatsUpdate {
            score: Some(8),
            merges: Some(1),
            highest_tile: Some(8),
            is_game_over: None,
        })));
    }

    #[test]
    fn test_merged_tile_waits_a_step() {
        let mut game = game();
        // Two 2s merge into a 4 that overlaps the 4 resting above them
        game.world_mut().add_body(BodySpec::tile(2, Vec2::new(200.0, 675.0)));
        game.world_mut().add_body(BodySpec::tile(2, Vec2::new(240.0, 675.0)));
        game.world_mut().add_body(BodySpec::tile(4, Vec2::new(220.0, 612.0)));

        game.step();
        assert_eq!(merged(&game.drain_events()).len(), 1);
        assert_eq!(game.world().tile_count(), 2);

        game.step();
        let second = merged(&game.drain_events());
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].new_value, 8);
        assert_eq!(game.score(), 4 + 8);
    }

    #[test]
    fn test_two_2048s_vanish_with_bonus() {
        let mut game = game();
        game.world_mut().add_body(BodySpec::tile(2048, Vec2::new(150.0, 570.0)));
        game.world_mut().add_body(BodySpec::tile(2048, Vec2::new(300.0, 570.0)));
        assert_eq!(game.world().tile_count(), 2);

        game.step();
        assert_eq!(game.world().tile_count(), 0);
        assert_eq!(game.score(), 2048 * 2 * 3);
        assert_eq!(game.highest_tile(), 4096);
    }

    #[test]
    fn test_settled_overflow_ends_game_once() {
        let mut game = overflowing_game();
        step_n(&mut game, 120);

        assert!(game.is_game_over());
        let events = game.drain_events();
        let game_overs = events.iter().filter(|e| **e == GameEvent::GameOver).count();
        assert_eq!(game_overs, 1);
        assert!(events.iter().any(|e| matches!(e, GameEvent::LossArmed { .. })));

        // Frozen: no more steps, no drops
        let ticks = game.time_ticks();
        step_n(&mut game, 10);
        assert_eq!(game.time_ticks(), ticks);
        assert!(game.drop_tile().is_none());
        assert_eq!(game.advance(1.0), 0);
    }

    #[test]
    fn test_continue_resumes_play() {
        let mut game = overflowing_game();
        step_n(&mut game, 120);
        assert!(game.is_game_over());
        game.drain_events();

        assert_eq!(game.continue_play(), Some(1));
        assert!(!game.is_game_over());
        assert_eq!(game.world().tile_count(), 0);
        let events = game.drain_events();
        assert!(events.contains(&GameEvent::Continued { removed: 1 }));

        assert!(game.continue_play().is_none());
        step_n(&mut game, 5);
        assert!(game.drop_tile().is_some());
    }

    #[test]
    fn test_advance_uses_fixed_steps() {
        let mut game = game();
        assert_eq!(game.advance(SIM_DT * 3.0 + SIM_DT * 0.5), 3);
        assert_eq!(game.time_ticks(), 3);
        assert_eq!(game.now_ms(), 50);
        // Long frames are clamped to 0.1s, which is at most MAX_SUBSTEPS steps
        assert!(game.advance(5.0) <= MAX_SUBSTEPS);
    }

    #[test]
    fn test_bad_frame_time_is_skipped() {
        let mut game = game();
        assert_eq!(game.advance(f32::NAN), 0);
        assert_eq!(game.advance(f32::INFINITY), 0);
        assert_eq!(game.advance(SIM_DT * 3.0 + SIM_DT * 0.5), 3);
        assert_eq!(game.time_ticks(), 3);
    }

    #[test]
    fn test_non_finite_aim_keeps_drop_inside_well() {
        let mut game = game();
        let far = game.world_mut().add_body(BodySpec::tile(2, Vec2::new(40.0, 675.0)));
        game.aim(300.0);
        game.aim(f32::NAN);
        game.aim(f32::NEG_INFINITY);

        let id = game.drop_tile().unwrap();
        assert_eq!(game.world().body(id).unwrap().pos, Vec2::new(300.0, 100.0));

        game.step();
        assert!(merged(&game.drain_events()).is_empty());
        assert!(game.world().contains(far));
        assert!(game.world().bodies().iter().all(|b| b.pos.is_finite()));
    }

    #[test]
    fn test_teardown_stops_everything() {
        let mut game = game();
        game.drop_tile();
        assert!(game.pending_timers() > 0);

        game.teardown();
        assert!(!game.is_running());
        assert_eq!(game.pending_timers(), 0);
        assert!(game.world().bodies().is_empty());
        assert!(game.drop_tile().is_none());
        assert_eq!(game.advance(1.0), 0);
        assert!(game.drain_events().is_empty());
    }

    #[test]
    fn test_same_seed_same_tiles() {
        let mut a = Game::new(1, 99, &Tuning::default()).unwrap();
        let mut b = Game::new(2, 99, &Tuning::default()).unwrap();
        for x in [100.0, 300.0, 200.0, 350.0] {
            a.aim(x);
            b.aim(x);
            a.drop_tile();
            b.drop_tile();
            for _ in 0..12 {
                a.step();
                b.step();
            }
            assert_eq!(a.next_value(), b.next_value());
        }
        let pa: Vec<_> = a.world().bodies().iter().map(|t| (t.value, t.pos)).collect();
        let pb: Vec<_> = b.world().bodies().iter().map(|t| (t.value, t.pos)).collect();
        assert_eq!(pa, pb);
    }
}
