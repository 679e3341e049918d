//! Session controller
//!
//! Owns everything that outlives a single game: the running stats, the high
//! score and play count, the ad gate, and optional commentary. Exactly one
//! [`Game`] is alive at a time; a reset tears it down before the next starts.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::ads::{AdGate, AdKind, AdNetwork, AdPhase, AdUpdate};
use crate::commentary::{Commentator, CommentaryProvider, CommentaryRequest};
use crate::error::TuningError;
use crate::persistence::{KeyValueStore, PlayerRecords};
use crate::settings::Settings;
use crate::sim::body::BodyLabel;
use crate::sim::game::{Game, GameEvent, SoundCue, StatsUpdate};
use crate::sim::merge::MergeOutcome;
use crate::sim::spawn::TilePicker;
use crate::sim::world::{CircleWorld, PhysicsWorld};
use crate::tiles::{MIN_TILE_VALUE, tile_def_or_min};
use crate::tuning::Tuning;

/// Stats shown to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub score: u64,
    pub high_score: u64,
    pub merges: u32,
    pub highest_tile: u32,
    pub is_game_over: bool,
    pub games_played: u64,
    pub game_id: u64,
}

impl SessionStats {
    fn fresh(records: &PlayerRecords, game_id: u64) -> Self {
        Self {
            score: 0,
            high_score: records.high_score,
            merges: 0,
            highest_tile: MIN_TILE_VALUE,
            is_game_over: false,
            games_played: records.games_played,
            game_id,
        }
    }
}

/// Read-only tile snapshot for drawing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileView {
    pub id: u32,
    pub value: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub fill: String,
    pub border: String,
    pub text: String,
}

/// Notification for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
    StatsChanged(SessionStats),
    TileMerged(MergeOutcome),
    GameOver,
    AdLoading { kind: AdKind },
    AdShowing { kind: AdKind, placeholder: bool },
    AdClosable { kind: AdKind },
    ContinueGranted { removed: usize },
    GameReset { game_id: u64 },
    Commentary(String),
    Sound { cue: SoundCue, volume: f32 },
}

/// Stats, records, ads and the live game
pub struct SessionController {
    tuning: Tuning,
    picker: TilePicker,
    settings: Settings,
    store: Box<dyn KeyValueStore>,
    records: PlayerRecords,
    stats: SessionStats,
    ads: AdGate,
    commentator: Option<Commentator>,
    game: Game,
    seeds: Pcg32,
    clock_ms: f64,
    running: bool,
    events: Vec<SessionEvent>,
}

impl SessionController {
    /// Start a session and its first game
    pub fn new(
        tuning: Tuning,
        store: Box<dyn KeyValueStore>,
        ads: Box<dyn AdNetwork>,
        seed: u64,
    ) -> Result<Self, TuningError> {
        tuning.validate()?;
        let picker = TilePicker::new(&tuning.spawn_weights)?;
        let records = PlayerRecords::load(store.as_ref());
        let settings = Settings::load(store.as_ref());

        let mut seeds = Pcg32::seed_from_u64(seed);
        let game_id = 1;
        let world = CircleWorld::new(&tuning);
        let game = Game::with_parts(game_id, seeds.next_u64(), &tuning, world, picker.clone());

        Ok(Self {
            ads: AdGate::new(ads, &tuning),
            stats: SessionStats::fresh(&records, game_id),
            tuning,
            picker,
            settings,
            store,
            records,
            commentator: None,
            game,
            seeds,
            clock_ms: 0.0,
            running: true,
            events: Vec::new(),
        })
    }

    /// Attach a commentary provider
    pub fn with_commentary(mut self, provider: Box<dyn CommentaryProvider>) -> Self {
        self.commentator = Some(Commentator::new(provider, self.tuning.commentary_timeout_ms));
        self
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn records(&self) -> PlayerRecords {
        self.records
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace and persist the player's preferences
    pub fn set_settings(&mut self, settings: Settings) {
        if let Err(e) = settings.save(self.store.as_mut()) {
            log::warn!("Failed to save settings: {}", e);
        }
        self.settings = settings;
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Direct game access for scripted setups
    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    /// Every tile in the well, ascending by id
    pub fn tile_views(&self) -> Vec<TileView> {
        self.game
            .world()
            .bodies()
            .iter()
            .filter(|b| b.label == BodyLabel::Tile)
            .map(|b| {
                let def = tile_def_or_min(b.value);
                TileView {
                    id: b.id.0,
                    value: b.value,
                    x: b.pos.x,
                    y: b.pos.y,
                    radius: b.radius,
                    fill: def.fill_css(),
                    border: def.border_css(),
                    text: def.text_css(),
                }
            })
            .collect()
    }

    /// Session clock (ms since start)
    pub fn now_ms(&self) -> u64 {
        self.clock_ms as u64
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn ad_phase(&self) -> AdPhase {
        self.ads.phase()
    }

    /// Whole seconds until the ad on screen may be closed
    pub fn ad_seconds_left(&self) -> Option<u64> {
        self.ads.seconds_left(self.now_ms())
    }

    /// Take all events raised since the last call
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Move the drop position
    pub fn aim(&mut self, x: f32) {
        if self.running && !self.ads.is_busy() {
            self.game.aim(x);
        }
    }

    /// Drop the next tile; `false` if the drop was ignored
    pub fn drop_tile(&mut self) -> bool {
        if !self.running || self.ads.is_busy() {
            return false;
        }
        let dropped = self.game.drop_tile().is_some();
        self.pump_game_events();
        dropped
    }

    /// Advance the session clock and everything hanging off it
    pub fn advance(&mut self, dt: f32) {
        if !self.running {
            return;
        }
        // Bad frame times (NaN, infinite) count as no time passing
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.clock_ms += f64::from(dt) * 1000.0;
        let now = self.now_ms();

        self.game.advance(dt);
        self.pump_game_events();

        for update in self.ads.advance(now) {
            match update {
                AdUpdate::Showing { kind, placeholder } => {
                    self.events.push(SessionEvent::AdShowing { kind, placeholder });
                }
                AdUpdate::Closable { kind } => {
                    self.events.push(SessionEvent::AdClosable { kind });
                }
            }
        }

        if let Some(line) = self.commentator.as_mut().and_then(|c| c.poll(now)) {
            self.events.push(SessionEvent::Commentary(line));
        }
    }

    /// Merge a partial update into the stats.
    ///
    /// The score never goes down here; the high score follows it up and is
    /// persisted whenever it moves.
    pub fn update_stats(&mut self, update: &StatsUpdate) {
        if let Some(score) = update.score {
            self.stats.score = self.stats.score.max(score);
        }
        if let Some(merges) = update.merges {
            self.stats.merges = merges;
        }
        if let Some(highest_tile) = update.highest_tile {
            self.stats.highest_tile = highest_tile;
        }
        if let Some(is_game_over) = update.is_game_over {
            self.stats.is_game_over = is_game_over;
        }

        if self.stats.score > self.stats.high_score {
            self.stats.high_score = self.stats.score;
            self.records.high_score = self.stats.score;
            if let Err(e) = self.records.save_high_score(self.store.as_mut()) {
                log::warn!("Failed to save high score: {}", e);
            }
        }

        self.events.push(SessionEvent::StatsChanged(self.stats));
    }

    /// Ask to continue a lost game behind a rewarded ad.
    ///
    /// Only valid while the game is over and no ad is running.
    pub fn request_continue(&mut self) -> bool {
        if !self.running || !self.stats.is_game_over || self.ads.is_busy() {
            return false;
        }
        self.sound(SoundCue::Button);
        self.begin_ad(AdKind::Continue)
    }

    /// Count a play and start a new game, first showing an interstitial on
    /// every Nth play. Ignored while an ad is running.
    pub fn request_reset(&mut self) -> bool {
        if !self.running || self.ads.is_busy() {
            return false;
        }
        self.sound(SoundCue::Button);

        self.records.games_played += 1;
        self.stats.games_played = self.records.games_played;
        if let Err(e) = self.records.save_games_played(self.store.as_mut()) {
            log::warn!("Failed to save play count: {}", e);
        }

        let every = self.tuning.periodic_ad_every;
        if every > 0 && self.records.games_played % every == 0 {
            self.begin_ad(AdKind::Periodic)
        } else {
            self.reset_game();
            true
        }
    }

    /// Close the ad on screen. Ignored until it is closable.
    pub fn dismiss_ad(&mut self) -> bool {
        let Some(done) = self.ads.dismiss() else {
            return false;
        };
        if done.kind.is_rewarded() {
            if let Some(removed) = self.game.continue_play() {
                self.pump_game_events();
                self.events.push(SessionEvent::ContinueGranted { removed });
            }
        } else {
            self.reset_game();
        }
        true
    }

    /// Tear down the current game and start a fresh one
    pub fn reset_game(&mut self) {
        self.game.teardown();
        if let Some(commentator) = self.commentator.as_mut() {
            commentator.cancel();
        }

        let game_id = self.stats.game_id + 1;
        let world = CircleWorld::new(&self.tuning);
        self.game = Game::with_parts(game_id, self.seeds.next_u64(), &self.tuning, world, self.picker.clone());
        self.stats = SessionStats::fresh(&self.records, game_id);
        log::info!("Session reset to game {}", game_id);

        self.events.push(SessionEvent::GameReset { game_id });
        self.events.push(SessionEvent::StatsChanged(self.stats));
    }

    /// Stop everything: game, timers, ads, commentary
    pub fn teardown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.game.teardown();
        self.ads.cancel();
        if let Some(commentator) = self.commentator.as_mut() {
            commentator.cancel();
        }
        log::info!("Session torn down");
    }

    fn begin_ad(&mut self, kind: AdKind) -> bool {
        let started = self.ads.begin(kind, self.now_ms());
        if started {
            self.events.push(SessionEvent::AdLoading { kind });
        }
        started
    }

    fn pump_game_events(&mut self) {
        for event in self.game.drain_events() {
            match event {
                GameEvent::StatsChanged(update) => self.update_stats(&update),
                GameEvent::Merged(merge) => {
                    self.events.push(SessionEvent::TileMerged(merge));
                    if merge.new_value >= self.tuning.commentary_min_merge {
                        self.comment(merge.value, false);
                    }
                }
                GameEvent::GameOver => {
                    self.events.push(SessionEvent::GameOver);
                    self.comment(self.stats.highest_tile / 2, true);
                }
                GameEvent::Sound(cue) => self.sound(cue),
                GameEvent::Dropped { .. }
                | GameEvent::LossArmed { .. }
                | GameEvent::LossCleared
                | GameEvent::Continued { .. } => {}
            }
        }
    }

    fn comment(&mut self, last_merge: u32, is_game_over: bool) {
        if !self.settings.commentary_enabled {
            return;
        }
        let Some(commentator) = self.commentator.as_mut() else {
            return;
        };
        let request = CommentaryRequest {
            score: self.game.score(),
            last_merge,
            highest_tile: self.stats.highest_tile,
            is_game_over,
        };
        if let Some(line) = commentator.request(&request, self.clock_ms as u64) {
            self.events.push(SessionEvent::Commentary(line));
        }
    }

    fn sound(&mut self, cue: SoundCue) {
        if self.settings.sound_enabled {
            self.events.push(SessionEvent::Sound {
                cue,
                volume: self.settings.effective_volume(),
            });
        }
    }
}
