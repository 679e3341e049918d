//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by body ID)
//! - No platform dependencies

pub mod body;
pub mod collision;
pub mod game;
pub mod loss;
pub mod merge;
pub mod spawn;
pub mod timers;
pub mod world;

pub use body::{Body, BodyId, BodyLabel, BodySpec};
pub use game::{Game, GameEvent, GameTimer, SoundCue, StatsUpdate};
pub use loss::{LossDetector, LossState, LossTransition};
pub use merge::{MergeOutcome, MergeRules, resolve_merges};
pub use spawn::{SpawnControl, TileDrop, TilePicker};
pub use timers::{Scheduler, TimerHandle};
pub use world::{CircleWorld, PhysicsWorld, StepEvents};
