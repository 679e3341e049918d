//! 2048 Stack - a physics stacking puzzle
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, merges, spawning, loss detection)
//! - `session`: Stats, high score, restart/continue routing
//! - `ads`: Ad gate state machine
//! - `commentary`: Optional quips on big merges and game over
//! - `persistence`: Key-value storage and player records
//! - `platform`: Browser bindings
//! - `tuning`: Data-driven game balance

pub mod ads;
pub mod commentary;
pub mod error;
pub mod persistence;
pub mod platform;
pub mod session;
pub mod settings;
pub mod sim;
pub mod tiles;
pub mod tuning;

pub use error::{AdError, CommentaryError, StoreError, TuningError};
pub use session::{SessionController, SessionEvent, SessionStats};
pub use settings::Settings;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Simulation rate
    pub const SIM_HZ: u32 = 60;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / SIM_HZ as f32;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
}
