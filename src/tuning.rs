//! Data-driven game balance
//!
//! Every gameplay constant lives here so a JSON file can retune the game
//! without a rebuild. Missing fields fall back to the defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TuningError;
use crate::tiles::{MAX_TILE_VALUE, is_tile_value, radius_for};

/// Weighted entry for the next-tile distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnWeight {
    pub value: u32,
    pub weight: u32,
}

/// Gameplay tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === World ===
    /// Well width (pixels)
    pub world_width: f32,
    /// Well height (pixels); the floor sits here
    pub world_height: f32,
    /// Height at which dropped tiles appear
    pub spawn_y: f32,
    /// Tiles settled above this line start the loss timer
    pub loss_line_y: f32,

    // === Physics ===
    /// Downward acceleration (pixels/s²)
    pub gravity: f32,
    /// Bounciness for tile contacts
    pub restitution: f32,
    /// Coulomb friction coefficient for tile contacts
    pub friction: f32,
    /// Fraction of velocity lost each step to air drag
    pub air_friction: f32,
    /// Vertical speed (pixels/s) below which a tile counts as settled
    pub settle_speed: f32,

    // === Timers (ms) ===
    pub drop_cooldown_ms: u64,
    pub preview_pop_ms: u64,
    pub loss_grace_ms: u64,
    pub ad_load_ms: u64,
    pub ad_min_display_ms: u64,
    pub commentary_timeout_ms: u64,

    // === Rules ===
    /// Every Nth restart is gated behind an interstitial ad
    pub periodic_ad_every: u64,
    /// Merges producing at least this value ask for commentary
    pub commentary_min_merge: u32,
    /// Largest value that still spawns as a tile
    pub max_tile_value: u32,
    /// Award an extra 2x on merges past the cap
    pub super_merge_bonus: bool,
    /// Next-tile distribution
    pub spawn_weights: Vec<SpawnWeight>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            world_width: 450.0,
            world_height: 700.0,
            spawn_y: 100.0,
            loss_line_y: 160.0,

            gravity: 1000.0,
            restitution: 0.3,
            friction: 0.05,
            air_friction: 0.01,
            settle_speed: 12.0,

            drop_cooldown_ms: 150,
            preview_pop_ms: 200,
            loss_grace_ms: 1000,
            ad_load_ms: 800,
            ad_min_display_ms: 5000,
            commentary_timeout_ms: 4000,

            periodic_ad_every: 4,
            commentary_min_merge: 64,
            max_tile_value: MAX_TILE_VALUE,
            super_merge_bonus: true,
            spawn_weights: vec![
                SpawnWeight { value: 2, weight: 4 },
                SpawnWeight { value: 4, weight: 3 },
                SpawnWeight { value: 8, weight: 2 },
                SpawnWeight { value: 16, weight: 1 },
            ],
        }
    }
}

impl Tuning {
    /// Parse and validate tuning from JSON
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load and validate tuning from a JSON file
    pub fn load(path: &Path) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path)?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Check that the values describe a playable game
    pub fn validate(&self) -> Result<(), TuningError> {
        if !(self.world_width > 0.0 && self.world_height > 0.0) {
            return Err(TuningError::invalid("world_width", "world must have a positive size"));
        }
        if !(self.spawn_y > 0.0 && self.spawn_y < self.world_height) {
            return Err(TuningError::invalid("spawn_y", "must lie inside the well"));
        }
        if !(self.loss_line_y > 0.0 && self.loss_line_y < self.world_height) {
            return Err(TuningError::invalid("loss_line_y", "must lie inside the well"));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(TuningError::invalid("restitution", "must be within 0..=1"));
        }
        if !(0.0..1.0).contains(&self.air_friction) {
            return Err(TuningError::invalid("air_friction", "must be within 0..1"));
        }
        if self.friction < 0.0 || self.settle_speed < 0.0 {
            return Err(TuningError::invalid("friction", "must not be negative"));
        }
        if self.periodic_ad_every == 0 {
            return Err(TuningError::invalid("periodic_ad_every", "must be at least 1"));
        }
        if !is_tile_value(self.max_tile_value) {
            return Err(TuningError::invalid(
                "max_tile_value",
                format!("{} is not a tile value", self.max_tile_value),
            ));
        }
        if self.spawn_weights.iter().all(|w| w.weight == 0) {
            return Err(TuningError::invalid("spawn_weights", "need at least one positive weight"));
        }
        for w in &self.spawn_weights {
            if !is_tile_value(w.value) || w.value > self.max_tile_value {
                return Err(TuningError::invalid(
                    "spawn_weights",
                    format!("{} is not a spawnable tile value", w.value),
                ));
            }
            if radius_for(w.value) * 2.0 > self.world_width {
                return Err(TuningError::invalid(
                    "spawn_weights",
                    format!("tile {} is wider than the well", w.value),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let tuning = Tuning::from_json(r#"{ "loss_grace_ms": 2500, "super_merge_bonus": false }"#)
            .unwrap();
        assert_eq!(tuning.loss_grace_ms, 2500);
        assert!(!tuning.super_merge_bonus);
        assert_eq!(tuning.world_width, 450.0);
        assert_eq!(tuning.spawn_weights.len(), 4);
    }

    #[test]
    fn test_rejects_bad_spawn_weights() {
        let err = Tuning::from_json(r#"{ "spawn_weights": [{ "value": 3, "weight": 1 }] }"#)
            .unwrap_err();
        assert!(matches!(err, TuningError::Invalid { field: "spawn_weights", .. }));

        let err = Tuning::from_json(r#"{ "spawn_weights": [{ "value": 2, "weight": 0 }] }"#)
            .unwrap_err();
        assert!(matches!(err, TuningError::Invalid { field: "spawn_weights", .. }));
    }

    #[test]
    fn test_rejects_zero_ad_interval() {
        let err = Tuning::from_json(r#"{ "periodic_ad_every": 0 }"#).unwrap_err();
        assert!(matches!(err, TuningError::Invalid { field: "periodic_ad_every", .. }));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(Tuning::from_json("{ nope"), Err(TuningError::Json(_))));
    }
}
