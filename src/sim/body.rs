//! Rigid circle bodies
//!
//! Everything in the well is a circle. Tiles carry a value; obstacles are
//! inert circles that never merge (used for tests and static decoration).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::tiles::radius_for;

/// Stable body identifier (monotonic within one world)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u32);

/// What a body is, for game rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyLabel {
    /// A numbered, mergeable tile
    Tile,
    /// Inert circle that takes part in physics only
    Obstacle,
}

/// Description of a body to add to a world
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySpec {
    pub label: BodyLabel,
    pub value: u32,
    pub pos: Vec2,
    pub radius: f32,
    pub is_static: bool,
}

impl BodySpec {
    /// A dynamic tile with its radius taken from the tile registry
    pub fn tile(value: u32, pos: Vec2) -> Self {
        Self {
            label: BodyLabel::Tile,
            value,
            pos,
            radius: radius_for(value),
            is_static: false,
        }
    }

    /// Same body, pinned in place
    pub fn pinned(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// A static obstacle circle
    pub fn obstacle(pos: Vec2, radius: f32) -> Self {
        Self {
            label: BodyLabel::Obstacle,
            value: 0,
            pos,
            radius,
            is_static: true,
        }
    }
}

/// A body living in a physics world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub id: BodyId,
    pub label: BodyLabel,
    /// Tile value (0 for obstacles)
    pub value: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub is_static: bool,
}

impl Body {
    pub fn from_spec(id: BodyId, spec: BodySpec) -> Self {
        Self {
            id,
            label: spec.label,
            value: spec.value,
            pos: spec.pos,
            vel: Vec2::ZERO,
            radius: spec.radius,
            is_static: spec.is_static,
        }
    }

    /// True for dynamic tiles, the only bodies game rules look at
    #[inline]
    pub fn is_live_tile(&self) -> bool {
        self.label == BodyLabel::Tile && !self.is_static
    }

    /// Mass proportional to area
    #[inline]
    pub fn mass(&self) -> f32 {
        self.radius * self.radius
    }

    /// Inverse mass (0 for static bodies)
    #[inline]
    pub fn inv_mass(&self) -> f32 {
        if self.is_static {
            0.0
        } else {
            1.0 / self.mass().max(f32::EPSILON)
        }
    }
}
