//! Tile registry
//!
//! Static table mapping each tile value to its physical radius and colours.
//! Bigger values get bigger circles, which is what makes the well fill up.

use serde::Serialize;

/// Visual and physical definition of one tile value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileDef {
    pub value: u32,
    /// Collision and render radius (pixels)
    pub radius: u32,
    /// Fill colour, 0xRRGGBB
    pub color: u32,
    /// Border colour, 0xRRGGBB
    pub border_color: u32,
    /// Label colour, 0xRRGGBB
    pub text_color: u32,
}

impl TileDef {
    const fn new(value: u32, radius: u32, color: u32, border_color: u32) -> Self {
        Self {
            value,
            radius,
            color,
            border_color,
            text_color: 0xffffff,
        }
    }

    /// Radius as a float for the physics world
    #[inline]
    pub fn radius_f32(&self) -> f32 {
        self.radius as f32
    }

    /// CSS hex string for the fill colour (e.g. `#ef4444`)
    pub fn fill_css(&self) -> String {
        format!("#{:06x}", self.color)
    }

    /// CSS hex string for the border colour
    pub fn border_css(&self) -> String {
        format!("#{:06x}", self.border_color)
    }

    /// CSS hex string for the value label
    pub fn text_css(&self) -> String {
        format!("#{:06x}", self.text_color)
    }
}

/// Smallest tile value
pub const MIN_TILE_VALUE: u32 = 2;

/// Largest tile value that still exists as a body
pub const MAX_TILE_VALUE: u32 = 2048;

/// All tile definitions, ascending by value
pub const TILE_DEFS: [TileDef; 11] = [
    TileDef::new(2, 25, 0xef4444, 0x991b1b),     // Red
    TileDef::new(4, 35, 0xf97316, 0x9a3412),     // Orange
    TileDef::new(8, 45, 0xeab308, 0x854d0e),     // Yellow
    TileDef::new(16, 55, 0x22c55e, 0x166534),    // Green
    TileDef::new(32, 65, 0x3b82f6, 0x1e40af),    // Blue
    TileDef::new(64, 75, 0x4f46e5, 0x3730a3),    // Indigo
    TileDef::new(128, 85, 0x9333ea, 0x6b21a8),   // Violet
    TileDef::new(256, 95, 0xec4899, 0x9d174d),   // Pink
    TileDef::new(512, 105, 0x06b6d4, 0x155e75),  // Cyan
    TileDef::new(1024, 115, 0xfacc15, 0xa16207), // Gold
    TileDef::new(2048, 130, 0xffffff, 0xcbd5e1), // White
];

/// Check that a value is a registered tile (power of two in 2..=2048)
#[inline]
pub fn is_tile_value(value: u32) -> bool {
    value.is_power_of_two() && (MIN_TILE_VALUE..=MAX_TILE_VALUE).contains(&value)
}

/// Look up the definition for a tile value
pub fn tile_def(value: u32) -> Option<&'static TileDef> {
    if !is_tile_value(value) {
        return None;
    }
    // 2 -> 0, 4 -> 1, ... 2048 -> 10
    TILE_DEFS.get(value.trailing_zeros() as usize - 1)
}

/// Definition for a value, falling back to the smallest tile for unknown values
pub fn tile_def_or_min(value: u32) -> &'static TileDef {
    tile_def(value).unwrap_or(&TILE_DEFS[0])
}

/// Radius for a tile value (smallest radius for unknown values)
#[inline]
pub fn radius_for(value: u32) -> f32 {
    tile_def_or_min(value).radius_f32()
}
