//! Merge rule engine
//!
//! Two dynamic tiles of equal value that start touching become one tile of
//! double the value at their midpoint. Past the value cap nothing is
//! spawned and a bonus is paid instead.

use glam::Vec2;
use serde::Serialize;

use super::body::{Body, BodyId, BodySpec};
use super::world::{PhysicsWorld, midpoint};
use crate::tuning::Tuning;

/// Scoring and cap rules for merges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRules {
    pub max_tile_value: u32,
    pub super_merge_bonus: bool,
}

impl MergeRules {
    pub fn from_tuning(tuning: &Tuning) -> Self {
        Self {
            max_tile_value: tuning.max_tile_value,
            super_merge_bonus: tuning.super_merge_bonus,
        }
    }

    /// Points for producing `new_value`, and whether a tile should spawn
    pub fn award(&self, new_value: u32) -> (u64, bool) {
        let base = new_value as u64;
        if new_value <= self.max_tile_value {
            (base, true)
        } else if self.super_merge_bonus {
            (base + base * 2, false)
        } else {
            (base, false)
        }
    }
}

/// Result of one merge
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MergeOutcome {
    /// The two tiles removed
    pub consumed: (BodyId, BodyId),
    /// Value of each consumed tile
    pub value: u32,
    pub new_value: u32,
    pub point: Vec2,
    /// Replacement tile (none past the cap)
    pub spawned: Option<BodyId>,
    pub points: u64,
}

/// Whether two bodies merge on contact
pub fn can_merge(a: &Body, b: &Body) -> bool {
    a.id != b.id && a.is_live_tile() && b.is_live_tile() && a.value == b.value
}

/// Apply merges for one step's collision-start pairs, in order.
///
/// A pair naming a body that an earlier pair already consumed is skipped.
pub fn resolve_merges<W: PhysicsWorld + ?Sized>(
    world: &mut W,
    pairs: &[(BodyId, BodyId)],
    rules: &MergeRules,
) -> Vec<MergeOutcome> {
    let mut outcomes = Vec::new();

    for &(id_a, id_b) in pairs {
        let (Some(a), Some(b)) = (world.body(id_a), world.body(id_b)) else {
            log::debug!("Skipping merge {:?}/{:?}: tile already consumed", id_a, id_b);
            continue;
        };
        if !can_merge(a, b) {
            continue;
        }

        let value = a.value;
        let new_value = value * 2;
        let point = midpoint(a.pos, b.pos);

        world.remove_body(id_a);
        world.remove_body(id_b);

        let (points, spawn) = rules.award(new_value);
        let spawned = spawn.then(|| world.add_body(BodySpec::tile(new_value, point)));

        log::debug!("Merged {} + {} -> {} at ({:.0}, {:.0})", value, value, new_value, point.x, point.y);
        outcomes.push(MergeOutcome {
            consumed: (id_a, id_b),
            value,
            new_value,
            point,
            spawned,
            points,
        });
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::body::BodySpec;
    use crate::sim::world::CircleWorld;
    use proptest::prelude::*;

    fn rules() -> MergeRules {
        MergeRules::from_tuning(&Tuning::default())
    }

    fn world() -> CircleWorld {
        CircleWorld::new(&Tuning::default())
    }

    #[test]
    fn test_two_fours_make_an_eight_at_midpoint() {
        let mut world = world();
        let a = world.add_body(BodySpec::tile(4, Vec2::new(100.0, 600.0)));
        let b = world.add_body(BodySpec::tile(4, Vec2::new(160.0, 640.0)));

        let outcomes = resolve_merges(&mut world, &[(a, b)], &rules());
        assert_eq!(outcomes.len(), 1);
        let merge = outcomes[0];
        assert_eq!(merge.new_value, 8);
        assert_eq!(merge.points, 8);
        assert_eq!(merge.point, Vec2::new(130.0, 620.0));

        let spawned = world.body(merge.spawned.unwrap()).unwrap();
        assert_eq!(spawned.value, 8);
        assert_eq!(spawned.pos, Vec2::new(130.0, 620.0));
        assert_eq!(spawned.radius, 45.0);
        assert!(!world.contains(a) && !world.contains(b));
        assert_eq!(world.tile_count(), 1);
    }

    #[test]
    fn test_two_2048s_pay_super_bonus_and_vanish() {
        let mut world = world();
        let a = world.add_body(BodySpec::tile(2048, Vec2::new(130.0, 570.0)));
        let b = world.add_body(BodySpec::tile(2048, Vec2::new(320.0, 570.0)));
        let other = world.add_body(BodySpec::tile(2, Vec2::new(225.0, 300.0)));

        let outcomes = resolve_merges(&mut world, &[(a, b)], &rules());
        assert_eq!(outcomes[0].new_value, 4096);
        assert_eq!(outcomes[0].points, 2048 * 2 * 3);
        assert!(outcomes[0].spawned.is_none());
        assert_eq!(world.tile_count(), 1);
        assert!(world.contains(other));
    }

    #[test]
    fn test_super_bonus_can_be_disabled() {
        let rules = MergeRules {
            max_tile_value: 2048,
            super_merge_bonus: false,
        };
        assert_eq!(rules.award(4096), (4096, false));
        assert_eq!(rules.award(2048), (2048, true));
    }

    #[test]
    fn test_unequal_values_do_not_merge() {
        let mut world = world();
        let a = world.add_body(BodySpec::tile(2, Vec2::new(100.0, 600.0)));
        let b = world.add_body(BodySpec::tile(4, Vec2::new(150.0, 600.0)));
        assert!(resolve_merges(&mut world, &[(a, b)], &rules()).is_empty());
        assert_eq!(world.tile_count(), 2);
    }

    #[test]
    fn test_static_and_obstacles_do_not_merge() {
        let mut world = world();
        let pinned = world.add_body(BodySpec::tile(2, Vec2::new(100.0, 600.0)).pinned());
        let live = world.add_body(BodySpec::tile(2, Vec2::new(150.0, 600.0)));
        let rock = world.add_body(BodySpec::obstacle(Vec2::new(200.0, 600.0), 25.0));

        let pairs = [(pinned, live), (live, rock)];
        assert!(resolve_merges(&mut world, &pairs, &rules()).is_empty());
        assert_eq!(world.bodies().len(), 3);
    }

    #[test]
    fn test_consumed_tile_is_not_merged_twice() {
        let mut world = world();
        let a = world.add_body(BodySpec::tile(2, Vec2::new(100.0, 600.0)));
        let b = world.add_body(BodySpec::tile(2, Vec2::new(150.0, 600.0)));
        let c = world.add_body(BodySpec::tile(2, Vec2::new(200.0, 600.0)));

        // b touches both a and c in the same step
        let outcomes = resolve_merges(&mut world, &[(a, b), (b, c)], &rules());
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].consumed, (a, b));
        assert!(world.contains(c));
        assert_eq!(world.tile_count(), 2);
    }

    #[test]
    fn test_independent_pairs_in_one_batch() {
        let mut world = world();
        let a = world.add_body(BodySpec::tile(2, Vec2::new(50.0, 600.0)));
        let b = world.add_body(BodySpec::tile(2, Vec2::new(100.0, 600.0)));
        let c = world.add_body(BodySpec::tile(8, Vec2::new(250.0, 600.0)));
        let d = world.add_body(BodySpec::tile(8, Vec2::new(340.0, 600.0)));

        let outcomes = resolve_merges(&mut world, &[(a, b), (c, d)], &rules());
        let values: Vec<_> = outcomes.iter().map(|m| m.new_value).collect();
        assert_eq!(values, vec![4, 16]);
        assert_eq!(world.tile_count(), 2);
    }

    proptest! {
        #[test]
        fn prop_merge_doubles_to_power_of_two(exp in 1u32..=11) {
            let value = 1u32 << exp;
            let mut world = world();
            let a = world.add_body(BodySpec::tile(value, Vec2::new(200.0, 500.0)));
            let b = world.add_body(BodySpec::tile(value, Vec2::new(260.0, 500.0)));

            let outcomes = resolve_merges(&mut world, &[(a, b)], &rules());
            prop_assert_eq!(outcomes.len(), 1);
            prop_assert_eq!(outcomes[0].new_value, value * 2);
            prop_assert!(outcomes[0].new_value.is_power_of_two());
            prop_assert_eq!(outcomes[0].spawned.is_some(), value * 2 <= 2048);
        }
    }
}
