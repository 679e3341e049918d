//! Physics world adapter
//!
//! Game rules only talk to [`PhysicsWorld`]: add a body, remove a body, look
//! at bodies, step. Each step reports the pairs that *started* touching, the
//! same shape as a `collisionStart` event in a full rigid-body engine.
//! [`CircleWorld`] is the built-in implementation: gravity, circles, walls.

use std::collections::BTreeSet;

use glam::Vec2;

use super::body::{Body, BodyId, BodyLabel, BodySpec};
use super::collision::{
    Bounds, Material, circle_circle_contact, circle_wall_contacts, resolve_pair, resolve_wall,
};
use crate::tuning::Tuning;

/// Solver passes per step
pub const SOLVER_ITERATIONS: u32 = 8;

/// Events raised by one simulation step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepEvents {
    /// Pairs (lower id first) that began touching this step, sorted
    pub collision_start: Vec<(BodyId, BodyId)>,
}

/// Narrow interface to a 2D physics engine
pub trait PhysicsWorld {
    /// Add a body and return its id
    fn add_body(&mut self, spec: BodySpec) -> BodyId;

    /// Remove a body. Returns `None` if it was already gone.
    fn remove_body(&mut self, id: BodyId) -> Option<Body>;

    fn body(&self, id: BodyId) -> Option<&Body>;

    /// All bodies, ascending by id
    fn bodies(&self) -> &[Body];

    /// Advance the simulation by `dt` seconds
    fn step(&mut self, dt: f32) -> StepEvents;

    /// Remove every body and forget all contacts
    fn clear(&mut self);

    fn contains(&self, id: BodyId) -> bool {
        self.body(id).is_some()
    }

    /// Number of tile bodies (static or not)
    fn tile_count(&self) -> usize {
        self.bodies()
            .iter()
            .filter(|b| b.label == BodyLabel::Tile)
            .count()
    }
}

/// Minimal circle integrator: gravity, circle-circle and wall contacts
#[derive(Debug, Clone)]
pub struct CircleWorld {
    bounds: Bounds,
    gravity: f32,
    air_friction: f32,
    material: Material,
    /// Sorted by id
    bodies: Vec<Body>,
    /// Pairs touching at the end of the previous step
    contacts: BTreeSet<(BodyId, BodyId)>,
    next_id: u32,
}

impl CircleWorld {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            bounds: Bounds {
                width: tuning.world_width,
                height: tuning.world_height,
            },
            gravity: tuning.gravity,
            air_friction: tuning.air_friction,
            material: Material {
                restitution: tuning.restitution,
                friction: tuning.friction,
                ..Material::default()
            },
            bodies: Vec::new(),
            contacts: BTreeSet::new(),
            next_id: 1,
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Mutable access for tests and scripted setups
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.index_of(id).map(|idx| &mut self.bodies[idx])
    }

    fn index_of(&self, id: BodyId) -> Option<usize> {
        self.bodies.binary_search_by_key(&id, |b| b.id).ok()
    }

    fn integrate(&mut self, dt: f32) {
        let damping = 1.0 - self.air_friction;
        for body in self.bodies.iter_mut().filter(|b| !b.is_static) {
            body.vel.y += self.gravity * dt;
            body.vel *= damping;
            body.pos += body.vel * dt;
        }
    }

    /// One solver pass; records touching pairs when `touching` is given
    fn solve(&mut self, mut touching: Option<&mut BTreeSet<(BodyId, BodyId)>>) {
        let n = self.bodies.len();
        for j in 1..n {
            let (left, right) = self.bodies.split_at_mut(j);
            let b = &mut right[0];
            for a in left.iter_mut() {
                if a.is_static && b.is_static {
                    continue;
                }
                if let Some(contact) = circle_circle_contact(a.pos, a.radius, b.pos, b.radius) {
                    if let Some(set) = touching.as_deref_mut() {
                        set.insert((a.id, b.id));
                    }
                    resolve_pair(a, b, &contact, &self.material);
                }
            }
        }

        for body in self.bodies.iter_mut().filter(|b| !b.is_static) {
            for contact in circle_wall_contacts(body.pos, body.radius, self.bounds) {
                resolve_wall(body, &contact, &self.material);
            }
        }
    }
}

impl PhysicsWorld for CircleWorld {
    fn add_body(&mut self, spec: BodySpec) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        // Ids only grow, so pushing keeps the vec sorted
        self.bodies.push(Body::from_spec(id, spec));
        id
    }

    fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        let idx = self.index_of(id)?;
        self.contacts.retain(|&(a, b)| a != id && b != id);
        Some(self.bodies.remove(idx))
    }

    fn body(&self, id: BodyId) -> Option<&Body> {
        self.index_of(id).map(|idx| &self.bodies[idx])
    }

    fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    fn step(&mut self, dt: f32) -> StepEvents {
        self.integrate(dt);

        let mut touching = BTreeSet::new();
        self.solve(Some(&mut touching));
        for _ in 1..SOLVER_ITERATIONS {
            self.solve(None);
        }

        let collision_start = touching.difference(&self.contacts).copied().collect();
        self.contacts = touching;
        StepEvents { collision_start }
    }

    fn clear(&mut self) {
        self.bodies.clear();
        self.contacts.clear();
    }
}

/// Midpoint of two positions
#[inline]
pub fn midpoint(a: Vec2, b: Vec2) -> Vec2 {
    (a + b) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;

    fn world() -> CircleWorld {
        CircleWorld::new(&Tuning::default())
    }

    fn run(world: &mut CircleWorld, steps: usize) -> Vec<(BodyId, BodyId)> {
        let mut started = Vec::new();
        for _ in 0..steps {
            started.extend(world.step(SIM_DT).collision_start);
        }
        started
    }

    #[test]
    fn test_tile_falls_and_rests_on_floor() {
        let mut world = world();
        let id = world.add_body(BodySpec::tile(2, Vec2::new(225.0, 100.0)));

        run(&mut world, 240);

        let body = world.body(id).unwrap();
        assert!((body.pos.y - (700.0 - 25.0)).abs() < 2.0, "y = {}", body.pos.y);
        assert!(body.vel.y.abs() < 12.0, "vy = {}", body.vel.y);
    }

    #[test]
    fn test_static_body_does_not_move() {
        let mut world = world();
        let id = world.add_body(BodySpec::tile(4, Vec2::new(100.0, 100.0)).pinned());
        run(&mut world, 60);
        assert_eq!(world.body(id).unwrap().pos, Vec2::new(100.0, 100.0));
    }

    #[test]
    fn test_walls_contain_tiles() {
        let mut world = world();
        let id = world.add_body(BodySpec::tile(2, Vec2::new(5.0, 600.0)));
        run(&mut world, 120);
        assert!(world.body(id).unwrap().pos.x >= 25.0 - 1.0);
    }

    #[test]
    fn test_collision_start_fires_once_per_contact() {
        let mut world = world();
        let floor = world.add_body(BodySpec::tile(2, Vec2::new(225.0, 675.0)));
        // 1.5px above contact so the landing is too slow to bounce
        let top = world.add_body(BodySpec::tile(4, Vec2::new(225.0, 675.0 - 60.0 - 1.5)));

        let started = run(&mut world, 240);
        let hits = started.iter().filter(|&&p| p == (floor, top)).count();
        assert_eq!(hits, 1, "started: {:?}", started);
    }

    #[test]
    fn test_remove_body() {
        let mut world = world();
        let a = world.add_body(BodySpec::tile(2, Vec2::new(100.0, 675.0)));
        let b = world.add_body(BodySpec::tile(2, Vec2::new(300.0, 675.0)));
        assert_eq!(world.tile_count(), 2);

        assert!(world.remove_body(a).is_some());
        assert!(world.remove_body(a).is_none());
        assert!(!world.contains(a));
        assert!(world.contains(b));
        assert_eq!(world.tile_count(), 1);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut world = world();
        let a = world.add_body(BodySpec::tile(2, Vec2::new(100.0, 100.0)));
        world.clear();
        let b = world.add_body(BodySpec::tile(2, Vec2::new(100.0, 100.0)));
        assert!(b > a);
        assert_eq!(world.bodies().len(), 1);
    }

    #[test]
    fn test_obstacles_do_not_count_as_tiles() {
        let mut world = world();
        world.add_body(BodySpec::obstacle(Vec2::new(225.0, 400.0), 30.0));
        assert_eq!(world.tile_count(), 0);
        assert_eq!(world.bodies().len(), 1);
    }

    #[test]
    fn test_midpoint() {
        assert_eq!(midpoint(Vec2::new(0.0, 0.0), Vec2::new(10.0, 20.0)), Vec2::new(5.0, 10.0));
    }
}
