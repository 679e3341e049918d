//! Collision detection and response for circles in a walled well
//!
//! Circle-circle contacts plus three walls (left, right, floor). Response is
//! a simple sequential-impulse step: push bodies apart, then cancel the
//! approaching velocity with restitution and Coulomb friction.

use glam::Vec2;

use super::body::Body;

/// Penetration allowed before positional correction kicks in (pixels)
pub const PENETRATION_SLOP: f32 = 0.5;
/// Fraction of the remaining penetration removed per iteration
pub const CORRECTION_PERCENT: f32 = 0.8;
/// Gap under which two circles still count as touching (pixels)
pub const CONTACT_TOLERANCE: f32 = 1.0;

/// Surface response parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub restitution: f32,
    pub friction: f32,
    /// Approach speeds below this do not bounce (stops resting jitter)
    pub rest_speed: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            restitution: 0.3,
            friction: 0.05,
            rest_speed: 60.0,
        }
    }
}

/// A contact between two circles or a circle and a wall
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit normal. For pairs it points from the first body to the second;
    /// for walls it points out of the wall, toward the body.
    pub normal: Vec2,
    /// Overlap depth (negative when within tolerance but not overlapping)
    pub penetration: f32,
    /// Approximate contact point
    pub point: Vec2,
}

/// Axis-aligned well: x in `[0, width]`, floor at `y = height`, open top
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

/// Check two circles for contact
pub fn circle_circle_contact(pa: Vec2, ra: f32, pb: Vec2, rb: f32) -> Option<Contact> {
    let delta = pb - pa;
    let dist_sq = delta.length_squared();
    let reach = ra + rb + CONTACT_TOLERANCE;
    if dist_sq >= reach * reach {
        return None;
    }

    let dist = dist_sq.sqrt();
    // Coincident centres: separate straight up so the stack stays stable
    let normal = if dist > 1e-4 { delta / dist } else { Vec2::NEG_Y };
    Some(Contact {
        normal,
        penetration: ra + rb - dist,
        point: pa + normal * ra,
    })
}

/// All wall contacts for a circle (at most two at once, in a corner)
pub fn circle_wall_contacts(pos: Vec2, radius: f32, bounds: Bounds) -> Vec<Contact> {
    let mut contacts = Vec::new();

    let floor_pen = pos.y + radius - bounds.height;
    if floor_pen > 0.0 {
        contacts.push(Contact {
            normal: Vec2::NEG_Y,
            penetration: floor_pen,
            point: Vec2::new(pos.x, bounds.height),
        });
    }

    let left_pen = radius - pos.x;
    if left_pen > 0.0 {
        contacts.push(Contact {
            normal: Vec2::X,
            penetration: left_pen,
            point: Vec2::new(0.0, pos.y),
        });
    }

    let right_pen = pos.x + radius - bounds.width;
    if right_pen > 0.0 {
        contacts.push(Contact {
            normal: Vec2::NEG_X,
            penetration: right_pen,
            point: Vec2::new(bounds.width, pos.y),
        });
    }

    contacts
}

/// Resolve a contact between two bodies (normal points from `a` to `b`)
pub fn resolve_pair(a: &mut Body, b: &mut Body, contact: &Contact, material: &Material) {
    let ia = a.inv_mass();
    let ib = b.inv_mass();
    let inv_sum = ia + ib;
    if inv_sum <= 0.0 {
        return;
    }
    let n = contact.normal;

    // Positional correction
    let correction = (contact.penetration - PENETRATION_SLOP).max(0.0) * CORRECTION_PERCENT / inv_sum;
    a.pos -= n * correction * ia;
    b.pos += n * correction * ib;

    // Normal impulse
    let rv = b.vel - a.vel;
    let vn = rv.dot(n);
    if vn >= 0.0 {
        return; // Separating
    }
    let e = if -vn > material.rest_speed {
        material.restitution
    } else {
        0.0
    };
    let jn = -(1.0 + e) * vn / inv_sum;
    a.vel -= n * jn * ia;
    b.vel += n * jn * ib;

    // Friction impulse, clamped by the Coulomb cone
    let rv = b.vel - a.vel;
    let tangent = rv - n * rv.dot(n);
    let t_len = tangent.length();
    if t_len > 1e-4 {
        let t = tangent / t_len;
        let jt = (-rv.dot(t) / inv_sum).clamp(-jn * material.friction, jn * material.friction);
        a.vel -= t * jt * ia;
        b.vel += t * jt * ib;
    }
}

/// Resolve a contact between a body and an immovable wall
pub fn resolve_wall(body: &mut Body, contact: &Contact, material: &Material) {
    if body.is_static {
        return;
    }
    let n = contact.normal;

    body.pos += n * (contact.penetration - PENETRATION_SLOP).max(0.0) * CORRECTION_PERCENT;

    let vn = body.vel.dot(n);
    if vn >= 0.0 {
        return;
    }
    let e = if -vn > material.rest_speed {
        material.restitution
    } else {
        0.0
    };
    let dvn = -(1.0 + e) * vn;
    body.vel += n * dvn;

    // Friction slows the sliding component, never reverses it
    let tangent = body.vel - n * body.vel.dot(n);
    let t_len = tangent.length();
    if t_len > 1e-4 {
        let drop = (dvn * material.friction).min(t_len);
        body.vel -= tangent / t_len * drop;
    }
}
