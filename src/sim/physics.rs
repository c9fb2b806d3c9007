//! Puck physics: friction, integration, boundary bounce, pair impulses
//!
//! Velocities are in pixels per tick, so integration is a plain add. The
//! host owns the frame clock; one call per frame keeps motion consistent
//! with the original surface's behavior.

use glam::Vec2;

use super::state::{Puck, PuckId, Surface};

/// Distance below which two centers are treated as coincident. Such a pair
/// has no collision normal and is skipped for the tick.
pub const DEGENERATE_DISTANCE: f32 = 1e-6;

/// Apply friction and integrate one puck.
///
/// Friction is a straight multiplier: 0 zeroes velocity instantly, 1
/// preserves it indefinitely. Values just under 1 give the surface its glide.
pub fn integrate(puck: &mut Puck) {
    puck.vel *= puck.friction;
    puck.pos += puck.vel;
}

/// Clamp a puck inside the surface, reflecting velocity per axis.
///
/// Each axis is resolved independently: the center is clamped so the puck's
/// edge touches the boundary exactly, and that velocity component is negated
/// and dampened by the puck's bounce coefficient.
pub fn resolve_boundary(puck: &mut Puck, surface: &Surface) {
    let r = puck.radius();

    if puck.pos.x - r < 0.0 {
        puck.pos.x = r;
        puck.vel.x = -puck.vel.x * puck.bounce;
    } else if puck.pos.x + r > surface.width {
        puck.pos.x = surface.width - r;
        puck.vel.x = -puck.vel.x * puck.bounce;
    }

    if puck.pos.y - r < 0.0 {
        puck.pos.y = r;
        puck.vel.y = -puck.vel.y * puck.bounce;
    } else if puck.pos.y + r > surface.height {
        puck.pos.y = surface.height - r;
        puck.vel.y = -puck.vel.y * puck.bounce;
    }
}

/// Resolve one overlapping pair: equal-and-opposite impulse along the
/// collision normal plus half-overlap positional separation each.
///
/// Returns false when the pair was skipped (separating, zero-mass, or
/// coincident centers).
pub fn resolve_pair(a: &mut Puck, b: &mut Puck) -> bool {
    // Zero-mass pucks neither push nor are pushed
    if a.mass <= 0.0 || b.mass <= 0.0 {
        return false;
    }

    let delta = b.pos - a.pos;
    let dist = delta.length();
    let sum_radii = a.radius() + b.radius();
    if dist >= sum_radii {
        return false;
    }
    // Exactly coincident centers have no usable normal
    if dist < DEGENERATE_DISTANCE {
        return false;
    }

    let normal = delta / dist;

    // Already separating along the normal
    let rel_vel = (b.vel - a.vel).dot(normal);
    if rel_vel >= 0.0 {
        return false;
    }

    // Combined restitution is the lesser of the two bounce coefficients
    let restitution = a.bounce.min(b.bounce);
    let inv_mass_a = 1.0 / a.mass;
    let inv_mass_b = 1.0 / b.mass;

    let impulse = -(1.0 + restitution) * rel_vel / (inv_mass_a + inv_mass_b);
    a.vel -= normal * (impulse * inv_mass_a);
    b.vel += normal * (impulse * inv_mass_b);

    // Separate by half the overlap along the normal each
    let overlap = sum_radii - dist;
    a.pos -= normal * (overlap * 0.5);
    b.pos += normal * (overlap * 0.5);

    true
}

/// Resolve every unique pair once. Pucks whose position is owned elsewhere
/// this tick (path playback, an active connection drag) are excluded.
pub fn resolve_all_pairs(pucks: &mut [Puck], dragging: Option<PuckId>) {
    let len = pucks.len();
    for i in 0..len {
        for j in (i + 1)..len {
            let (head, tail) = pucks.split_at_mut(j);
            let a = &mut head[i];
            let b = &mut tail[0];
            if a.path.is_playing() || b.path.is_playing() {
                continue;
            }
            if dragging == Some(a.id) || dragging == Some(b.id) {
                continue;
            }
            resolve_pair(a, b);
        }
    }
}
