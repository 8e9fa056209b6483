// Client-side steering: converts raw input into a velocity and deflects it
// tangentially around overlapping obstacles.
//
// Runs against the last received snapshot only; the server never sees the
// deflection, just the resulting reported pose.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec2;

use crate::domain::entities::clamp_to_arena;
use crate::domain::geometry::{self, Circle};
use crate::domain::tuning::{ArenaTuning, PlayerTuning};

/// Computes this frame's velocity for the local player.
///
/// `desired` is the raw input displacement (e.g. cursor offset from screen
/// center). Obstacles are the other players' and spawners' circles; movers
/// are deliberately not steered around.
///
/// The first overlapping obstacle deflects the velocity along the tangent
/// line; any further overlapping obstacle zeroes it outright. Players can
/// get stuck between two obstacles rather than squeeze through; an accepted
/// simplification.
pub fn steer(
    pos: Vec2,
    radius: f32,
    desired: Vec2,
    obstacles: &[Circle],
    arena: &ArenaTuning,
    tuning: &PlayerTuning,
) -> Vec2 {
    let mut vel = shape_input(desired, tuning);
    let mut tentative = clamp_to_arena(pos + vel, radius, arena);
    let own = Circle::new(pos, radius);

    let mut deflected_once = false;
    for obstacle in obstacles {
        if !own.overlaps_circle_at(tentative, obstacle) {
            continue;
        }
        if deflected_once {
            // Second overlapping obstacle: hard stop.
            vel = Vec2::ZERO;
            continue;
        }
        deflected_once = true;

        // Tangent to the obstacle circle, perpendicular to center-to-center,
        // through our own current center.
        let tangent = geometry::rotated(obstacle.pos - pos, FRAC_PI_2);

        // Reference angle between the desired heading and the tangent,
        // normalized into a half turn; negative means the motion points into
        // the obstacle.
        let mut first_ang = geometry::heading(vel) - geometry::heading(tangent);
        if first_ang < 0.0 {
            first_ang += TAU;
        }
        let ref_ang = first_ang.min(PI - first_ang);
        if ref_ang >= 0.0 {
            continue;
        }

        // Slide along the tangent: aim at the point where the line from the
        // obstacle's center through the tentative position crosses it.
        let toward = tentative - obstacle.pos;
        vel = match line_intersection(pos, tangent, obstacle.pos, toward) {
            Some(point) if inside_arena(point, radius, arena) => point - pos,
            // Degenerate (parallel lines) or an intersection outside the
            // arena both stop the player instead of producing NaN motion.
            _ => Vec2::ZERO,
        };
        tentative = pos + vel;
    }

    vel
}

/// Maps the raw input displacement onto a velocity: inside the slow zone the
/// magnitude scales down proportionally so fine input near the origin moves
/// slowly, otherwise it caps at the configured speed.
fn shape_input(desired: Vec2, tuning: &PlayerTuning) -> Vec2 {
    if desired.length_squared() < tuning.slow_zone_sq {
        geometry::with_magnitude(
            desired,
            desired.length() / tuning.slow_zone_scale * tuning.speed,
        )
    } else {
        geometry::with_magnitude(desired, tuning.speed)
    }
}

/// Intersection of two lines in point-direction form.
///
/// The parametric form sidesteps slope arithmetic entirely, so vertical
/// lines need no special case; the single degenerate case is parallel
/// directions, which returns `None`.
fn line_intersection(p1: Vec2, d1: Vec2, p2: Vec2, d2: Vec2) -> Option<Vec2> {
    let denom = d1.perp_dot(d2);
    if denom.abs() < f32::EPSILON {
        return None;
    }
    let t = (p2 - p1).perp_dot(d2) / denom;
    Some(p1 + d1 * t)
}

fn inside_arena(point: Vec2, radius: f32, arena: &ArenaTuning) -> bool {
    point.x >= radius
        && point.x <= arena.width - radius
        && point.y >= radius
        && point.y <= arena.height - radius
}
