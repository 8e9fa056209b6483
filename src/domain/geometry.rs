// Shared collision geometry used by both the authoritative world tick and
// client-side prediction. Keeping one kernel guarantees identical semantics
// on both ends of the wire.

use glam::Vec2;

/// Angle of a vector in radians, `atan2(y, x)`.
pub fn heading(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Rotates a vector by `angle` radians about the origin.
pub fn rotated(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

/// Rescales a vector to the given magnitude. Zero vectors stay zero.
pub fn with_magnitude(v: Vec2, magnitude: f32) -> Vec2 {
    let len_sq = v.length_squared();
    if len_sq > 0.0 {
        v * (magnitude / len_sq.sqrt())
    } else {
        v
    }
}

/// A circle with its squared radius cached for hit tests.
///
/// `r` and `r_sq` are only ever updated together through [`Circle::set_radius`].
#[derive(Debug, Clone, Copy)]
pub struct Circle {
    pub pos: Vec2,
    pub r: f32,
    pub r_sq: f32,
}

impl Circle {
    pub fn new(pos: Vec2, r: f32) -> Self {
        Self { pos, r, r_sq: r * r }
    }

    pub fn set_radius(&mut self, r: f32) {
        self.r = r;
        self.r_sq = r * r;
    }

    /// Circle-circle overlap: compares squared center distance against
    /// the squared sum of radii.
    pub fn overlaps_circle(&self, other: &Circle) -> bool {
        self.overlaps_circle_at(self.pos, other)
    }

    /// Same test with this circle's center overridden, used by the steering
    /// solver to probe a tentative position without mutating the shape.
    pub fn overlaps_circle_at(&self, pos: Vec2, other: &Circle) -> bool {
        let r_sum = self.r + other.r;
        pos.distance_squared(other.pos) < r_sum * r_sum
    }
}

/// An axis-free square: center, width and rotation angle.
///
/// `inscribed_r_sq` caches (0.6·w)², the deliberately inaccurate inscribed
/// circle other squares are collapsed to in square-vs-square tests.
#[derive(Debug, Clone, Copy)]
pub struct Square {
    pub pos: Vec2,
    pub w: f32,
    pub half_w: f32,
    pub inscribed_r_sq: f32,
    pub rot: f32,
}

impl Square {
    pub fn new(pos: Vec2, w: f32, rot: f32) -> Self {
        Self {
            pos,
            w,
            half_w: w * 0.5,
            inscribed_r_sq: (w * 0.6) * (w * 0.6),
            rot,
        }
    }

    pub fn set_width(&mut self, w: f32) {
        self.w = w;
        self.half_w = w * 0.5;
        self.inscribed_r_sq = (w * 0.6) * (w * 0.6);
    }

    /// The four world-space corners, counter-clockwise from (+,+).
    pub fn corners(&self) -> [Vec2; 4] {
        let h = self.half_w;
        [
            self.pos + rotated(Vec2::new(h, h), self.rot),
            self.pos + rotated(Vec2::new(-h, h), self.rot),
            self.pos + rotated(Vec2::new(-h, -h), self.rot),
            self.pos + rotated(Vec2::new(h, -h), self.rot),
        ]
    }

    /// Square-vs-circle overlap.
    ///
    /// Transforms the circle center into this square's local un-rotated
    /// frame, clamps it to the square's extent to find the closest boundary
    /// point, then compares squared distance against the circle's r².
    pub fn overlaps_circle(&self, center: Vec2, r_sq: f32) -> bool {
        let local = rotated(center - self.pos, -self.rot);
        let closest = local.clamp(
            Vec2::splat(-self.half_w),
            Vec2::splat(self.half_w),
        );
        local.distance_squared(closest) < r_sq
    }

    /// Approximate square-vs-square overlap: the other square is treated as
    /// its cached inscribed circle. Not exact polygon intersection.
    pub fn overlaps_square(&self, other: &Square) -> bool {
        self.overlaps_circle(other.pos, other.inscribed_r_sq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_3, FRAC_PI_4};

    #[test]
    fn heading_matches_atan2() {
        assert!((heading(Vec2::new(0.0, 1.0)) - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!((heading(Vec2::new(-1.0, 0.0)) - std::f32::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn with_magnitude_rescales_and_keeps_zero() {
        let v = with_magnitude(Vec2::new(3.0, 4.0), 10.0);
        assert!((v.length() - 10.0).abs() < 1e-4);
        assert_eq!(with_magnitude(Vec2::ZERO, 10.0), Vec2::ZERO);
    }

    #[test]
    fn circle_overlap_boundary() {
        let a = Circle::new(Vec2::ZERO, 5.0);
        let b = Circle::new(Vec2::new(9.9, 0.0), 5.0);
        let c = Circle::new(Vec2::new(10.0, 0.0), 5.0);
        assert!(a.overlaps_circle(&b));
        // Exactly touching is not an overlap (strict inequality).
        assert!(!a.overlaps_circle(&c));
    }

    #[test]
    fn square_circle_hit_and_miss() {
        let sq = Square::new(Vec2::ZERO, 20.0, FRAC_PI_4);
        // Along the diagonal the rotated square reaches sqrt(2)*10 ≈ 14.14.
        let near = Circle::new(Vec2::new(14.0, 0.0), 1.0);
        let far = Circle::new(Vec2::new(16.0, 0.0), 1.0);
        assert!(sq.overlaps_circle(near.pos, near.r_sq));
        assert!(!sq.overlaps_circle(far.pos, far.r_sq));
    }

    #[test]
    fn square_circle_invariant_under_shared_rotation() {
        // Rotating both shapes by the same angle about the square center
        // must not change the outcome.
        let center = Vec2::new(100.0, 50.0);
        let offsets = [
            Vec2::new(13.0, 2.0),
            Vec2::new(9.0, 9.0),
            Vec2::new(0.0, 15.5),
            Vec2::new(-11.0, 4.0),
        ];
        for &offset in &offsets {
            let base = Square::new(center, 20.0, 0.3);
            let circle = Circle::new(center + offset, 4.0);
            let expected = base.overlaps_circle(circle.pos, circle.r_sq);
            for ang in [FRAC_PI_3, 1.1, 2.9, -0.7] {
                let turned = Square::new(center, 20.0, 0.3 + ang);
                let moved = Circle::new(center + rotated(offset, ang), 4.0);
                assert_eq!(
                    turned.overlaps_circle(moved.pos, moved.r_sq),
                    expected,
                    "offset {offset:?} angle {ang}"
                );
            }
        }
    }

    #[test]
    fn square_square_uses_inscribed_circle() {
        let a = Square::new(Vec2::ZERO, 20.0, 0.0);
        // Inscribed radius of b is 0.6*20 = 12; square a extends to 10.
        let b = Square::new(Vec2::new(21.9, 0.0), 20.0, 0.0);
        let c = Square::new(Vec2::new(22.1, 0.0), 20.0, 0.0);
        assert!(a.overlaps_square(&b));
        assert!(!a.overlaps_square(&c));
    }

    #[test]
    fn corners_are_centered_on_pos() {
        let sq = Square::new(Vec2::new(5.0, -3.0), 8.0, 1.3);
        let sum: Vec2 = sq.corners().iter().copied().sum();
        assert!((sum / 4.0 - sq.pos).length() < 1e-4);
    }
}
