// Planar geometry helpers for the layout engine.
//
// `Vec2` is the only spatial type: wall centres, ball positions, and flight
// headings are all plain `f64` pairs in screen pixels, +x right, +y down
// (the player renders without a flip). Headings are kept unit-length by
// construction; `normalize_or` is the single place that handles the
// degenerate zero-length case by substituting a caller-chosen fallback.
//
// Also provides the parametric ray-vs-segment test used for both
// path-vs-wall and wall-vs-wall collision checks, the mirror reflection of
// a heading about a wall normal, and the wall-normal/rotation conversions.
// Rotations are stored in degrees with the wall segment running along the
// rotation angle, so a wall's normal sits 90 degrees counter-clockwise of it.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_1_SQRT_2;
use std::ops::{Add, Mul, Neg, Sub};

/// Below this length a direction vector is treated as degenerate.
pub const DEGENERATE_LEN: f64 = 1e-9;

/// Determinant threshold under which a ray and a segment count as parallel.
const PARALLEL_EPS: f64 = 1e-10;

/// Slack on the segment parameter `u` so grazing hits at wall tips count.
const SEGMENT_TIP_SLACK: f64 = 0.05;

/// A 2D vector or point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2::new(0.0, 0.0);

    /// Heading used whenever a direction cannot be derived: down-right.
    pub const DIAGONAL: Vec2 = Vec2::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2);

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector at `angle` radians.
    pub fn from_angle(angle: f64) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z-component of the 3D cross product.
    pub fn cross(self, other: Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or `fallback` if `self` is
    /// (nearly) zero-length.
    pub fn normalize_or(self, fallback: Vec2) -> Vec2 {
        let len = self.length();
        if len < DEGENERATE_LEN || !len.is_finite() {
            fallback
        } else {
            self * (1.0 / len)
        }
    }

    /// Rotate a heading by `delta` radians (re-derived from its angle so
    /// repeated perturbation never drifts off unit length).
    pub fn rotated(self, delta: f64) -> Vec2 {
        Vec2::from_angle(self.angle() + delta)
    }

    /// Both components rounded to the output precision.
    pub fn rounded(self) -> Vec2 {
        Vec2::new(round2(self.x), round2(self.y))
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Round to 2 decimal places, the precision of every emitted number.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Mirror `heading` about the line whose normal is `normal`:
/// `r = v - 2 (v . n) n`. No jitter is applied here.
pub fn reflect(heading: Vec2, normal: Vec2) -> Vec2 {
    let n = normal.normalize_or(Vec2::new(0.0, 1.0));
    heading - n * (2.0 * heading.dot(n))
}

/// Wall rotation (degrees) for a wall whose face normal is `normal`.
pub fn rotation_for_normal(normal: Vec2) -> f64 {
    normal.angle().to_degrees() - 90.0
}

/// Endpoints of a wall segment of `length` centred at `center`.
pub fn wall_segment(center: Vec2, rotation_deg: f64, length: f64) -> (Vec2, Vec2) {
    let half = Vec2::from_angle(rotation_deg.to_radians()) * (length / 2.0);
    (center - half, center + half)
}

/// Parametric ray/segment intersection.
///
/// The ray starts at `origin` along unit `dir` and is `ray_len` long; the
/// test accepts ray parameters in `(-margin, ray_len + margin)` and segment
/// parameters slightly past either tip. Parallel (or collinear) pairs are
/// reported as not intersecting.
pub fn ray_hits_segment(
    origin: Vec2,
    dir: Vec2,
    ray_len: f64,
    seg_a: Vec2,
    seg_b: Vec2,
    margin: f64,
) -> bool {
    let seg_d = seg_b - seg_a;
    let det = dir.cross(seg_d);
    if det.abs() < PARALLEL_EPS {
        return false;
    }
    let diff = seg_a - origin;
    let t = diff.cross(seg_d) / det;
    let u = diff.cross(dir) / det;
    t > -margin
        && t < ray_len + margin
        && u > -SEGMENT_TIP_SLACK
        && u < 1.0 + SEGMENT_TIP_SLACK
}

/// Whether two wall segments cross (with `margin` slack on the first).
pub fn segments_cross(a: (Vec2, Vec2), b: (Vec2, Vec2), margin: f64) -> bool {
    let d = a.1 - a.0;
    let len = d.length();
    if len < DEGENERATE_LEN {
        return false;
    }
    ray_hits_segment(a.0, d * (1.0 / len), len, b.0, b.1, margin)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn reflect_off_horizontal_wall_flips_y() {
        let r = reflect(Vec2::new(0.6, 0.8), Vec2::new(0.0, 1.0));
        assert!(close(r.x, 0.6) && close(r.y, -0.8));
    }

    #[test]
    fn reflect_preserves_length() {
        let v = Vec2::from_angle(1.234);
        let r = reflect(v, Vec2::from_angle(-0.4));
        assert!(close(r.length(), 1.0));
    }

    #[test]
    fn normalize_degenerate_uses_fallback() {
        assert_eq!(Vec2::ZERO.normalize_or(Vec2::DIAGONAL), Vec2::DIAGONAL);
        let n = Vec2::new(3.0, 4.0).normalize_or(Vec2::DIAGONAL);
        assert!(close(n.x, 0.6) && close(n.y, 0.8));
    }

    #[test]
    fn rotation_matches_normal() {
        // Normal pointing +y means the wall lies along the x axis.
        assert!(close(rotation_for_normal(Vec2::new(0.0, 1.0)), 0.0));
        assert!(close(rotation_for_normal(Vec2::new(1.0, 0.0)), -90.0));
        let (a, b) = wall_segment(Vec2::ZERO, 0.0, 30.0);
        assert!(close(a.x, -15.0) && close(b.x, 15.0) && close(a.y, 0.0));
    }

    #[test]
    fn ray_crossing_segment_is_detected() {
        let (a, b) = wall_segment(Vec2::new(50.0, 0.0), -90.0, 30.0);
        assert!(ray_hits_segment(Vec2::ZERO, Vec2::new(1.0, 0.0), 100.0, a, b, 2.0));
        // Too short to reach it.
        assert!(!ray_hits_segment(Vec2::ZERO, Vec2::new(1.0, 0.0), 40.0, a, b, 2.0));
        // Passing beside it.
        assert!(!ray_hits_segment(
            Vec2::new(0.0, 40.0),
            Vec2::new(1.0, 0.0),
            100.0,
            a,
            b,
            2.0
        ));
    }

    #[test]
    fn parallel_ray_never_hits() {
        let (a, b) = wall_segment(Vec2::new(50.0, 0.0), 0.0, 30.0);
        assert!(!ray_hits_segment(Vec2::ZERO, Vec2::new(1.0, 0.0), 100.0, a, b, 2.0));
    }

    #[test]
    fn crossing_walls() {
        let h = wall_segment(Vec2::ZERO, 0.0, 30.0);
        let v = wall_segment(Vec2::new(5.0, 0.0), 90.0, 30.0);
        assert!(segments_cross(h, v, 0.5));
        let far = wall_segment(Vec2::new(100.0, 0.0), 90.0, 30.0);
        assert!(!segments_cross(h, far, 0.5));
    }

    #[test]
    fn round2_behaves() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(-7.005001), -7.01);
        assert_eq!(Vec2::new(0.126, 9.994).rounded(), Vec2::new(0.13, 9.99));
    }
}
