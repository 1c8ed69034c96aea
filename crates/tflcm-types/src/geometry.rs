//! Rigid-body primitives: [`Vec3`], [`Quaternion`] and [`Transform3D`].
//!
//! All math is done in `f64`.  Quaternions use the (w, x, y, z) convention
//! and are expected to be unit length; every operation that produces a
//! rotation re-normalises it when its squared norm drifts from 1 by more
//! than [`NORM_TOLERANCE`], and a degenerate (near-zero) quaternion is read
//! as the identity rotation.

use serde::{Deserialize, Serialize};

/// Allowed deviation of `|q|²` from 1 before a quaternion is re-normalised.
pub const NORM_TOLERANCE: f64 = 1e-6;

/// Squared norm below which a quaternion is treated as the identity.
pub const DEGENERATE_NORM_SQUARED: f64 = 1e-6;

// ────────────────────────────────────────────────────────────────────────────
// Vec3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D translation vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn negate(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }

    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// Create a quaternion.  No normalisation happens here; operations that
    /// consume it normalise on demand.
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation (no rotation).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `angle` radians about `axis`.  A zero axis yields the
    /// identity.
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let n = axis.norm();
        if n < f64::EPSILON {
            return Self::identity();
        }
        let (s, c) = (angle * 0.5).sin_cos();
        Self::new(c, axis.x / n * s, axis.y / n * s, axis.z / n * s)
    }

    pub fn norm_squared(self) -> f64 {
        self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Re-normalise when `|q|²` is off by more than [`NORM_TOLERANCE`].
    /// Degenerate quaternions collapse to the identity.
    pub fn normalized(self) -> Self {
        let n2 = self.norm_squared();
        if !n2.is_finite() || n2 < DEGENERATE_NORM_SQUARED {
            return Self::identity();
        }
        if (n2 - 1.0).abs() <= NORM_TOLERANCE {
            return self;
        }
        let inv = 1.0 / n2.sqrt();
        Self::new(self.w * inv, self.x * inv, self.y * inv, self.z * inv)
    }

    /// Hamilton product: compose two rotations.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let q = self.normalized();
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = q.mul(p).mul(q.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transform3D
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body 3-D transform: rotation followed by translation.
///
/// Represents the pose of a child frame relative to its parent: to convert a
/// point expressed in the child frame into the parent frame, rotate it by
/// `rotation` then add `translation`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl Transform3D {
    pub fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// The identity transform (no translation, no rotation).
    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// Compose two transforms.
    ///
    /// If `self` = T_A_B and `other` = T_B_C, the result is T_A_C.
    pub fn compose(self, other: Self) -> Self {
        let q1 = self.rotation.normalized();
        let q2 = other.rotation.normalized();
        let translation = self.translation.add(q1.rotate(other.translation));
        let rotation = q1.mul(q2).normalized();
        Self::new(translation, rotation)
    }

    /// Rigid-body inverse: `R⁻¹ = Rᵗ`, `t⁻¹ = -Rᵗ·t`.
    pub fn inverse(self) -> Self {
        let inv = self.rotation.normalized().conjugate();
        Self::new(inv.rotate(self.translation.negate()), inv)
    }

    /// Map a point expressed in the child frame into the parent frame.
    pub fn apply(self, point: Vec3) -> Vec3 {
        self.translation.add(self.rotation.rotate(point))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2};

    // ── Quaternion ──────────────────────────────────────────────────────────

    #[test]
    fn quaternion_identity_rotate_is_noop() {
        let r = Quaternion::identity().rotate(Vec3::new(1.0, 2.0, 3.0));
        assert!((r.x - 1.0).abs() < 1e-12);
        assert!((r.y - 2.0).abs() < 1e-12);
        assert!((r.z - 3.0).abs() < 1e-12);
    }

    #[test]
    fn quaternion_90deg_yaw_rotates_x_to_y() {
        let q = Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);
        let r = q.rotate(Vec3::new(1.0, 0.0, 0.0));
        assert!(r.x.abs() < 1e-12, "x should be ~0, got {}", r.x);
        assert!((r.y - 1.0).abs() < 1e-12, "y should be ~1, got {}", r.y);
        assert!(r.z.abs() < 1e-12);
    }

    #[test]
    fn quaternion_conjugate_is_inverse() {
        let q = Quaternion::from_axis_angle(Vec3::new(1.0, 2.0, -1.0), 0.7);
        let prod = q.mul(q.conjugate());
        assert!((prod.w - 1.0).abs() < 1e-12);
        assert!(prod.x.abs() < 1e-12);
        assert!(prod.y.abs() < 1e-12);
        assert!(prod.z.abs() < 1e-12);
    }

    #[test]
    fn normalized_rescales_drifted_quaternion() {
        let q = Quaternion::new(2.0, 0.0, 0.0, 0.0).normalized();
        assert_eq!(q, Quaternion::identity());
        let q = Quaternion::new(1.0, 1.0, 0.0, 0.0).normalized();
        assert!((q.norm_squared() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_quaternion_becomes_identity() {
        assert_eq!(Quaternion::new(0.0, 0.0, 0.0, 0.0).normalized(), Quaternion::identity());
        assert_eq!(Quaternion::new(1e-5, 0.0, 0.0, 0.0).normalized(), Quaternion::identity());
    }

    #[test]
    fn axis_angle_matches_hand_built_yaw() {
        let q = Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 2.0), FRAC_PI_2);
        assert!((q.w - FRAC_1_SQRT_2).abs() < 1e-12);
        assert!((q.z - FRAC_1_SQRT_2).abs() < 1e-12);
    }

    // ── Transform3D ─────────────────────────────────────────────────────────

    #[test]
    fn transform_identity_compose_is_noop() {
        let t = Transform3D::new(Vec3::new(1.0, 2.0, 3.0), Quaternion::identity());
        let composed = Transform3D::identity().compose(t);
        assert_eq!(composed.translation, t.translation);
    }

    #[test]
    fn transform_compose_translations_add() {
        let t1 = Transform3D::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity());
        let t2 = Transform3D::new(Vec3::new(2.0, 0.0, 0.0), Quaternion::identity());
        assert!((t1.compose(t2).translation.x - 3.0).abs() < 1e-12);
    }

    #[test]
    fn compose_respects_parent_rotation() {
        // Child is 1 m along the local +X of a parent yawed by 90°.
        let yaw = Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);
        let t1 = Transform3D::new(Vec3::zero(), yaw);
        let t2 = Transform3D::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity());
        let t = t1.compose(t2);
        assert!(t.translation.x.abs() < 1e-12, "x={}", t.translation.x);
        assert!((t.translation.y - 1.0).abs() < 1e-12, "y={}", t.translation.y);
    }

    #[test]
    fn inverse_undoes_apply() {
        let t = Transform3D::new(
            Vec3::new(0.3, -1.2, 4.0),
            Quaternion::from_axis_angle(Vec3::new(0.2, 1.0, 0.5), 1.1),
        );
        let p = Vec3::new(-2.0, 0.5, 7.0);
        let back = t.inverse().apply(t.apply(p));
        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);
        assert!((back.z - p.z).abs() < 1e-9);
    }

    #[test]
    fn inverse_of_degenerate_rotation_is_pure_translation() {
        let t = Transform3D::new(Vec3::new(1.0, 2.0, 3.0), Quaternion::new(0.0, 0.0, 0.0, 0.0));
        let inv = t.inverse();
        assert_eq!(inv.rotation, Quaternion::identity());
        assert_eq!(inv.translation, Vec3::new(-1.0, -2.0, -3.0));
    }
}
