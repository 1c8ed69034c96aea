//! Rigid transform algebra on stamped transforms.
//!
//! [`invert`] and [`compose`] carry frame labels and stamps along with the
//! geometry from [`Transform3D`].  The buffer uses them to bridge frames that
//! are not stored in the requested direction and to fold a multi-hop path
//! into one answer.

use tflcm_types::{TfError, TransformStamped};

/// Invert a stamped transform: swap the frame labels, keep the stamp, and
/// take the rigid-body inverse of the geometry.
pub fn invert(t: &TransformStamped) -> TransformStamped {
    TransformStamped {
        parent_frame: t.child_frame.clone(),
        child_frame: t.parent_frame.clone(),
        stamp: t.stamp,
        transform: t.transform.inverse(),
    }
}

/// Compose `t1` (A → B) with `t2` (B → C) into A → C.
///
/// The result carries the later of the two stamps.
///
/// # Errors
///
/// [`TfError::FrameMismatch`] when `t1.child_frame != t2.parent_frame`.
pub fn compose(t1: &TransformStamped, t2: &TransformStamped) -> Result<TransformStamped, TfError> {
    if t1.child_frame != t2.parent_frame {
        return Err(TfError::FrameMismatch {
            left_child: t1.child_frame.clone(),
            right_parent: t2.parent_frame.clone(),
        });
    }
    Ok(TransformStamped {
        parent_frame: t1.parent_frame.clone(),
        child_frame: t2.child_frame.clone(),
        stamp: t1.stamp.max(t2.stamp),
        transform: t1.transform.compose(t2.transform),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tflcm_types::{Quaternion, Stamp, Transform3D, Vec3};

    const EPS: f64 = 1e-6;

    /// Component-wise comparison; `q` and `-q` are the same rotation.
    fn assert_close(a: &Transform3D, b: &Transform3D) {
        let ta = a.translation;
        let tb = b.translation;
        assert!((ta.x - tb.x).abs() < EPS, "tx {} vs {}", ta.x, tb.x);
        assert!((ta.y - tb.y).abs() < EPS, "ty {} vs {}", ta.y, tb.y);
        assert!((ta.z - tb.z).abs() < EPS, "tz {} vs {}", ta.z, tb.z);
        let (qa, qb) = (a.rotation, b.rotation);
        let sign = if qa.w * qb.w + qa.x * qb.x + qa.y * qb.y + qa.z * qb.z < 0.0 { -1.0 } else { 1.0 };
        assert!((qa.w - sign * qb.w).abs() < EPS, "qw {} vs {}", qa.w, qb.w);
        assert!((qa.x - sign * qb.x).abs() < EPS, "qx {} vs {}", qa.x, qb.x);
        assert!((qa.y - sign * qb.y).abs() < EPS, "qy {} vs {}", qa.y, qb.y);
        assert!((qa.z - sign * qb.z).abs() < EPS, "qz {} vs {}", qa.z, qb.z);
    }

    fn stamped(parent: &str, child: &str, sec: i64, transform: Transform3D) -> TransformStamped {
        TransformStamped::new(parent, child, Stamp::new(sec, 0), transform)
    }

    fn arb_transform() -> impl Strategy<Value = Transform3D> {
        (
            (-50.0..50.0f64, -50.0..50.0f64, -50.0..50.0f64),
            (-1.0..1.0f64, -1.0..1.0f64, -1.0..1.0f64),
            -3.1..3.1f64,
        )
            .prop_map(|((x, y, z), (ax, ay, az), angle)| {
                Transform3D::new(
                    Vec3::new(x, y, z),
                    Quaternion::from_axis_angle(Vec3::new(ax, ay, az), angle),
                )
            })
    }

    #[test]
    fn invert_swaps_frames_and_keeps_stamp() {
        let t = stamped("world", "base", 7, Transform3D::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity()));
        let inv = invert(&t);
        assert_eq!(inv.parent_frame, "base");
        assert_eq!(inv.child_frame, "world");
        assert_eq!(inv.stamp, t.stamp);
        assert!((inv.transform.translation.x + 1.0).abs() < EPS);
    }

    #[test]
    fn compose_labels_and_later_stamp() {
        let a = stamped("world", "base", 5, Transform3D::identity());
        let b = stamped("base", "camera", 9, Transform3D::identity());
        let c = compose(&a, &b).unwrap();
        assert_eq!(c.parent_frame, "world");
        assert_eq!(c.child_frame, "camera");
        assert_eq!(c.stamp, Stamp::new(9, 0));

        let c = compose(&stamped("world", "base", 9, Transform3D::identity()), &stamped("base", "camera", 5, Transform3D::identity())).unwrap();
        assert_eq!(c.stamp, Stamp::new(9, 0));
    }

    #[test]
    fn later_stamp_compares_nanoseconds_on_equal_seconds() {
        let mut a = stamped("a", "b", 3, Transform3D::identity());
        let mut b = stamped("b", "c", 3, Transform3D::identity());
        a.stamp = Stamp::new(3, 10);
        b.stamp = Stamp::new(3, 20);
        assert_eq!(compose(&a, &b).unwrap().stamp, Stamp::new(3, 20));
    }

    #[test]
    fn compose_rejects_mismatched_frames() {
        let a = stamped("world", "base", 1, Transform3D::identity());
        let b = stamped("camera", "lens", 1, Transform3D::identity());
        let err = compose(&a, &b).unwrap_err();
        assert_eq!(
            err,
            TfError::FrameMismatch {
                left_child: "base".to_string(),
                right_parent: "camera".to_string(),
            }
        );
    }

    #[test]
    fn compose_renormalises_drifted_rotation() {
        let drift = Quaternion::new(1.01, 0.0, 0.0, 0.0);
        let a = stamped("a", "b", 1, Transform3D::new(Vec3::zero(), drift));
        let b = stamped("b", "c", 1, Transform3D::new(Vec3::zero(), drift));
        let c = compose(&a, &b).unwrap();
        assert!((c.transform.rotation.norm_squared() - 1.0).abs() < EPS);
    }

    proptest! {
        #[test]
        fn inverse_is_an_involution(t in arb_transform()) {
            let s = stamped("a", "b", 1, t);
            let back = invert(&invert(&s));
            prop_assert_eq!(&back.parent_frame, "a");
            prop_assert_eq!(&back.child_frame, "b");
            assert_close(&back.transform, &t);
        }

        #[test]
        fn compose_with_inverse_is_identity(t in arb_transform()) {
            let s = stamped("a", "b", 1, t);
            let inv = invert(&s);
            let left = compose(&s, &inv).unwrap();
            let right = compose(&inv, &s).unwrap();
            prop_assert_eq!(&left.parent_frame, "a");
            prop_assert_eq!(&left.child_frame, "a");
            assert_close(&left.transform, &Transform3D::identity());
            assert_close(&right.transform, &Transform3D::identity());
        }

        #[test]
        fn compose_is_associative(t1 in arb_transform(), t2 in arb_transform(), t3 in arb_transform()) {
            let a = stamped("a", "b", 1, t1);
            let b = stamped("b", "c", 2, t2);
            let c = stamped("c", "d", 3, t3);
            let left = compose(&compose(&a, &b).unwrap(), &c).unwrap();
            let right = compose(&a, &compose(&b, &c).unwrap()).unwrap();
            prop_assert_eq!(left.stamp, right.stamp);
            assert_close(&left.transform, &right.transform);
        }
    }
}
