//! Three-vector alias and small geometric helpers.

use nalgebra::Vector3;

/// Double-precision three-vector used for positions, directions and fields.
pub type Vector3d = Vector3<f64>;

/// Unit vector along `v`, or `None` if `v` has zero or non-finite length.
pub fn unit_vector(v: &Vector3d) -> Option<Vector3d> {
    let norm = v.norm();
    if norm > 0.0 && norm.is_finite() {
        Some(v / norm)
    } else {
        None
    }
}

/// Whether every component of `v` is finite.
pub fn is_finite(v: &Vector3d) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Component-wise floor.
pub fn floor(v: &Vector3d) -> Vector3d {
    v.map(f64::floor)
}

/// Any unit vector perpendicular to `v`. `v` must be non-zero.
pub fn perpendicular(v: &Vector3d) -> Vector3d {
    // Cross with the axis least aligned to v to avoid a degenerate product.
    let axis = if v.x.abs() <= v.y.abs() && v.x.abs() <= v.z.abs() {
        Vector3d::x()
    } else if v.y.abs() <= v.z.abs() {
        Vector3d::y()
    } else {
        Vector3d::z()
    };
    v.cross(&axis).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_vector_rejects_zero() {
        assert!(unit_vector(&Vector3d::zeros()).is_none());
        let u = unit_vector(&Vector3d::new(3.0, 0.0, 4.0)).unwrap();
        assert!((u.norm() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn perpendicular_is_orthogonal() {
        for v in [
            Vector3d::new(1.0, 0.0, 0.0),
            Vector3d::new(0.0, 0.0, -2.0),
            Vector3d::new(1.0, 2.0, 3.0),
        ] {
            let p = perpendicular(&v);
            assert!(p.dot(&v).abs() < 1e-12);
            assert!((p.norm() - 1.0).abs() < 1e-12);
        }
    }
}
