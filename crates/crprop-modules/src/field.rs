//! The [`Field`] capability consumed by the propagation modules.

use crprop_core::Vector3d;

/// A vector field sampled at positions along a trajectory.
///
/// Implementations must be pure functions of their arguments: the same
/// field is evaluated concurrently by every worker thread.
pub trait Field: Send + Sync {
    /// Field vector at `position`.
    fn value(&self, position: &Vector3d) -> Vector3d;

    /// Field vector at `position` and `time` (seconds since emission).
    /// Static fields ignore `time`.
    fn value_at(&self, position: &Vector3d, time: f64) -> Vector3d {
        let _ = time;
        self.value(position)
    }
}

/// A field that vanishes everywhere.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ZeroField;

impl Field for ZeroField {
    fn value(&self, _position: &Vector3d) -> Vector3d {
        Vector3d::zeros()
    }
}

/// A homogeneous field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformField {
    value: Vector3d,
}

impl UniformField {
    /// Field equal to `value` everywhere.
    pub fn new(value: Vector3d) -> Self {
        Self { value }
    }
}

impl Field for UniformField {
    fn value(&self, _position: &Vector3d) -> Vector3d {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_field_ignores_position_and_time() {
        let f = UniformField::new(Vector3d::new(0.0, 0.0, 2.0));
        assert_eq!(f.value(&Vector3d::new(1.0, 2.0, 3.0)), Vector3d::new(0.0, 0.0, 2.0));
        assert_eq!(f.value_at(&Vector3d::zeros(), 1e9), Vector3d::new(0.0, 0.0, 2.0));
        assert_eq!(ZeroField.value(&Vector3d::x()), Vector3d::zeros());
    }
}
