//! Component-wise scale helpers and affine decomposition on top of glam.

use glam::{Affine3A, Quat, Vec3};

use crate::error::DegenerateTransform;

const AXES: [char; 3] = ['x', 'y', 'z'];

/// Component-wise helpers for non-uniform scale vectors.
pub trait ScaleExt {
    /// Reciprocal of every component, failing on the first exact zero.
    fn checked_recip(self) -> Result<Vec3, DegenerateTransform>;

    /// Reciprocal with 1.0 substituted for exactly-zero components.
    fn safe_recip(self) -> Vec3;

    /// Component-wise division yielding 1.0 wherever the divisor is zero.
    fn safe_div(self, divisor: Vec3) -> Vec3;
}

impl ScaleExt for Vec3 {
    fn checked_recip(self) -> Result<Vec3, DegenerateTransform> {
        let components = self.to_array();
        if let Some(i) = components.iter().position(|&c| c == 0.0) {
            return Err(DegenerateTransform { axis: AXES[i] });
        }
        Ok(self.recip())
    }

    fn safe_recip(self) -> Vec3 {
        match self.checked_recip() {
            Ok(recip) => recip,
            Err(err) => {
                log::trace!("{}, substituting 1.0", err);
                Vec3::from_array(self.to_array().map(|c| if c == 0.0 { 1.0 } else { 1.0 / c }))
            }
        }
    }

    fn safe_div(self, divisor: Vec3) -> Vec3 {
        let (a, b) = (self.to_array(), divisor.to_array());
        Vec3::new(
            if b[0] == 0.0 { 1.0 } else { a[0] / b[0] },
            if b[1] == 0.0 { 1.0 } else { a[1] / b[1] },
            if b[2] == 0.0 { 1.0 } else { a[2] / b[2] },
        )
    }
}

/// Rotation part of an affine transform with scale divided out.
pub fn affine_rotation(affine: &Affine3A) -> Quat {
    let (_, rotation, _) = affine.to_scale_rotation_translation();
    rotation.normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_recip_substitutes_zero_axis() {
        let recip = Vec3::new(2.0, 0.0, 4.0).safe_recip();
        assert_eq!(recip, Vec3::new(0.5, 1.0, 0.25));
    }

    #[test]
    fn test_checked_recip_reports_axis() {
        let err = Vec3::new(1.0, 1.0, 0.0).checked_recip().unwrap_err();
        assert_eq!(err.axis, 'z');
        assert!(Vec3::ONE.checked_recip().is_ok());
    }

    #[test]
    fn test_safe_div() {
        let out = Vec3::new(3.0, 2.0, 5.0).safe_div(Vec3::new(1.5, 0.0, 2.0));
        assert_eq!(out, Vec3::new(2.0, 1.0, 2.5));
    }

    #[test]
    fn test_affine_rotation_ignores_scale() {
        let rot = Quat::from_rotation_y(0.7);
        let affine = Affine3A::from_scale_rotation_translation(Vec3::new(2.0, 0.5, 3.0), rot, Vec3::X);
        let extracted = affine_rotation(&affine);
        assert!(extracted.angle_between(rot) < 1e-4);
    }
}
