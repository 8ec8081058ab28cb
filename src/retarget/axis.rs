use glam::Vec3;

use crate::bone::BoneRole;
use crate::skeleton::Skeleton;

/// Local axis a limb bone's length runs along
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LengthAxis {
    X,
    #[default]
    Y,
    Z,
}

impl LengthAxis {
    /// Dominant axis of a parent-local offset. Ties go to Y.
    pub fn from_offset(offset: Vec3) -> Self {
        let a = offset.abs();
        if a.x > a.y && a.x > a.z {
            LengthAxis::X
        } else if a.z > a.x && a.z > a.y {
            LengthAxis::Z
        } else {
            LengthAxis::Y
        }
    }

    /// `length` on this axis, `thickness` on the other two
    pub fn scale(self, length: f32, thickness: f32) -> Vec3 {
        match self {
            LengthAxis::X => Vec3::new(length, thickness, thickness),
            LengthAxis::Y => Vec3::new(thickness, length, thickness),
            LengthAxis::Z => Vec3::new(thickness, thickness, length),
        }
    }
}

/// Infer which local axis of `parent` points at `child`.
///
/// Reads rest world transforms only, so the result never picks up scaling
/// or posing applied later.
pub fn infer_length_axis(skeleton: &Skeleton, parent: BoneRole, child: BoneRole) -> LengthAxis {
    let (Some(p), Some(c)) = (skeleton.bone(parent), skeleton.bone(child)) else {
        return LengthAxis::Y;
    };
    let parent_world = skeleton.rest_world(p);
    let offset = Vec3::from(skeleton.rest_world(c).translation - parent_world.translation);
    let local = skeleton.rest_world_rotation(p).inverse() * offset;
    LengthAxis::from_offset(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::{NodeSpec, Transform};
    use glam::Quat;

    #[test]
    fn test_dominant_axis() {
        assert_eq!(LengthAxis::from_offset(Vec3::new(0.3, 0.1, 0.0)), LengthAxis::X);
        assert_eq!(LengthAxis::from_offset(Vec3::new(0.0, -0.4, 0.1)), LengthAxis::Y);
        assert_eq!(LengthAxis::from_offset(Vec3::new(0.1, 0.0, -0.2)), LengthAxis::Z);
    }

    #[test]
    fn test_ties_resolve_to_y() {
        assert_eq!(LengthAxis::from_offset(Vec3::new(0.2, 0.0, 0.2)), LengthAxis::Y);
        assert_eq!(LengthAxis::from_offset(Vec3::new(0.2, 0.2, 0.0)), LengthAxis::Y);
        assert_eq!(LengthAxis::from_offset(Vec3::ZERO), LengthAxis::Y);
    }

    #[test]
    fn test_scale_places_length() {
        assert_eq!(LengthAxis::X.scale(2.0, 0.5), Vec3::new(2.0, 0.5, 0.5));
        assert_eq!(LengthAxis::Z.scale(2.0, 0.5), Vec3::new(0.5, 0.5, 2.0));
    }

    #[test]
    fn test_fixture_arm_runs_along_local_y() {
        let avatar = crate::testutil::avatar(true);
        let axis = infer_length_axis(&avatar.skeleton, BoneRole::LeftUpperArm, BoneRole::LeftLowerArm);
        assert_eq!(axis, LengthAxis::Y);
    }

    #[test]
    fn test_unrotated_arm_runs_along_x() {
        let node = |name: &str, parent: Option<usize>, translation: Vec3| NodeSpec {
            name: name.to_string(),
            parent,
            rest: Transform {
                translation,
                ..Transform::IDENTITY
            },
        };
        let specs = vec![
            node("hips", None, Vec3::new(0.0, 1.0, 0.0)),
            node("upper", Some(0), Vec3::new(0.2, 0.4, 0.0)),
            node("lower", Some(1), Vec3::new(0.25, 0.0, 0.0)),
        ];
        let skeleton = Skeleton::build(
            specs,
            &[
                (BoneRole::Hips, 0),
                (BoneRole::LeftUpperArm, 1),
                (BoneRole::LeftLowerArm, 2),
            ],
            Quat::IDENTITY,
        )
        .unwrap();

        let axis = infer_length_axis(&skeleton, BoneRole::LeftUpperArm, BoneRole::LeftLowerArm);
        assert_eq!(axis, LengthAxis::X);
    }

    #[test]
    fn test_missing_bone_defaults_to_y() {
        let avatar = crate::testutil::avatar(false);
        let axis = infer_length_axis(&avatar.skeleton, BoneRole::LeftUpperArm, BoneRole::Jaw);
        assert_eq!(axis, LengthAxis::Y);
    }
}
