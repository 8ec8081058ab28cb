//! Eye gaze targeting from a 2-D gaze pad.

use glam::{Quat, Vec2, Vec3};
use serde::Serialize;

use crate::avatar::FormatVersion;
use crate::bone::BoneRole;
use crate::config::EditorConfig;
use crate::skeleton::Skeleton;

/// Where the eyes should look this frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LookAt {
    /// Follow the camera; the renderer knows where it is
    Camera,
    Point { position: Vec3 },
}

/// Head frame the pad is laid out in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeBasis {
    pub origin: Vec3,
    /// Normalized world rotation of the head
    pub head_rotation: Quat,
}

impl GazeBasis {
    /// Midpoint of the eyes, or a point just above the head joint when the
    /// avatar has no eye bones.
    pub fn measure(skeleton: &Skeleton, head_rotation: Quat, config: &EditorConfig) -> Option<Self> {
        let eyes = skeleton
            .bone(BoneRole::LeftEye)
            .zip(skeleton.bone(BoneRole::RightEye));
        let origin = match eyes {
            Some((left, right)) => {
                (skeleton.world_position(left) + skeleton.world_position(right)) * 0.5
            }
            None => {
                let head = skeleton.bone(BoneRole::Head)?;
                skeleton.world_position(head) + Vec3::new(0.0, config.eye_height_fallback, 0.0)
            }
        };
        Some(Self {
            origin,
            head_rotation,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeController {
    pad: Vec2,
    look_at_camera: bool,
    distance: f32,
    sensitivity: f32,
}

impl GazeController {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            pad: Vec2::ZERO,
            look_at_camera: false,
            distance: config.gaze_distance,
            sensitivity: config.gaze_sensitivity,
        }
    }

    pub fn pad(&self) -> Vec2 {
        self.pad
    }

    pub fn set_pad(&mut self, pad: Vec2) {
        self.pad = pad.clamp(Vec2::NEG_ONE, Vec2::ONE);
    }

    pub fn look_at_camera(&self) -> bool {
        self.look_at_camera
    }

    pub fn set_look_at_camera(&mut self, enabled: bool) {
        self.look_at_camera = enabled;
    }

    /// Centre the pad and stop following the camera
    pub fn reset(&mut self) {
        self.pad = Vec2::ZERO;
        self.look_at_camera = false;
    }

    /// Current look-at target
    pub fn target(&self, basis: &GazeBasis, format: FormatVersion) -> LookAt {
        if self.look_at_camera {
            return LookAt::Camera;
        }
        let q = basis.head_rotation;
        let forward = q * Vec3::NEG_Z;
        let right = q * Vec3::NEG_X;
        let up = q * Vec3::Y;

        let (distance, x_sign) = match format {
            FormatVersion::V1 => (-self.distance, -1.0),
            FormatVersion::V0 => (self.distance, 1.0),
        };

        let position = basis.origin
            + forward * distance
            + right * (self.pad.x * self.sensitivity * x_sign)
            + up * (self.pad.y * self.sensitivity);
        LookAt::Point { position }
    }

    /// Set the pad so the eyes point at `camera`, saturating at the edges
    pub fn sync_with_camera(&mut self, camera: Vec3, basis: &GazeBasis, format: FormatVersion) {
        let v = basis.head_rotation.inverse() * (camera - basis.origin);
        let forward_z = match format {
            FormatVersion::V1 => v.z,
            FormatVersion::V0 => -v.z,
        };
        let max_angle = (self.sensitivity / self.distance).atan();
        let to_pad = |theta: f32| {
            if theta.abs() >= max_angle {
                theta.signum()
            } else {
                theta.tan() * (self.distance / self.sensitivity)
            }
        };

        let mut x = to_pad(v.x.atan2(forward_z));
        if format == FormatVersion::V0 {
            x = -x;
        }
        let y = to_pad(v.y.atan2(forward_z));
        self.set_pad(Vec2::new(x, y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use crate::EPSILON;

    fn basis() -> GazeBasis {
        GazeBasis {
            origin: Vec3::new(0.0, 1.6, 0.0),
            head_rotation: Quat::from_rotation_y(0.3),
        }
    }

    fn point(look: LookAt) -> Vec3 {
        match look {
            LookAt::Point { position } => position,
            LookAt::Camera => panic!("expected a point"),
        }
    }

    #[test]
    fn test_centre_looks_ahead() {
        let gaze = GazeController::new(&EditorConfig::default());
        let b = GazeBasis {
            head_rotation: Quat::IDENTITY,
            ..basis()
        };
        let v1 = point(gaze.target(&b, FormatVersion::V1));
        assert!((v1 - (b.origin + Vec3::new(0.0, 0.0, 5.0))).length() < EPSILON);
        let v0 = point(gaze.target(&b, FormatVersion::V0));
        assert!((v0 - (b.origin + Vec3::new(0.0, 0.0, -5.0))).length() < EPSILON);
    }

    #[test]
    fn test_sync_inverts_target() {
        for format in [FormatVersion::V1, FormatVersion::V0] {
            let mut gaze = GazeController::new(&EditorConfig::default());
            gaze.set_pad(Vec2::new(0.3, -0.45));
            let camera = point(gaze.target(&basis(), format));

            let mut synced = GazeController::new(&EditorConfig::default());
            synced.sync_with_camera(camera, &basis(), format);
            assert!(
                (synced.pad() - Vec2::new(0.3, -0.45)).length() < 1e-4,
                "{:?}: pad {:?}",
                format,
                synced.pad()
            );
        }
    }

    #[test]
    fn test_sync_saturates() {
        let mut gaze = GazeController::new(&EditorConfig::default());
        let b = GazeBasis {
            head_rotation: Quat::IDENTITY,
            ..basis()
        };
        // Far off to the side, barely in front
        gaze.sync_with_camera(b.origin + Vec3::new(50.0, 0.0, 0.1), &b, FormatVersion::V1);
        assert_eq!(gaze.pad().x, 1.0);
        assert!(gaze.pad().y.abs() < EPSILON);
    }

    #[test]
    fn test_pad_clamped_and_camera_mode() {
        let mut gaze = GazeController::new(&EditorConfig::default());
        gaze.set_pad(Vec2::new(3.0, -2.0));
        assert_eq!(gaze.pad(), Vec2::new(1.0, -1.0));
        gaze.set_look_at_camera(true);
        assert_eq!(gaze.target(&basis(), FormatVersion::V1), LookAt::Camera);
        gaze.reset();
        assert_eq!(gaze.pad(), Vec2::ZERO);
        assert!(!gaze.look_at_camera());
    }

    #[test]
    fn test_basis_uses_eye_midpoint() {
        let avatar = testutil::avatar(true);
        let config = EditorConfig::default();
        let b = GazeBasis::measure(&avatar.skeleton, Quat::IDENTITY, &config).unwrap();
        let head = avatar.skeleton.world_position(avatar.bone(BoneRole::Head).unwrap());
        assert!((b.origin - (head + Vec3::new(0.0, 0.06, 0.05))).length() < EPSILON);

        let mut desc = testutil::humanoid(true);
        desc.human_bones.remove("leftEye");
        let no_eyes = crate::avatar::Avatar::load(desc, &config).unwrap();
        let b = GazeBasis::measure(&no_eyes.skeleton, Quat::IDENTITY, &config).unwrap();
        assert!((b.origin - (head + Vec3::new(0.0, 0.1, 0.0))).length() < EPSILON);
    }
}
