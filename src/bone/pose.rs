use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::id::{BoneRole, RoleSet};
use crate::avatar::FormatVersion;
use crate::config::EditorConfig;
use crate::retarget::BodyOffsets;
use crate::skeleton::Skeleton;

/// Fixed poses selectable from the pose menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CannedPose {
    TPose,
    APose,
    Stand,
}

/// Humanoid pose in normalized space.
///
/// Every bone's rest orientation is factored out, so identity everywhere is
/// the T-pose regardless of how the avatar's bones were authored.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPose {
    pub rotations: [Quat; BoneRole::COUNT],
    /// Hips position in the avatar root frame. `None` keeps the rest position.
    pub hips_position: Option<Vec3>,
}

impl Default for NormalizedPose {
    fn default() -> Self {
        Self::identity()
    }
}

impl NormalizedPose {
    pub fn identity() -> Self {
        Self {
            rotations: [Quat::IDENTITY; BoneRole::COUNT],
            hips_position: None,
        }
    }

    /// Return a new pose with the specified bone rotation
    pub fn with_rotation(self, role: BoneRole, rotation: Quat) -> Self {
        let mut pose = self;
        pose.rotations[role.index()] = rotation;
        pose
    }

    pub fn with_hips_position(self, position: Option<Vec3>) -> Self {
        Self {
            hips_position: position,
            ..self
        }
    }

    #[inline]
    pub fn rotation(&self, role: BoneRole) -> Quat {
        self.rotations[role.index()]
    }

    /// Build a canned pose. Arm lowering direction follows the avatar's
    /// format convention.
    pub fn canned(pose: CannedPose, format: FormatVersion, config: &EditorConfig) -> Self {
        let angle = match pose {
            CannedPose::TPose => return Self::identity(),
            CannedPose::APose => config.a_pose_angle,
            CannedPose::Stand => config.stand_angle,
        };
        let sign = format.arm_lowering_sign();
        Self::identity()
            .with_rotation(BoneRole::LeftUpperArm, Quat::from_rotation_z(sign * angle))
            .with_rotation(BoneRole::RightUpperArm, Quat::from_rotation_z(-sign * angle))
    }

    /// Normalized world rotation: the root orientation composed with the
    /// normalized rotations of the bone and its humanoid ancestors.
    pub fn world_rotation(&self, skeleton: &Skeleton, role: BoneRole) -> Quat {
        let mut rotation = self.rotation(role);
        let mut cursor = skeleton.humanoid_parent(role);
        while let Some(parent) = cursor {
            rotation = self.rotation(parent) * rotation;
            cursor = skeleton.humanoid_parent(parent);
        }
        skeleton.root().rotation * rotation
    }

    /// Write the pose onto the raw skeleton.
    ///
    /// Raw local rotation = `Pw⁻¹ · n · Pw · rest`, where `Pw` is the rest
    /// world rotation of the bone's raw parent. Hips translation gets the
    /// body pass offset layered on top.
    pub fn apply(&self, skeleton: &mut Skeleton, offsets: &BodyOffsets) {
        for role in skeleton.roles().iter() {
            let Some(index) = skeleton.bone(role) else {
                continue;
            };
            let rest = skeleton.node(index).rest;
            let parent_rest = skeleton
                .node(index)
                .parent
                .map(|p| skeleton.rest_world_rotation(p))
                .unwrap_or(Quat::IDENTITY);
            let n = self.rotation(role);
            let raw = (parent_rest.inverse() * n * parent_rest * rest.rotation).normalize();
            skeleton.set_rotation(index, raw);
        }

        if let Some(hips) = skeleton.bone(BoneRole::Hips) {
            let base = match self.hips_position {
                Some(position) => raw_hips_translation(skeleton, position),
                None => skeleton.node(hips).rest.translation,
            };
            skeleton.set_translation(hips, base + offsets.hips);
        }
    }

    /// Snapshot the bones the avatar actually has
    pub fn capture(&self, present: RoleSet) -> BoneTransforms {
        let mut bones = BTreeMap::new();
        for role in present.iter() {
            let position = if role == BoneRole::Hips {
                self.hips_position
            } else {
                None
            };
            bones.insert(
                role,
                BoneTransform {
                    rotation: self.rotation(role),
                    position,
                },
            );
        }
        BoneTransforms(bones)
    }

    /// Overwrite the bones recorded in `snapshot`, keeping the rest
    pub fn restore(self, snapshot: &BoneTransforms) -> Self {
        let mut pose = self;
        for (role, transform) in &snapshot.0 {
            pose.rotations[role.index()] = transform.rotation;
            if *role == BoneRole::Hips {
                pose.hips_position = transform.position;
            }
        }
        pose
    }
}

/// Raw hips translation for a normalized hips position
pub fn raw_hips_translation(skeleton: &Skeleton, position: Vec3) -> Vec3 {
    match skeleton.bone(BoneRole::Hips) {
        Some(hips) => skeleton.rest_parent_world(hips).inverse().transform_point3(position),
        None => position,
    }
}

/// Normalized hips position for a raw hips translation
pub fn normalized_hips_position(skeleton: &Skeleton, translation: Vec3) -> Vec3 {
    match skeleton.bone(BoneRole::Hips) {
        Some(hips) => skeleton.rest_parent_world(hips).transform_point3(translation),
        None => translation,
    }
}

/// One bone of a custom pose snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoneTransform {
    pub rotation: Quat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
}

/// Custom pose snapshot, keyed by role
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneTransforms(pub BTreeMap<BoneRole, BoneTransform>);
