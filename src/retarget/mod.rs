//! Body-shape retargeting.
//!
//! One pass per parameter change: build the desired absolute scale table,
//! write scales and counter-scales onto the skeleton, move the root so the
//! feet stay planted, then resize head colliders.

mod axis;
mod colliders;
mod compensate;
mod desired;
mod root;

pub use axis::{infer_length_axis, LengthAxis};
pub use colliders::update_collider_radii;
pub use compensate::{apply_scales, BodyOffsets};
pub use desired::{desired_scales, is_scaled_role, DesiredScales, SCALED_ROLES};
pub use root::{reposition_root, root_lift};

use crate::avatar::Avatar;
use crate::bone::BoneRole;
use crate::config::EditorConfig;
use crate::params::BodyParameters;
use crate::skeleton::Skeleton;

/// Which bone owns the shoulders and neck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChestLayout {
    /// Only a chest bone
    Single,
    /// Chest plus upper chest
    WithUpperChest,
}

impl ChestLayout {
    /// The bone that receives the chestSize z offset
    pub fn chest_like(self) -> BoneRole {
        match self {
            ChestLayout::Single => BoneRole::Chest,
            ChestLayout::WithUpperChest => BoneRole::UpperChest,
        }
    }
}

/// Length axes of the four limb segments, measured on the left side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimbAxes {
    pub upper_arm: LengthAxis,
    pub lower_arm: LengthAxis,
    pub upper_leg: LengthAxis,
    pub lower_leg: LengthAxis,
}

impl LimbAxes {
    pub fn infer(skeleton: &Skeleton) -> Self {
        Self {
            upper_arm: infer_length_axis(skeleton, BoneRole::LeftUpperArm, BoneRole::LeftLowerArm),
            lower_arm: infer_length_axis(skeleton, BoneRole::LeftLowerArm, BoneRole::LeftHand),
            upper_leg: infer_length_axis(skeleton, BoneRole::LeftUpperLeg, BoneRole::LeftLowerLeg),
            lower_leg: infer_length_axis(skeleton, BoneRole::LeftLowerLeg, BoneRole::LeftFoot),
        }
    }
}

/// A scaled bone present on the avatar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaledBone {
    pub role: BoneRole,
    pub node: usize,
    /// Nearest scaled ancestor. `None` only for the root of the scaled set.
    pub scale_parent: Option<usize>,
}

/// Everything the body pass needs to know about an avatar's shape,
/// resolved once at load.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyLayout {
    pub chest: ChestLayout,
    pub axes: LimbAxes,
    /// Scaled bones, parents before children
    pub scaled: Vec<ScaledBone>,
}

impl BodyLayout {
    pub fn resolve(skeleton: &Skeleton) -> Self {
        let chest = if skeleton.has_bone(BoneRole::UpperChest) {
            ChestLayout::WithUpperChest
        } else {
            ChestLayout::Single
        };

        let mut scaled: Vec<ScaledBone> = SCALED_ROLES
            .iter()
            .filter_map(|&role| {
                let node = skeleton.bone(role)?;
                Some(ScaledBone {
                    role,
                    node,
                    scale_parent: nearest_scaled_ancestor(skeleton, node),
                })
            })
            .collect();
        scaled.sort_by_key(|bone| bone.node);

        Self {
            chest,
            axes: LimbAxes::infer(skeleton),
            scaled,
        }
    }

    pub fn has_upper_chest(&self) -> bool {
        self.chest == ChestLayout::WithUpperChest
    }
}

fn nearest_scaled_ancestor(skeleton: &Skeleton, node: usize) -> Option<usize> {
    let mut cursor = skeleton.node(node).parent;
    while let Some(index) = cursor {
        let current = skeleton.node(index);
        if current.role.is_some_and(is_scaled_role) {
            return Some(index);
        }
        cursor = current.parent;
    }
    None
}

/// Run the whole body pass against the avatar's current hips orientation.
pub fn apply(avatar: &mut Avatar, params: &BodyParameters, config: &EditorConfig) -> BodyOffsets {
    let desired = desired_scales(params, &avatar.layout);
    let offsets = apply_scales(&mut avatar.skeleton, &avatar.layout, &desired, params, config);
    reposition_root(&mut avatar.skeleton, params, avatar.default_leg_length, config);
    update_collider_radii(&mut avatar.colliders, &avatar.skeleton, params);
    offsets
}
