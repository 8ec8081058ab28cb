use glam::Vec3;

use super::{BodyLayout, DesiredScales};
use crate::bone::BoneRole;
use crate::config::EditorConfig;
use crate::math::ScaleExt;
use crate::params::{BodyKey, BodyParameters};
use crate::skeleton::Skeleton;

/// Translation offsets the body pass layers on top of posing
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyOffsets {
    /// Added to the hips translation, in the hips' parent frame
    pub hips: Vec3,
}

/// Write desired scales onto the skeleton, cancelling inherited scale on
/// every bone that has a scaled ancestor.
///
/// For such a bone the compensation slot holds the reciprocal of the scale
/// accumulated between it and its nearest scaled ancestor, and its
/// translation is stretched by that same scale so the joint stays on the
/// parent's surface.
pub fn apply_scales(
    skeleton: &mut Skeleton,
    layout: &BodyLayout,
    desired: &DesiredScales,
    params: &BodyParameters,
    config: &EditorConfig,
) -> BodyOffsets {
    for role in skeleton.roles().iter() {
        if let Some(index) = skeleton.bone(role) {
            skeleton.set_scale(index, Vec3::ONE);
        }
    }

    let chest_like = layout.chest.chest_like();
    let mut offsets = BodyOffsets::default();

    for bone in &layout.scaled {
        let Some(target) = desired.get(bone.role) else {
            continue;
        };
        let rest = skeleton.node(bone.node).rest;

        match (bone.scale_parent, skeleton.node(bone.node).parent) {
            (Some(scale_parent), Some(raw_parent)) => {
                skeleton.set_scale(bone.node, target);
                let inherited = skeleton.chain_scale(raw_parent, scale_parent);
                skeleton.set_compensation(bone.node, Some(inherited.safe_recip()));

                let mut translation = rest.translation * inherited;
                if bone.role == chest_like {
                    translation.z += (params.body(BodyKey::ChestSize) - 1.0) * config.chest_z_factor;
                }
                skeleton.set_translation(bone.node, translation);
            }
            _ => {
                // Root of the scaled set: nothing above it is scaled
                skeleton.set_scale(bone.node, target.safe_div(Vec3::ONE));
                skeleton.set_compensation(bone.node, None);
                if bone.role == BoneRole::Hips {
                    offsets.hips = Vec3::new(
                        0.0,
                        0.0,
                        (params.body(BodyKey::HipSize) - 1.0) * config.hips_z_factor,
                    );
                    skeleton.set_translation(bone.node, rest.translation + offsets.hips);
                }
            }
        }
    }

    offsets
}
