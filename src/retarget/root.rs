use glam::Vec3;

use crate::bone::BoneRole;
use crate::config::EditorConfig;
use crate::params::{BodyKey, BodyParameters};
use crate::skeleton::Skeleton;

/// Distance the root must rise so longer legs and larger feet stay on the
/// ground
pub fn root_lift(params: &BodyParameters, default_leg_length: f32, config: &EditorConfig) -> f32 {
    let leg_growth = (params.body(BodyKey::LegLength) - 1.0) * default_leg_length;
    let foot_growth = (params.body(BodyKey::FootSize) - 1.0) * config.foot_base_height;
    leg_growth + foot_growth
}

/// Place the avatar root along the hips' current world up vector.
///
/// Absolute, so it can run every frame without drifting.
pub fn reposition_root(
    skeleton: &mut Skeleton,
    params: &BodyParameters,
    default_leg_length: f32,
    config: &EditorConfig,
) {
    let Some(hips) = skeleton.bone(BoneRole::Hips) else {
        return;
    };
    let up = skeleton.world_rotation(hips) * Vec3::Y;
    let lift = root_lift(params, default_leg_length, config);
    skeleton.set_root_translation(up * lift);
}
