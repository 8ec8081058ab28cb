use glam::Vec3;

use super::{BodyLayout, ChestLayout};
use crate::bone::BoneRole;
use crate::params::{BodyKey, BodyParameters};

/// Roles the body pass assigns an absolute scale to
pub const SCALED_ROLES: [BoneRole; 32] = [
    BoneRole::Hips,
    BoneRole::Spine,
    BoneRole::Chest,
    BoneRole::UpperChest,
    BoneRole::Neck,
    BoneRole::Head,
    BoneRole::LeftShoulder,
    BoneRole::LeftUpperArm,
    BoneRole::LeftLowerArm,
    BoneRole::LeftHand,
    BoneRole::RightShoulder,
    BoneRole::RightUpperArm,
    BoneRole::RightLowerArm,
    BoneRole::RightHand,
    BoneRole::LeftUpperLeg,
    BoneRole::LeftLowerLeg,
    BoneRole::LeftFoot,
    BoneRole::LeftToes,
    BoneRole::RightUpperLeg,
    BoneRole::RightLowerLeg,
    BoneRole::RightFoot,
    BoneRole::RightToes,
    BoneRole::LeftThumbProximal,
    BoneRole::LeftIndexProximal,
    BoneRole::LeftMiddleProximal,
    BoneRole::LeftRingProximal,
    BoneRole::LeftLittleProximal,
    BoneRole::RightThumbProximal,
    BoneRole::RightIndexProximal,
    BoneRole::RightMiddleProximal,
    BoneRole::RightRingProximal,
    BoneRole::RightLittleProximal,
];

/// Proximal finger segments sit at the tail of `SCALED_ROLES`
const FIRST_FINGER: usize = 22;

pub fn is_scaled_role(role: BoneRole) -> bool {
    SCALED_ROLES.contains(&role)
}

/// Absolute target scale per role
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredScales([Option<Vec3>; BoneRole::COUNT]);

impl DesiredScales {
    #[inline]
    pub fn get(&self, role: BoneRole) -> Option<Vec3> {
        self.0[role.index()]
    }

    fn set(&mut self, role: BoneRole, scale: Vec3) {
        self.0[role.index()] = Some(scale);
    }

    fn set_pair(&mut self, left: BoneRole, right: BoneRole, scale: Vec3) {
        self.set(left, scale);
        self.set(right, scale);
    }
}

/// Build the desired absolute scale of every scaled role.
///
/// Roles are filled whether or not the avatar has them; the compensator
/// skips the absent ones.
pub fn desired_scales(params: &BodyParameters, layout: &BodyLayout) -> DesiredScales {
    let p = |key| params.body(key);
    let mut table = DesiredScales([None; BoneRole::COUNT]);

    table.set(
        BoneRole::Hips,
        Vec3::new(p(BodyKey::WaistWidth), 1.0, p(BodyKey::HipSize)),
    );
    table.set(
        BoneRole::Spine,
        Vec3::new(p(BodyKey::StomachSize), p(BodyKey::TorsoHeight), p(BodyKey::StomachSize)),
    );

    match layout.chest {
        ChestLayout::WithUpperChest => {
            table.set(
                BoneRole::Chest,
                Vec3::new(p(BodyKey::ShoulderWidth), 1.0, p(BodyKey::StomachSize)),
            );
            table.set(
                BoneRole::UpperChest,
                Vec3::new(p(BodyKey::ShoulderWidth), 1.0, p(BodyKey::ChestSize)),
            );
        }
        ChestLayout::Single => {
            table.set(
                BoneRole::Chest,
                Vec3::new(p(BodyKey::ShoulderWidth), 1.0, p(BodyKey::ChestSize)),
            );
        }
    }

    table.set(
        BoneRole::Neck,
        Vec3::new(p(BodyKey::NeckWidth), p(BodyKey::NeckHeight), p(BodyKey::NeckWidth)),
    );
    table.set(BoneRole::Head, Vec3::splat(p(BodyKey::HeadSize)));

    // Shoulder width lives on the chest
    table.set_pair(BoneRole::LeftShoulder, BoneRole::RightShoulder, Vec3::ONE);

    let axes = &layout.axes;
    table.set_pair(
        BoneRole::LeftUpperArm,
        BoneRole::RightUpperArm,
        axes.upper_arm.scale(p(BodyKey::ArmLength), p(BodyKey::ArmMuscle)),
    );
    table.set_pair(
        BoneRole::LeftLowerArm,
        BoneRole::RightLowerArm,
        axes.lower_arm.scale(p(BodyKey::ArmLength), p(BodyKey::ForearmSize)),
    );
    table.set_pair(
        BoneRole::LeftHand,
        BoneRole::RightHand,
        Vec3::splat(p(BodyKey::HandSize)),
    );

    table.set_pair(
        BoneRole::LeftUpperLeg,
        BoneRole::RightUpperLeg,
        axes.upper_leg.scale(p(BodyKey::LegLength), p(BodyKey::ThighSize)),
    );
    table.set_pair(
        BoneRole::LeftLowerLeg,
        BoneRole::RightLowerLeg,
        axes.lower_leg.scale(p(BodyKey::LegLength), p(BodyKey::CalfSize)),
    );
    table.set_pair(
        BoneRole::LeftFoot,
        BoneRole::RightFoot,
        Vec3::splat(p(BodyKey::FootSize)),
    );
    table.set_pair(
        BoneRole::LeftToes,
        BoneRole::RightToes,
        Vec3::splat(p(BodyKey::ToeSize)),
    );

    let finger = Vec3::splat(p(BodyKey::FingerSize));
    for role in &SCALED_ROLES[FIRST_FINGER..] {
        table.set(*role, finger);
    }

    table
}
