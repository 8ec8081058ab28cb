//! Synthetic humanoid fixture shared by unit tests.
//!
//! Newer format convention: the avatar faces +Z, its left side is +X. Upper
//! arms carry a rest rotation so that their local +Y runs along the arm,
//! which is how most authored rigs orient limb bones.

use std::collections::BTreeMap;
use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec3};

use crate::avatar::{
    Avatar, AvatarDescription, AvatarMeta, ColliderDescription, ColliderGroupDescription,
    ColliderShape, NodeDescription,
};
use crate::config::EditorConfig;

pub const HIPS_HEIGHT: f32 = 1.0;
pub const HIPS_TO_FOOT: f32 = 0.9;
pub const HEAD_COLLIDER_RADIUS: f32 = 0.08;
pub const HAIR_COLLIDER_RADIUS: f32 = 0.1;
pub const HAND_COLLIDER_RADIUS: f32 = 0.03;

struct Builder {
    nodes: Vec<NodeDescription>,
    human_bones: BTreeMap<String, usize>,
}

impl Builder {
    fn add(&mut self, name: &str, bone: bool, parent: Option<usize>, translation: Vec3) -> usize {
        self.add_rotated(name, bone, parent, translation, Quat::IDENTITY)
    }

    fn add_rotated(
        &mut self,
        name: &str,
        bone: bool,
        parent: Option<usize>,
        translation: Vec3,
        rotation: Quat,
    ) -> usize {
        let index = self.nodes.len();
        self.nodes.push(NodeDescription {
            name: name.to_string(),
            parent,
            translation,
            rotation,
            scale: Vec3::ONE,
        });
        if bone {
            self.human_bones.insert(name.to_string(), index);
        }
        index
    }

    fn arm(&mut self, side: &str, sign: f32, chest: usize) -> usize {
        let shoulder = self.add(
            &format!("{side}Shoulder"),
            true,
            Some(chest),
            Vec3::new(0.05 * sign, 0.1, 0.0),
        );
        let upper = self.add_rotated(
            &format!("{side}UpperArm"),
            true,
            Some(shoulder),
            Vec3::new(0.1 * sign, 0.0, 0.0),
            Quat::from_rotation_z(-FRAC_PI_2 * sign),
        );
        let lower = self.add(&format!("{side}LowerArm"), true, Some(upper), Vec3::new(0.0, 0.25, 0.0));
        let hand = self.add(&format!("{side}Hand"), true, Some(lower), Vec3::new(0.0, 0.22, 0.0));
        let index = self.add(&format!("{side}IndexProximal"), true, Some(hand), Vec3::new(0.0, 0.08, 0.0));
        self.add(&format!("{side}IndexIntermediate"), true, Some(index), Vec3::new(0.0, 0.03, 0.0));
        let metacarpal = self.add(
            &format!("{side}ThumbMetacarpal"),
            true,
            Some(hand),
            Vec3::new(0.0, 0.02, 0.02),
        );
        self.add(&format!("{side}ThumbProximal"), true, Some(metacarpal), Vec3::new(0.0, 0.03, 0.0));
        hand
    }

    fn leg(&mut self, side: &str, sign: f32, hips: usize) {
        let upper = self.add(&format!("{side}UpperLeg"), true, Some(hips), Vec3::new(0.1 * sign, 0.0, 0.0));
        let lower = self.add(&format!("{side}LowerLeg"), true, Some(upper), Vec3::new(0.0, -0.45, 0.0));
        let foot = self.add(&format!("{side}Foot"), true, Some(lower), Vec3::new(0.0, -0.45, 0.0));
        self.add(&format!("{side}Toes"), true, Some(foot), Vec3::new(0.0, -0.05, 0.1));
    }
}

/// Humanoid description, with or without the optional upper chest
pub fn humanoid(with_upper_chest: bool) -> AvatarDescription {
    let mut b = Builder {
        nodes: Vec::new(),
        human_bones: BTreeMap::new(),
    };

    let root = b.add("Armature", false, None, Vec3::ZERO);
    let hips = b.add("hips", true, Some(root), Vec3::new(0.0, HIPS_HEIGHT, 0.0));
    let spine = b.add("spine", true, Some(hips), Vec3::new(0.0, 0.1, 0.0));
    let chest = b.add("chest", true, Some(spine), Vec3::new(0.0, 0.15, 0.0));
    let chest_like = if with_upper_chest {
        b.add("upperChest", true, Some(chest), Vec3::new(0.0, 0.15, 0.0))
    } else {
        chest
    };
    let neck = b.add("neck", true, Some(chest_like), Vec3::new(0.0, 0.15, 0.0));
    let head = b.add("head", true, Some(neck), Vec3::new(0.0, 0.1, 0.0));
    b.add("leftEye", true, Some(head), Vec3::new(0.03, 0.06, 0.05));
    b.add("rightEye", true, Some(head), Vec3::new(-0.03, 0.06, 0.05));
    let hair = b.add("HairJoint", false, Some(head), Vec3::new(0.0, 0.12, -0.05));

    let left_hand = b.arm("left", 1.0, chest_like);
    b.arm("right", -1.0, chest_like);
    b.leg("left", 1.0, hips);
    b.leg("right", -1.0, hips);

    let sphere = |radius: f32| ColliderShape::Sphere {
        offset: Vec3::ZERO,
        radius,
    };

    AvatarDescription {
        meta: AvatarMeta {
            meta_version: Some("1".to_string()),
            modification: Some("allowEverything".to_string()),
            license_name: Some("CC_BY".to_string()),
            title: Some("Fixture".to_string()),
        },
        nodes: b.nodes,
        human_bones: b.human_bones,
        expressions: vec![
            "happy".to_string(),
            "blink".to_string(),
            "aa".to_string(),
            "Wink_L".to_string(),
            "Tongue".to_string(),
        ],
        collider_groups: vec![
            ColliderGroupDescription {
                name: "Head".to_string(),
                colliders: vec![
                    ColliderDescription {
                        node: head,
                        shape: sphere(HEAD_COLLIDER_RADIUS),
                    },
                    ColliderDescription {
                        node: hair,
                        shape: ColliderShape::Capsule {
                            offset: Vec3::ZERO,
                            tail: Vec3::new(0.0, -0.1, 0.0),
                            radius: HAIR_COLLIDER_RADIUS,
                        },
                    },
                ],
            },
            ColliderGroupDescription {
                name: "LeftHand".to_string(),
                colliders: vec![ColliderDescription {
                    node: left_hand,
                    shape: sphere(HAND_COLLIDER_RADIUS),
                }],
            },
        ],
        root_rotation: None,
    }
}

/// Loaded fixture avatar with default configuration
pub fn avatar(with_upper_chest: bool) -> Avatar {
    Avatar::load(humanoid(with_upper_chest), &EditorConfig::default()).unwrap()
}

/// Same skeleton declared in the legacy format convention
pub fn legacy_avatar() -> Avatar {
    let mut desc = humanoid(false);
    desc.meta.meta_version = Some("0".to_string());
    desc.meta.modification = None;
    Avatar::load(desc, &EditorConfig::default()).unwrap()
}
