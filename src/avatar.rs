//! Avatar description handed over by the asset loader, and the loaded
//! avatar built from it.
//!
//! Loading validates licensing metadata first, then builds the arena
//! skeleton and captures everything the retargeting pass measures from the
//! rest pose (leg length, limb length axes, chest layout, collider radii).

use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::bone::BoneRole;
use crate::config::EditorConfig;
use crate::error::AvatarError;
use crate::retarget::BodyLayout;
use crate::skeleton::{NodeSpec, Skeleton, Transform};

/// Avatar format convention, which decides the facing direction and hence
/// the sign of canned arm rotations and gaze offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatVersion {
    /// Legacy convention, avatar faces -Z
    V0,
    /// Newer convention, avatar faces +Z
    V1,
}

impl FormatVersion {
    pub fn from_meta_version(meta_version: Option<&str>) -> Self {
        match meta_version {
            Some("1") => FormatVersion::V1,
            _ => FormatVersion::V0,
        }
    }

    /// Sign of the left upper arm's z rotation that lowers the arm
    #[inline]
    pub fn arm_lowering_sign(self) -> f32 {
        match self {
            FormatVersion::V0 => 1.0,
            FormatVersion::V1 => -1.0,
        }
    }
}

const NO_DERIVATIVE_PHRASES: [&str; 8] = [
    "no derivative",
    "noderivative",
    "改変不可",
    "改変禁止",
    "禁止演绎",
    "禁止修改",
    "변경 금지",
    "수정 금지",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AvatarMeta {
    pub meta_version: Option<String>,
    pub modification: Option<String>,
    pub license_name: Option<String>,
    pub title: Option<String>,
}

impl AvatarMeta {
    pub fn format_version(&self) -> FormatVersion {
        FormatVersion::from_meta_version(self.meta_version.as_deref())
    }

    /// Reject avatars whose license forbids derivative works
    pub fn check_license(&self) -> Result<(), AvatarError> {
        match self.format_version() {
            FormatVersion::V1 => {
                if self.modification.as_deref() == Some("prohibited") {
                    return Err(AvatarError::LicenseRestricted {
                        label: self
                            .license_name
                            .clone()
                            .or_else(|| self.modification.clone()),
                    });
                }
            }
            FormatVersion::V0 => {
                if let Some(name) = &self.license_name {
                    if is_no_derivative_license(name) {
                        return Err(AvatarError::LicenseRestricted {
                            label: Some(name.clone()),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn is_no_derivative_license(name: &str) -> bool {
    let lower = name.to_lowercase();
    let nd_token = lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| token == "nd");
    nd_token || NO_DERIVATIVE_PHRASES.iter().any(|p| lower.contains(p))
}

fn one() -> Vec3 {
    Vec3::ONE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub translation: Vec3,
    #[serde(default)]
    pub rotation: Quat,
    #[serde(default = "one")]
    pub scale: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColliderShape {
    Sphere { offset: Vec3, radius: f32 },
    Capsule { offset: Vec3, tail: Vec3, radius: f32 },
}

impl ColliderShape {
    pub fn radius(&self) -> f32 {
        match self {
            ColliderShape::Sphere { radius, .. } | ColliderShape::Capsule { radius, .. } => *radius,
        }
    }

    pub fn with_radius(self, radius: f32) -> Self {
        match self {
            ColliderShape::Sphere { offset, .. } => ColliderShape::Sphere { offset, radius },
            ColliderShape::Capsule { offset, tail, .. } => {
                ColliderShape::Capsule { offset, tail, radius }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColliderDescription {
    pub node: usize,
    pub shape: ColliderShape,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColliderGroupDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub colliders: Vec<ColliderDescription>,
}

/// Everything the asset loader extracts from an avatar file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarDescription {
    #[serde(default)]
    pub meta: AvatarMeta,
    pub nodes: Vec<NodeDescription>,
    pub human_bones: BTreeMap<String, usize>,
    #[serde(default)]
    pub expressions: Vec<String>,
    #[serde(default)]
    pub collider_groups: Vec<ColliderGroupDescription>,
    #[serde(default)]
    pub root_rotation: Option<Quat>,
}

impl AvatarDescription {
    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, AvatarError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Spring-physics collider with its load-time radius
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub group: String,
    /// Arena index of the owning node
    pub node: usize,
    pub shape: ColliderShape,
    pub original_radius: f32,
}

/// A loaded avatar: skeleton plus everything derived from its rest pose
#[derive(Debug, Clone)]
pub struct Avatar {
    pub title: Option<String>,
    pub format: FormatVersion,
    pub skeleton: Skeleton,
    pub layout: BodyLayout,
    pub colliders: Vec<Collider>,
    pub expressions: Vec<String>,
    /// Rest-pose vertical distance from hips to left foot
    pub default_leg_length: f32,
}

impl Avatar {
    pub fn from_json(json: &str, config: &EditorConfig) -> Result<Self, AvatarError> {
        Self::load(AvatarDescription::from_json(json)?, config)
    }

    pub fn load(desc: AvatarDescription, config: &EditorConfig) -> Result<Self, AvatarError> {
        desc.meta.check_license()?;

        let mut bones = Vec::with_capacity(desc.human_bones.len());
        for (name, &node) in &desc.human_bones {
            match BoneRole::from_name(name) {
                Some(role) => bones.push((role, node)),
                None => log::warn!("Ignoring unknown humanoid bone '{}'", name),
            }
        }
        if !bones.iter().any(|(role, _)| *role == BoneRole::Hips) {
            return Err(AvatarError::AssetFormat(
                "humanoid has no hips bone".to_string(),
            ));
        }

        let node_count = desc.nodes.len();
        let specs = desc
            .nodes
            .into_iter()
            .map(|n| NodeSpec {
                name: n.name,
                parent: n.parent,
                rest: Transform {
                    translation: n.translation,
                    rotation: n.rotation.normalize(),
                    scale: n.scale,
                },
            })
            .collect::<Vec<_>>();

        let skeleton = Skeleton::build(
            specs,
            &bones,
            desc.root_rotation.unwrap_or(Quat::IDENTITY),
        )?;

        let mut colliders = Vec::new();
        for group in desc.collider_groups {
            for collider in group.colliders {
                if collider.node >= node_count {
                    return Err(AvatarError::AssetFormat(format!(
                        "collider in group '{}' references missing node {}",
                        group.name, collider.node
                    )));
                }
                let Some(node) = skeleton.arena_index(collider.node) else {
                    continue;
                };
                colliders.push(Collider {
                    group: group.name.clone(),
                    node,
                    shape: collider.shape,
                    original_radius: collider.shape.radius(),
                });
            }
        }

        let default_leg_length = measure_leg_length(&skeleton, config.fallback_leg_length);
        let layout = BodyLayout::resolve(&skeleton);
        let format = desc.meta.format_version();

        log::info!(
            "Loaded avatar '{}' ({:?}, {} nodes, {} humanoid bones, upper chest: {})",
            desc.meta.title.as_deref().unwrap_or("untitled"),
            format,
            skeleton.len(),
            skeleton.roles().len(),
            layout.has_upper_chest()
        );

        Ok(Self {
            title: desc.meta.title,
            format,
            skeleton,
            layout,
            colliders,
            expressions: desc.expressions,
            default_leg_length,
        })
    }

    /// Arena index of a role, if present
    #[inline]
    pub fn bone(&self, role: BoneRole) -> Option<usize> {
        self.skeleton.bone(role)
    }
}

fn measure_leg_length(skeleton: &Skeleton, fallback: f32) -> f32 {
    let (Some(hips), Some(foot)) = (
        skeleton.bone(BoneRole::Hips),
        skeleton.bone(BoneRole::LeftFoot),
    ) else {
        return fallback;
    };
    let distance = (skeleton.rest_world(hips).translation.y
        - skeleton.rest_world(foot).translation.y)
        .abs();
    if distance > 1e-4 {
        distance
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn test_v1_prohibited_modification_rejected() {
        let mut desc = testutil::humanoid(true);
        desc.meta.meta_version = Some("1".to_string());
        desc.meta.modification = Some("prohibited".to_string());

        let err = Avatar::load(desc, &EditorConfig::default()).unwrap_err();
        assert!(matches!(err, AvatarError::LicenseRestricted { .. }));
    }

    #[test]
    fn test_legacy_license_names() {
        assert!(is_no_derivative_license("CC_BY_ND"));
        assert!(is_no_derivative_license("CC_BY_NC_ND"));
        assert!(is_no_derivative_license("Attribution-NoDerivatives"));
        assert!(is_no_derivative_license("改変禁止"));
        assert!(!is_no_derivative_license("CC_BY"));
        assert!(!is_no_derivative_license("Redistribution_Prohibited"));
        assert!(!is_no_derivative_license("Standard license"));
    }

    #[test]
    fn test_legacy_nd_rejected_with_label() {
        let mut desc = testutil::humanoid(false);
        desc.meta.license_name = Some("CC_BY_ND".to_string());

        match Avatar::load(desc, &EditorConfig::default()) {
            Err(AvatarError::LicenseRestricted { label }) => {
                assert_eq!(label.as_deref(), Some("CC_BY_ND"))
            }
            other => panic!("expected license error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_hips_is_format_error() {
        let mut desc = testutil::humanoid(false);
        desc.human_bones.remove("hips");
        let err = Avatar::load(desc, &EditorConfig::default()).unwrap_err();
        assert!(matches!(err, AvatarError::AssetFormat(_)));
    }

    #[test]
    fn test_garbage_json_is_format_error() {
        let err = Avatar::from_json("{ not json", &EditorConfig::default()).unwrap_err();
        assert!(matches!(err, AvatarError::AssetFormat(_)));
    }

    #[test]
    fn test_default_leg_length_measured() {
        let avatar = Avatar::load(testutil::humanoid(true), &EditorConfig::default()).unwrap();
        assert!(
            (avatar.default_leg_length - testutil::HIPS_TO_FOOT).abs() < 1e-4,
            "leg length {}",
            avatar.default_leg_length
        );
    }

    #[test]
    fn test_leg_length_falls_back_without_feet() {
        let mut desc = testutil::humanoid(true);
        desc.human_bones.remove("leftFoot");
        let config = EditorConfig::default();
        let avatar = Avatar::load(desc, &config).unwrap();
        assert_eq!(avatar.default_leg_length, config.fallback_leg_length);
    }

    #[test]
    fn test_format_version_from_meta() {
        let avatar = Avatar::load(testutil::humanoid(true), &EditorConfig::default()).unwrap();
        assert_eq!(avatar.format, FormatVersion::V1);
        assert_eq!(FormatVersion::from_meta_version(Some("0")), FormatVersion::V0);
        assert_eq!(FormatVersion::from_meta_version(None), FormatVersion::V0);
    }

    #[test]
    fn test_colliders_keep_original_radius() {
        let avatar = Avatar::load(testutil::humanoid(true), &EditorConfig::default()).unwrap();
        assert!(!avatar.colliders.is_empty());
        for collider in &avatar.colliders {
            assert_eq!(collider.original_radius, collider.shape.radius());
        }
    }
}
