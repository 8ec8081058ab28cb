//! Direct bone manipulation: marker hit-testing and proxy dragging.
//!
//! A picked bone is driven through a proxy carrying a world position and
//! rotation. The rotate handle acts on every bone; only the hips also get a
//! translate handle.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use serde::Serialize;
use static_assertions::const_assert_eq;

use crate::bone::{normalized_hips_position, BoneRole, NormalizedPose};
use crate::config::EditorConfig;
use crate::retarget::BodyOffsets;
use crate::skeleton::Skeleton;

/// Picking ray in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or(Vec3::NEG_Z),
        }
    }

    /// Ray through a point in normalized device coordinates
    pub fn from_ndc(ndc: Vec2, view: Mat4, proj: Mat4) -> Self {
        let inverse = (proj * view).inverse();
        let near = inverse * Vec4::new(ndc.x, ndc.y, -1.0, 1.0);
        let far = inverse * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let near = near.truncate() / near.w;
        let far = far.truncate() / far.w;
        Self::new(near, far - near)
    }

    /// Nearest non-negative hit distance against a sphere
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let to_center = self.origin - center;
        let b = to_center.dot(self.direction);
        let c = to_center.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let near = -b - root;
        let far = -b + root;
        if near >= 0.0 {
            Some(near)
        } else if far >= 0.0 {
            Some(0.0)
        } else {
            None
        }
    }
}

/// Overlay marker for one bone, laid out for direct upload
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize)]
pub struct BoneMarker {
    pub position: [f32; 3],
    pub radius: f32,
    pub role: u32,
    pub selected: u32,
    pub _pad: [u32; 2],
}

const_assert_eq!(std::mem::size_of::<BoneMarker>(), 32);

impl BoneMarker {
    pub fn role(&self) -> Option<BoneRole> {
        BoneRole::from_index(self.role as usize)
    }
}

pub fn marker_radius(role: BoneRole, config: &EditorConfig) -> f32 {
    if role.is_finger() || role.is_eye() {
        config.small_marker_radius
    } else {
        config.marker_radius
    }
}

/// Markers for every humanoid bone, at current world positions
pub fn bone_markers(
    skeleton: &Skeleton,
    selected: Option<BoneRole>,
    config: &EditorConfig,
) -> Vec<BoneMarker> {
    skeleton
        .roles()
        .iter()
        .filter_map(|role| {
            let index = skeleton.bone(role)?;
            Some(BoneMarker {
                position: skeleton.world_position(index).to_array(),
                radius: marker_radius(role, config),
                role: role.index() as u32,
                selected: u32::from(selected == Some(role)),
                _pad: [0; 2],
            })
        })
        .collect()
}

/// Closest marker the ray passes through
pub fn pick_marker(ray: &Ray, markers: &[BoneMarker]) -> Option<BoneRole> {
    markers
        .iter()
        .filter_map(|m| {
            let distance = ray.intersect_sphere(Vec3::from_array(m.position), m.radius)?;
            Some((distance, m.role()?))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, role)| role)
}

/// Transform the handles act on
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Proxy {
    pub position: Vec3,
    pub rotation: Quat,
}

/// A bone with transform handles attached
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub role: BoneRole,
    pub proxy: Proxy,
    /// Translate handle attached alongside the rotate handle
    pub translate: bool,
    pub dragging: bool,
}

impl Selection {
    /// Attach handles to `role`, seeding the proxy from the bone's current
    /// world position and normalized world rotation.
    pub fn attach(role: BoneRole, skeleton: &Skeleton, pose: &NormalizedPose) -> Option<Self> {
        let index = skeleton.bone(role)?;
        Some(Self {
            role,
            proxy: Proxy {
                position: skeleton.world_position(index),
                rotation: pose.world_rotation(skeleton, role),
            },
            translate: role == BoneRole::Hips,
            dragging: false,
        })
    }

    /// Re-seed an idle proxy from the bone's live transform. A proxy being
    /// dragged is left alone.
    pub fn follow(&mut self, skeleton: &Skeleton, pose: &NormalizedPose) {
        if self.dragging {
            return;
        }
        if let Some(index) = skeleton.bone(self.role) {
            self.proxy = Proxy {
                position: skeleton.world_position(index),
                rotation: pose.world_rotation(skeleton, self.role),
            };
        }
    }
}

/// What a pointer press did
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PickOutcome {
    /// Picking is not available right now
    Ignored,
    Missed,
    /// An eye marker was hit; the gaze controls should open
    GazeMenu { role: BoneRole },
    Attached { role: BoneRole },
}

/// Feed a proxy transform back into the pose.
///
/// The proxy rotation is brought into the bone's normalized parent frame.
/// For the hips, the proxy position is mapped through the inverse of the
/// raw parent's world matrix, minus the body pass offset.
pub fn drag_to(
    selection: &Selection,
    proxy: Proxy,
    skeleton: &Skeleton,
    pose: NormalizedPose,
    offsets: &BodyOffsets,
) -> NormalizedPose {
    let role = selection.role;
    let parent_world = match skeleton.humanoid_parent(role) {
        Some(parent) => pose.world_rotation(skeleton, parent),
        None => skeleton.root().rotation,
    };
    let local = (parent_world.inverse() * proxy.rotation).normalize();
    let pose = pose.with_rotation(role, local);

    if !selection.translate {
        return pose;
    }
    let Some(hips) = skeleton.bone(BoneRole::Hips) else {
        return pose;
    };
    let raw = skeleton.parent_frame(hips).inverse().transform_point3(proxy.position) - offsets.hips;
    pose.with_hips_position(Some(normalized_hips_position(skeleton, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use crate::EPSILON;

    #[test]
    fn test_ray_sphere() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let hit = ray.intersect_sphere(Vec3::ZERO, 1.0).unwrap();
        assert!((hit - 4.0).abs() < EPSILON);
        assert!(ray.intersect_sphere(Vec3::new(3.0, 0.0, 0.0), 1.0).is_none());
        assert!(ray.intersect_sphere(Vec3::new(0.0, 0.0, 10.0), 1.0).is_none());
    }

    #[test]
    fn test_ray_from_ndc_centre_looks_forward() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 1.0, 3.0), Vec3::new(0.0, 1.0, 0.0), Vec3::Y);
        let proj = Mat4::perspective_rh(0.8, 1.5, 0.1, 100.0);
        let ray = Ray::from_ndc(Vec2::ZERO, view, proj);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-3, "dir {:?}", ray.direction);
        assert!((ray.origin.y - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_markers_cover_humanoid_bones() {
        let avatar = testutil::avatar(true);
        let config = EditorConfig::default();
        let markers = bone_markers(&avatar.skeleton, Some(BoneRole::Head), &config);
        assert_eq!(markers.len(), avatar.skeleton.roles().len());

        let eye = markers.iter().find(|m| m.role() == Some(BoneRole::LeftEye)).unwrap();
        assert_eq!(eye.radius, config.small_marker_radius);
        let head = markers.iter().find(|m| m.role() == Some(BoneRole::Head)).unwrap();
        assert_eq!(head.radius, config.marker_radius);
        assert_eq!(head.selected, 1);

        let bytes: &[u8] = bytemuck::cast_slice(&markers);
        assert_eq!(bytes.len(), markers.len() * 32);
    }

    #[test]
    fn test_pick_prefers_nearest() {
        let avatar = testutil::avatar(true);
        let markers = bone_markers(&avatar.skeleton, None, &EditorConfig::default());
        let head = avatar.skeleton.world_position(avatar.bone(BoneRole::Head).unwrap());

        // Straight down through the head
        let ray = Ray::new(head + Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Y);
        assert_eq!(pick_marker(&ray, &markers), Some(BoneRole::Head));

        let miss = Ray::new(Vec3::new(5.0, 5.0, 5.0), Vec3::Y);
        assert_eq!(pick_marker(&miss, &markers), None);
    }

    #[test]
    fn test_attach_sets_handles() {
        let avatar = testutil::avatar(true);
        let pose = NormalizedPose::identity();
        let hips = Selection::attach(BoneRole::Hips, &avatar.skeleton, &pose).unwrap();
        let arm = Selection::attach(BoneRole::LeftLowerArm, &avatar.skeleton, &pose).unwrap();
        assert!(hips.translate);
        assert!(!arm.translate);
        assert!(!arm.dragging);
        assert!(Selection::attach(BoneRole::Jaw, &avatar.skeleton, &pose).is_none());
    }

    #[test]
    fn test_follow_reseeds_only_idle_proxy() {
        let avatar = testutil::avatar(true);
        let pose = NormalizedPose::identity();
        let mut selection = Selection::attach(BoneRole::Head, &avatar.skeleton, &pose).unwrap();
        let live = selection.proxy;
        let moved = Proxy {
            position: live.position + Vec3::X,
            rotation: Quat::from_rotation_z(0.5),
        };

        selection.proxy = moved;
        selection.dragging = true;
        selection.follow(&avatar.skeleton, &pose);
        assert_eq!(selection.proxy, moved, "a dragged proxy is left alone");

        selection.dragging = false;
        selection.follow(&avatar.skeleton, &pose);
        assert!((selection.proxy.position - live.position).length() < EPSILON);
        assert!(selection.proxy.rotation.angle_between(live.rotation) < EPSILON);
    }

    #[test]
    fn test_drag_rotation_reaches_world() {
        let mut avatar = testutil::avatar(false);
        let spine_turn = Quat::from_rotation_y(0.5);
        let pose = NormalizedPose::identity().with_rotation(BoneRole::Spine, spine_turn);
        pose.apply(&mut avatar.skeleton, &BodyOffsets::default());

        let selection = Selection::attach(BoneRole::Neck, &avatar.skeleton, &pose).unwrap();
        let target = Quat::from_rotation_x(0.7);
        let proxy = Proxy {
            rotation: target,
            ..selection.proxy
        };
        let pose = drag_to(&selection, proxy, &avatar.skeleton, pose, &BodyOffsets::default());

        assert!(pose.world_rotation(&avatar.skeleton, BoneRole::Neck).angle_between(target) < 1e-4);
        assert!(pose.rotation(BoneRole::Neck).angle_between(spine_turn.inverse() * target) < 1e-4);
    }

    #[test]
    fn test_drag_hips_translation() {
        let mut avatar = testutil::avatar(true);
        let offsets = BodyOffsets {
            hips: Vec3::new(0.0, 0.0, -0.1),
        };
        let pose = NormalizedPose::identity();
        pose.apply(&mut avatar.skeleton, &offsets);

        let selection = Selection::attach(BoneRole::Hips, &avatar.skeleton, &pose).unwrap();
        let target = selection.proxy.position + Vec3::new(0.2, -0.1, 0.0);
        let proxy = Proxy {
            position: target,
            ..selection.proxy
        };
        let pose = drag_to(&selection, proxy, &avatar.skeleton, pose, &offsets);
        pose.apply(&mut avatar.skeleton, &offsets);

        let hips = avatar.bone(BoneRole::Hips).unwrap();
        let world = avatar.skeleton.world_position(hips);
        assert!((world - target).length() < EPSILON, "hips at {:?}, wanted {:?}", world, target);
    }
}
