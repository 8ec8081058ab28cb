use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::id::BoneRole;
use super::pose::NormalizedPose;
use crate::error::ClipError;

// ============================================================================
// Clip JSON
// ============================================================================

/// Euler angles in degrees for hand-authored clips
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct EulerAngles {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl EulerAngles {
    /// Convert to quaternion (XYZ order)
    pub fn to_quat(&self) -> Quat {
        Quat::from_euler(
            glam::EulerRot::XYZ,
            self.x.to_radians(),
            self.y.to_radians(),
            self.z.to_radians(),
        )
    }
}

/// One bone's key in a keyframe. `rotation` wins over `euler`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BoneKeyJson {
    #[serde(default)]
    pub rotation: Option<Quat>,
    #[serde(default)]
    pub euler: Option<EulerAngles>,
    #[serde(default)]
    pub position: Option<Vec3>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClipKeyframeJson {
    pub time: f32,
    #[serde(default)]
    pub bones: BTreeMap<String, BoneKeyJson>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoseClipJson {
    #[serde(default)]
    pub name: String,
    pub duration: f32,
    pub keyframes: Vec<ClipKeyframeJson>,
}

// ============================================================================
// Tracks
// ============================================================================

/// Keys of a single channel, sorted by time
#[derive(Debug, Clone, Default, PartialEq)]
struct Track<T> {
    times: Vec<f32>,
    values: Vec<T>,
}

impl<T: Copy> Track<T> {
    fn push(&mut self, time: f32, value: T) {
        self.times.push(time);
        self.values.push(value);
    }

    fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    fn first(&self) -> Option<T> {
        self.values.first().copied()
    }

    /// Sample with looping: past the last key, blend back toward the first
    fn sample(&self, time: f32, duration: f32, blend: impl Fn(T, T, f32) -> T) -> Option<T> {
        let last = self.times.len().checked_sub(1)?;
        let next_idx = self.times.partition_point(|t| *t <= time);

        if next_idx == 0 {
            return self.first();
        }

        if next_idx > last {
            let segment = duration - self.times[last] + self.times[0];
            let t = if segment > 0.0 {
                ((time - self.times[last]) / segment).clamp(0.0, 1.0)
            } else {
                0.0
            };
            return Some(blend(self.values[last], self.values[0], t));
        }

        let (prev, next) = (next_idx - 1, next_idx);
        let segment = self.times[next] - self.times[prev];
        let t = if segment > 0.0 {
            (time - self.times[prev]) / segment
        } else {
            0.0
        };
        Some(blend(self.values[prev], self.values[next], t))
    }
}

// ============================================================================
// Clip
// ============================================================================

/// Imported animation clip bound to humanoid roles.
///
/// Zero duration marks a static pose rather than an animation.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseClip {
    pub name: String,
    pub duration: f32,
    rotations: BTreeMap<BoneRole, Track<Quat>>,
    hips_position: Track<Vec3>,
}

impl PoseClip {
    /// Parse from JSON string. Unknown bone names are dropped.
    pub fn from_json(json: &str) -> Result<Self, ClipError> {
        let clip_json: PoseClipJson = serde_json::from_str(json)?;
        Self::from_clip_json(clip_json)
    }

    pub fn from_clip_json(clip_json: PoseClipJson) -> Result<Self, ClipError> {
        if clip_json.keyframes.is_empty() {
            return Err(ClipError::Empty);
        }
        if clip_json.duration < 0.0 {
            return Err(ClipError::NegativeDuration(clip_json.duration));
        }

        let mut keyframes = clip_json.keyframes;
        keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));

        let mut rotations: BTreeMap<BoneRole, Track<Quat>> = BTreeMap::new();
        let mut hips_position = Track::default();

        for keyframe in keyframes {
            for (name, key) in keyframe.bones {
                let Some(role) = BoneRole::from_name(&name) else {
                    log::warn!("Clip '{}': ignoring unknown bone '{}'", clip_json.name, name);
                    continue;
                };
                let rotation = key.rotation.or_else(|| key.euler.map(|e| e.to_quat()));
                if let Some(rotation) = rotation {
                    rotations
                        .entry(role)
                        .or_default()
                        .push(keyframe.time, rotation.normalize());
                }
                if role == BoneRole::Hips {
                    if let Some(position) = key.position {
                        hips_position.push(keyframe.time, position);
                    }
                }
            }
        }

        Ok(Self {
            name: clip_json.name,
            duration: clip_json.duration,
            rotations,
            hips_position,
        })
    }

    /// A static pose rather than a loop
    pub fn is_static(&self) -> bool {
        self.duration == 0.0
    }

    /// Sample the clip at `time` over `base`. Bones without a track keep
    /// their pose from `base`.
    pub fn sample_onto(&self, time: f32, base: &NormalizedPose) -> NormalizedPose {
        let looped_time = if self.duration > 0.0 {
            time.rem_euclid(self.duration)
        } else {
            0.0
        };

        let mut pose = base.clone();
        for (role, track) in &self.rotations {
            let sampled = if self.is_static() {
                track.first()
            } else {
                track.sample(looped_time, self.duration, |a, b, t| a.slerp(b, t))
            };
            if let Some(rotation) = sampled {
                pose.rotations[role.index()] = rotation;
            }
        }

        let position = if self.is_static() {
            self.hips_position.first()
        } else {
            self.hips_position
                .sample(looped_time, self.duration, |a, b, t| a.lerp(b, t))
        };
        if position.is_some() {
            pose.hips_position = position;
        }
        pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EPSILON;

    const WAVE: &str = r#"{
        "name": "wave",
        "duration": 2.0,
        "keyframes": [
            { "time": 0.0, "bones": { "spine": { "euler": { "x": 0 } }, "hips": { "position": [0, 1, 0] } } },
            { "time": 1.0, "bones": { "spine": { "euler": { "x": 90 } }, "tailBase": { "euler": { "y": 10 } } } }
        ]
    }"#;

    #[test]
    fn test_parse_drops_unknown_bones() {
        let clip = PoseClip::from_json(WAVE).unwrap();
        assert_eq!(clip.name, "wave");
        let animated: Vec<BoneRole> = clip
            .rotations
            .iter()
            .filter(|(_, track)| !track.is_empty())
            .map(|(role, _)| *role)
            .collect();
        assert_eq!(animated, vec![BoneRole::Spine]);
        assert!(!clip.is_static());
    }

    #[test]
    fn test_sample_interpolates() {
        let clip = PoseClip::from_json(WAVE).unwrap();
        let pose = clip.sample_onto(0.5, &NormalizedPose::identity());

        let rotated_y = pose.rotation(BoneRole::Spine) * Vec3::Y;
        assert!(
            (rotated_y.y - 0.707).abs() < 0.01,
            "Rotated Y.y should be ~0.707, got {}",
            rotated_y.y
        );
        assert!((rotated_y.z - 0.707).abs() < 0.01);
    }

    #[test]
    fn test_sample_wraps_back_to_first_key() {
        let clip = PoseClip::from_json(WAVE).unwrap();
        // Halfway between the last key (1.0) and the wrap point (2.0)
        let pose = clip.sample_onto(3.5, &NormalizedPose::identity());
        let (_, angle) = pose.rotation(BoneRole::Spine).to_axis_angle();
        assert!(
            (angle.to_degrees() - 45.0).abs() < 0.1,
            "expected 45 deg, got {}",
            angle.to_degrees()
        );
    }

    #[test]
    fn test_untracked_bones_keep_base_pose() {
        let clip = PoseClip::from_json(WAVE).unwrap();
        let base = NormalizedPose::identity().with_rotation(BoneRole::Head, Quat::from_rotation_y(0.3));
        let pose = clip.sample_onto(0.25, &base);
        assert_eq!(pose.rotation(BoneRole::Head), base.rotation(BoneRole::Head));
        let hips = pose.hips_position.unwrap();
        assert!((hips - Vec3::new(0.0, 1.0, 0.0)).length() < EPSILON);
    }

    #[test]
    fn test_static_clip_uses_first_key() {
        let json = r#"{
            "name": "pose",
            "duration": 0,
            "keyframes": [{ "time": 0, "bones": { "leftUpperArm": { "rotation": [0, 0, 0.3826834, 0.9238795] } } }]
        }"#;
        let clip = PoseClip::from_json(json).unwrap();
        assert!(clip.is_static());

        let pose = clip.sample_onto(12.0, &NormalizedPose::identity());
        let expected = Quat::from_rotation_z(std::f32::consts::FRAC_PI_4);
        assert!(pose.rotation(BoneRole::LeftUpperArm).angle_between(expected) < 1e-3);
    }

    #[test]
    fn test_rejects_empty_and_negative() {
        let empty = r#"{ "name": "x", "duration": 1.0, "keyframes": [] }"#;
        assert!(matches!(PoseClip::from_json(empty), Err(ClipError::Empty)));

        let negative = r#"{ "name": "x", "duration": -1.0, "keyframes": [{ "time": 0 }] }"#;
        assert!(matches!(
            PoseClip::from_json(negative),
            Err(ClipError::NegativeDuration(_))
        ));

        assert!(matches!(PoseClip::from_json("nope"), Err(ClipError::Parse(_))));
    }
}
