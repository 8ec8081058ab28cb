//! Pose modes, the custom-pose snapshot and clip playback.

use serde::{Deserialize, Serialize};

use crate::avatar::FormatVersion;
use crate::bone::{BoneRole, BoneTransforms, CannedPose, NormalizedPose, PoseClip, RoleSet};
use crate::config::EditorConfig;
use crate::picker::{drag_to, Proxy, Selection};
use crate::retarget::BodyOffsets;
use crate::skeleton::Skeleton;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PoseMode {
    #[default]
    TPose,
    APose,
    Stand,
    Custom,
}

impl PoseMode {
    pub fn from_name(name: &str) -> Option<PoseMode> {
        match name {
            "tPose" | "T-Pose" => Some(PoseMode::TPose),
            "aPose" | "A-Pose" => Some(PoseMode::APose),
            "stand" | "Stand" => Some(PoseMode::Stand),
            "custom" | "Custom" => Some(PoseMode::Custom),
            _ => None,
        }
    }

    /// The fixed pose this mode shows, `None` for Custom
    pub fn canned(self) -> Option<CannedPose> {
        match self {
            PoseMode::TPose => Some(CannedPose::TPose),
            PoseMode::APose => Some(CannedPose::APose),
            PoseMode::Stand => Some(CannedPose::Stand),
            PoseMode::Custom => None,
        }
    }
}

/// A looping clip and its play head
#[derive(Debug, Clone, PartialEq)]
pub struct Playback {
    pub clip: PoseClip,
    /// Seconds since the clip started, unwrapped
    pub time: f32,
    pub playing: bool,
}

impl Playback {
    pub fn new(clip: PoseClip) -> Self {
        Self {
            clip,
            time: 0.0,
            playing: true,
        }
    }

    /// Move the play head; paused playback stays put
    pub fn advance(&mut self, dt: f32) {
        if self.playing {
            self.time += dt;
        }
    }
}

/// How an imported clip was taken in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClipImport {
    /// Non-zero duration: plays continuously
    Looping,
    /// Zero duration: applied once and stored as the custom pose
    Captured,
}

/// Owns the current normalized pose and everything that decides it
#[derive(Debug, Clone)]
pub struct PoseController {
    mode: PoseMode,
    pose: NormalizedPose,
    snapshot: Option<BoneTransforms>,
    playback: Option<Playback>,
    selection: Option<Selection>,
    format: FormatVersion,
    config: EditorConfig,
}

impl PoseController {
    pub fn new(mode: PoseMode, format: FormatVersion, config: &EditorConfig) -> Self {
        let mut controller = Self {
            mode,
            pose: NormalizedPose::identity(),
            snapshot: None,
            playback: None,
            selection: None,
            format,
            config: config.clone(),
        };
        if let Some(canned) = mode.canned() {
            controller.pose = controller.canned_pose(canned);
        }
        controller
    }

    pub fn mode(&self) -> PoseMode {
        self.mode
    }

    pub fn pose(&self) -> &NormalizedPose {
        &self.pose
    }

    pub fn snapshot(&self) -> Option<&BoneTransforms> {
        self.snapshot.as_ref()
    }

    pub fn playback(&self) -> Option<&Playback> {
        self.playback.as_ref()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn is_custom(&self) -> bool {
        self.mode == PoseMode::Custom
    }

    /// A clip is loaded and advancing
    pub fn is_playing(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| p.playing)
    }

    pub fn is_dragging(&self) -> bool {
        self.selection.as_ref().is_some_and(|s| s.dragging)
    }

    fn canned_pose(&self, canned: CannedPose) -> NormalizedPose {
        NormalizedPose::canned(canned, self.format, &self.config)
    }

    /// Explicit mode selection. Canned modes drop the snapshot, playback
    /// and any attached handles.
    pub fn set_mode(&mut self, mode: PoseMode) {
        match mode.canned() {
            Some(canned) => {
                self.snapshot = None;
                self.show_canned(mode, canned);
            }
            None => self.enter_custom(),
        }
    }

    /// Show a canned pose for a while, keeping the snapshot so a later
    /// return to Custom restores it.
    pub fn preview_mode(&mut self, mode: PoseMode) {
        match mode.canned() {
            Some(canned) => self.show_canned(mode, canned),
            None => self.enter_custom(),
        }
    }

    fn show_canned(&mut self, mode: PoseMode, canned: CannedPose) {
        self.mode = mode;
        self.pose = self.canned_pose(canned);
        self.playback = None;
        self.selection = None;
    }

    /// Switch to Custom, restoring the snapshot when there is one
    pub fn enter_custom(&mut self) {
        self.mode = PoseMode::Custom;
        if let Some(snapshot) = &self.snapshot {
            self.pose = self.pose.clone().restore(snapshot);
        }
    }

    /// Store the current pose as the custom snapshot
    pub fn capture(&mut self, present: RoleSet) {
        self.snapshot = Some(self.pose.capture(present));
    }

    /// Take in an imported clip, entering Custom first if needed.
    ///
    /// A zero-duration clip is applied once and captured; anything longer
    /// replaces the current playback.
    pub fn import_clip(&mut self, clip: PoseClip, present: RoleSet) -> ClipImport {
        if !self.is_custom() {
            self.enter_custom();
        }
        if clip.is_static() {
            self.pose = clip.sample_onto(0.0, &self.pose);
            self.playback = None;
            self.capture(present);
            ClipImport::Captured
        } else {
            self.pose = clip.sample_onto(0.0, &self.pose);
            self.playback = Some(Playback::new(clip));
            self.selection = None;
            ClipImport::Looping
        }
    }

    /// Pause or resume the loaded clip. Returns the new playing state.
    pub fn toggle_playback(&mut self) -> bool {
        if !self.is_custom() {
            return false;
        }
        let Some(playback) = self.playback.as_mut() else {
            return false;
        };
        playback.playing = !playback.playing;
        if playback.playing {
            self.selection = None;
        }
        playback.playing
    }

    /// Step playback. Returns whether the pose changed.
    pub fn advance(&mut self, dt: f32) -> bool {
        let Some(playback) = self.playback.as_mut().filter(|p| p.playing) else {
            return false;
        };
        playback.advance(dt);
        self.pose = playback.clip.sample_onto(playback.time, &self.pose);
        true
    }

    /// Attach handles to `role` if the avatar has that bone
    pub fn select(&mut self, role: BoneRole, skeleton: &Skeleton) -> Option<&Selection> {
        self.selection = Selection::attach(role, skeleton, &self.pose);
        self.selection.as_ref()
    }

    pub fn detach(&mut self) {
        self.selection = None;
    }

    /// Keep an idle proxy on the selected bone after the skeleton moved
    pub fn follow_selection(&mut self, skeleton: &Skeleton) {
        if let Some(selection) = self.selection.as_mut() {
            selection.follow(skeleton, &self.pose);
        }
    }

    /// Follow the proxy while a handle is dragged
    pub fn drag(&mut self, proxy: Proxy, skeleton: &Skeleton, offsets: &BodyOffsets) -> bool {
        let Some(selection) = self.selection.as_mut() else {
            return false;
        };
        selection.dragging = true;
        selection.proxy = proxy;
        self.pose = drag_to(selection, proxy, skeleton, self.pose.clone(), offsets);
        true
    }

    /// Release the handle; it stays attached
    pub fn end_drag(&mut self) {
        if let Some(selection) = self.selection.as_mut() {
            selection.dragging = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use glam::{Quat, Vec3};

    const STATIC_POSE: &str = r#"{
        "name": "salute",
        "duration": 0,
        "keyframes": [{ "time": 0, "bones": {
            "rightUpperArm": { "euler": { "x": 10, "y": 20, "z": -35 } },
            "neck": { "rotation": [0.0871557, 0, 0, 0.9961947] },
            "hips": { "position": [0.0, 0.95, 0.05] }
        } }]
    }"#;

    const LOOP: &str = r#"{
        "name": "nod",
        "duration": 1.0,
        "keyframes": [
            { "time": 0.0, "bones": { "head": { "euler": { "x": 0 } } } },
            { "time": 0.5, "bones": { "head": { "euler": { "x": 30 } } } }
        ]
    }"#;

    fn controller() -> PoseController {
        PoseController::new(PoseMode::Stand, FormatVersion::V1, &EditorConfig::default())
    }

    #[test]
    fn test_static_clip_round_trips_through_preview() {
        let avatar = testutil::avatar(true);
        let mut poses = controller();
        let clip = PoseClip::from_json(STATIC_POSE).unwrap();

        assert_eq!(poses.import_clip(clip, avatar.skeleton.roles()), ClipImport::Captured);
        assert!(poses.is_custom());
        assert!(poses.playback().is_none());
        let captured = poses.pose().clone();

        poses.preview_mode(PoseMode::APose);
        assert_ne!(poses.pose(), &captured);
        poses.set_mode(PoseMode::Custom);

        for role in avatar.skeleton.roles().iter() {
            assert_eq!(
                poses.pose().rotation(role),
                captured.rotation(role),
                "{:?} differs after round trip",
                role
            );
        }
        assert_eq!(poses.pose().hips_position, captured.hips_position);
    }

    #[test]
    fn test_explicit_canned_mode_drops_snapshot() {
        let avatar = testutil::avatar(true);
        let mut poses = controller();
        poses.set_mode(PoseMode::Custom);
        poses.capture(avatar.skeleton.roles());
        assert!(poses.snapshot().is_some());

        poses.set_mode(PoseMode::TPose);
        assert!(poses.snapshot().is_none());
        poses.set_mode(PoseMode::Custom);
        assert_eq!(poses.pose(), &NormalizedPose::identity());
    }

    #[test]
    fn test_custom_without_snapshot_keeps_pose() {
        let mut poses = controller();
        let stand = poses.pose().clone();
        poses.set_mode(PoseMode::Custom);
        assert_eq!(poses.pose(), &stand);
    }

    #[test]
    fn test_looping_clip_plays_and_pauses() {
        let avatar = testutil::avatar(true);
        let mut poses = controller();
        poses.set_mode(PoseMode::Custom);
        let clip = PoseClip::from_json(LOOP).unwrap();

        assert_eq!(poses.import_clip(clip, avatar.skeleton.roles()), ClipImport::Looping);
        assert!(poses.is_playing());
        assert!(poses.snapshot().is_none(), "looping clips never touch the snapshot");

        assert!(poses.advance(0.25));
        let (_, angle) = poses.pose().rotation(BoneRole::Head).to_axis_angle();
        assert!((angle.to_degrees() - 15.0).abs() < 0.1, "head at {}", angle.to_degrees());

        assert!(!poses.toggle_playback());
        let paused = poses.pose().clone();
        assert!(!poses.advance(0.25));
        assert_eq!(poses.pose(), &paused);
        assert_eq!(poses.playback().unwrap().time, 0.25);

        assert!(poses.toggle_playback());
        poses.set_mode(PoseMode::Stand);
        assert!(poses.playback().is_none());
        assert!(!poses.toggle_playback());
    }

    #[test]
    fn test_canned_mode_detaches_handles() {
        let avatar = testutil::avatar(false);
        let mut poses = controller();
        poses.set_mode(PoseMode::Custom);
        assert!(poses.select(BoneRole::LeftHand, &avatar.skeleton).is_some());

        poses.preview_mode(PoseMode::TPose);
        assert!(poses.selection().is_none());
    }

    #[test]
    fn test_drag_updates_pose_and_release_keeps_handle() {
        let avatar = testutil::avatar(false);
        let mut poses = controller();
        poses.set_mode(PoseMode::Custom);
        poses.select(BoneRole::Head, &avatar.skeleton);

        let proxy = Proxy {
            position: Vec3::ZERO,
            rotation: Quat::from_rotation_y(0.4),
        };
        assert!(poses.drag(proxy, &avatar.skeleton, &BodyOffsets::default()));
        assert!(poses.is_dragging());
        assert!(poses.pose().rotation(BoneRole::Head).angle_between(Quat::from_rotation_y(0.4)) < 1e-4);

        poses.end_drag();
        assert!(!poses.is_dragging());
        assert_eq!(poses.selection().unwrap().role, BoneRole::Head);
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(PoseMode::from_name("A-Pose"), Some(PoseMode::APose));
        assert_eq!(PoseMode::from_name("custom"), Some(PoseMode::Custom));
        assert_eq!(PoseMode::from_name("sit"), None);
        assert_eq!(serde_json::to_string(&PoseMode::TPose).unwrap(), "\"tPose\"");
    }
}
