//! Centralized application state with context passing pattern
//!
//! `EditorSession` owns everything tied to one loaded avatar and is driven
//! through plain method calls, so it tests without a browser. `AppState`
//! keeps the optional session in a thread-local for the wasm bindings, which
//! stay thin wrappers around these methods.

use std::cell::RefCell;
use std::collections::BTreeMap;

use glam::{Mat4, Vec2, Vec3};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::avatar::Avatar;
use crate::bone::{BoneRole, PoseClip};
use crate::config::EditorConfig;
use crate::error::{ClipError, ParameterImportError};
use crate::expression::{AutoBlink, ExpressionMixer};
use crate::gaze::{GazeBasis, GazeController, LookAt};
use crate::history::ParameterHistory;
use crate::params::{BodyParameters, PresetKind};
use crate::picker::{bone_markers, pick_marker, BoneMarker, PickOutcome, Proxy, Ray, Selection};
use crate::pose_state::{ClipImport, PoseController, PoseMode};
use crate::retarget::{self, BodyOffsets};
use crate::scheduler::{FrameScheduler, PhysicsStep, UpdateRequest};

/// Everything the renderer needs after a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Weights keyed by the avatar's expression names
    pub expressions: BTreeMap<String, f32>,
    /// Only set in Custom mode
    pub look_at: Option<LookAt>,
    pub physics: PhysicsStep,
}

/// Editing state for one loaded avatar
pub struct EditorSession {
    avatar: Avatar,
    config: EditorConfig,
    params: BodyParameters,
    history: ParameterHistory<BodyParameters>,
    poses: PoseController,
    offsets: BodyOffsets,
    mixer: ExpressionMixer,
    blink: AutoBlink,
    gaze: GazeController,
    scheduler: FrameScheduler,
}

impl EditorSession {
    /// Fresh session: identity parameters, T-Pose, empty history
    pub fn new(avatar: Avatar, config: EditorConfig, rng: SmallRng) -> Self {
        let mixer = ExpressionMixer::new(&avatar.expressions);
        let params = BodyParameters::with_custom_expressions(mixer.custom_names());

        let mut session = Self {
            history: ParameterHistory::new(config.history_depth),
            poses: PoseController::new(PoseMode::default(), avatar.format, &config),
            offsets: BodyOffsets::default(),
            blink: AutoBlink::new(config.blink, rng),
            gaze: GazeController::new(&config),
            scheduler: FrameScheduler::new(&config),
            avatar,
            config,
            params,
            mixer,
        };
        session.apply_update();
        session
    }

    pub fn avatar(&self) -> &Avatar {
        &self.avatar
    }

    pub fn params(&self) -> &BodyParameters {
        &self.params
    }

    pub fn pose_mode(&self) -> PoseMode {
        self.poses.mode()
    }

    pub fn poses(&self) -> &PoseController {
        &self.poses
    }

    pub fn gaze(&self) -> &GazeController {
        &self.gaze
    }

    pub fn has_pending_update(&self) -> bool {
        self.scheduler.has_pending()
    }

    // --- Body pass ---

    /// Body parameters, then the current pose, then root placement
    fn refresh(&mut self) {
        self.offsets = retarget::apply(&mut self.avatar, &self.params, &self.config);
        self.apply_pose();
    }

    fn apply_pose(&mut self) {
        self.poses.pose().apply(&mut self.avatar.skeleton, &self.offsets);
        self.reposition_root();
        self.poses.follow_selection(&self.avatar.skeleton);
    }

    fn reposition_root(&mut self) {
        retarget::reposition_root(
            &mut self.avatar.skeleton,
            &self.params,
            self.avatar.default_leg_length,
            &self.config,
        );
    }

    fn apply_update(&mut self) {
        self.refresh();
        self.scheduler.mark_applied(self.poses.is_playing());
    }

    fn request_update(&mut self) {
        match self.scheduler.request_update() {
            UpdateRequest::ApplyNow => self.apply_update(),
            UpdateRequest::Deferred { deadline_ms } => {
                log::trace!("Body update deferred until {:.1} ms", deadline_ms);
            }
        }
    }

    // --- Parameters ---

    pub fn set_parameter(&mut self, name: &str, value: f32) {
        self.params.set(name, value);
        self.request_update();
    }

    pub fn set_custom_expression(&mut self, name: &str, value: f32) {
        self.params
            .custom_expressions
            .insert(name.to_string(), value.clamp(0.0, 1.0));
        self.request_update();
    }

    pub fn reset_parameters(&mut self) {
        self.params = BodyParameters::with_custom_expressions(self.mixer.custom_names());
        self.request_update();
    }

    /// Remember the current parameters as an undo point
    pub fn begin_edit(&mut self) {
        self.history.push(self.params.clone());
    }

    pub fn undo(&mut self) -> bool {
        let Some(params) = self.history.undo(self.params.clone()) else {
            return false;
        };
        self.params = params;
        self.request_update();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(params) = self.history.redo(self.params.clone()) else {
            return false;
        };
        self.params = params;
        self.request_update();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn export_preset(&self, kind: PresetKind) -> Result<String, serde_json::Error> {
        self.params.export_preset(kind)
    }

    /// Import a preset into the `active` tab, recording an undo point
    pub fn import_preset(&mut self, json: &str, active: PresetKind) -> Result<(), ParameterImportError> {
        let next = self.params.import_preset(json, active).inspect_err(|e| {
            log::warn!("Preset rejected: {}", e);
        })?;
        self.begin_edit();
        self.params = next;
        self.request_update();
        Ok(())
    }

    // --- Pose ---

    /// Select a pose mode from the menu. Canned modes drop the custom
    /// snapshot.
    pub fn set_pose_mode(&mut self, mode: PoseMode) {
        let previous = self.poses.mode();
        self.poses.set_mode(mode);
        self.after_mode_change(previous);
    }

    /// Show a pose mode temporarily; the custom snapshot survives
    pub fn preview_pose_mode(&mut self, mode: PoseMode) {
        let previous = self.poses.mode();
        self.poses.preview_mode(mode);
        self.after_mode_change(previous);
    }

    fn after_mode_change(&mut self, previous: PoseMode) {
        let mode = self.poses.mode();
        if mode != previous {
            log::info!("Pose mode {:?} -> {:?}", previous, mode);
            self.gaze.reset();
        }
        self.scheduler.cancel();
        self.apply_update();
    }

    pub fn import_clip(&mut self, json: &str) -> Result<ClipImport, ClipError> {
        let clip = PoseClip::from_json(json)?;
        let previous = self.poses.mode();
        let name = clip.name.clone();
        let import = self.poses.import_clip(clip, self.avatar.skeleton.roles());
        if previous != PoseMode::Custom {
            self.gaze.reset();
        }
        log::info!("Imported clip '{}' as {:?}", name, import);

        self.apply_pose();
        if !self.poses.is_playing() {
            self.scheduler.settle();
        }
        Ok(import)
    }

    /// Store the current pose as the custom snapshot. Custom mode only.
    pub fn capture_custom_pose(&mut self) -> bool {
        if !self.poses.is_custom() {
            return false;
        }
        self.poses.capture(self.avatar.skeleton.roles());
        true
    }

    pub fn toggle_playback(&mut self) -> bool {
        self.poses.toggle_playback()
    }

    // --- Direct manipulation ---

    /// Hit-test the bone markers. Custom mode only, and never while a clip
    /// plays or a handle is being dragged.
    pub fn pointer_down(&mut self, ray: &Ray) -> PickOutcome {
        if !self.poses.is_custom() || self.poses.is_playing() || self.poses.is_dragging() {
            return PickOutcome::Ignored;
        }
        let markers = self.bone_markers();
        let Some(role) = pick_marker(ray, &markers) else {
            return PickOutcome::Missed;
        };
        if role.is_eye() {
            return PickOutcome::GazeMenu { role };
        }
        match self.poses.select(role, &self.avatar.skeleton) {
            Some(_) => PickOutcome::Attached { role },
            None => PickOutcome::Missed,
        }
    }

    pub fn drag_proxy(&mut self, proxy: Proxy) -> bool {
        if self.poses.is_playing() {
            return false;
        }
        if !self.poses.drag(proxy, &self.avatar.skeleton, &self.offsets) {
            return false;
        }
        self.apply_pose();
        true
    }

    pub fn end_drag(&mut self) {
        self.poses.end_drag();
    }

    pub fn detach_selection(&mut self) {
        self.poses.detach();
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.poses.selection()
    }

    pub fn is_bone_selected(&self, role: BoneRole) -> bool {
        self.poses.selection().is_some_and(|s| s.role == role)
    }

    /// Overlay markers; empty outside Custom mode
    pub fn bone_markers(&self) -> Vec<BoneMarker> {
        if !self.poses.is_custom() {
            return Vec::new();
        }
        let selected = self.poses.selection().map(|s| s.role);
        bone_markers(&self.avatar.skeleton, selected, &self.config)
    }

    // --- Expressions and gaze ---

    pub fn set_auto_blink(&mut self, enabled: bool) {
        self.blink.set_enabled(enabled, self.scheduler.now_ms());
    }

    pub fn set_gaze(&mut self, x: f32, y: f32) {
        self.gaze.set_pad(Vec2::new(x, y));
    }

    /// Toggle camera following. Turning it off points the pad at where the
    /// camera is, so the eyes do not jump.
    pub fn set_look_at_camera(&mut self, enabled: bool, camera: Vec3) {
        self.gaze.set_look_at_camera(enabled);
        if !enabled {
            self.sync_gaze_with_camera(camera);
        }
    }

    pub fn sync_gaze_with_camera(&mut self, camera: Vec3) {
        if let Some(basis) = self.gaze_basis() {
            self.gaze.sync_with_camera(camera, &basis, self.avatar.format);
        }
    }

    fn gaze_basis(&self) -> Option<GazeBasis> {
        let head_rotation = self
            .poses
            .pose()
            .world_rotation(&self.avatar.skeleton, BoneRole::Head);
        GazeBasis::measure(&self.avatar.skeleton, head_rotation, &self.config)
    }

    // --- Frame ---

    /// Advance one frame by `dt` seconds
    pub fn tick(&mut self, dt: f32) -> Frame {
        let dt = self.scheduler.advance_clock(dt);
        let playing = self.poses.is_playing();

        let pose_changed = self.poses.advance(dt);
        if self.scheduler.take_due() {
            self.apply_update();
        } else if pose_changed {
            self.poses.pose().apply(&mut self.avatar.skeleton, &self.offsets);
        }

        let auto_blink = self.blink.update(self.scheduler.now_ms());

        let look_at = if self.poses.is_custom() {
            self.gaze_basis()
                .map(|basis| self.gaze.target(&basis, self.avatar.format))
        } else {
            None
        };

        let physics = self.scheduler.physics_step(dt, playing);
        self.reposition_root();
        self.poses.follow_selection(&self.avatar.skeleton);

        Frame {
            expressions: self.mixer.mix(&self.params, auto_blink),
            look_at,
            physics,
        }
    }

    // --- Read access ---

    pub fn world_matrices(&self) -> Vec<Mat4> {
        self.avatar.skeleton.world_matrices()
    }

    /// Current radius of every collider, in load order
    pub fn collider_radii(&self) -> Vec<f32> {
        self.avatar.colliders.iter().map(|c| c.shape.radius()).collect()
    }

    pub fn root_translation(&self) -> Vec3 {
        self.avatar.skeleton.root().translation
    }
}

/// Functions should take explicit references to what they need, not access
/// this struct directly via globals.
pub struct AppState {
    pub config: EditorConfig,
    /// Session for the loaded avatar (only one at a time)
    pub session: Option<EditorSession>,
}

impl AppState {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Replace any current session with one for `avatar`
    pub fn load_avatar(&mut self, avatar: Avatar) {
        if self.session.take().is_some() {
            log::info!("Replacing loaded avatar");
        }
        let rng = SmallRng::seed_from_u64(entropy_seed());
        self.session = Some(EditorSession::new(avatar, self.config.clone(), rng));
    }

    pub fn unload(&mut self) {
        if self.session.take().is_some() {
            log::info!("Avatar unloaded");
        }
    }

    pub fn session(&self) -> Option<&EditorSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut EditorSession> {
        self.session.as_mut()
    }
}

fn entropy_seed() -> u64 {
    match getrandom::u64() {
        Ok(seed) => seed,
        Err(err) => {
            log::warn!("No system entropy ({}), seeding from the clock", err);
            clock_seed()
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        fn clock_seed() -> u64 {
            web_sys::window()
                .and_then(|w| w.performance())
                .map(|p| p.now().to_bits())
                .unwrap_or_default()
        }
    } else {
        fn clock_seed() -> u64 {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default()
        }
    }
}

// Global state access, thin wrapper for WASM bindings only
thread_local! {
    static APP_STATE: RefCell<Option<AppState>> = const { RefCell::new(None) };
}

/// Execute a closure with immutable access to AppState
///
/// Returns None if AppState is not initialized
pub fn with_app_state<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&AppState) -> R,
{
    APP_STATE.with(|state| {
        let borrowed = state.borrow();
        borrowed.as_ref().map(f)
    })
}

/// Execute a closure with mutable access to AppState
///
/// Returns None if AppState is not initialized
pub fn with_app_state_mut<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut AppState) -> R,
{
    APP_STATE.with(|state| {
        let mut borrowed = state.borrow_mut();
        borrowed.as_mut().map(f)
    })
}

/// Install a fresh AppState, dropping any loaded avatar
pub fn initialize_app_state(config: EditorConfig) {
    APP_STATE.with(|state| {
        *state.borrow_mut() = Some(AppState::new(config));
    });
}
