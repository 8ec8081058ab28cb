//! wasm-bindgen entry points over the thread-local editor state.

use std::fmt::Display;

use glam::{Mat4, Quat, Vec2, Vec3};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::avatar::Avatar;
use crate::bone::BoneRole;
use crate::config::EditorConfig;
use crate::params::PresetKind;
use crate::picker::{Proxy, Ray};
use crate::pose_state::PoseMode;
use crate::state::{self, EditorSession};

fn js_error(err: impl Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn no_avatar() -> JsValue {
    JsValue::from_str("No avatar loaded")
}

/// Helper to access the current session with mutable access
fn with_session_mut<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut EditorSession) -> R,
{
    state::with_app_state_mut(|app| app.session_mut().map(f)).flatten()
}

/// Helper to access the current session with read-only access
fn with_session<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&EditorSession) -> R,
{
    state::with_app_state(|app| app.session().map(f)).flatten()
}

/// Plain objects rather than `Map`s, so the UI can index by key
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(js_error)
}

fn mat4(values: &[f32]) -> Result<Mat4, JsValue> {
    let cols: &[f32; 16] = values
        .try_into()
        .map_err(|_| js_error(format!("expected 16 matrix values, got {}", values.len())))?;
    Ok(Mat4::from_cols_array(cols))
}

fn preset_kind(name: &str) -> Result<PresetKind, JsValue> {
    PresetKind::from_name(name).ok_or_else(|| js_error(format!("Unknown preset type '{}'", name)))
}

fn pose_mode(name: &str) -> Result<PoseMode, JsValue> {
    PoseMode::from_name(name).ok_or_else(|| js_error(format!("Unknown pose mode '{}'", name)))
}

/// Set up logging and the global state. `config_json` may be empty.
#[wasm_bindgen]
pub fn init(config_json: Option<String>) -> Result<(), JsValue> {
    // Set up panic hook for better error messages in browser console
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();

    let config = match config_json.as_deref() {
        Some(json) if !json.trim().is_empty() => EditorConfig::from_json(json).map_err(js_error)?,
        _ => EditorConfig::default(),
    };
    state::initialize_app_state(config);
    log::info!("Editor core initialized");
    Ok(())
}

/// Load an avatar description, replacing any current avatar
#[wasm_bindgen]
pub fn load_avatar(description_json: &str) -> Result<(), JsValue> {
    state::with_app_state_mut(|app| {
        let avatar = Avatar::from_json(description_json, &app.config).map_err(|e| {
            log::warn!("Avatar rejected: {}", e);
            js_error(e)
        })?;
        app.load_avatar(avatar);
        Ok(())
    })
    .unwrap_or_else(|| Err(js_error("init() has not been called")))
}

#[wasm_bindgen]
pub fn unload_avatar() {
    state::with_app_state_mut(|app| app.unload());
}

// --- Parameters ---

#[wasm_bindgen]
pub fn set_parameter(name: &str, value: f32) {
    with_session_mut(|session| session.set_parameter(name, value));
}

#[wasm_bindgen]
pub fn set_custom_expression(name: &str, value: f32) {
    with_session_mut(|session| session.set_custom_expression(name, value));
}

#[wasm_bindgen]
pub fn reset_parameters() {
    with_session_mut(|session| session.reset_parameters());
}

/// Current slider values as a plain object
#[wasm_bindgen]
pub fn get_parameters() -> Result<JsValue, JsValue> {
    with_session(|session| to_js(session.params())).unwrap_or_else(|| Err(no_avatar()))
}

#[wasm_bindgen]
pub fn begin_edit() {
    with_session_mut(|session| session.begin_edit());
}

#[wasm_bindgen]
pub fn undo() -> bool {
    with_session_mut(|session| session.undo()).unwrap_or(false)
}

#[wasm_bindgen]
pub fn redo() -> bool {
    with_session_mut(|session| session.redo()).unwrap_or(false)
}

#[wasm_bindgen]
pub fn can_undo() -> bool {
    with_session(|session| session.can_undo()).unwrap_or(false)
}

#[wasm_bindgen]
pub fn can_redo() -> bool {
    with_session(|session| session.can_redo()).unwrap_or(false)
}

#[wasm_bindgen]
pub fn export_preset(kind: &str) -> Result<String, JsValue> {
    let kind = preset_kind(kind)?;
    with_session(|session| session.export_preset(kind).map_err(js_error))
        .unwrap_or_else(|| Err(no_avatar()))
}

#[wasm_bindgen]
pub fn import_preset(json: &str, active_kind: &str) -> Result<(), JsValue> {
    let kind = preset_kind(active_kind)?;
    with_session_mut(|session| session.import_preset(json, kind).map_err(js_error))
        .unwrap_or_else(|| Err(no_avatar()))
}

// --- Pose ---

#[wasm_bindgen]
pub fn set_pose_mode(mode: &str) -> Result<(), JsValue> {
    let mode = pose_mode(mode)?;
    with_session_mut(|session| session.set_pose_mode(mode)).ok_or_else(no_avatar)
}

#[wasm_bindgen]
pub fn preview_pose_mode(mode: &str) -> Result<(), JsValue> {
    let mode = pose_mode(mode)?;
    with_session_mut(|session| session.preview_pose_mode(mode)).ok_or_else(no_avatar)
}

#[wasm_bindgen]
pub fn get_pose_mode() -> Result<JsValue, JsValue> {
    with_session(|session| to_js(&session.pose_mode())).unwrap_or_else(|| Err(no_avatar()))
}

/// Import a clip. Resolves to "looping" or "captured".
#[wasm_bindgen]
pub fn import_clip(json: &str) -> Result<JsValue, JsValue> {
    with_session_mut(|session| match session.import_clip(json) {
        Ok(import) => to_js(&import),
        Err(e) => {
            log::warn!("Clip rejected: {}", e);
            Err(js_error(e))
        }
    })
    .unwrap_or_else(|| Err(no_avatar()))
}

#[wasm_bindgen]
pub fn capture_custom_pose() -> bool {
    with_session_mut(|session| session.capture_custom_pose()).unwrap_or(false)
}

#[wasm_bindgen]
pub fn toggle_playback() -> bool {
    with_session_mut(|session| session.toggle_playback()).unwrap_or(false)
}

// --- Direct manipulation ---

/// Hit-test at a pointer position given in normalized device coordinates
#[wasm_bindgen]
pub fn pointer_down(ndc_x: f32, ndc_y: f32, view: &[f32], projection: &[f32]) -> Result<JsValue, JsValue> {
    let ray = Ray::from_ndc(Vec2::new(ndc_x, ndc_y), mat4(view)?, mat4(projection)?);
    with_session_mut(|session| to_js(&session.pointer_down(&ray))).unwrap_or_else(|| Err(no_avatar()))
}

/// Feed the transform handle's proxy back into the pose.
/// `position` is `[x, y, z]`, `rotation` is `[x, y, z, w]`.
#[wasm_bindgen]
pub fn drag_proxy(position: &[f32], rotation: &[f32]) -> Result<bool, JsValue> {
    let position: [f32; 3] = position
        .try_into()
        .map_err(|_| js_error("proxy position needs 3 values"))?;
    let rotation: [f32; 4] = rotation
        .try_into()
        .map_err(|_| js_error("proxy rotation needs 4 values"))?;
    let proxy = Proxy {
        position: Vec3::from_array(position),
        rotation: Quat::from_array(rotation).normalize(),
    };
    Ok(with_session_mut(|session| session.drag_proxy(proxy)).unwrap_or(false))
}

#[wasm_bindgen]
pub fn end_drag() {
    with_session_mut(|session| session.end_drag());
}

#[wasm_bindgen]
pub fn detach_selection() {
    with_session_mut(|session| session.detach_selection());
}

/// Current selection with its proxy transform, or null
#[wasm_bindgen]
pub fn get_selection() -> Result<JsValue, JsValue> {
    with_session(|session| to_js(&session.selection())).unwrap_or(Ok(JsValue::NULL))
}

#[wasm_bindgen]
pub fn is_bone_selected(role: &str) -> bool {
    let Some(role) = BoneRole::from_name(role) else {
        return false;
    };
    with_session(|session| session.is_bone_selected(role)).unwrap_or(false)
}

/// Marker records, 32 bytes each
#[wasm_bindgen]
pub fn get_bone_markers() -> Vec<u8> {
    with_session(|session| bytemuck::cast_slice::<_, u8>(&session.bone_markers()).to_vec()).unwrap_or_default()
}

// --- Expressions and gaze ---

#[wasm_bindgen]
pub fn set_auto_blink(enabled: bool) {
    with_session_mut(|session| session.set_auto_blink(enabled));
}

#[wasm_bindgen]
pub fn set_gaze(x: f32, y: f32) {
    with_session_mut(|session| session.set_gaze(x, y));
}

#[wasm_bindgen]
pub fn set_look_at_camera(enabled: bool, camera_x: f32, camera_y: f32, camera_z: f32) {
    let camera = Vec3::new(camera_x, camera_y, camera_z);
    with_session_mut(|session| session.set_look_at_camera(enabled, camera));
}

#[wasm_bindgen]
pub fn sync_gaze_with_camera(camera_x: f32, camera_y: f32, camera_z: f32) -> Vec<f32> {
    let camera = Vec3::new(camera_x, camera_y, camera_z);
    with_session_mut(|session| {
        session.sync_gaze_with_camera(camera);
        session.gaze().pad().to_array().to_vec()
    })
    .unwrap_or_default()
}

// --- Frame ---

/// Advance one frame. Returns expression weights, the look-at target and
/// the physics instruction.
#[wasm_bindgen]
pub fn tick(dt: f32) -> Result<JsValue, JsValue> {
    with_session_mut(|session| to_js(&session.tick(dt))).unwrap_or(Ok(JsValue::NULL))
}

/// Column-major world matrices, 16 floats per node in arena order
#[wasm_bindgen]
pub fn get_world_matrices() -> Vec<f32> {
    with_session(|session| bytemuck::cast_slice::<_, f32>(&session.world_matrices()).to_vec()).unwrap_or_default()
}

#[wasm_bindgen]
pub fn get_node_names() -> Result<JsValue, JsValue> {
    with_session(|session| {
        let names: Vec<&str> = session
            .avatar()
            .skeleton
            .nodes()
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        to_js(&names)
    })
    .unwrap_or_else(|| Err(no_avatar()))
}

#[wasm_bindgen]
pub fn get_collider_radii() -> Vec<f32> {
    with_session(|session| session.collider_radii()).unwrap_or_default()
}

#[wasm_bindgen]
pub fn get_root_translation() -> Vec<f32> {
    with_session(|session| session.root_translation().to_array().to_vec()).unwrap_or_default()
}
