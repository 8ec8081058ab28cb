//! Tuning constants for retargeting, posing and the frame scheduler.
//!
//! The cosmetic offsets are empirically tuned; they live here so they can be
//! overridden from JSON without touching the algorithms that read them.

use serde::{Deserialize, Serialize};

// --- Retargeting ---

/// Hips z offset per unit of hipSize above 1.0 (meters)
pub const HIPS_Z_FACTOR: f32 = -0.22;

/// Chest-like bone z offset per unit of chestSize above 1.0 (meters)
pub const CHEST_Z_FACTOR: f32 = -0.05;

/// Height the root rises per unit of footSize above 1.0 (meters)
pub const FOOT_BASE_HEIGHT: f32 = 0.11;

/// Used when the hips-to-foot distance cannot be measured at load
pub const FALLBACK_LEG_LENGTH: f32 = 0.75;

// --- Canned poses ---

/// Upper-arm lowering for A-Pose (radians)
pub const A_POSE_ANGLE: f32 = 0.8;

/// Upper-arm lowering for Stand (radians)
pub const STAND_ANGLE: f32 = 1.4;

// --- Scheduling ---

pub const THROTTLE_MS: f64 = 33.0;
pub const STABILIZATION_FRAMES: u32 = 30;

/// Upper bound on a single frame step (seconds)
pub const MAX_FRAME_DELTA: f32 = 0.05;

// --- Picking / gaze ---

pub const MARKER_RADIUS: f32 = 0.02;
pub const SMALL_MARKER_RADIUS: f32 = 0.004;
pub const GAZE_DISTANCE: f32 = 5.0;
pub const GAZE_SENSITIVITY: f32 = 20.0;

/// Lift above the head joint used as gaze origin when eye bones are missing
pub const EYE_HEIGHT_FALLBACK: f32 = 0.1;

pub const HISTORY_DEPTH: usize = 50;

/// Auto-blink timings in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlinkTiming {
    pub close_ms: f64,
    pub open_ms: f64,
    pub first_delay_ms: f64,
    pub min_interval_ms: f64,
    pub max_interval_ms: f64,
}

impl Default for BlinkTiming {
    fn default() -> Self {
        Self {
            close_ms: 100.0,
            open_ms: 150.0,
            first_delay_ms: 2000.0,
            min_interval_ms: 2000.0,
            max_interval_ms: 5000.0,
        }
    }
}

/// Editor-wide configuration. Every field falls back to its default when
/// absent from the JSON it was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub hips_z_factor: f32,
    pub chest_z_factor: f32,
    pub foot_base_height: f32,
    pub fallback_leg_length: f32,
    pub a_pose_angle: f32,
    pub stand_angle: f32,
    pub throttle_ms: f64,
    pub stabilization_frames: u32,
    pub max_frame_delta: f32,
    pub blink: BlinkTiming,
    pub history_depth: usize,
    pub marker_radius: f32,
    pub small_marker_radius: f32,
    pub gaze_distance: f32,
    pub gaze_sensitivity: f32,
    pub eye_height_fallback: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            hips_z_factor: HIPS_Z_FACTOR,
            chest_z_factor: CHEST_Z_FACTOR,
            foot_base_height: FOOT_BASE_HEIGHT,
            fallback_leg_length: FALLBACK_LEG_LENGTH,
            a_pose_angle: A_POSE_ANGLE,
            stand_angle: STAND_ANGLE,
            throttle_ms: THROTTLE_MS,
            stabilization_frames: STABILIZATION_FRAMES,
            max_frame_delta: MAX_FRAME_DELTA,
            blink: BlinkTiming::default(),
            history_depth: HISTORY_DEPTH,
            marker_radius: MARKER_RADIUS,
            small_marker_radius: SMALL_MARKER_RADIUS,
            gaze_distance: GAZE_DISTANCE,
            gaze_sensitivity: GAZE_SENSITIVITY,
            eye_height_fallback: EYE_HEIGHT_FALLBACK,
        }
    }
}

impl EditorConfig {
    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
