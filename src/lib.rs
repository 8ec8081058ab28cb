//! VRM Body Editor - Wasm Core
//!
//! Body retargeting, posing and expression state for humanoid avatars,
//! driven from the browser through wasm-bindgen. Rendering and asset
//! decoding stay on the JavaScript side.

pub mod avatar;
pub mod bone;
pub mod config;
pub mod error;
pub mod expression;
pub mod gaze;
pub mod history;
mod math;
pub mod params;
pub mod picker;
pub mod pose_state;
pub mod retarget;
pub mod scheduler;
pub mod skeleton;
pub mod state;

#[cfg(target_arch = "wasm32")]
pub mod api;

#[cfg(test)]
mod testutil;

pub use avatar::{Avatar, AvatarDescription, FormatVersion};
pub use config::EditorConfig;
pub use error::{AvatarError, ClipError, ParameterImportError};
pub use params::{BodyKey, BodyParameters, ExpressionKey, PresetKind};
pub use pose_state::PoseMode;
pub use state::{EditorSession, Frame};

/// Tolerance for float comparisons in tests and degenerate-length checks
pub const EPSILON: f32 = 1e-4;
