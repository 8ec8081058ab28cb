//! Error types for the avatar editor core

use thiserror::Error;

use crate::params::PresetKind;

/// Failures while turning a loader description into a live avatar.
///
/// Both variants abort the load before any skeleton is constructed.
#[derive(Error, Debug)]
pub enum AvatarError {
    #[error("not a recognized avatar description: {0}")]
    AssetFormat(String),

    #[error("avatar license prohibits modification{}", license_suffix(.label))]
    LicenseRestricted { label: Option<String> },
}

fn license_suffix(label: &Option<String>) -> String {
    match label {
        Some(label) => format!(" ({label})"),
        None => String::new(),
    }
}

impl From<serde_json::Error> for AvatarError {
    fn from(err: serde_json::Error) -> Self {
        AvatarError::AssetFormat(err.to_string())
    }
}

/// Animation clip loader errors
#[derive(Error, Debug)]
pub enum ClipError {
    #[error("failed to parse animation clip: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("animation clip has no keyframes")]
    Empty,

    #[error("animation clip duration {0} is negative")]
    NegativeDuration(f32),
}

/// Preset import errors. Parameters are left untouched when one is returned.
#[derive(Error, Debug)]
pub enum ParameterImportError {
    #[error("malformed preset: {0}")]
    Malformed(String),

    #[error("preset of type '{found}' cannot be imported into the {expected} tab")]
    WrongCategory {
        expected: PresetKind,
        found: PresetKind,
    },
}

/// A scale axis was exactly zero where a reciprocal was needed.
///
/// Never surfaced to the user: callers substitute 1.0 for the axis.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("zero scale on {axis} axis")]
pub struct DegenerateTransform {
    pub axis: char,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_license_error_includes_label() {
        let err = AvatarError::LicenseRestricted {
            label: Some("CC_BY_ND".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "avatar license prohibits modification (CC_BY_ND)"
        );

        let bare = AvatarError::LicenseRestricted { label: None };
        assert_eq!(bare.to_string(), "avatar license prohibits modification");
    }

    #[test]
    fn test_wrong_category_message() {
        let err = ParameterImportError::WrongCategory {
            expected: PresetKind::Body,
            found: PresetKind::Expression,
        };
        assert!(err.to_string().contains("'expression'"));
        assert!(err.to_string().contains("body tab"));
    }
}
