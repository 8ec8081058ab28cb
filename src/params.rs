//! Body-shape and expression parameters, plus the JSON preset format.
//!
//! Body sliders are multiplicative factors centered on 1.0. Expression
//! sliders are blend weights in [0, 1]. Custom expressions are keyed by the
//! names the loaded avatar declares.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ParameterImportError;

pub const CUSTOM_EXPRESSIONS_KEY: &str = "customExpressions";

/// Body-shape slider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BodyKey {
    HeadSize,
    NeckWidth,
    NeckHeight,
    ShoulderWidth,
    ChestSize,
    ArmLength,
    ArmMuscle,
    ForearmSize,
    HandSize,
    FingerSize,
    StomachSize,
    TorsoHeight,
    WaistWidth,
    HipSize,
    LegLength,
    ThighSize,
    CalfSize,
    FootSize,
    ToeSize,
}

impl BodyKey {
    pub const COUNT: usize = 19;

    pub const ALL: [BodyKey; Self::COUNT] = [
        BodyKey::HeadSize,
        BodyKey::NeckWidth,
        BodyKey::NeckHeight,
        BodyKey::ShoulderWidth,
        BodyKey::ChestSize,
        BodyKey::ArmLength,
        BodyKey::ArmMuscle,
        BodyKey::ForearmSize,
        BodyKey::HandSize,
        BodyKey::FingerSize,
        BodyKey::StomachSize,
        BodyKey::TorsoHeight,
        BodyKey::WaistWidth,
        BodyKey::HipSize,
        BodyKey::LegLength,
        BodyKey::ThighSize,
        BodyKey::CalfSize,
        BodyKey::FootSize,
        BodyKey::ToeSize,
    ];

    const NAMES: [&'static str; Self::COUNT] = [
        "headSize",
        "neckWidth",
        "neckHeight",
        "shoulderWidth",
        "chestSize",
        "armLength",
        "armMuscle",
        "forearmSize",
        "handSize",
        "fingerSize",
        "stomachSize",
        "torsoHeight",
        "waistWidth",
        "hipSize",
        "legLength",
        "thighSize",
        "calfSize",
        "footSize",
        "toeSize",
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        Self::NAMES[self.index()]
    }

    pub fn from_name(name: &str) -> Option<BodyKey> {
        Self::NAMES.iter().position(|n| *n == name).map(|i| Self::ALL[i])
    }
}

/// Standard expression preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExpressionKey {
    Neutral,
    Happy,
    Angry,
    Sad,
    Relaxed,
    Surprised,
    Aa,
    Ih,
    Ou,
    Ee,
    Oh,
    Blink,
    BlinkLeft,
    BlinkRight,
    LookUp,
    LookDown,
    LookLeft,
    LookRight,
}

impl ExpressionKey {
    pub const COUNT: usize = 18;

    pub const ALL: [ExpressionKey; Self::COUNT] = [
        ExpressionKey::Neutral,
        ExpressionKey::Happy,
        ExpressionKey::Angry,
        ExpressionKey::Sad,
        ExpressionKey::Relaxed,
        ExpressionKey::Surprised,
        ExpressionKey::Aa,
        ExpressionKey::Ih,
        ExpressionKey::Ou,
        ExpressionKey::Ee,
        ExpressionKey::Oh,
        ExpressionKey::Blink,
        ExpressionKey::BlinkLeft,
        ExpressionKey::BlinkRight,
        ExpressionKey::LookUp,
        ExpressionKey::LookDown,
        ExpressionKey::LookLeft,
        ExpressionKey::LookRight,
    ];

    const PRESET_NAMES: [&'static str; Self::COUNT] = [
        "neutral",
        "happy",
        "angry",
        "sad",
        "relaxed",
        "surprised",
        "aa",
        "ih",
        "ou",
        "ee",
        "oh",
        "blink",
        "blinkLeft",
        "blinkRight",
        "lookUp",
        "lookDown",
        "lookLeft",
        "lookRight",
    ];

    const PARAM_NAMES: [&'static str; Self::COUNT] = [
        "expNeutral",
        "expHappy",
        "expAngry",
        "expSad",
        "expRelaxed",
        "expSurprised",
        "expAa",
        "expIh",
        "expOu",
        "expEe",
        "expOh",
        "expBlink",
        "expBlinkLeft",
        "expBlinkRight",
        "expLookUp",
        "expLookDown",
        "expLookLeft",
        "expLookRight",
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Name the avatar's expression manager uses
    pub const fn preset_name(self) -> &'static str {
        Self::PRESET_NAMES[self.index()]
    }

    /// Name of the slider in parameter records and presets
    pub const fn param_name(self) -> &'static str {
        Self::PARAM_NAMES[self.index()]
    }

    pub fn from_param_name(name: &str) -> Option<ExpressionKey> {
        Self::PARAM_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| Self::ALL[i])
    }
}

/// Any known slider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKey {
    Body(BodyKey),
    Expression(ExpressionKey),
}

impl ParamKey {
    pub fn parse(name: &str) -> Option<ParamKey> {
        BodyKey::from_name(name)
            .map(ParamKey::Body)
            .or_else(|| ExpressionKey::from_param_name(name).map(ParamKey::Expression))
    }
}

/// Preset category, matching the editor tab it was exported from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetKind {
    Expression,
    Body,
}

impl PresetKind {
    /// Range imported numeric values are clamped to
    pub fn clamp_range(self) -> (f32, f32) {
        match self {
            PresetKind::Expression => (0.0, 1.0),
            PresetKind::Body => (0.5, 2.0),
        }
    }

    pub fn from_name(name: &str) -> Option<PresetKind> {
        match name {
            "expression" => Some(PresetKind::Expression),
            "body" => Some(PresetKind::Body),
            _ => None,
        }
    }

    /// Whether a parameter key belongs to this category
    fn owns_key(self, key: &str) -> bool {
        let is_expression = key.starts_with("exp") || key == CUSTOM_EXPRESSIONS_KEY;
        match self {
            PresetKind::Expression => is_expression,
            PresetKind::Body => !is_expression,
        }
    }
}

impl fmt::Display for PresetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetKind::Expression => write!(f, "expression"),
            PresetKind::Body => write!(f, "body"),
        }
    }
}

/// The full slider record
#[derive(Debug, Clone, PartialEq)]
pub struct BodyParameters {
    body: [f32; BodyKey::COUNT],
    expressions: [f32; ExpressionKey::COUNT],
    pub custom_expressions: BTreeMap<String, f32>,
    /// Keys not known to this build, carried through presets unchanged
    pub extra: BTreeMap<String, Value>,
}

impl Default for BodyParameters {
    fn default() -> Self {
        Self {
            body: [1.0; BodyKey::COUNT],
            expressions: [0.0; ExpressionKey::COUNT],
            custom_expressions: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl BodyParameters {
    /// Identity parameters with a zero weight for each custom expression
    pub fn with_custom_expressions<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut params = Self::default();
        for name in names {
            params.custom_expressions.insert(name.to_string(), 0.0);
        }
        params
    }

    #[inline]
    pub fn body(&self, key: BodyKey) -> f32 {
        self.body[key.index()]
    }

    #[inline]
    pub fn set_body(&mut self, key: BodyKey, value: f32) {
        self.body[key.index()] = value;
    }

    #[inline]
    pub fn expression(&self, key: ExpressionKey) -> f32 {
        self.expressions[key.index()]
    }

    #[inline]
    pub fn set_expression(&mut self, key: ExpressionKey, value: f32) {
        self.expressions[key.index()] = value;
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        match ParamKey::parse(name)? {
            ParamKey::Body(key) => Some(self.body(key)),
            ParamKey::Expression(key) => Some(self.expression(key)),
        }
    }

    /// Write a slider by name. Unknown names are kept in `extra`.
    pub fn set(&mut self, name: &str, value: f32) {
        match ParamKey::parse(name) {
            Some(ParamKey::Body(key)) => self.set_body(key, value),
            Some(ParamKey::Expression(key)) => self.set_expression(key, value),
            None => {
                self.extra.insert(name.to_string(), Value::from(value));
            }
        }
    }

    fn preset_params(&self, kind: PresetKind) -> Map<String, Value> {
        let mut params = Map::new();
        match kind {
            PresetKind::Body => {
                for key in BodyKey::ALL {
                    params.insert(key.name().to_string(), Value::from(self.body(key)));
                }
            }
            PresetKind::Expression => {
                for key in ExpressionKey::ALL {
                    params.insert(key.param_name().to_string(), Value::from(self.expression(key)));
                }
                let custom: Map<String, Value> = self
                    .custom_expressions
                    .iter()
                    .map(|(name, weight)| (name.clone(), Value::from(*weight)))
                    .collect();
                params.insert(CUSTOM_EXPRESSIONS_KEY.to_string(), Value::Object(custom));
            }
        }
        for (key, value) in &self.extra {
            if kind.owns_key(key) {
                params.insert(key.clone(), value.clone());
            }
        }
        params
    }

    /// Serialize one category as a preset file
    pub fn export_preset(&self, kind: PresetKind) -> Result<String, serde_json::Error> {
        let mut file = Map::new();
        file.insert("type".to_string(), Value::String(kind.to_string()));
        file.insert("params".to_string(), Value::Object(self.preset_params(kind)));
        serde_json::to_string_pretty(&Value::Object(file))
    }

    /// Apply a preset file on top of these parameters.
    ///
    /// Returns the updated record; `self` is never modified, so a failed
    /// import leaves the caller's parameters untouched.
    pub fn import_preset(
        &self,
        json: &str,
        active: PresetKind,
    ) -> Result<BodyParameters, ParameterImportError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ParameterImportError::Malformed(e.to_string()))?;

        let kind_name = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ParameterImportError::Malformed("missing 'type'".to_string()))?;
        let found = PresetKind::from_name(kind_name).ok_or_else(|| {
            ParameterImportError::Malformed(format!("unknown preset type '{}'", kind_name))
        })?;
        let params = value
            .get("params")
            .and_then(Value::as_object)
            .ok_or_else(|| ParameterImportError::Malformed("missing 'params'".to_string()))?;

        if found != active {
            return Err(ParameterImportError::WrongCategory {
                expected: active,
                found,
            });
        }

        let (lo, hi) = found.clamp_range();
        let (exp_lo, exp_hi) = PresetKind::Expression.clamp_range();
        let mut next = self.clone();

        for (key, value) in params {
            if key == CUSTOM_EXPRESSIONS_KEY {
                let Some(custom) = value.as_object() else {
                    return Err(ParameterImportError::Malformed(format!(
                        "'{}' must be an object",
                        CUSTOM_EXPRESSIONS_KEY
                    )));
                };
                for (name, weight) in custom {
                    let Some(weight) = weight.as_f64() else {
                        return Err(ParameterImportError::Malformed(format!(
                            "custom expression '{}' is not a number",
                            name
                        )));
                    };
                    next.custom_expressions
                        .insert(name.clone(), (weight as f32).clamp(exp_lo, exp_hi));
                }
                continue;
            }

            match ParamKey::parse(key) {
                Some(_) => {
                    let Some(number) = value.as_f64() else {
                        return Err(ParameterImportError::Malformed(format!(
                            "'{}' is not a number",
                            key
                        )));
                    };
                    next.set(key, (number as f32).clamp(lo, hi));
                }
                None => {
                    next.extra.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(next)
    }
}

impl Serialize for BodyParameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for key in BodyKey::ALL {
            map.serialize_entry(key.name(), &self.body(key))?;
        }
        for key in ExpressionKey::ALL {
            map.serialize_entry(key.param_name(), &self.expression(key))?;
        }
        map.serialize_entry(CUSTOM_EXPRESSIONS_KEY, &self.custom_expressions)?;
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
