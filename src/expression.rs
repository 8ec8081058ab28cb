//! Facial expression weights and the procedural blink.

use std::collections::BTreeMap;

use rand::rngs::SmallRng;
use rand::Rng;

use crate::config::BlinkTiming;
use crate::params::{BodyParameters, ExpressionKey};

/// Maps slider values onto the expression names a given avatar declares
#[derive(Debug, Clone, Default)]
pub struct ExpressionMixer {
    /// Avatar expression name for each preset, if the avatar has it
    presets: [Option<String>; ExpressionKey::COUNT],
    /// Avatar expressions that are not presets
    custom: Vec<String>,
}

impl ExpressionMixer {
    pub fn new(avatar_expressions: &[String]) -> Self {
        let mut presets: [Option<String>; ExpressionKey::COUNT] = Default::default();
        for key in ExpressionKey::ALL {
            presets[key.index()] = resolve_name(avatar_expressions, key.preset_name());
        }

        let custom = avatar_expressions
            .iter()
            .filter(|name| !presets.iter().flatten().any(|preset| preset == *name))
            .cloned()
            .collect();

        Self { presets, custom }
    }

    /// Non-preset expressions, which become the custom sliders
    pub fn custom_names(&self) -> impl Iterator<Item = &str> {
        self.custom.iter().map(String::as_str)
    }

    /// Weights keyed by the avatar's own expression names.
    ///
    /// The blink preset is `max(manual, auto_blink)`.
    pub fn mix(&self, params: &BodyParameters, auto_blink: f32) -> BTreeMap<String, f32> {
        let mut weights = BTreeMap::new();
        for key in ExpressionKey::ALL {
            let Some(name) = &self.presets[key.index()] else {
                continue;
            };
            let mut weight = params.expression(key);
            if key == ExpressionKey::Blink {
                weight = weight.max(auto_blink);
            }
            weights.insert(name.clone(), weight);
        }
        for (name, weight) in &params.custom_expressions {
            if let Some(resolved) = resolve_name(&self.custom, name) {
                weights.insert(resolved, *weight);
            }
        }
        weights
    }
}

/// Exact match first, then case-insensitive
fn resolve_name(names: &[String], wanted: &str) -> Option<String> {
    names
        .iter()
        .find(|n| n.as_str() == wanted)
        .or_else(|| names.iter().find(|n| n.eq_ignore_ascii_case(wanted)))
        .cloned()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BlinkPhase {
    Idle,
    Closing { started_ms: f64 },
    Opening { started_ms: f64 },
}

/// Periodic procedural blink
#[derive(Debug, Clone)]
pub struct AutoBlink {
    enabled: bool,
    phase: BlinkPhase,
    next_at_ms: f64,
    timing: BlinkTiming,
    rng: SmallRng,
}

impl AutoBlink {
    pub fn new(timing: BlinkTiming, rng: SmallRng) -> Self {
        Self {
            enabled: false,
            phase: BlinkPhase::Idle,
            next_at_ms: 0.0,
            timing,
            rng,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool, now_ms: f64) {
        if enabled && !self.enabled {
            self.next_at_ms = now_ms + self.timing.first_delay_ms;
        }
        self.enabled = enabled;
        self.phase = BlinkPhase::Idle;
    }

    /// Blink weight at `now_ms`; zero while disabled
    pub fn update(&mut self, now_ms: f64) -> f32 {
        if !self.enabled {
            return 0.0;
        }

        match self.phase {
            BlinkPhase::Idle => {
                if now_ms >= self.next_at_ms {
                    self.phase = BlinkPhase::Closing { started_ms: now_ms };
                }
                0.0
            }
            BlinkPhase::Closing { started_ms } => {
                let progress = (now_ms - started_ms) / self.timing.close_ms;
                if progress >= 1.0 {
                    self.phase = BlinkPhase::Opening { started_ms: now_ms };
                    1.0
                } else {
                    progress as f32
                }
            }
            BlinkPhase::Opening { started_ms } => {
                let progress = (now_ms - started_ms) / self.timing.open_ms;
                if progress >= 1.0 {
                    self.phase = BlinkPhase::Idle;
                    self.next_at_ms = now_ms + self.next_interval();
                    0.0
                } else {
                    1.0 - progress as f32
                }
            }
        }
    }

    fn next_interval(&mut self) -> f64 {
        let (min, max) = (self.timing.min_interval_ms, self.timing.max_interval_ms);
        if max > min {
            self.rng.random_range(min..max)
        } else {
            min
        }
    }
}
