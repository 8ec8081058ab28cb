//! Frame clock, throttled body updates and the physics settling window.

use serde::Serialize;

use crate::config::EditorConfig;

/// Answer to an update request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateRequest {
    /// Enough time has passed; run the update now
    ApplyNow,
    /// Run it on the first tick at or after `deadline_ms`
    Deferred { deadline_ms: f64 },
}

/// What the secondary-motion simulation should do this frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "dt", rename_all = "camelCase")]
pub enum PhysicsStep {
    /// Reset springs to rest and step at zero delta
    ResetAndSettle,
    Advance(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameScheduler {
    now_ms: f64,
    last_applied_ms: Option<f64>,
    pending_deadline_ms: Option<f64>,
    settle_frames_left: u32,
    throttle_ms: f64,
    settle_frames: u32,
    max_frame_delta: f32,
}

impl FrameScheduler {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            now_ms: 0.0,
            last_applied_ms: None,
            pending_deadline_ms: None,
            settle_frames_left: 0,
            throttle_ms: config.throttle_ms,
            settle_frames: config.stabilization_frames,
            max_frame_delta: config.max_frame_delta,
        }
    }

    /// Session clock in milliseconds
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Advance the clock by a frame, returning the clamped delta in seconds
    pub fn advance_clock(&mut self, dt: f32) -> f32 {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.max_frame_delta)
        } else {
            0.0
        };
        self.now_ms += f64::from(dt) * 1000.0;
        dt
    }

    /// Ask to run the body update.
    ///
    /// Leading edge when the throttle interval has passed since the last
    /// applied update, otherwise one trailing deadline that replaces any
    /// earlier one.
    pub fn request_update(&mut self) -> UpdateRequest {
        match self.last_applied_ms {
            Some(last) if self.now_ms - last < self.throttle_ms => {
                let deadline_ms = last + self.throttle_ms;
                self.pending_deadline_ms = Some(deadline_ms);
                UpdateRequest::Deferred { deadline_ms }
            }
            _ => {
                self.pending_deadline_ms = None;
                UpdateRequest::ApplyNow
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending_deadline_ms.is_some()
    }

    /// Consume the pending update if its deadline has passed
    pub fn take_due(&mut self) -> bool {
        match self.pending_deadline_ms {
            Some(deadline) if self.now_ms >= deadline => {
                self.pending_deadline_ms = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending update
    pub fn cancel(&mut self) {
        if self.pending_deadline_ms.take().is_some() {
            log::debug!("Cancelled pending body update");
        }
    }

    /// Record that an update ran. Outside playback this opens the settling
    /// window.
    pub fn mark_applied(&mut self, playing: bool) {
        self.last_applied_ms = Some(self.now_ms);
        self.pending_deadline_ms = None;
        if !playing {
            self.settle();
        }
    }

    /// Open the settling window without touching the throttle
    pub fn settle(&mut self) {
        self.settle_frames_left = self.settle_frames;
    }

    pub fn is_settling(&self) -> bool {
        self.settle_frames_left > 0
    }

    /// Physics instruction for this frame. Consumes one settling frame.
    pub fn physics_step(&mut self, dt: f32, playing: bool) -> PhysicsStep {
        if self.settle_frames_left > 0 {
            self.settle_frames_left -= 1;
            PhysicsStep::ResetAndSettle
        } else if playing {
            PhysicsStep::Advance(dt)
        } else {
            PhysicsStep::Advance(0.0)
        }
    }
}
