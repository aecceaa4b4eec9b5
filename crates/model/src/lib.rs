use serde::{Deserialize, Serialize};
use std::fmt;

mod geom;
pub use geom::{Orientation, Vec3};

/// Backend-assigned actor identifier, stable for the actor's lifetime.
pub type ActorId = u32;

/// One simulation tick as reported by the backend snapshot query.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct FrameSnapshot {
    pub frame_id: u64,
    pub platform_timestamp: f64,
}

/// Kinematic state of one tracked actor, re-read every frame.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct ActorState {
    pub id: ActorId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub orientation: Orientation,
}

/// Another vehicle projected into the ego reference frame.
///
/// Built per frame during assessment and discarded after classification.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct ThreatCandidate {
    pub actor_id: ActorId,
    /// Meters ahead of the ego along its forward axis.
    pub longitudinal: f64,
    /// Meters to the side of the ego along its right axis.
    pub lateral: f64,
    /// Relative speed along the ego forward axis, m/s. Positive = closing.
    pub closing_speed: f64,
    /// Seconds until the longitudinal gap closes at the current rate.
    pub ttc: f64,
}

/// Collision-risk level exposed through the status channel.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Status {
    NotConnected = 0,
    Activated = 1,
    Warning = 2,
    MildBraking = 3,
    StrongBraking = 4,
}

impl Status {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Status::NotConnected),
            1 => Some(Status::Activated),
            2 => Some(Status::Warning),
            3 => Some(Status::MildBraking),
            4 => Some(Status::StrongBraking),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::NotConnected => "not connected",
            Status::Activated => "activated",
            Status::Warning => "warning",
            Status::MildBraking => "mild braking",
            Status::StrongBraking => "strong braking",
        };
        f.write_str(name)
    }
}

/// Time-to-collision thresholds and candidate filters, fixed per run.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct ThresholdConfig {
    /// TTC below this raises `Warning` (seconds).
    #[serde(default = "ThresholdConfig::default_ttc_warning")]
    pub ttc_warning: f64,
    /// TTC below this raises `MildBraking` (seconds).
    #[serde(default = "ThresholdConfig::default_ttc_mild_braking")]
    pub ttc_mild_braking: f64,
    /// TTC below this raises `StrongBraking` (seconds).
    #[serde(default = "ThresholdConfig::default_ttc_strong_braking")]
    pub ttc_strong_braking: f64,
    /// Extra lateral slack beyond half the lane width (meters).
    #[serde(default = "ThresholdConfig::default_lateral_margin")]
    pub lateral_margin: f64,
    /// Candidates closing slower than this are ignored (m/s).
    #[serde(default = "ThresholdConfig::default_min_closing_speed")]
    pub min_closing_speed: f64,
}

impl ThresholdConfig {
    fn default_ttc_warning() -> f64 {
        2.5
    }
    fn default_ttc_mild_braking() -> f64 {
        2.0
    }
    fn default_ttc_strong_braking() -> f64 {
        1.5
    }
    fn default_lateral_margin() -> f64 {
        0.5
    }
    fn default_min_closing_speed() -> f64 {
        0.05
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            ttc_warning: Self::default_ttc_warning(),
            ttc_mild_braking: Self::default_ttc_mild_braking(),
            ttc_strong_braking: Self::default_ttc_strong_braking(),
            lateral_margin: Self::default_lateral_margin(),
            min_closing_speed: Self::default_min_closing_speed(),
        }
    }
}

/// One diagnostic event bound for the telemetry broker.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct MetricEvent {
    pub topic: String,
    pub timestamp_ns: i64,
    pub event: String,
    pub value: i64,
}
