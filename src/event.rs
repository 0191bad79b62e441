//! Detection events flowing from the external detector into the engine.

use serde::{Deserialize, Serialize};

/// Traffic features attached to a detection event.
///
/// `anomaly`, `entropy` and `frequency` are normalized scores in `[0, 1]`;
/// discretization clamps out-of-range inputs. `depth` is the nesting depth
/// of the field path and may be omitted, in which case it is derived from
/// the path itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Features {
    pub anomaly: f64,
    pub entropy: f64,
    pub frequency: f64,
    #[serde(default)]
    pub depth: Option<u32>,
}

impl Features {
    pub fn new(anomaly: f64, entropy: f64, frequency: f64) -> Self {
        Self {
            anomaly,
            entropy,
            frequency,
            depth: None,
        }
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }
}

/// Ground-truth label for a traffic event.
///
/// Only training traces carry labels; the live `/detect` payload never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficLabel {
    Benign,
    Malicious,
}

/// A single detection event for one `(service, path)` observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub service_id: String,
    pub path: String,
    #[serde(default)]
    pub payload: String,
    pub features: Features,
    /// Ground truth, when the caller has it. Drives the Q update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<TrafficLabel>,
}

impl Event {
    pub fn new(service_id: impl Into<String>, path: impl Into<String>, features: Features) -> Self {
        Self {
            service_id: service_id.into(),
            path: path.into(),
            payload: String::new(),
            features,
            label: None,
        }
    }

    pub fn with_label(mut self, label: TrafficLabel) -> Self {
        self.label = Some(label);
        self
    }
}
