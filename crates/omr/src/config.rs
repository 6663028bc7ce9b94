use std::path::Path;
use std::time::Duration;

use omr_anchor::AnchorParams;
use omr_sheet::{BubbleParams, StabilizerParams};
use serde::{Deserialize, Serialize};

use crate::capture::CaptureConstraints;
use crate::io::{read_json, write_json, OmrIoError};

/// Every tunable of a scanning session, loadable from JSON.
///
/// Missing sections fall back to their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub anchor: AnchorParams,
    pub bubble: BubbleParams,
    pub stabilizer: StabilizerParams,
    /// Period of the scan loop in milliseconds.
    pub tick_interval_ms: u64,
    pub capture: CaptureConstraints,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            anchor: AnchorParams::default(),
            bubble: BubbleParams::default(),
            stabilizer: StabilizerParams::default(),
            tick_interval_ms: 100,
            capture: CaptureConstraints::default(),
        }
    }
}

impl ScanConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, OmrIoError> {
        read_json(path.as_ref())
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), OmrIoError> {
        write_json(self, path.as_ref())
    }
}
