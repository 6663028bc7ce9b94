use std::path::Path;

use omr_anchor::AnchorQuad;
use omr_sheet::{CorrectionResults, Stats};
use serde::{Deserialize, Serialize};

use crate::io::{read_json, write_json, OmrIoError};
use crate::SessionController;

/// Serializable summary of a confirmed scan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Questions present in the layout.
    pub layout_questions: usize,
    /// Questions that were graded.
    pub graded_questions: usize,
    pub frames_seen: u64,
    /// Frame on which the last question confirmed.
    pub completed_at: Option<u64>,
    pub anchors: Option<AnchorQuad>,
    pub stats: Stats,
    pub results: CorrectionResults,
}

impl ScanReport {
    pub fn new(session: &SessionController, results: CorrectionResults) -> Self {
        Self {
            layout_questions: session.layout().questions().count(),
            graded_questions: session.book().len(),
            frames_seen: session.frames_seen(),
            completed_at: session.completed_at(),
            anchors: session.detected_anchors().copied(),
            stats: *session.stats(),
            results,
        }
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, OmrIoError> {
        read_json(path.as_ref())
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), OmrIoError> {
        write_json(self, path.as_ref())
    }
}
