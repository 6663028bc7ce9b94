use log::{debug, info};
use omr_anchor::{AnchorDetector, AnchorQuad};
use omr_core::{luminance, RgbaImageView};
use omr_sheet::{
    AnswerKey, BubbleReader, CorrectionResults, Layout, PerspectiveAligner, QuestionBook, Stats,
    TemporalStabilizer,
};
use serde::{Deserialize, Serialize};

use crate::render::{render_snapshots, Snapshots};
use crate::ScanConfig;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Scanning,
    /// Every question confirmed; waiting for the operator.
    AwaitingConfirmation,
    /// Results emitted.
    Confirmed,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no layout question has a correct answer to grade against")]
    NoGradableQuestions,
    #[error("operation needs phase {expected:?}, session is in {actual:?}")]
    WrongPhase { expected: Phase, actual: Phase },
}

/// Result of feeding one frame to the session.
#[derive(Debug)]
pub enum TickOutcome {
    /// Anchors not found; every accumulator was reset.
    AlignmentLost,
    /// Frame processed, `pending` questions still unconfirmed.
    Scanning { pending: usize },
    /// The last pending question confirmed on this frame.
    Completed(Box<Snapshots>),
    /// The session is not scanning; the frame was not looked at.
    Ignored,
}

/// One scanning session over a single answer sheet.
///
/// Owns the per-question state and drives the per-frame pipeline
/// anchors → alignment → bubble fills → debounce.
#[derive(Debug)]
pub struct SessionController {
    layout: Layout,
    detector: AnchorDetector,
    reader: BubbleReader,
    stabilizer: TemporalStabilizer,
    book: QuestionBook,
    phase: Phase,
    stats: Stats,
    detected_anchors: Option<AnchorQuad>,
    frames: u64,
    completed_at: Option<u64>,
}

impl SessionController {
    pub fn new(layout: Layout, key: &AnswerKey, config: &ScanConfig) -> Result<Self, SessionError> {
        let book = QuestionBook::new(&layout, key);
        if book.is_empty() {
            return Err(SessionError::NoGradableQuestions);
        }
        info!("session started with {} gradable questions", book.len());
        Ok(Self {
            layout,
            detector: AnchorDetector::new(config.anchor.clone()),
            reader: BubbleReader::new(config.bubble.clone()),
            stabilizer: TemporalStabilizer::new(config.stabilizer.clone()),
            book,
            phase: Phase::Scanning,
            stats: Stats::default(),
            detected_anchors: None,
            frames: 0,
            completed_at: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Anchors of the last frame, `None` after alignment was lost.
    pub fn detected_anchors(&self) -> Option<&AnchorQuad> {
        self.detected_anchors.as_ref()
    }

    pub fn book(&self) -> &QuestionBook {
        &self.book
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Frames processed while scanning.
    pub fn frames_seen(&self) -> u64 {
        self.frames
    }

    /// Frame number on which the last question confirmed.
    pub fn completed_at(&self) -> Option<u64> {
        self.completed_at
    }

    /// Run the full pipeline on one frame.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(frame = self.frames + 1))
    )]
    pub fn tick(&mut self, frame: &RgbaImageView<'_>) -> TickOutcome {
        if self.phase != Phase::Scanning {
            return TickOutcome::Ignored;
        }
        self.frames += 1;

        let gray = luminance(frame);
        let quad = match self.detector.find_anchors_gray(&gray.view()) {
            Ok(quad) => quad,
            Err(err) => {
                debug!("frame {}: {err}", self.frames);
                self.lose_alignment();
                return TickOutcome::AlignmentLost;
            }
        };
        self.detected_anchors = Some(quad);

        let alignment = match PerspectiveAligner::align(&quad, &self.layout) {
            Ok(alignment) => alignment,
            Err(err) => {
                debug!("frame {}: {err}", self.frames);
                self.lose_alignment();
                return TickOutcome::AlignmentLost;
            }
        };

        let aligned = alignment.warp_to_content(&gray.view());
        let fills = self
            .reader
            .measure(&aligned.view(), &self.layout, alignment.content_offset);
        for (_, state) in self.book.observe_frame(&self.stabilizer, &fills) {
            self.stats.record(state);
        }

        if !self.book.all_confirmed() {
            return TickOutcome::Scanning {
                pending: self.book.pending(),
            };
        }

        self.phase = Phase::AwaitingConfirmation;
        self.completed_at = Some(self.frames);
        info!(
            "all questions confirmed at frame {} ({} correct, {} incorrect, {} nullified)",
            self.frames, self.stats.correct, self.stats.incorrect, self.stats.nullified
        );
        let snapshots = render_snapshots(
            frame,
            &self.layout,
            &alignment,
            &quad,
            &self.book,
            &self.stats,
        );
        TickOutcome::Completed(Box::new(snapshots))
    }

    /// Accept the confirmed readings and emit the results.
    pub fn confirm(&mut self) -> Result<CorrectionResults, SessionError> {
        self.expect_phase(Phase::AwaitingConfirmation)?;
        self.phase = Phase::Confirmed;
        info!("results confirmed");
        Ok(self.book.results(&self.stabilizer))
    }

    /// Discard the readings and scan again.
    pub fn retry(&mut self) -> Result<(), SessionError> {
        self.expect_phase(Phase::AwaitingConfirmation)?;
        self.reset();
        self.phase = Phase::Scanning;
        info!("retrying scan");
        Ok(())
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    fn lose_alignment(&mut self) {
        if self.detected_anchors.is_some() {
            info!("alignment lost at frame {}, restarting all questions", self.frames);
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.book.reset();
        self.stats.clear();
        self.detected_anchors = None;
        self.completed_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omr_core::RgbaImage;

    fn layout() -> Layout {
        Layout::from_json(
            r#"{
            "anchors": [{"x": 10, "y": 10}, {"x": 110, "y": 10}, {"x": 110, "y": 90}, {"x": 10, "y": 90}],
            "fieldBlocks": {"Q1": {"bubbleCoordinates": [{"x": 40, "y": 40, "width": 8, "height": 8, "value": "A"}]}}
        }"#,
        )
        .expect("layout")
    }

    fn blank(w: usize, h: usize) -> RgbaImage {
        RgbaImage::from_raw(w, h, vec![255; w * h * 4]).expect("frame")
    }

    #[test]
    fn session_needs_gradable_questions() {
        let key = AnswerKey::from_json(r#"{"Q1": ""}"#).expect("key");
        let err = SessionController::new(layout(), &key, &ScanConfig::default()).unwrap_err();
        assert_eq!(err, SessionError::NoGradableQuestions);
    }

    #[test]
    fn blank_frames_lose_alignment() {
        let key = AnswerKey::from_json(r#"{"Q1": "A"}"#).expect("key");
        let mut session =
            SessionController::new(layout(), &key, &ScanConfig::default()).expect("session");
        let frame = blank(120, 100);
        assert!(matches!(session.tick(&frame.view()), TickOutcome::AlignmentLost));
        assert_eq!(session.phase(), Phase::Scanning);
        assert_eq!(session.frames_seen(), 1);
        assert!(session.detected_anchors().is_none());
    }

    #[test]
    fn confirm_and_retry_need_completion() {
        let key = AnswerKey::from_json(r#"{"Q1": "A"}"#).expect("key");
        let mut session =
            SessionController::new(layout(), &key, &ScanConfig::default()).expect("session");
        let wrong = SessionError::WrongPhase {
            expected: Phase::AwaitingConfirmation,
            actual: Phase::Scanning,
        };
        assert_eq!(session.confirm().unwrap_err(), wrong);
        assert_eq!(session.retry().unwrap_err(), wrong);
    }
}
