//! Answer-sheet model and per-frame grading pipeline.
//!
//! Given anchors found by [`omr_anchor`], this crate rectifies the frame into
//! the sheet's content space ([`PerspectiveAligner`]), measures how much of
//! each bubble is inked ([`BubbleReader`]) and debounces readings over
//! consecutive frames before grading them ([`TemporalStabilizer`],
//! [`QuestionBook`]).
//!
//! ## Quickstart
//!
//! ```
//! use omr_sheet::{AnswerKey, Layout, QuestionBook, TemporalStabilizer, FillingData};
//!
//! let layout = Layout::from_json(r#"{
//!     "anchors": [{"x": 10, "y": 10}, {"x": 190, "y": 10}, {"x": 190, "y": 140}, {"x": 10, "y": 140}],
//!     "fieldBlocks": {"Q1": {"bubbleCoordinates": [{"x": 40, "y": 40, "width": 8, "height": 8, "value": "A"}]}}
//! }"#)?;
//! let key = AnswerKey::from_json(r#"{"Q1": "A"}"#)?;
//!
//! let mut book = QuestionBook::new(&layout, &key);
//! let stabilizer = TemporalStabilizer::default();
//! let confirmed = book.observe_frame(&stabilizer, &FillingData::new());
//! assert!(confirmed.is_empty());
//! assert_eq!(book.pending(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod align;
mod book;
mod bubbles;
mod grading;
mod layout;
mod stabilizer;

pub use align::{AlignError, PerspectiveAligner, SheetAlignment};
pub use book::{QuestionBook, TrackedQuestion};
pub use bubbles::{BubbleParams, BubbleReader, FillingData, OptionFill};
pub use grading::{CorrectionResult, CorrectionResults, Stats};
pub use layout::{
    AnswerKey, Bubble, Dimensions, Layout, LayoutError, QuestionId, MAX_CONTENT_SIDE,
};
pub use stabilizer::{grade, QuestionState, QuestionStatus, StabilizerParams, TemporalStabilizer};
