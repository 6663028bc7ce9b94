//! Per-question debounce and grading.
//!
//! A reading must repeat identically over `confirmation_frames` consecutive
//! frames before it is graded. Once graded, a question stays terminal until
//! it is reset.

use serde::{Deserialize, Serialize};

use crate::OptionFill;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionState {
    Pending,
    Correct,
    Incorrect,
    /// More than one option marked.
    Nullified,
}

impl QuestionState {
    pub fn is_terminal(self) -> bool {
        self != QuestionState::Pending
    }
}

/// Debounce accumulator for one question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionStatus {
    pub stable_reading: Option<String>,
    /// Option values behind `stable_reading`, in layout order.
    #[serde(default)]
    pub stable_marks: Vec<String>,
    pub stable_count: u32,
    pub state: QuestionState,
}

impl Default for QuestionStatus {
    fn default() -> Self {
        Self {
            stable_reading: None,
            stable_marks: Vec::new(),
            stable_count: 0,
            state: QuestionState::Pending,
        }
    }
}

impl QuestionStatus {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerParams {
    /// Minimum fill ratio (exclusive) for an option to count as marked.
    pub marking_threshold: f32,
    /// Consecutive identical readings needed to confirm.
    pub confirmation_frames: u32,
}

impl Default for StabilizerParams {
    fn default() -> Self {
        Self {
            marking_threshold: 0.51,
            confirmation_frames: 15,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TemporalStabilizer {
    params: StabilizerParams,
}

impl TemporalStabilizer {
    pub fn new(params: StabilizerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StabilizerParams {
        &self.params
    }

    /// Values of the options filled above the marking threshold, in layout order.
    pub fn marked_options(&self, fills: &[OptionFill]) -> Vec<String> {
        fills
            .iter()
            .filter(|f| f.ratio > self.params.marking_threshold)
            .map(|f| f.value.clone())
            .collect()
    }

    /// Concatenated values of the marked options, in layout order.
    pub fn current_answer(&self, fills: &[OptionFill]) -> String {
        self.marked_options(fills).concat()
    }

    /// Feed one frame's fills for a question.
    ///
    /// Returns the graded state on the frame that confirms, `None` otherwise.
    /// Terminal questions ignore further frames.
    pub fn observe(
        &self,
        status: &mut QuestionStatus,
        fills: &[OptionFill],
        correct: &str,
    ) -> Option<QuestionState> {
        if status.state.is_terminal() {
            return None;
        }
        let marks = self.marked_options(fills);
        let reading = marks.concat();
        if status.stable_reading.as_deref() != Some(reading.as_str()) {
            status.stable_marks = marks;
        }
        self.observe_reading(status, reading, correct)
    }

    /// [`observe`](Self::observe) on an already derived reading.
    ///
    /// Leaves `stable_marks` untouched.
    pub fn observe_reading(
        &self,
        status: &mut QuestionStatus,
        reading: String,
        correct: &str,
    ) -> Option<QuestionState> {
        if status.state.is_terminal() {
            return None;
        }
        if status.stable_reading.as_deref() == Some(reading.as_str()) {
            status.stable_count = status.stable_count.saturating_add(1);
        } else {
            status.stable_reading = Some(reading);
            status.stable_count = 1;
        }

        if status.stable_count < self.params.confirmation_frames {
            return None;
        }
        let state = grade(status.stable_reading.as_deref().unwrap_or(""), correct);
        status.state = state;
        Some(state)
    }

    /// `min(stable_count, N) / N`, always in `[0, 1]`.
    pub fn confidence(&self, status: &QuestionStatus) -> f32 {
        let n = self.params.confirmation_frames.max(1);
        status.stable_count.min(n) as f32 / n as f32
    }
}

/// Grade a confirmed reading.
///
/// Blank is incorrect and more than one mark nullifies the question.
pub fn grade(reading: &str, correct: &str) -> QuestionState {
    match reading.chars().count() {
        0 => QuestionState::Incorrect,
        1 if reading == correct => QuestionState::Correct,
        1 => QuestionState::Incorrect,
        _ => QuestionState::Nullified,
    }
}
