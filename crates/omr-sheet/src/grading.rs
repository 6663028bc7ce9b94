use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{QuestionId, QuestionState};

/// Final outcome for one graded question.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionResult {
    pub correct_answer: String,
    /// Confirmed reading; empty when nothing was marked.
    pub detected_answer: String,
    pub status: QuestionState,
    pub confidence: f32,
}

pub type CorrectionResults = BTreeMap<QuestionId, CorrectionResult>;

/// Running tally of confirmed questions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub correct: u32,
    pub incorrect: u32,
    pub nullified: u32,
}

impl Stats {
    pub fn record(&mut self, state: QuestionState) {
        match state {
            QuestionState::Correct => self.correct += 1,
            QuestionState::Incorrect => self.incorrect += 1,
            QuestionState::Nullified => self.nullified += 1,
            QuestionState::Pending => {}
        }
    }

    pub fn total(&self) -> u32 {
        self.correct + self.incorrect + self.nullified
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
