use log::{debug, info};

use crate::{
    AnswerKey, CorrectionResult, CorrectionResults, FillingData, Layout, QuestionId,
    QuestionState, QuestionStatus, TemporalStabilizer,
};

/// One gradable question: its correct answer and its debounce slot.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedQuestion {
    pub id: QuestionId,
    pub correct_answer: String,
    pub status: QuestionStatus,
}

/// Fixed set of tracked questions for one scanning session.
///
/// Built once from the layout questions that also have a non-empty entry in
/// the answer key; nothing is added afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct QuestionBook {
    questions: Vec<TrackedQuestion>,
}

impl QuestionBook {
    pub fn new(layout: &Layout, key: &AnswerKey) -> Self {
        let questions: Vec<_> = layout
            .questions()
            .filter_map(|id| {
                key.get(id).map(|answer| TrackedQuestion {
                    id: id.clone(),
                    correct_answer: answer.to_owned(),
                    status: QuestionStatus::default(),
                })
            })
            .collect();
        debug!("tracking {} gradable questions", questions.len());
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn questions(&self) -> &[TrackedQuestion] {
        &self.questions
    }

    pub fn get(&self, id: &QuestionId) -> Option<&TrackedQuestion> {
        self.questions.iter().find(|q| &q.id == id)
    }

    pub fn pending(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| !q.status.state.is_terminal())
            .count()
    }

    /// True once no tracked question is pending (and at least one exists).
    pub fn all_confirmed(&self) -> bool {
        !self.is_empty() && self.pending() == 0
    }

    /// Return every question to pending with an empty debounce window.
    pub fn reset(&mut self) {
        for q in &mut self.questions {
            q.status.reset();
        }
    }

    /// Advance every pending question with one frame's fill data.
    ///
    /// Questions missing from `fills` read as blank. Returns the questions
    /// confirmed on this frame.
    pub fn observe_frame(
        &mut self,
        stabilizer: &TemporalStabilizer,
        fills: &FillingData,
    ) -> Vec<(QuestionId, QuestionState)> {
        let mut confirmed = Vec::new();
        for q in &mut self.questions {
            let options = fills.get(&q.id).map(Vec::as_slice).unwrap_or(&[]);
            if let Some(state) = stabilizer.observe(&mut q.status, options, &q.correct_answer) {
                info!(
                    "question {} confirmed {:?} (reading {:?})",
                    q.id,
                    state,
                    q.status.stable_reading.as_deref().unwrap_or("")
                );
                confirmed.push((q.id.clone(), state));
            }
        }
        confirmed
    }

    /// Result map over the current statuses.
    pub fn results(&self, stabilizer: &TemporalStabilizer) -> CorrectionResults {
        self.questions
            .iter()
            .map(|q| {
                (
                    q.id.clone(),
                    CorrectionResult {
                        correct_answer: q.correct_answer.clone(),
                        detected_answer: q.status.stable_reading.clone().unwrap_or_default(),
                        status: q.status.state,
                        confidence: stabilizer.confidence(&q.status),
                    },
                )
            })
            .collect()
    }
}
