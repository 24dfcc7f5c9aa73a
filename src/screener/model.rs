//! Screener definition and answer data models.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// An option score. Kept as the backend's JSON number so integral and
/// fractional values both load and go back out unchanged.
pub type AnswerValue = serde_json::Number;

/// A selectable choice, shared by every question in a section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerOption {
    pub title: String,
    pub value: AnswerValue,
}

/// A single question. `question_id` is unique within a screener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    pub question_id: String,
    pub title: String,
}

/// A group of questions answered from the same option set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    pub answers: Vec<AnswerOption>,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreenerContent {
    pub sections: Vec<Section>,
    pub display_name: String,
}

/// Questionnaire definition served by `GET /api/screener`.
///
/// Only the first section is used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Screener {
    pub id: String,
    pub name: String,
    pub disorder: String,
    pub content: ScreenerContent,
    pub full_name: String,
}

impl Screener {
    /// Check the structural invariants the flow relies on.
    pub fn validate(&self) -> Result<(), ApiError> {
        let section = self
            .content
            .sections
            .first()
            .ok_or_else(|| ApiError::InvalidScreener("screener has no sections".into()))?;

        if section.questions.is_empty() {
            return Err(ApiError::InvalidScreener("section has no questions".into()));
        }
        if section.answers.is_empty() {
            return Err(ApiError::InvalidScreener(
                "section has no answer options".into(),
            ));
        }

        let mut seen = HashSet::new();
        for question in &section.questions {
            if !seen.insert(question.question_id.as_str()) {
                return Err(ApiError::InvalidScreener(format!(
                    "duplicate question_id {:?}",
                    question.question_id
                )));
            }
        }
        Ok(())
    }

    /// The section the flow walks through. Call after [`Screener::validate`].
    pub fn section(&self) -> &Section {
        &self.content.sections[0]
    }

    pub fn questions(&self) -> &[Question] {
        &self.section().questions
    }

    pub fn answer_options(&self) -> &[AnswerOption] {
        &self.section().answers
    }

    pub fn total_questions(&self) -> usize {
        self.questions().len()
    }

    /// The option whose value equals `value`. `1` and `1.0` compare equal.
    pub fn option_for(&self, value: &AnswerValue) -> Option<&AnswerOption> {
        let wanted = value.as_f64()?;
        self.answer_options()
            .iter()
            .find(|a| a.value.as_f64() == Some(wanted))
    }
}

/// One recorded answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnsweredQuestion {
    pub question_id: String,
    pub value: AnswerValue,
}

/// Answers in the order the questions were answered.
///
/// Append-only: one entry per question, never edited or removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AnswerRecord {
    entries: Vec<AnsweredQuestion>,
}

impl AnswerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an answer. Returns `false` (and records nothing) if the
    /// question was already answered.
    pub fn record(&mut self, question_id: &str, value: impl Into<AnswerValue>) -> bool {
        if self.get(question_id).is_some() {
            return false;
        }
        self.entries.push(AnsweredQuestion {
            question_id: question_id.to_string(),
            value: value.into(),
        });
        true
    }

    pub fn get(&self, question_id: &str) -> Option<&AnswerValue> {
        self.entries
            .iter()
            .find(|e| e.question_id == question_id)
            .map(|e| &e.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[AnsweredQuestion] {
        &self.entries
    }
}

/// Body of `POST /api/answers`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub session_id: String,
    pub answers: Vec<AnsweredQuestion>,
    #[serde(rename = "isComplete")]
    pub is_complete: bool,
}

impl SubmissionRequest {
    /// A final submission of every recorded answer.
    pub fn complete(session_id: &str, answers: &AnswerRecord) -> Self {
        Self {
            session_id: session_id.to_string(),
            answers: answers.entries().to_vec(),
            is_complete: true,
        }
    }
}

/// Response of `POST /api/answers`: recommended assessment names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionResponse {
    pub results: Vec<String>,
}
