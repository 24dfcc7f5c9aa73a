//! ScreenerFlow — owns the session, walks the questions, and submits the
//! answer set once the last question is answered.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use crate::error::{FETCH_FAILED_MESSAGE, FlowError, SUBMIT_FAILED_MESSAGE};

use super::api::{AnswerSubmitter, ScreenerProvider};
use super::ids::IdGenerator;
use super::model::{
    AnswerOption, AnswerRecord, AnswerValue, Question, Screener, SubmissionRequest,
};
use super::state::{FlowPhase, FlowState, Progress, RetryStep};

/// What happened to an answer passed to [`ScreenerFlow::submit_answer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Answer recorded; the flow moved on to `current_index`.
    Advanced { current_index: usize },
    /// Final answer recorded and the answer set accepted by the backend.
    Completed { recommendations: Vec<String> },
    /// Dropped: the flow is already complete or a submission is in flight.
    Ignored,
}

/// The question flow state machine for one screener run.
pub struct ScreenerFlow {
    provider: Arc<dyn ScreenerProvider>,
    submitter: Arc<dyn AnswerSubmitter>,
    session_id: String,
    screener: RwLock<Option<Arc<Screener>>>,
    state: RwLock<FlowState>,
    /// Held for the duration of a fetch or submission.
    in_flight: Mutex<()>,
}

impl ScreenerFlow {
    /// Create a flow in `Loading` with a freshly generated session id.
    pub fn new(
        provider: Arc<dyn ScreenerProvider>,
        submitter: Arc<dyn AnswerSubmitter>,
        ids: &dyn IdGenerator,
    ) -> Self {
        let session_id = ids.generate();
        tracing::info!(%session_id, "Starting screener session");
        Self {
            provider,
            submitter,
            session_id,
            screener: RwLock::new(None),
            state: RwLock::new(FlowState::Loading),
            in_flight: Mutex::new(()),
        }
    }

    /// Create a flow and load the screener. A failed load leaves the flow in
    /// `Error`, ready for [`ScreenerFlow::retry`].
    pub async fn start(
        provider: Arc<dyn ScreenerProvider>,
        submitter: Arc<dyn AnswerSubmitter>,
        ids: &dyn IdGenerator,
    ) -> Self {
        let flow = Self::new(provider, submitter, ids);
        if let Err(e) = flow.load().await {
            tracing::debug!("Initial screener load failed: {}", e);
        }
        flow
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Snapshot of the current state.
    pub async fn state(&self) -> FlowState {
        self.state.read().await.clone()
    }

    pub async fn phase(&self) -> FlowPhase {
        self.state.read().await.phase()
    }

    pub async fn screener(&self) -> Option<Arc<Screener>> {
        self.screener.read().await.clone()
    }

    /// Whether a fetch or submission is outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// The question on screen, only while in progress.
    pub async fn current_question(&self) -> Option<Question> {
        let screener = self.screener().await?;
        match &*self.state.read().await {
            FlowState::InProgress { current_index, .. } => {
                screener.questions().get(*current_index).cloned()
            }
            _ => None,
        }
    }

    /// Options offered for every question.
    pub async fn answer_options(&self) -> Vec<AnswerOption> {
        self.screener()
            .await
            .map(|s| s.answer_options().to_vec())
            .unwrap_or_default()
    }

    /// Derived progress, only while in progress.
    pub async fn progress(&self) -> Option<Progress> {
        let screener = self.screener().await?;
        match &*self.state.read().await {
            FlowState::InProgress { current_index, .. } => {
                Some(Progress::new(*current_index, screener.total_questions()))
            }
            _ => None,
        }
    }

    /// Fetch the screener content.
    ///
    /// Runs from `Loading`, or from a failed fetch (same as
    /// [`ScreenerFlow::retry`]). Once content is loaded this is a no-op.
    pub async fn load(&self) -> Result<(), FlowError> {
        let _gate = self.in_flight.try_lock().map_err(|_| FlowError::Busy)?;

        {
            let mut state = self.state.write().await;
            let refetch = match &*state {
                FlowState::Loading => false,
                FlowState::Error {
                    retry: RetryStep::Fetch,
                    ..
                } => true,
                _ => return Ok(()),
            };
            if refetch {
                set_state(&mut state, FlowState::Loading);
            }
        }

        self.fetch_content().await
    }

    /// Record an answer for the current question.
    ///
    /// Advances to the next question, or submits the whole answer set when
    /// this was the last one. Answers after completion, or while a
    /// submission is outstanding, are ignored.
    pub async fn submit_answer(
        &self,
        value: impl Into<AnswerValue>,
    ) -> Result<AnswerOutcome, FlowError> {
        let value = value.into();
        if self.phase().await.is_terminal() {
            tracing::debug!(%value, "Ignoring answer after completion");
            return Ok(AnswerOutcome::Ignored);
        }

        let Ok(_gate) = self.in_flight.try_lock() else {
            tracing::debug!(%value, "Ignoring answer while a request is in flight");
            return Ok(AnswerOutcome::Ignored);
        };

        let screener = self.screener().await;
        let mut state = self.state.write().await;

        let (current_index, answers) = match &mut *state {
            FlowState::InProgress {
                current_index,
                answers,
            } => (current_index, answers),
            FlowState::Completed { .. } => return Ok(AnswerOutcome::Ignored),
            other => {
                return Err(FlowError::NotAnswerable {
                    phase: other.phase(),
                });
            }
        };
        let Some(screener) = screener else {
            return Err(FlowError::NotAnswerable {
                phase: FlowPhase::Loading,
            });
        };

        let Some(option) = screener.option_for(&value) else {
            return Err(FlowError::InvalidAnswer { value });
        };

        let Some(question) = screener.questions().get(*current_index) else {
            return Err(FlowError::NotAnswerable {
                phase: FlowPhase::InProgress,
            });
        };
        answers.record(&question.question_id, option.value.clone());
        tracing::debug!(
            session_id = %self.session_id,
            question_id = %question.question_id,
            value = %option.value,
            "Answer recorded"
        );

        if *current_index + 1 < screener.total_questions() {
            *current_index += 1;
            return Ok(AnswerOutcome::Advanced {
                current_index: *current_index,
            });
        }

        let answers = answers.clone();
        drop(state);
        self.submit(answers).await
    }

    /// Re-run the step that failed.
    ///
    /// A failed fetch is fetched again. A failed submission re-sends the
    /// retained answers under the same session id. Returns the phase the
    /// flow ends up in.
    pub async fn retry(&self) -> Result<FlowPhase, FlowError> {
        let _gate = self.in_flight.try_lock().map_err(|_| FlowError::Busy)?;

        let step = match &*self.state.read().await {
            FlowState::Error { retry, .. } => retry.clone(),
            other => {
                return Err(FlowError::NothingToRetry {
                    phase: other.phase(),
                });
            }
        };

        tracing::info!(session_id = %self.session_id, ?step, "Retrying screener step");
        match step {
            RetryStep::Fetch => {
                set_state(&mut *self.state.write().await, FlowState::Loading);
                self.fetch_content().await?;
            }
            RetryStep::Submit { answers } => {
                self.submit(answers).await?;
            }
        }
        Ok(self.phase().await)
    }

    /// Fetch, validate and install the screener. Caller holds the in-flight
    /// gate and has put the flow in `Loading`.
    async fn fetch_content(&self) -> Result<(), FlowError> {
        let fetched = self
            .provider
            .fetch_screener()
            .await
            .and_then(|screener| screener.validate().map(|_| screener));
        match fetched {
            Ok(screener) => {
                tracing::info!(
                    screener_id = %screener.id,
                    name = %screener.name,
                    questions = screener.total_questions(),
                    "Screener loaded"
                );
                *self.screener.write().await = Some(Arc::new(screener));
                set_state(
                    &mut *self.state.write().await,
                    FlowState::InProgress {
                        current_index: 0,
                        answers: AnswerRecord::new(),
                    },
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(session_id = %self.session_id, "Failed to fetch screener: {}", e);
                set_state(
                    &mut *self.state.write().await,
                    FlowState::Error {
                        message: FETCH_FAILED_MESSAGE.to_string(),
                        retry: RetryStep::Fetch,
                    },
                );
                Err(FlowError::Fetch(e))
            }
        }
    }

    /// Send the answer set. Caller holds the in-flight gate.
    async fn submit(&self, answers: AnswerRecord) -> Result<AnswerOutcome, FlowError> {
        let request = SubmissionRequest::complete(&self.session_id, &answers);
        tracing::info!(
            session_id = %self.session_id,
            answers = answers.len(),
            "Submitting screener answers"
        );

        match self.submitter.submit_answers(&request).await {
            Ok(response) => {
                tracing::info!(
                    session_id = %self.session_id,
                    recommendations = ?response.results,
                    "Screener completed"
                );
                set_state(
                    &mut *self.state.write().await,
                    FlowState::Completed {
                        recommendations: response.results.clone(),
                        answers,
                        completed_at: Utc::now(),
                    },
                );
                Ok(AnswerOutcome::Completed {
                    recommendations: response.results,
                })
            }
            Err(e) => {
                tracing::error!(session_id = %self.session_id, "Error submitting answers: {}", e);
                set_state(
                    &mut *self.state.write().await,
                    FlowState::Error {
                        message: SUBMIT_FAILED_MESSAGE.to_string(),
                        retry: RetryStep::Submit { answers },
                    },
                );
                Err(FlowError::Submission(e))
            }
        }
    }
}

fn set_state(state: &mut FlowState, next: FlowState) {
    if let Err(e) = state.transition_to(next) {
        tracing::warn!("Rejected screener state change: {}", e);
    }
}
