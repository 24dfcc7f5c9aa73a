//! Screener — a sequential, single-choice questionnaire.
//!
//! The flow fetches a screener definition, walks its first section one
//! question at a time, and submits the ordered answer set once the last
//! question is answered. The backend scores the answers and returns the
//! assessments it recommends next.

pub mod api;
pub mod flow;
pub mod ids;
pub mod model;
pub mod render;
pub mod state;

pub use api::{AnswerSubmitter, HttpScreenerApi, ScreenerProvider};
pub use flow::{AnswerOutcome, ScreenerFlow};
pub use ids::{IdGenerator, UuidV4Ids};
pub use model::{AnswerOption, AnswerRecord, AnswerValue, AnsweredQuestion, Question, Screener};
pub use state::{FlowPhase, FlowState, Progress, RetryStep};
