//! Screener — client for a sequential diagnostic questionnaire.

pub mod channels;
pub mod config;
pub mod error;
pub mod screener;
