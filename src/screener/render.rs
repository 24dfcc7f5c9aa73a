//! Plain-text rendering of flow states for the terminal.

use super::model::Screener;
use super::state::{FlowState, Progress};

pub const LOADING_TEXT: &str = "Loading diagnostic screener...";
pub const NO_RECOMMENDATIONS_TEXT: &str = "No additional assessments recommended at this time.";

const PROGRESS_BAR_WIDTH: usize = 30;

/// Short description of a known assessment, for "learn more" output.
pub fn assessment_info(name: &str) -> Option<&'static str> {
    match name {
        "PHQ-9" => Some(
            "The Patient Health Questionnaire-9 (PHQ-9) is a standardized questionnaire used to \
screen, diagnose, and monitor both depression and anxiety symptoms. It helps clinicians assess \
the severity of these conditions and track changes over time.",
        ),
        "ASRM" => Some(
            "The Altman Self-Rating Mania Scale (ASRM) is a brief questionnaire used to assess \
symptoms of mania and hypomania.",
        ),
        "ASSIST" => Some(
            "The Alcohol, Smoking and Substance Involvement Screening Test (ASSIST) is a brief \
screening tool for substance use and related problems.",
        ),
        _ => None,
    }
}

/// Render any state. `screener` is needed only for `InProgress`.
pub fn render_state(state: &FlowState, screener: Option<&Screener>) -> String {
    match state {
        FlowState::Loading => LOADING_TEXT.to_string(),
        FlowState::Error { message, .. } => render_error(message),
        FlowState::InProgress { current_index, .. } => match screener {
            Some(screener) => render_question(screener, *current_index),
            None => LOADING_TEXT.to_string(),
        },
        FlowState::Completed {
            recommendations, ..
        } => render_completed(recommendations),
    }
}

pub fn render_error(message: &str) -> String {
    format!("{message}\n\nType 'r' to retry or 'q' to quit.")
}

/// Question screen: titles, progress, the question, numbered options.
pub fn render_question(screener: &Screener, current_index: usize) -> String {
    let Some(question) = screener.questions().get(current_index) else {
        return String::new();
    };
    let progress = Progress::new(current_index, screener.total_questions());

    let mut lines = vec![
        screener.content.display_name.clone(),
        progress_bar(&progress, PROGRESS_BAR_WIDTH),
        String::new(),
    ];
    if !screener.section().title.is_empty() {
        lines.push(screener.section().title.clone());
        lines.push(String::new());
    }
    lines.push(question.title.clone());
    lines.push(String::new());
    for (i, option) in screener.answer_options().iter().enumerate() {
        lines.push(format!("  {}) {}", i + 1, option.title));
    }
    lines.push(String::new());
    lines.push(progress.counter());
    lines.join("\n")
}

/// Completion screen. An empty list is shown as its own message.
pub fn render_completed(recommendations: &[String]) -> String {
    let mut lines = vec![
        "Screener Completed".to_string(),
        String::new(),
        "Thank you for completing the diagnostic screener.".to_string(),
        String::new(),
        "Recommended Assessments:".to_string(),
    ];
    if recommendations.is_empty() {
        lines.push(format!("  {NO_RECOMMENDATIONS_TEXT}"));
    } else {
        for (i, name) in recommendations.iter().enumerate() {
            let hint = if assessment_info(name).is_some() {
                format!("  (type 'info {}' to learn more)", i + 1)
            } else {
                String::new()
            };
            lines.push(format!("  {}. {name}{hint}", i + 1));
        }
    }
    lines.push(String::new());
    lines.push("Please consult with your healthcare provider about these results.".to_string());
    lines.join("\n")
}

/// `[#######.......]  25%`
pub fn progress_bar(progress: &Progress, width: usize) -> String {
    let filled = ((progress.fraction() * width as f64).round() as usize).min(width);
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        ".".repeat(width - filled),
        progress.percent().round() as u32
    )
}
