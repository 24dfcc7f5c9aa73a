//! CLI channel — runs a screener over stdin/stdout.

use std::io::Write;

use futures::{StreamExt, stream};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{FlowError, Result};
use crate::screener::render::{assessment_info, render_state};
use crate::screener::{FlowPhase, FlowState, ScreenerFlow};

/// Drives a [`ScreenerFlow`] from line input and prints each state.
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }

    /// Run until the user quits or input ends. Returns the phase the flow
    /// was left in.
    pub async fn run<R, W>(&self, flow: &ScreenerFlow, input: R, out: &mut W) -> Result<FlowPhase>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        if flow.phase().await == FlowPhase::Loading {
            writeln!(out, "{}\n", render_state(&FlowState::Loading, None))?;
            report(flow.load().await, out)?;
        }
        self.show(flow, out).await?;

        let mut lines = Box::pin(stream::unfold(input.lines(), |mut lines| async move {
            match lines.next_line().await {
                Ok(Some(line)) => Some((line, lines)),
                Ok(None) => None, // EOF
                Err(e) => {
                    tracing::error!("Error reading input: {}", e);
                    None
                }
            }
        }));

        while let Some(line) = lines.next().await {
            let line = line.trim().to_lowercase();
            if line.is_empty() {
                continue;
            }
            if line == "q" || line == "quit" {
                break;
            }

            match flow.phase().await {
                FlowPhase::InProgress => self.answer(flow, &line, out).await?,
                FlowPhase::Error => {
                    if line == "r" || line == "retry" {
                        report(flow.retry().await, out)?;
                        self.show(flow, out).await?;
                    } else {
                        writeln!(out, "Type 'r' to retry or 'q' to quit.")?;
                    }
                }
                FlowPhase::Completed => self.info(flow, &line, out).await?,
                FlowPhase::Loading => {
                    writeln!(out, "Still loading, please wait.")?;
                }
            }
        }

        Ok(flow.phase().await)
    }

    async fn show<W: Write>(&self, flow: &ScreenerFlow, out: &mut W) -> Result<()> {
        let state = flow.state().await;
        let screener = flow.screener().await;
        writeln!(out, "{}\n", render_state(&state, screener.as_deref()))?;
        Ok(())
    }

    /// Map a 1-based choice to its option value and submit it.
    async fn answer<W: Write>(&self, flow: &ScreenerFlow, line: &str, out: &mut W) -> Result<()> {
        let options = flow.answer_options().await;
        let choice = line
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=options.len()).contains(n));
        let Some(choice) = choice else {
            writeln!(
                out,
                "Please enter a number between 1 and {}.",
                options.len()
            )?;
            return Ok(());
        };

        let value = options[choice - 1].value.clone();
        report(flow.submit_answer(value).await, out)?;
        self.show(flow, out).await
    }

    /// Handle `info <n>` on the completion screen.
    async fn info<W: Write>(&self, flow: &ScreenerFlow, line: &str, out: &mut W) -> Result<()> {
        let FlowState::Completed {
            recommendations, ..
        } = flow.state().await
        else {
            return Ok(());
        };

        let index = line
            .strip_prefix("info")
            .or_else(|| line.strip_prefix('i'))
            .and_then(|rest| rest.trim().parse::<usize>().ok())
            .and_then(|n| n.checked_sub(1));
        let Some(name) = index.and_then(|i| recommendations.get(i)) else {
            writeln!(out, "Type 'info <number>' to learn more, or 'q' to exit.")?;
            return Ok(());
        };

        match assessment_info(name) {
            Some(text) => writeln!(out, "{name}: {text}\n")?,
            None => writeln!(out, "No further information available for {name}.\n")?,
        }
        Ok(())
    }
}

/// Print a flow error the next render won't show.
///
/// Fetch and submission failures land the flow in `Error`, which `show()`
/// renders with its own message.
fn report<T, W: Write>(result: std::result::Result<T, FlowError>, out: &mut W) -> Result<()> {
    match result {
        Ok(_) | Err(FlowError::Fetch(_) | FlowError::Submission(_)) => {}
        Err(e) => writeln!(out, "{}", e.user_message())?,
    }
    Ok(())
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}
