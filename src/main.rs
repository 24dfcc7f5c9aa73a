use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;

use screener_client::channels::CliChannel;
use screener_client::config::ApiConfig;
use screener_client::screener::{FlowPhase, HttpScreenerApi, ScreenerFlow, UuidV4Ids};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout is the questionnaire.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = ApiConfig::from_env().context("invalid screener API configuration")?;

    eprintln!("Clinical Screener v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: {}", config.url(""));
    eprintln!("   Enter the number of your answer. 'q' to quit.\n");

    let ids = Arc::new(UuidV4Ids);
    let api = Arc::new(HttpScreenerApi::new(config, ids.clone()));
    let flow = ScreenerFlow::new(api.clone(), api, &*ids);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let phase = CliChannel::new()
        .run(&flow, stdin, &mut stdout)
        .await
        .context("screener session failed")?;

    if phase != FlowPhase::Completed {
        tracing::info!(session_id = %flow.session_id(), %phase, "Screener exited before completion");
    }
    Ok(())
}
