//! Subcommand bodies, kept free of process globals so tests can drive them.

use std::future::Future;
use std::io::Write;

use anyhow::{bail, Context, Result};
use council_core::{DebateOutcome, DebateRun, DecisionStore, SessionId};
use futures::StreamExt;
use tracing::{info, warn};

use crate::cli::OutputFormat;
use crate::gateway::GatewayClient;
use crate::render::{render_event, render_record, render_summaries};

/// Print every event of `run` as it arrives; `shutdown` resolving cancels the debate.
pub async fn stream_debate<W, F>(
    mut run: DebateRun,
    format: OutputFormat,
    out: &mut W,
    shutdown: F,
) -> Result<DebateOutcome>
where
    W: Write,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut interrupted = false;

    loop {
        tokio::select! {
            _ = &mut shutdown, if !interrupted => {
                warn!("interrupt received, cancelling debate");
                run.cancel();
                interrupted = true;
            }
            event = run.next() => match event {
                Some(event) => {
                    if let Some(text) = render_event(&event, format) {
                        out.write_all(text.as_bytes()).context("Failed to write event")?;
                        out.flush().context("Failed to flush output")?;
                    }
                }
                None => break,
            }
        }
    }

    let outcome = run.outcome().await.context("Debate task failed")?;
    let status = outcome
        .session
        .as_ref()
        .map_or_else(|| "[rejected]".to_string(), |s| s.status_line());
    info!(
        %status,
        succeeded = outcome.succeeded.len(),
        failed = outcome.failed.len(),
        "debate run finished"
    );
    Ok(outcome)
}

pub async fn list_history<W: Write>(
    store: &dyn DecisionStore,
    skip: usize,
    limit: usize,
    json: bool,
    out: &mut W,
) -> Result<()> {
    let summaries = store
        .list_sessions(skip, limit)
        .await
        .context("Failed to list debates")?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &summaries)?;
        writeln!(out)?;
    } else {
        out.write_all(render_summaries(&summaries).as_bytes())?;
    }
    Ok(())
}

pub async fn show_history<W: Write>(
    store: &dyn DecisionStore,
    id: SessionId,
    json: bool,
    out: &mut W,
) -> Result<()> {
    let Some(record) = store
        .get_session(id)
        .await
        .with_context(|| format!("Failed to read debate #{id}"))?
    else {
        bail!("No debate session #{id}");
    };
    if json {
        serde_json::to_writer_pretty(&mut *out, &record)?;
        writeln!(out)?;
    } else {
        out.write_all(render_record(&record).as_bytes())?;
    }
    Ok(())
}

/// Check each of `models`; returns whether every one answered.
pub async fn test_models<W: Write>(
    client: &GatewayClient,
    models: &[String],
    out: &mut W,
) -> Result<bool> {
    let mut all_available = true;
    for model in models {
        let available = client.test_model(model).await;
        all_available &= available;
        let verdict = if available { "available" } else { "unavailable" };
        writeln!(out, "{model}: {verdict}")?;
    }
    Ok(all_available)
}

pub async fn list_models<W: Write>(client: &GatewayClient, out: &mut W) -> Result<()> {
    let models = client
        .list_models()
        .await
        .with_context(|| format!("Failed to list models at {}", client.config().models_url()))?;
    if models.is_empty() {
        writeln!(out, "Gateway advertises no models.")?;
    }
    for model in models {
        match model.owned_by {
            Some(owner) => writeln!(out, "{}  ({owner})", model.id)?,
            None => writeln!(out, "{}", model.id)?,
        }
    }
    Ok(())
}
