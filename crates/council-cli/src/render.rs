//! Turning events and stored records into terminal output.

use std::fmt::Write as _;

use council_core::events::DebateEvent;
use council_core::{DecisionRecord, DecisionSummary};

use crate::cli::OutputFormat;

/// Text for one event, or `None` when the format skips it.
pub fn render_event(event: &DebateEvent, format: OutputFormat) -> Option<String> {
    match format {
        OutputFormat::Sse => Some(event.to_sse()),
        OutputFormat::Json => serde_json::to_string(event).ok().map(|line| line + "\n"),
        OutputFormat::Text => render_text(event),
    }
}

fn render_text(event: &DebateEvent) -> Option<String> {
    let text = match event {
        DebateEvent::DebateStart {
            session_id,
            query,
            council_members,
            chairman,
        } => format!(
            "Debate #{session_id}: {query}\nCouncil: {} | Chairman: {chairman}\n",
            council_members.join(", ")
        ),
        DebateEvent::ModelStart { model_id } => format!("  [{model_id}] thinking...\n"),
        // Interleaved chunks from several models are unreadable as plain text.
        DebateEvent::ModelChunk { .. } => return None,
        DebateEvent::ModelComplete {
            model_id,
            elapsed_seconds,
            chunk_count,
        } => format!("  [{model_id}] done in {elapsed_seconds:.1}s ({chunk_count} chunks)\n"),
        DebateEvent::ModelError { model_id, error } => {
            format!("  [{model_id}] failed: {error}\n")
        }
        DebateEvent::SynthesisStart { chairman } => {
            format!("\nChairman {chairman} is synthesizing...\n")
        }
        DebateEvent::SynthesisComplete {
            consensus_items,
            debates,
            synthesis_text,
        } => {
            let mut out = String::new();
            let _ = writeln!(out, "\nCONSENSUS");
            if consensus_items.is_empty() {
                let _ = writeln!(out, "  (none)");
            }
            for item in consensus_items {
                let _ = writeln!(out, "  • {item}");
            }
            let _ = writeln!(out, "\nDEBATES");
            if debates.is_empty() {
                let _ = writeln!(out, "  (none)");
            }
            for point in debates {
                if point.positions.is_empty() {
                    let _ = writeln!(out, "  • {}", point.topic);
                } else {
                    let _ = writeln!(out, "  • {}: {}", point.topic, point.positions);
                }
            }
            let _ = writeln!(out, "\nSYNTHESIS");
            let _ = writeln!(out, "{synthesis_text}");
            out
        }
        DebateEvent::SynthesisError { error } => format!("\nSynthesis failed: {error}\n"),
        DebateEvent::DebateComplete { session_id } => format!(
            "\nDebate #{session_id} complete. \
             Full responses: llm-council history show {session_id}\n"
        ),
        DebateEvent::Error { message } => format!("Error: {message}\n"),
    };
    Some(text)
}

/// One line per summary, newest first as given.
pub fn render_summaries(summaries: &[DecisionSummary]) -> String {
    if summaries.is_empty() {
        return "No recorded debates.\n".to_string();
    }
    let mut out = String::new();
    for s in summaries {
        let status = if s.has_synthesis {
            "synthesized"
        } else {
            "no synthesis"
        };
        let _ = writeln!(
            out,
            "#{:<5} {}  {:>2} responses  {:<12}  {}",
            s.id,
            s.created_at.format("%Y-%m-%d %H:%M"),
            s.response_count,
            status,
            truncate(&s.query, 60)
        );
    }
    out
}

/// Full record: query, every response, then the synthesis.
pub fn render_record(record: &DecisionRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Debate #{}: {}", record.id, record.query);
    let _ = writeln!(
        out,
        "Chairman: {} | Created: {}",
        record.chairman,
        record.created_at.to_rfc3339()
    );
    for response in &record.responses {
        let _ = writeln!(
            out,
            "\n--- {} ({:.1}s, {} chunks) ---\n{}",
            response.model_id, response.elapsed_seconds, response.chunk_count, response.text
        );
    }
    match &record.synthesis {
        Some(synthesis) => {
            let event = DebateEvent::synthesis_complete(&synthesis.to_result());
            if let Some(text) = render_text(&event) {
                out.push_str(&text);
            }
        }
        None => {
            let _ = writeln!(out, "\n(no synthesis recorded)");
        }
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
