//! Chairman output parser.
//!
//! Single pass over the lines of the raw synthesis:
//!
//! ```text
//! None ──"CONSENSUS…"──▶ Consensus ──"DEBATES…"──▶ Debates ──"SYNTHESIS…"──▶ Synthesis
//!   ▲                       any header line switches to its section, from any state
//! ```
//!
//! Header lines are consumed. In `Consensus`/`Debates` only `•` bullets count;
//! in `Synthesis` every line is kept verbatim. Everything else is dropped.
//! The parser never fails: missing or garbled sections come back empty.

use tracing::debug;

use super::types::{DebatePoint, SynthesisResult};

/// Bullet marker the chairman is instructed to use.
pub const BULLET: char = '•';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Consensus,
    Debates,
    Synthesis,
}

impl Section {
    /// Section switched to by `line`, if it is a header.
    fn from_header(line: &str) -> Option<Self> {
        let upper = line.trim().to_uppercase();
        if upper.starts_with("CONSENSUS") {
            Some(Self::Consensus)
        } else if upper.starts_with("DEBATES") {
            Some(Self::Debates)
        } else if upper.starts_with("SYNTHESIS") {
            Some(Self::Synthesis)
        } else {
            None
        }
    }
}

/// Parse raw chairman text into consensus items, debates, and synthesis prose.
pub fn parse_synthesis(raw: &str) -> SynthesisResult {
    let mut result = SynthesisResult::default();
    let mut synthesis_lines: Vec<&str> = Vec::new();
    let mut section = Section::None;

    for line in raw.lines() {
        if let Some(next) = Section::from_header(line) {
            section = next;
            continue;
        }

        match section {
            Section::Consensus => {
                if let Some(item) = bullet_item(line) {
                    result.consensus_items.push(item.to_string());
                }
            }
            Section::Debates => {
                if let Some(item) = bullet_item(line) {
                    result.debates.push(split_debate(item));
                }
            }
            Section::Synthesis => synthesis_lines.push(line),
            Section::None => {}
        }
    }

    result.synthesis_text = trim_blank_lines(&synthesis_lines).join("\n");

    if result.is_empty() && !raw.trim().is_empty() {
        debug!(
            raw_len = raw.len(),
            "synthesis text had no recognisable sections"
        );
    }

    result
}

/// Text of a `•` bullet, or `None` for non-bullets and empty bullets.
fn bullet_item(line: &str) -> Option<&str> {
    let item = line.trim().strip_prefix(BULLET)?.trim();
    if item.is_empty() {
        None
    } else {
        Some(item)
    }
}

fn split_debate(item: &str) -> DebatePoint {
    match item.split_once(':') {
        Some((topic, positions)) => DebatePoint::new(topic.trim(), positions.trim()),
        None => DebatePoint::new(item, ""),
    }
}

fn trim_blank_lines<'a>(lines: &'a [&'a str]) -> &'a [&'a str] {
    let start = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(start, |i| i + 1);
    &lines[start..end]
}
