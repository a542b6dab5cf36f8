//! Envelope codec — the tolerant contract between a role's raw output and
//! the transcript.
//!
//! Under the explicit-sequence strategy each role is asked to wrap its
//! analysis in a JSON envelope `{sender, receiver, turn_index, content}`.
//! Language models are unreliable at emitting strictly valid structured
//! output, so the codec degrades gracefully: on parse failure the raw text
//! becomes the content and the technically-speaking role becomes the sender.
//! Decoding never fails.

use serde::{Deserialize, Serialize};

/// Normalized per-turn record extracted from a role's raw output.
///
/// `receiver` and `turn_index` are self-declared and advisory only — the
/// turn router is authoritative for control flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub sender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_index: Option<u64>,
    pub content: String,
}

/// How a raw payload was decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// The payload parsed as a structured envelope.
    Structured,
    /// Parse failed; the raw text was taken verbatim as content. Reported to
    /// the display sink as a non-fatal warning.
    RawFallback,
}

/// Loose wire shape: every field optional so a partially-filled envelope
/// still decodes as structured.
#[derive(Debug, Deserialize)]
struct WireEnvelope {
    sender: Option<String>,
    receiver: Option<String>,
    turn_index: Option<u64>,
    content: Option<String>,
}

/// Decode a role's raw output into an [`Envelope`].
///
/// `declared_speaker` is the role the driver actually invoked; it backfills
/// the sender whenever the payload omits or garbles it.
pub fn decode(raw_text: &str, declared_speaker: &str) -> (Envelope, DecodeOutcome) {
    // One trimmed form for both the parse attempt and every fallback, so
    // payload padding never leaks into the transcript.
    let trimmed = raw_text.trim();
    match serde_json::from_str::<WireEnvelope>(trimmed) {
        Ok(wire) => {
            let envelope = Envelope {
                sender: wire
                    .sender
                    .unwrap_or_else(|| declared_speaker.to_string()),
                receiver: wire.receiver,
                turn_index: wire.turn_index,
                content: wire.content.unwrap_or_else(|| trimmed.to_string()),
            };
            (envelope, DecodeOutcome::Structured)
        }
        Err(_) => {
            let envelope = Envelope {
                sender: declared_speaker.to_string(),
                receiver: None,
                turn_index: None,
                content: trimmed.to_string(),
            };
            (envelope, DecodeOutcome::RawFallback)
        }
    }
}

impl Envelope {
    /// True when the content is empty or whitespace-only. Such turns are
    /// discarded by the driver before reaching the transcript.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}
