//! Structured observability hooks for conversation lifecycle events.
//!
//! Events are emitted at `info!` level (configurable via the `IDEAFLOW_LOG`
//! env var). For JSON output, set `IDEAFLOW_LOG_FORMAT=json`.

use tracing::{info, warn};

use crate::driver::Termination;

/// Span scoping all events of one conversation run. Attach with
/// `tracing::Instrument` in async code; entering a guard across await points
/// mis-scopes the span.
pub fn run_span(idea: &str) -> tracing::Span {
    let label: String = idea.chars().take(40).collect();
    tracing::info_span!("ideaflow.run", idea = %label)
}

/// Emit event: conversation started.
pub fn emit_run_started(idea: &str) {
    info!(event = "run.started", idea_chars = idea.chars().count());
}

/// Emit event: a turn was accepted into the transcript.
pub fn emit_turn_accepted(role: &str, step: usize) {
    info!(event = "turn.accepted", role = %role, step = step);
}

/// Emit event: a turn was discarded for empty content.
pub fn emit_turn_skipped(role: &str) {
    warn!(event = "turn.skipped_empty", role = %role);
}

/// Emit event: a payload failed envelope decoding and fell back to raw text.
pub fn emit_decode_fallback(role: &str) {
    warn!(event = "turn.decode_fallback", role = %role);
}

/// Emit event: accepted content is missing its header tag or closing phrase.
pub fn emit_contract_violation(role: &str) {
    warn!(event = "turn.contract_violation", role = %role);
}

/// Emit event: conversation finished with its termination reason.
pub fn emit_run_finished(accepted: usize, attempted: usize, termination: &Termination) {
    info!(
        event = "run.finished",
        accepted = accepted,
        attempted = attempted,
        termination = %termination,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_span_create_does_not_panic() {
        let _span = run_span("a very long idea that should be cut to forty characters");
    }
}
