//! Ideaflow Core Library
//!
//! A ten-role research-idea analysis pipeline: a fixed cast of analyst roles
//! takes one seed idea through domain classification, refinement,
//! feasibility, and resourcing, producing a transcript and report files.

pub mod client;
pub mod config;
pub mod console;
pub mod driver;
pub mod envelope;
pub mod error;
pub mod obs;
pub mod report;
pub mod roles;
pub mod router;
pub mod telemetry;

pub use client::ChatCompletionClient;
pub use config::{PipelineConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use console::{ConsoleSink, DisplaySink};
pub use driver::{
    CompletionClient, ConversationDriver, ConversationState, DriverConfig, Termination,
    TranscriptEntry,
};
pub use envelope::{decode, DecodeOutcome, Envelope};
pub use error::{PipelineError, Result};
pub use obs::{
    emit_contract_violation, emit_decode_fallback, emit_run_finished, emit_run_started,
    emit_turn_accepted, emit_turn_skipped, run_span,
};
pub use report::{html_url, ReportWriter, SavedReports};
pub use roles::{role_by_name, roles, RoleId, RoleSpec};
pub use router::{Route, RoutedTurn, RoundRobinRouter, SequenceRouter, Speaker, TurnRouter};
pub use telemetry::init_tracing;

/// Ideaflow version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
