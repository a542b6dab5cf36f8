//! Pipeline-level error taxonomy.
//!
//! Only `Config` may halt the entry point before a run starts. Per-turn
//! faults are absorbed by the conversation driver so that a partial
//! transcript is always produced and persisted. Envelope decode failure is a
//! warning, not an error; an empty-content turn is silently skipped.

/// Errors produced by the ideaflow pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Missing or empty credential / invalid settings. Fatal before any run.
    #[error("configuration error: {0}")]
    Config(String),

    /// A name outside the closed role set reached a registry lookup.
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// The router could not determine a next speaker. Distinct from normal
    /// completion at the end of the sequence.
    #[error("no next speaker after {0}")]
    NoNextSpeaker(String),

    /// External model-service fault. Caught at the driver level; the run
    /// terminates early with partial results.
    #[error("model call failed: {0}")]
    ModelCall(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
