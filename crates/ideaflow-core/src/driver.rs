//! Conversation driver: the turn loop that carries an idea through the
//! analysis sequence.
//!
//! The driver owns all termination logic. Four conditions end a run: the
//! accepted-message ceiling, the attempted-turn safety ceiling, natural
//! sequence completion, and a caught collaborator fault. A fault never
//! propagates out of [`ConversationDriver::run`] — the run finalizes with
//! whatever transcript it has, so reports are always written.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{warn, Instrument};

use crate::console::DisplaySink;
use crate::envelope::{decode, DecodeOutcome};
use crate::error::Result;
use crate::obs;
use crate::roles::{roles, RoleId, RoleSpec};
use crate::router::{Route, RoutedTurn, TurnRouter};

use serde::{Deserialize, Serialize};

/// One accepted message in the conversation.
///
/// `step` is the 1-based position among *accepted* messages; discarded
/// empty turns leave no gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub step: usize,
    /// Canonical role name of the author.
    pub agent: String,
    pub content: String,
}

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum Termination {
    /// The accepted-message ceiling was reached.
    MessageCeiling,
    /// The attempted-turn safety ceiling was reached. Guards against routing
    /// loops that accept nothing (all turns empty).
    SafetyCeiling,
    /// The terminal role spoke and handed off to nobody.
    SequenceComplete,
    /// A model call or routing decision failed mid-run.
    CollaboratorFault(String),
    /// The caller asked the run to stop.
    Cancelled,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::MessageCeiling => write!(f, "message ceiling reached"),
            Termination::SafetyCeiling => write!(f, "safety ceiling reached"),
            Termination::SequenceComplete => write!(f, "sequence complete"),
            Termination::CollaboratorFault(detail) => {
                write!(f, "collaborator fault: {detail}")
            }
            Termination::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Final state of a finished run. Always produced, even on fault.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    pub idea: String,
    pub transcript: Vec<TranscriptEntry>,
    /// Turns attempted, including discarded and faulted ones.
    pub attempted_turns: usize,
    pub termination: Termination,
}

impl ConversationState {
    /// True when every role in the sequence produced an accepted message.
    pub fn completed_naturally(&self) -> bool {
        self.termination == Termination::SequenceComplete
    }
}

/// Ceilings for a run.
#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    /// Maximum accepted messages before the run stops.
    pub message_ceiling: usize,
    /// Maximum attempted turns, counted whether or not they are accepted.
    pub safety_ceiling: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            message_ceiling: 12,
            safety_ceiling: 15,
        }
    }
}

/// A collaborator that produces one role's analysis text.
///
/// Inject a deterministic stub in tests; wire to the chat-completion HTTP
/// client in production.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        role: &RoleSpec,
        idea: &str,
        transcript: &[TranscriptEntry],
    ) -> Result<String>;
}

/// Drives one conversation from seed idea to termination.
pub struct ConversationDriver {
    client: Arc<dyn CompletionClient>,
    router: Box<dyn TurnRouter>,
    sink: Arc<dyn DisplaySink>,
    config: DriverConfig,
    cancel: Option<watch::Receiver<bool>>,
}

impl ConversationDriver {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        router: Box<dyn TurnRouter>,
        sink: Arc<dyn DisplaySink>,
        config: DriverConfig,
    ) -> Self {
        Self {
            client,
            router,
            sink,
            config,
            cancel: None,
        }
    }

    /// Stop between turns once the channel carries `true`. In-flight model
    /// calls are not interrupted.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|rx| *rx.borrow())
    }

    /// Run the conversation to termination. Infallible by construction:
    /// per-turn faults terminate the run, they do not escape it.
    pub async fn run(&self, idea: &str) -> ConversationState {
        let span = obs::run_span(idea);
        self.run_loop(idea).instrument(span).await
    }

    async fn run_loop(&self, idea: &str) -> ConversationState {
        obs::emit_run_started(idea);
        self.sink.banner(idea);

        let mut routed: Vec<RoutedTurn> = vec![RoutedTurn::seed()];
        let mut transcript: Vec<TranscriptEntry> = Vec::new();
        let mut attempted = 0usize;

        let termination = loop {
            if transcript.len() >= self.config.message_ceiling {
                break Termination::MessageCeiling;
            }
            if attempted >= self.config.safety_ceiling {
                break Termination::SafetyCeiling;
            }
            if self.cancelled() {
                break Termination::Cancelled;
            }

            let role = match self.router.next(&routed) {
                Ok(Route::Next(role)) => role,
                Ok(Route::Complete) => break Termination::SequenceComplete,
                Err(e) => {
                    warn!(error = %e, "routing fault");
                    break Termination::CollaboratorFault(e.to_string());
                }
            };
            let spec = role.spec();
            attempted += 1;
            self.sink.progress(attempted, roles().len(), spec);

            let raw = match self.client.complete(spec, idea, &transcript).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(role = %spec.name, error = %e, "model call failed, finalizing early");
                    break Termination::CollaboratorFault(e.to_string());
                }
            };

            let (envelope, outcome) = decode(&raw, spec.name);
            if outcome == DecodeOutcome::RawFallback {
                obs::emit_decode_fallback(spec.name);
                self.sink.decode_warning(spec.name, &raw);
            }
            if !envelope.is_empty() && !spec.conforms(&envelope.content) {
                obs::emit_contract_violation(spec.name);
            }

            // The role spoke either way; routing history advances even when
            // the transcript does not.
            routed.push(RoutedTurn::from_role(role, envelope.sender.clone()));

            if envelope.is_empty() {
                obs::emit_turn_skipped(spec.name);
                self.sink.skipped_empty(spec.name);
                continue;
            }

            // Credit the resolved sender, exactly as the router attributes
            // the turn: a declared sender naming a known role wins, anything
            // else falls back to the invoked role.
            let author = RoleId::from_name(&envelope.sender)
                .map(RoleId::spec)
                .unwrap_or(spec);

            let step = transcript.len() + 1;
            obs::emit_turn_accepted(author.name, step);
            self.sink.turn(step, author, &envelope.content);
            transcript.push(TranscriptEntry {
                step,
                agent: author.name.to_string(),
                content: envelope.content,
            });
        };

        obs::emit_run_finished(transcript.len(), attempted, &termination);
        self.sink.completed(transcript.len(), &termination);

        ConversationState {
            idea: idea.to_string(),
            transcript,
            attempted_turns: attempted,
            termination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::roles::{roles, RoleId};
    use crate::router::{RoundRobinRouter, SequenceRouter};
    use std::sync::Mutex;

    /// Yields each scripted response once, in order; errors when exhausted.
    struct ScriptedClient {
        responses: Mutex<Vec<std::result::Result<String, String>>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<std::result::Result<String, String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
            })
        }

        fn speaking_all_roles() -> Arc<Self> {
            let responses = roles()
                .iter()
                .map(|spec| {
                    Ok(format!(
                        "{}\n- Finding: solid\n{}",
                        spec.header_tag, spec.closing_phrase
                    ))
                })
                .collect();
            Self::new(responses)
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(
            &self,
            _role: &RoleSpec,
            _idea: &str,
            _transcript: &[TranscriptEntry],
        ) -> Result<String> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(PipelineError::ModelCall("script exhausted".to_string()));
            }
            responses
                .remove(0)
                .map_err(PipelineError::ModelCall)
        }
    }

    #[derive(Default)]
    struct SilentSink;

    impl DisplaySink for SilentSink {
        fn banner(&self, _idea: &str) {}
        fn progress(&self, _current: usize, _total: usize, _role: &RoleSpec) {}
        fn turn(&self, _step: usize, _role: &RoleSpec, _content: &str) {}
        fn decode_warning(&self, _role_name: &str, _raw: &str) {}
        fn skipped_empty(&self, _role_name: &str) {}
        fn completed(&self, _total_steps: usize, _termination: &Termination) {}
        fn summary(&self, _transcript: &[TranscriptEntry]) {}
        fn reports_saved(&self, _saved: &crate::report::SavedReports) {}
    }

    fn driver(client: Arc<dyn CompletionClient>, router: Box<dyn TurnRouter>) -> ConversationDriver {
        ConversationDriver::new(client, router, Arc::new(SilentSink), DriverConfig::default())
    }

    #[tokio::test]
    async fn full_sequence_terminates_with_ten_accepted_messages() {
        let state = driver(
            ScriptedClient::speaking_all_roles(),
            Box::new(SequenceRouter),
        )
        .run("early wildfire detection with drones")
        .await;

        assert_eq!(state.termination, Termination::SequenceComplete);
        assert_eq!(state.transcript.len(), 10);
        assert_eq!(state.attempted_turns, 10);
        assert_eq!(state.transcript[0].agent, "domain_classifier");
        assert_eq!(state.transcript[9].agent, "final_resource_engineer");
        // Steps are contiguous and 1-based.
        for (i, entry) in state.transcript.iter().enumerate() {
            assert_eq!(entry.step, i + 1);
        }
    }

    #[tokio::test]
    async fn fault_mid_run_finalizes_with_partial_transcript() {
        let mut responses: Vec<std::result::Result<String, String>> = roles()
            .iter()
            .take(5)
            .map(|spec| Ok(format!("{} ok {}", spec.header_tag, spec.closing_phrase)))
            .collect();
        responses.push(Err("quota exhausted".to_string()));

        let state = driver(ScriptedClient::new(responses), Box::new(SequenceRouter))
            .run("idea")
            .await;

        assert!(matches!(
            state.termination,
            Termination::CollaboratorFault(ref detail) if detail.contains("quota exhausted")
        ));
        assert_eq!(state.transcript.len(), 5);
        assert_eq!(state.attempted_turns, 6);
    }

    #[tokio::test]
    async fn empty_turn_advances_sequence_without_a_transcript_gap() {
        let mut responses: Vec<std::result::Result<String, String>> = Vec::new();
        for (i, spec) in roles().iter().enumerate() {
            if i == 2 {
                responses.push(Ok("   ".to_string()));
            } else {
                responses.push(Ok(format!("{} ok {}", spec.header_tag, spec.closing_phrase)));
            }
        }

        let state = driver(ScriptedClient::new(responses), Box::new(SequenceRouter))
            .run("idea")
            .await;

        assert_eq!(state.termination, Termination::SequenceComplete);
        assert_eq!(state.transcript.len(), 9);
        assert_eq!(state.attempted_turns, 10);
        // The discarded prompt_engineer turn leaves no hole in the numbering.
        assert_eq!(state.transcript[2].agent, RoleId::AiSpecialist.name());
        assert_eq!(state.transcript[2].step, 3);
    }

    #[tokio::test]
    async fn round_robin_stops_at_the_message_ceiling() {
        let responses = (0..20)
            .map(|i| Ok(format!("analysis {i}")))
            .collect();

        let state = driver(ScriptedClient::new(responses), Box::new(RoundRobinRouter))
            .run("idea")
            .await;

        assert_eq!(state.termination, Termination::MessageCeiling);
        assert_eq!(state.transcript.len(), 12);
        // Wraps past the terminal role.
        assert_eq!(state.transcript[10].agent, "domain_classifier");
        assert_eq!(state.transcript[11].agent, "senior_researcher");
    }

    #[tokio::test]
    async fn safety_ceiling_catches_runs_that_accept_nothing() {
        let responses = (0..20).map(|_| Ok(String::new())).collect();

        let state = driver(ScriptedClient::new(responses), Box::new(RoundRobinRouter))
            .run("idea")
            .await;

        assert_eq!(state.termination, Termination::SafetyCeiling);
        assert!(state.transcript.is_empty());
        assert_eq!(state.attempted_turns, 15);
    }

    #[tokio::test]
    async fn cancellation_stops_between_turns() {
        let (tx, rx) = watch::channel(true);
        let state = driver(
            ScriptedClient::speaking_all_roles(),
            Box::new(SequenceRouter),
        )
        .with_cancellation(rx)
        .run("idea")
        .await;
        drop(tx);

        assert_eq!(state.termination, Termination::Cancelled);
        assert!(state.transcript.is_empty());
    }

    #[tokio::test]
    async fn declared_known_sender_is_credited_and_routed_consistently() {
        // The invoked domain_classifier declares itself as advisor_professor;
        // both the transcript and the subsequent route must follow that name.
        let advisor = RoleId::AdvisorProfessor.spec();
        let engineer = RoleId::FinalResourceEngineer.spec();
        let responses = vec![
            Ok(serde_json::json!({
                "sender": advisor.name,
                "content": format!("{} looks strong {}", advisor.header_tag, advisor.closing_phrase),
            })
            .to_string()),
            Ok(format!(
                "{} ok {}",
                engineer.header_tag, engineer.closing_phrase
            )),
        ];

        let state = driver(ScriptedClient::new(responses), Box::new(SequenceRouter))
            .run("idea")
            .await;

        assert_eq!(state.termination, Termination::SequenceComplete);
        assert_eq!(state.transcript.len(), 2);
        assert_eq!(state.transcript[0].agent, "advisor_professor");
        assert_eq!(state.transcript[1].agent, "final_resource_engineer");
    }

    #[tokio::test]
    async fn unrecognized_declared_sender_is_credited_to_the_invoked_role() {
        let mut responses = vec![Ok(serde_json::json!({
            "sender": "question_wizard",
            "content": "🎯 Domain Analysis free-form Domain analysis complete.",
        })
        .to_string())];
        responses.extend(
            roles()
                .iter()
                .skip(1)
                .map(|spec| Ok(format!("{} ok {}", spec.header_tag, spec.closing_phrase))),
        );

        let state = driver(ScriptedClient::new(responses), Box::new(SequenceRouter))
            .run("idea")
            .await;

        assert_eq!(state.termination, Termination::SequenceComplete);
        assert_eq!(state.transcript.len(), 10);
        assert_eq!(state.transcript[0].agent, "domain_classifier");
    }

    #[tokio::test]
    async fn structured_envelope_content_is_unwrapped_into_the_transcript() {
        let first = roles()[0].clone();
        let body = format!("{} wrapped {}", first.header_tag, first.closing_phrase);
        let wire = serde_json::json!({
            "sender": first.name,
            "receiver": "senior_researcher",
            "turn_index": 1,
            "content": body,
        })
        .to_string();
        let mut responses = vec![Ok(wire)];
        responses.extend(
            roles()
                .iter()
                .skip(1)
                .map(|spec| Ok(format!("{} ok {}", spec.header_tag, spec.closing_phrase))),
        );

        let state = driver(ScriptedClient::new(responses), Box::new(SequenceRouter))
            .run("idea")
            .await;

        assert_eq!(state.transcript[0].content, body);
        assert_eq!(state.termination, Termination::SequenceComplete);
    }
}
