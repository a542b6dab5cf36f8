//! Turn routing — who speaks next.
//!
//! Routing works over the *attempted*-turn history (including turns later
//! discarded for empty content), never over the accepted transcript: a role
//! that produced an empty analysis still spoke, and the sequence moves on to
//! its successor rather than re-invoking it.
//!
//! Self-declared envelope fields are advisory. The sequence strategy resolves
//! "who actually spoke" from the declared sender with a defensive fallback to
//! the technical speaker, so a model freely inventing sender names cannot
//! derail control flow.

use crate::error::{PipelineError, Result};
use crate::roles::{roles, RoleId};

/// Who technically produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    /// The seeding participant who posed the initial idea.
    User,
    /// One of the ten analysis roles.
    Role(RoleId),
}

/// One attempted turn, as seen by the router.
#[derive(Debug, Clone)]
pub struct RoutedTurn {
    /// Sender name declared in the decoded envelope.
    pub sender: String,
    /// The participant the driver actually invoked.
    pub speaker: Speaker,
}

impl RoutedTurn {
    /// The synthetic seed turn priming the router. Never part of the transcript.
    pub fn seed() -> Self {
        Self {
            sender: "user".to_string(),
            speaker: Speaker::User,
        }
    }

    pub fn from_role(role: RoleId, sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            speaker: Speaker::Role(role),
        }
    }
}

/// Routing decision for the next turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// This role speaks next.
    Next(RoleId),
    /// The sequence has run to its natural end. Normal termination, not a fault.
    Complete,
}

/// Strategy deciding which role speaks next given the attempted-turn history.
pub trait TurnRouter: Send + Sync {
    fn next(&self, history: &[RoutedTurn]) -> Result<Route>;
}

/// Positional strategy: the n-th role turn belongs to `roles()[n mod 10]`.
///
/// A pure function of how many role turns have happened; termination is
/// entirely external (the driver's ceilings).
#[derive(Debug, Default)]
pub struct RoundRobinRouter;

impl TurnRouter for RoundRobinRouter {
    fn next(&self, history: &[RoutedTurn]) -> Result<Route> {
        let role_turns = history
            .iter()
            .filter(|turn| matches!(turn.speaker, Speaker::Role(_)))
            .count();
        let spec = &roles()[role_turns % roles().len()];
        Ok(Route::Next(spec.id))
    }
}

/// Explicit-sequence strategy: each role hands off to its registered successor.
#[derive(Debug, Default)]
pub struct SequenceRouter;

impl SequenceRouter {
    /// Resolve who spoke last. Declared sender wins when it names a known
    /// role; otherwise fall back to the technical speaker.
    fn last_speaker(turn: &RoutedTurn) -> Result<Speaker> {
        if turn.sender == "user" {
            return Ok(Speaker::User);
        }
        if let Some(role) = RoleId::from_name(&turn.sender) {
            return Ok(Speaker::Role(role));
        }
        match turn.speaker {
            Speaker::Role(role) => Ok(Speaker::Role(role)),
            Speaker::User => Err(PipelineError::NoNextSpeaker(turn.sender.clone())),
        }
    }
}

impl TurnRouter for SequenceRouter {
    fn next(&self, history: &[RoutedTurn]) -> Result<Route> {
        let Some(last) = history.last() else {
            return Ok(Route::Next(RoleId::first()));
        };

        match Self::last_speaker(last)? {
            // The seed turn opens the sequence.
            Speaker::User => Ok(Route::Next(RoleId::first())),
            Speaker::Role(role) => match role.spec().successor {
                Some(next) => Ok(Route::Next(next)),
                None => Ok(Route::Complete),
            },
        }
    }
}
