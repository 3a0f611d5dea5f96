//! Collaborator interfaces consumed by the environment core.
//!
//! The core never implements world geometry, rule inference or action
//! semantics itself. A concrete environment injects implementations of
//! these traits at construction time.

use crate::error::EnvError;
use crate::types::{AuthToken, EnvironmentService, Location, Message, ParticipantId};
use std::any::Any;
use std::collections::BTreeSet;
use std::fmt::Debug;

/// Resolves participant positions.
///
/// # Errors
/// * `EnvError::Unavailable` / `EnvError::NotFound` - the participant has no location state
/// * `EnvError::Fatal` - the service structurally cannot resolve this participant
pub trait LocationService: Send + Sync {
    fn agent_location(&self, participant: ParticipantId) -> Result<Location, EnvError>;
}

/// Resolves participant communication ranges.
///
/// # Errors
/// * `EnvError::Unavailable` / `EnvError::NotFound` - the participant has no range state
pub trait CommunicationRangeService: Send + Sync {
    fn agent_communication_range(&self, participant: ParticipantId) -> Result<f64, EnvError>;
}

/// An external stateful inference session.
///
/// Facts are inserted fire-and-forget; the session's rules are opaque.
pub trait InferenceSession: Send + Sync {
    fn insert_fact(&self, message: &Message);
}

/// Computes the set of capabilities advertised to a newly registered participant.
pub trait ServiceGenerator: Send + Sync {
    fn generate_services(&self, participant: ParticipantId) -> BTreeSet<EnvironmentService>;
}

/// Something a participant asks the environment to do.
pub trait Action: Debug + Send + Sync {
    /// Short label for logging.
    fn name(&self) -> &str;

    /// Downcast hook for handlers.
    fn as_any(&self) -> &dyn Any;
}

/// Applies validated actions to the world.
pub trait ActionHandler: Send + Sync {
    /// Called only after the actor's token has been validated.
    fn handle(&self, actor: ParticipantId, action: &dyn Action) -> Result<(), EnvError>;
}

/// Mints fresh authentication tokens.
///
/// # Implementations
///
/// - **Production**: random v4 UUIDs
/// - **Simulation**: a seeded RNG so runs are reproducible
pub trait TokenSource: Send + Sync {
    fn mint(&self) -> AuthToken;
}
