//! Shared state store - global and participant-scoped state entries.

use agora_env::{EnvError, ParticipantId, SharedState};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Participant-scoped entries, keyed by state name.
///
/// Each participant's map is immutable once published and replaced
/// wholesale, so readers never observe a half-populated map.
pub type StateMap = HashMap<String, SharedState>;

/// Typed key-value slots visible to the environment and its collaborators.
#[derive(Default)]
pub struct SharedStateStore {
    /// Global entries, one instance shared by all readers
    globals: RwLock<HashMap<String, SharedState>>,

    /// Per-participant entry maps
    participants: RwLock<HashMap<ParticipantId, Arc<StateMap>>>,
}

impl SharedStateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an Arc-wrapped store for sharing between components.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Publishes a global entry under its own name, returning any entry it replaced.
    pub fn insert_global(&self, state: SharedState) -> Option<SharedState> {
        debug!("Publishing global state '{}'", state.name());
        self.globals.write().insert(state.name().to_string(), state)
    }

    /// Returns the global entry called `name`.
    pub fn get_global(&self, name: &str) -> Result<SharedState, EnvError> {
        match self.globals.read().get(name) {
            Some(state) => {
                debug!("Returning global environment state '{}'", name);
                Ok(state.clone())
            }
            None => {
                let err = EnvError::not_found(format!(
                    "global state '{}' does not exist",
                    name
                ));
                warn!("Invalid global shared state access: {}", err);
                Err(err)
            }
        }
    }

    /// Returns the entry `name` owned by `participant`.
    ///
    /// An unknown participant and an unknown name yield the same error kind.
    pub fn get_participant_state(
        &self,
        participant: ParticipantId,
        name: &str,
    ) -> Result<SharedState, EnvError> {
        let map = self.participants.read().get(&participant).cloned();

        let Some(map) = map else {
            let err = EnvError::not_found(format!(
                "'{}.{}': participant does not exist",
                participant, name
            ));
            warn!("Invalid shared state access: {}", err);
            return Err(err);
        };

        match map.get(name) {
            Some(state) => {
                debug!("Returning participant state '{}.{}'", participant, name);
                Ok(state.clone())
            }
            None => {
                let err = EnvError::not_found(format!(
                    "'{}.{}': participant does not have a state with this name",
                    participant, name
                ));
                warn!("Invalid shared state access: {}", err);
                Err(err)
            }
        }
    }

    /// Replaces a participant's entries wholesale.
    ///
    /// Entries are keyed by their own name; a later entry with the same
    /// name replaces an earlier one.
    pub fn put_participant_state(
        &self,
        participant: ParticipantId,
        entries: impl IntoIterator<Item = SharedState>,
    ) {
        let map: StateMap = entries
            .into_iter()
            .map(|state| (state.name().to_string(), state))
            .collect();

        self.participants.write().insert(participant, Arc::new(map));
    }

    /// Drops every entry owned by `participant`.
    pub(crate) fn remove_participant_state(&self, participant: ParticipantId) -> bool {
        self.participants.write().remove(&participant).is_some()
    }

    /// Names of the entries owned by `participant`, sorted.
    pub fn participant_state_names(&self, participant: ParticipantId) -> Vec<String> {
        let mut names: Vec<String> = self
            .participants
            .read()
            .get(&participant)
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Number of participants with a published state map.
    pub fn participant_count(&self) -> usize {
        self.participants.read().len()
    }
}
