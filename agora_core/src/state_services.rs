//! Location and communication-range services backed by participant state.
//!
//! Participants declare a `Location` entry and an `f64` range entry at
//! registration; these services resolve them through the state store.
//! A missing entry reports `Unavailable`, a wrongly typed entry is a
//! contract violation and reports `Fatal`.

use crate::shared_state::SharedStateStore;
use agora_env::{CommunicationRangeService, EnvError, Location, LocationService, ParticipantId};
use std::sync::Arc;

/// Restricts which participants a location service may resolve.
#[derive(Debug, Clone, Copy)]
struct Perception {
    observer: ParticipantId,
    radius: f64,
}

/// Resolves locations from the store.
#[derive(Clone)]
pub struct StateLocationService {
    store: Arc<SharedStateStore>,
    state_name: String,
    perception: Option<Perception>,
}

impl StateLocationService {
    pub fn new(store: Arc<SharedStateStore>, state_name: impl Into<String>) -> Self {
        Self {
            store,
            state_name: state_name.into(),
            perception: None,
        }
    }

    /// Limits resolution to participants within `radius` of `observer`.
    ///
    /// Asking for a participant outside the radius is a `Fatal` error: it
    /// means the caller asked about someone it should not be able to see.
    pub fn perceived_by(mut self, observer: ParticipantId, radius: f64) -> Self {
        self.perception = Some(Perception { observer, radius });
        self
    }

    fn read_location(&self, participant: ParticipantId) -> Result<Location, EnvError> {
        let state = self
            .store
            .get_participant_state(participant, &self.state_name)
            .map_err(|e| EnvError::unavailable(e.to_string()))?;

        state.get::<Location>().ok_or_else(|| {
            EnvError::fatal(format!(
                "state '{}.{}' holds {}, expected a Location",
                participant,
                self.state_name,
                state.value_type()
            ))
        })
    }
}

impl LocationService for StateLocationService {
    fn agent_location(&self, participant: ParticipantId) -> Result<Location, EnvError> {
        let location = self.read_location(participant)?;

        if let Some(Perception { observer, radius }) = self.perception {
            if observer != participant {
                let origin = self.read_location(observer)?;
                if origin.distance_to(&location) > radius {
                    return Err(EnvError::fatal(format!(
                        "{} cannot see {}",
                        observer, participant
                    )));
                }
            }
        }

        Ok(location)
    }
}

/// Resolves communication ranges from the store.
#[derive(Clone)]
pub struct StateRangeService {
    store: Arc<SharedStateStore>,
    state_name: String,
}

impl StateRangeService {
    pub fn new(store: Arc<SharedStateStore>, state_name: impl Into<String>) -> Self {
        Self {
            store,
            state_name: state_name.into(),
        }
    }
}

impl CommunicationRangeService for StateRangeService {
    fn agent_communication_range(&self, participant: ParticipantId) -> Result<f64, EnvError> {
        let state = self
            .store
            .get_participant_state(participant, &self.state_name)
            .map_err(|e| EnvError::unavailable(e.to_string()))?;

        state.get::<f64>().ok_or_else(|| {
            EnvError::fatal(format!(
                "state '{}.{}' holds {}, expected an f64 range",
                participant,
                self.state_name,
                state.value_type()
            ))
        })
    }
}
