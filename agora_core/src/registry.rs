//! Participant registry - registration and capability tokens.
//!
//! A participant's token lives in the same map entry as its registration,
//! and its shared-state map is published/removed while the registry write
//! lock is held. No reader can observe a token without a registration,
//! or state outliving a deregistration.

use crate::shared_state::SharedStateStore;
use agora_env::{
    AuthToken, EnvError, EnvironmentService, ParticipantId, ServiceGenerator, SharedState,
    TokenSource,
};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Production token source backed by random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokenSource;

impl TokenSource for RandomTokenSource {
    fn mint(&self) -> AuthToken {
        AuthToken::from_uuid(Uuid::new_v4())
    }
}

/// Tracks registered participants and their tokens.
pub struct ParticipantRegistry {
    /// Registered participants -> current token
    registered: RwLock<HashMap<ParticipantId, AuthToken>>,

    /// State store the registry publishes participant entries into
    store: Arc<SharedStateStore>,

    /// Token minting
    tokens: Arc<dyn TokenSource>,
}

impl ParticipantRegistry {
    /// Creates a registry publishing into `store`.
    pub fn new(store: Arc<SharedStateStore>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            registered: RwLock::new(HashMap::new()),
            store,
            tokens,
        }
    }

    /// Registers a participant.
    ///
    /// # Returns
    /// * `Ok((token, services))` - the fresh token and the advertised services
    /// * `Err(EnvError::InvalidRequest)` - nil identity, or already registered
    pub fn register(
        &self,
        participant: ParticipantId,
        initial_state: Vec<SharedState>,
        services: &dyn ServiceGenerator,
    ) -> Result<(AuthToken, BTreeSet<EnvironmentService>), EnvError> {
        if participant.is_nil() {
            let err = EnvError::invalid_request("registration request has no participant identity");
            warn!("Failed to register participant: {}", err);
            return Err(err);
        }

        let token = {
            let mut registered = self.registered.write();
            if registered.contains_key(&participant) {
                let err = EnvError::invalid_request(format!(
                    "participant {} is already registered",
                    participant
                ));
                warn!("Failed to register participant: {}", err);
                return Err(err);
            }

            info!("Registering participant {}", participant);
            let token = self.tokens.mint();
            self.store.put_participant_state(participant, initial_state);
            registered.insert(participant, token);
            token
        };

        let services = services.generate_services(participant);
        debug!(
            "Responding to registration from {} with {} services",
            participant,
            services.len()
        );

        Ok((token, services))
    }

    /// Removes a participant, its token and its state.
    ///
    /// Fails with `Unauthorized` unless `token` is the participant's current
    /// token; an unregistered participant never matches.
    pub fn deregister(&self, participant: ParticipantId, token: AuthToken) -> Result<(), EnvError> {
        let mut registered = self.registered.write();

        if registered.get(&participant) != Some(&token) {
            let err = EnvError::unauthorized(format!(
                "participant {} attempting to deregister with incorrect token",
                participant
            ));
            warn!("{}", err);
            return Err(err);
        }

        info!("Deregistering participant {}", participant);
        self.store.remove_participant_state(participant);
        registered.remove(&participant);
        Ok(())
    }

    /// True iff `participant` is registered and `token` is its current token.
    pub fn validate(&self, participant: ParticipantId, token: AuthToken) -> bool {
        self.registered.read().get(&participant) == Some(&token)
    }

    /// True if `participant` is currently registered.
    pub fn is_registered(&self, participant: ParticipantId) -> bool {
        self.registered.read().contains_key(&participant)
    }

    /// Snapshot of the registered participants, sorted.
    pub fn participants(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<ParticipantId> = self.registered.read().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Number of registered participants.
    pub fn len(&self) -> usize {
        self.registered.read().len()
    }

    /// True when nobody is registered.
    pub fn is_empty(&self) -> bool {
        self.registered.read().is_empty()
    }
}
