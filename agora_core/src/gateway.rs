//! Environment gateway - the single entry point participants talk to.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    EnvironmentGateway                      │
//! │                                                            │
//! │   register ──► ParticipantRegistry ──► SharedStateStore    │
//! │   act ───────► validate ──► ActionHandler                  │
//! │   deregister ► ParticipantRegistry                         │
//! │   get/global ────────────────────────► SharedStateStore    │
//! │                                                            │
//! │   ServiceGenerator (injected)   TokenSource (injected)     │
//! └────────────────────────────────────────────────────────────┘
//! ```

use crate::config::EnvironmentConfig;
use crate::registry::{ParticipantRegistry, RandomTokenSource};
use crate::shared_state::SharedStateStore;
use crate::state_services::{StateLocationService, StateRangeService};
use agora_env::{
    Action, ActionHandler, AuthToken, EnvError, EnvironmentService, ParticipantId,
    ServiceGenerator, SharedState, TokenSource,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A request to join the environment.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Identity of the joining participant
    pub participant: ParticipantId,

    /// State the participant shares with the environment
    pub shared_state: Vec<SharedState>,
}

impl RegistrationRequest {
    pub fn new(participant: ParticipantId) -> Self {
        Self {
            participant,
            shared_state: Vec::new(),
        }
    }

    /// Declares a shared state entry.
    pub fn with_state(mut self, state: SharedState) -> Self {
        self.shared_state.push(state);
        self
    }
}

/// The environment's answer to a successful registration.
#[derive(Debug, Clone)]
pub struct RegistrationResponse {
    /// Token required for `act` and `deregister`
    pub token: AuthToken,

    /// Capabilities advertised to the participant
    pub services: BTreeSet<EnvironmentService>,
}

/// Advertises the same services to every participant.
#[derive(Debug, Clone, Default)]
pub struct StaticServices {
    services: BTreeSet<EnvironmentService>,
}

impl StaticServices {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            services: names.into_iter().map(EnvironmentService::new).collect(),
        }
    }
}

impl ServiceGenerator for StaticServices {
    fn generate_services(&self, _participant: ParticipantId) -> BTreeSet<EnvironmentService> {
        self.services.clone()
    }
}

/// Accepts every validated action without effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopActionHandler;

impl ActionHandler for NoopActionHandler {
    fn handle(&self, actor: ParticipantId, action: &dyn Action) -> Result<(), EnvError> {
        debug!("Ignoring action '{}' from {}", action.name(), actor);
        Ok(())
    }
}

/// Composes the registry and state store behind one interface.
pub struct EnvironmentGateway {
    config: EnvironmentConfig,
    store: Arc<SharedStateStore>,
    registry: ParticipantRegistry,
    services: Arc<dyn ServiceGenerator>,
    actions: Arc<dyn ActionHandler>,
}

impl EnvironmentGateway {
    /// Creates a gateway with random tokens, no advertised services and a no-op action handler.
    pub fn new(config: EnvironmentConfig) -> Self {
        info!("Creating environment '{}'", config.name);
        let store = SharedStateStore::shared();
        let registry = ParticipantRegistry::new(store.clone(), Arc::new(RandomTokenSource));
        Self {
            config,
            store,
            registry,
            services: Arc::new(StaticServices::default()),
            actions: Arc::new(NoopActionHandler),
        }
    }

    /// Sets the service-generation collaborator.
    pub fn with_services(mut self, services: Arc<dyn ServiceGenerator>) -> Self {
        self.services = services;
        self
    }

    /// Sets the action-processing collaborator.
    pub fn with_action_handler(mut self, actions: Arc<dyn ActionHandler>) -> Self {
        self.actions = actions;
        self
    }

    /// Sets the token source. Call before anyone registers: the registry
    /// is rebuilt empty over the same store.
    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.registry = ParticipantRegistry::new(self.store.clone(), tokens);
        self
    }

    /// Registers a participant.
    pub fn register(&self, request: RegistrationRequest) -> Result<RegistrationResponse, EnvError> {
        let (token, services) = self.registry.register(
            request.participant,
            request.shared_state,
            self.services.as_ref(),
        )?;
        debug!(
            "{}: {} joined with {} services",
            self.config.name,
            request.participant,
            services.len()
        );
        Ok(RegistrationResponse { token, services })
    }

    /// Performs an action on behalf of `actor`.
    ///
    /// The token is checked before the action reaches the handler.
    pub fn act(
        &self,
        action: &dyn Action,
        actor: ParticipantId,
        token: AuthToken,
    ) -> Result<(), EnvError> {
        if !self.registry.validate(actor, token) {
            let err = EnvError::unauthorized(format!(
                "participant {} attempting to act with incorrect token",
                actor
            ));
            warn!("{}", err);
            return Err(err);
        }
        self.actions.handle(actor, action)
    }

    /// Deregisters a participant.
    pub fn deregister(&self, participant: ParticipantId, token: AuthToken) -> Result<(), EnvError> {
        self.registry.deregister(participant, token)?;
        debug!("{}: {} left", self.config.name, participant);
        Ok(())
    }

    /// Returns a global state entry.
    pub fn get_global(&self, name: &str) -> Result<SharedState, EnvError> {
        self.store.get_global(name)
    }

    /// Returns a participant's state entry.
    pub fn get(&self, name: &str, participant: ParticipantId) -> Result<SharedState, EnvError> {
        self.store.get_participant_state(participant, name)
    }

    /// Publishes a global state entry.
    pub fn insert_global(&self, state: SharedState) -> Option<SharedState> {
        self.store.insert_global(state)
    }

    /// Location service reading the configured location entry.
    pub fn location_service(&self) -> StateLocationService {
        StateLocationService::new(self.store.clone(), self.config.location_state.clone())
    }

    /// Range service reading the configured range entry.
    pub fn range_service(&self) -> StateRangeService {
        StateRangeService::new(self.store.clone(), self.config.range_state.clone())
    }

    /// The participant registry.
    pub fn registry(&self) -> &ParticipantRegistry {
        &self.registry
    }

    /// The backing state store.
    pub fn store(&self) -> &Arc<SharedStateStore> {
        &self.store
    }

    /// Configuration.
    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }
}

impl Default for EnvironmentGateway {
    fn default() -> Self {
        Self::new(EnvironmentConfig::default())
    }
}
