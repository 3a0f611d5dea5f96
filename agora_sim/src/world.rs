//! SimWorld - the simulation harness container.

use crate::actions::{MoveAction, MoveHandler};
use crate::error::SimError;
use crate::keys::SeededTokenSource;
use crate::session::RecordingSession;

use agora_core::{
    ConstraintPipeline, EnvironmentConfig, EnvironmentGateway, InferenceForwardingConstraint,
    RangeConstraint, RegistrationRequest, StaticServices,
};
use agora_env::{AuthToken, EnvironmentService, Location, Message, ParticipantId, SharedState};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Name of the global entry holding the current tick.
pub const TIME_STATE: &str = "time";

/// Services advertised to every simulated participant.
pub const SIM_SERVICES: [&str; 3] = ["location", "commsrange", "messaging"];

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Number of participants to spawn
    pub num_participants: usize,

    /// Side length of the square world
    pub world_size: f64,

    /// Communication range given to spawned participants
    pub comm_range: f64,

    /// Number of ticks to run
    pub ticks: u64,

    /// Maximum per-axis step of a random move (0 = stationary)
    pub step_size: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_participants: 8,
            world_size: 100.0,
            comm_range: 30.0,
            ticks: 50,
            step_size: 2.0,
        }
    }
}

/// A participant the harness registered, with its credentials.
#[derive(Debug, Clone)]
pub struct SimParticipant {
    pub id: ParticipantId,
    pub token: AuthToken,
    pub services: BTreeSet<EnvironmentService>,
}

/// Per-tick message statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickStats {
    /// Messages handed to the pipeline
    pub messages_sent: u64,

    /// Messages the pipeline allowed
    pub deliveries: u64,

    /// Messages the pipeline dropped
    pub drops: u64,

    /// Decisions that disagreed with the ground-truth geometry
    pub range_violations: u64,
}

impl TickStats {
    pub fn merge(&mut self, other: TickStats) {
        self.messages_sent += other.messages_sent;
        self.deliveries += other.deliveries;
        self.drops += other.drops;
        self.range_violations += other.range_violations;
    }
}

/// The SimWorld - gateway, pipeline and collaborators for one run.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    gateway: Arc<EnvironmentGateway>,
    pipeline: ConstraintPipeline,
    session: Arc<RecordingSession>,

    /// Seeded RNG for placement and movement
    rng: ChaCha8Rng,

    participants: Vec<SimParticipant>,

    /// Global clock entry
    clock: SharedState,

    /// Identity counter for spawned participants
    spawned: u64,

    tick_count: u64,
}

impl SimWorld {
    /// Creates a new SimWorld with the given configuration.
    pub fn new(config: SimConfig) -> Self {
        // Derive separate seeds for different subsystems
        let physics_seed = config.seed.wrapping_mul(0x9e3779b97f4a7c15);
        let token_seed = config.seed.wrapping_mul(0x517cc1b727220a95);

        let env_config = EnvironmentConfig {
            name: "agora-sim".to_string(),
            ..Default::default()
        };
        let gateway = EnvironmentGateway::new(env_config)
            .with_token_source(Arc::new(SeededTokenSource::new(token_seed)))
            .with_services(Arc::new(StaticServices::new(SIM_SERVICES)));
        let mover = MoveHandler::new(
            gateway.store().clone(),
            gateway.config().location_state.clone(),
            config.world_size,
        );
        let gateway = Arc::new(gateway.with_action_handler(Arc::new(mover)));

        let clock = SharedState::new(TIME_STATE, 0u64);
        gateway.insert_global(clock.clone());

        let session = Arc::new(RecordingSession::new());
        let pipeline = ConstraintPipeline::new()
            .with(Arc::new(InferenceForwardingConstraint::new(session.clone())))
            .with(Arc::new(RangeConstraint::new(
                Arc::new(gateway.location_service()),
                Arc::new(gateway.range_service()),
            )));
        debug!("Delivery pipeline: [{}]", pipeline.names().join(", "));

        Self {
            config,
            gateway,
            pipeline,
            session,
            rng: ChaCha8Rng::seed_from_u64(physics_seed),
            participants: Vec::new(),
            clock,
            spawned: 0,
            tick_count: 0,
        }
    }

    /// Spawns `num_participants` at random positions and returns their IDs.
    pub fn spawn_participants(&mut self) -> Result<Vec<ParticipantId>, SimError> {
        let mut ids = Vec::with_capacity(self.config.num_participants);
        for _ in 0..self.config.num_participants {
            let location = Location::from_xy(
                self.rng.gen_range(0.0..=self.config.world_size),
                self.rng.gen_range(0.0..=self.config.world_size),
            );
            ids.push(self.spawn_at(location, Some(self.config.comm_range))?);
        }
        Ok(ids)
    }

    /// Registers one participant. `range: None` leaves out the range entry.
    pub fn spawn_at(&mut self, location: Location, range: Option<f64>) -> Result<ParticipantId, SimError> {
        self.spawned += 1;
        let id = ParticipantId::from_seed(self.config.seed ^ self.spawned);
        self.register(id, location, range)?;
        Ok(id)
    }

    fn register(&mut self, id: ParticipantId, location: Location, range: Option<f64>) -> Result<(), SimError> {
        let env = self.gateway.config();
        let mut request = RegistrationRequest::new(id)
            .with_state(SharedState::new(env.location_state.clone(), location));
        if let Some(range) = range {
            request = request.with_state(SharedState::new(env.range_state.clone(), range));
        }

        let response = self.gateway.register(request)?;
        self.participants.push(SimParticipant {
            id,
            token: response.token,
            services: response.services,
        });
        Ok(())
    }

    /// Deregisters a participant and returns the token it used.
    pub fn remove(&mut self, id: ParticipantId) -> Result<AuthToken, SimError> {
        let index = self.index_of(id)?;
        let token = self.participants[index].token;
        self.gateway.deregister(id, token)?;
        self.participants.remove(index);
        Ok(token)
    }

    /// Deregisters and re-registers `id` with the same state.
    ///
    /// Returns `(stale, fresh)` tokens.
    pub fn rejoin(&mut self, id: ParticipantId) -> Result<(AuthToken, AuthToken), SimError> {
        let location = self.location_of(id);
        let range = self.range_of(id);
        let location = location.ok_or_else(|| {
            SimError::Env(agora_env::EnvError::not_found(format!("{} has no location", id)))
        })?;

        let stale = self.remove(id)?;
        self.register(id, location, range)?;
        let fresh = self.participants[self.index_of(id)?].token;
        Ok((stale, fresh))
    }

    fn index_of(&self, id: ParticipantId) -> Result<usize, SimError> {
        self.participants
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| SimError::Env(agora_env::EnvError::not_found(format!("{} is not in the world", id))))
    }

    /// Advances the world by one tick: every participant moves, then
    /// messages every other participant through the pipeline.
    pub fn tick(&mut self) -> Result<TickStats, SimError> {
        self.tick_count += 1;
        self.clock.set(self.tick_count)?;

        if self.config.step_size > 0.0 {
            let step = self.config.step_size;
            for i in 0..self.participants.len() {
                let action = MoveAction::new(
                    self.rng.gen_range(-step..=step),
                    self.rng.gen_range(-step..=step),
                );
                let p = &self.participants[i];
                self.gateway.act(&action, p.id, p.token)?;
            }
        }

        let mut stats = TickStats::default();
        for from in &self.participants {
            for to in &self.participants {
                if from.id == to.id {
                    continue;
                }

                let message = Message::new(
                    from.id,
                    to.id,
                    "inform",
                    self.tick_count.to_le_bytes().to_vec(),
                    self.tick_count,
                );
                let expected_blocked = self.expected_blocked(from.id, to.id);

                stats.messages_sent += 1;
                let delivered = self.pipeline.evaluate(message)?.is_some();
                if delivered {
                    stats.deliveries += 1;
                } else {
                    stats.drops += 1;
                }
                if delivered == expected_blocked {
                    stats.range_violations += 1;
                }
            }
        }

        debug!(
            "tick {}: {} sent, {} delivered, {} dropped",
            self.tick_count, stats.messages_sent, stats.deliveries, stats.drops
        );
        Ok(stats)
    }

    /// Ground truth: would two participants be out of range?
    ///
    /// Missing facts count as "in range", matching the fail-open policy.
    pub fn expected_blocked(&self, a: ParticipantId, b: ParticipantId) -> bool {
        match (self.location_of(a), self.location_of(b), self.range_of(a), self.range_of(b)) {
            (Some(la), Some(lb), Some(ra), Some(rb)) => la.distance_to(&lb) > ra.min(rb),
            _ => false,
        }
    }

    /// Current location of a participant, if it has one.
    pub fn location_of(&self, id: ParticipantId) -> Option<Location> {
        let env = self.gateway.config();
        self.gateway
            .get(&env.location_state, id)
            .ok()
            .and_then(|state| state.get::<Location>())
    }

    /// Communication range of a participant, if it has one.
    pub fn range_of(&self, id: ParticipantId) -> Option<f64> {
        let env = self.gateway.config();
        self.gateway
            .get(&env.range_state, id)
            .ok()
            .and_then(|state| state.get::<f64>())
    }

    /// Positions of all participants in the world.
    pub fn positions(&self) -> Vec<(ParticipantId, Location)> {
        self.participants
            .iter()
            .filter_map(|p| self.location_of(p.id).map(|l| (p.id, l)))
            .collect()
    }

    pub fn gateway(&self) -> &Arc<EnvironmentGateway> {
        &self.gateway
    }

    pub fn pipeline(&self) -> &ConstraintPipeline {
        &self.pipeline
    }

    pub fn session(&self) -> &Arc<RecordingSession> {
        &self.session
    }

    pub fn participants(&self) -> &[SimParticipant] {
        &self.participants
    }

    /// Returns the current tick count.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Reads the global clock through the gateway.
    pub fn time(&self) -> u64 {
        self.gateway
            .get_global(TIME_STATE)
            .ok()
            .and_then(|state| state.get::<u64>())
            .unwrap_or(0)
    }

    /// Returns the number of registered participants.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_env::EnvError;

    fn still_world(n: usize) -> SimWorld {
        SimWorld::new(SimConfig {
            num_participants: n,
            step_size: 0.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_sim_world_creation() {
        let mut world = still_world(3);
        let ids = world.spawn_participants().unwrap();

        assert_eq!(ids.len(), 3);
        assert_eq!(world.participant_count(), 3);
        assert_eq!(world.gateway().registry().len(), 3);
        for p in world.participants() {
            assert_eq!(p.services.len(), SIM_SERVICES.len());
        }
    }

    #[test]
    fn test_pipeline_forwards_before_range_check() {
        let world = still_world(0);
        assert_eq!(world.pipeline().names(), vec!["inference", "range"]);
        assert_eq!(world.gateway().config().name, "agora-sim");
    }

    #[test]
    fn test_tick_advances_global_clock() {
        let mut world = still_world(2);
        world.spawn_participants().unwrap();

        assert_eq!(world.time(), 0);
        world.tick().unwrap();
        world.tick().unwrap();
        assert_eq!(world.tick_count(), 2);
        assert_eq!(world.time(), 2);
    }

    #[test]
    fn test_tick_delivery_matches_geometry() {
        let mut world = still_world(0);
        let a = world.spawn_at(Location::from_xy(0.0, 0.0), Some(5.0)).unwrap();
        let b = world.spawn_at(Location::from_xy(3.0, 0.0), Some(5.0)).unwrap();
        let c = world.spawn_at(Location::from_xy(10.0, 0.0), Some(5.0)).unwrap();

        let stats = world.tick().unwrap();

        // a<->b in range, a<->c and b<->c out of range (distance 7 > 5)
        assert_eq!(stats.messages_sent, 6);
        assert_eq!(stats.deliveries, 2);
        assert_eq!(stats.drops, 4);
        assert_eq!(stats.range_violations, 0);
        assert!(!world.expected_blocked(a, b));
        assert!(world.expected_blocked(a, c));
        assert_eq!(world.session().fact_count(), 6);
    }

    #[test]
    fn test_moves_stay_inside_world() {
        let mut world = SimWorld::new(SimConfig {
            num_participants: 5,
            step_size: 50.0,
            world_size: 20.0,
            ..Default::default()
        });
        world.spawn_participants().unwrap();

        for _ in 0..10 {
            let stats = world.tick().unwrap();
            assert_eq!(stats.range_violations, 0);
        }
        for (_, location) in world.positions() {
            assert!((0.0..=20.0).contains(&location.position.x));
            assert!((0.0..=20.0).contains(&location.position.y));
        }
    }

    #[test]
    fn test_rejoin_rotates_token() {
        let mut world = still_world(2);
        let ids = world.spawn_participants().unwrap();

        let (stale, fresh) = world.rejoin(ids[0]).unwrap();
        assert_ne!(stale, fresh);

        let gateway = world.gateway();
        let result = gateway.act(&MoveAction::new(0.0, 0.0), ids[0], stale);
        assert!(matches!(result, Err(EnvError::Unauthorized(_))));
        assert!(gateway.act(&MoveAction::new(0.0, 0.0), ids[0], fresh).is_ok());
        assert!(world.location_of(ids[0]).is_some());
    }

    #[test]
    fn test_same_seed_same_world() {
        let run = || {
            let mut world = SimWorld::new(SimConfig::default());
            world.spawn_participants().unwrap();
            let stats: Vec<TickStats> = (0..5).map(|_| world.tick().unwrap()).collect();
            let tokens: Vec<AuthToken> = world.participants().iter().map(|p| p.token).collect();
            (stats, tokens)
        };

        assert_eq!(run(), run());
    }
}
