//! Scenario runner - executes simulation scenarios against the environment core.

use crate::actions::MoveAction;
use crate::error::SimError;
use crate::exporter::ParticipantPosition;
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld, TickStats};

use agora_core::{EnvironmentGateway, RandomTokenSource, RegistrationRequest};
use agora_env::{EnvError, Location, ParticipantId, SharedState, TokenSource};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,

    /// Participant positions at the end of the run
    pub positions: Vec<ParticipantPosition>,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScenarioMetrics {
    /// Message statistics summed over all ticks
    pub messages: TickStats,

    /// Facts forwarded to the inference session
    pub facts_inserted: u64,

    /// Successful registrations
    pub registrations: u64,

    /// Requests rejected as unauthorized
    pub unauthorized_rejections: u64,

    /// Observed behaviour that broke an invariant
    pub invariant_violations: u64,
}

/// Runs simulation scenarios.
pub struct ScenarioRunner {
    config: SimConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, num_participants: usize) -> Self {
        Self {
            config: SimConfig {
                seed,
                num_participants,
                ..Default::default()
            },
        }
    }

    /// Creates a runner from a full configuration.
    pub fn with_config(config: SimConfig) -> Self {
        Self { config }
    }

    /// Sets the number of ticks.
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.config.ticks = ticks;
        self
    }

    /// Runs a scenario and returns the result.
    ///
    /// A fatal environment error ends the run and is reported as a failure.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.config.seed);
        debug!("  {}", scenario.description());

        let outcome = match scenario {
            ScenarioId::RangePartition => self.run_range_partition(),
            ScenarioId::RandomWalk => self.run_random_walk(),
            ScenarioId::AuthChurn => self.run_auth_churn(),
            ScenarioId::FailOpen => self.run_fail_open(),
            ScenarioId::ConcurrentJoin => self.run_concurrent_join(),
        };

        outcome.unwrap_or_else(|e| {
            warn!("Scenario {} aborted: {}", scenario.name(), e);
            ScenarioResult {
                scenario,
                seed: self.config.seed,
                passed: false,
                total_ticks: 0,
                failure_reason: Some(e.to_string()),
                metrics: ScenarioMetrics::default(),
                positions: Vec::new(),
            }
        })
    }

    fn finish(
        &self,
        scenario: ScenarioId,
        world: &SimWorld,
        mut metrics: ScenarioMetrics,
        failure_reason: Option<String>,
    ) -> ScenarioResult {
        metrics.facts_inserted = world.session().fact_count() as u64;
        ScenarioResult {
            scenario,
            seed: self.config.seed,
            passed: failure_reason.is_none(),
            total_ticks: world.tick_count(),
            failure_reason,
            metrics,
            positions: world
                .positions()
                .into_iter()
                .map(|(id, location)| ParticipantPosition::new(id, location))
                .collect(),
        }
    }

    /// Shared checks for ticked scenarios.
    fn check_messages(world: &SimWorld, metrics: &ScenarioMetrics) -> Option<String> {
        let sent = metrics.messages.messages_sent;
        if metrics.messages.range_violations > 0 {
            return Some(format!(
                "{} delivery decisions disagreed with geometry",
                metrics.messages.range_violations
            ));
        }
        if world.session().fact_count() as u64 != sent {
            return Some(format!(
                "{} facts forwarded for {} messages",
                world.session().fact_count(),
                sent
            ));
        }
        None
    }

    /// SIM-001: two clusters separated by more than the communication range.
    fn run_range_partition(&self) -> Result<ScenarioResult, SimError> {
        info!("SIM-001: RangePartition - clusters out of range");

        let config = SimConfig {
            step_size: 0.0,
            ..self.config.clone()
        };
        let range = config.comm_range;
        let gap = range * 3.0;
        let mut world = SimWorld::new(config);

        let per_cluster = (self.config.num_participants / 2).max(1);
        let mut metrics = ScenarioMetrics::default();
        for i in 0..per_cluster {
            let offset = (i as f64) * range / (2.0 * per_cluster as f64);
            world.spawn_at(Location::from_xy(offset, 0.0), Some(range))?;
            world.spawn_at(Location::from_xy(gap + offset, 0.0), Some(range))?;
            metrics.registrations += 2;
        }

        for _ in 0..self.config.ticks {
            metrics.messages.merge(world.tick()?);
        }

        // Only intra-cluster pairs may deliver
        let intra_pairs = (2 * per_cluster * (per_cluster - 1)) as u64;
        let expected_deliveries = intra_pairs * self.config.ticks;

        let mut failure = Self::check_messages(&world, &metrics);
        if failure.is_none() && metrics.messages.deliveries != expected_deliveries {
            failure = Some(format!(
                "expected {} deliveries, saw {}",
                expected_deliveries, metrics.messages.deliveries
            ));
        }

        info!(
            "✓ RangePartition complete: {} delivered, {} dropped",
            metrics.messages.deliveries, metrics.messages.drops
        );
        Ok(self.finish(ScenarioId::RangePartition, &world, metrics, failure))
    }

    /// SIM-002: random movement, decisions checked against geometry every tick.
    fn run_random_walk(&self) -> Result<ScenarioResult, SimError> {
        info!("SIM-002: RandomWalk - moving participants");

        let mut world = SimWorld::new(self.config.clone());
        let ids = world.spawn_participants()?;
        let mut metrics = ScenarioMetrics {
            registrations: ids.len() as u64,
            ..Default::default()
        };

        for _ in 0..self.config.ticks {
            metrics.messages.merge(world.tick()?);
        }

        let failure = Self::check_messages(&world, &metrics);
        info!(
            "✓ RandomWalk complete: {} delivered, {} dropped",
            metrics.messages.deliveries, metrics.messages.drops
        );
        Ok(self.finish(ScenarioId::RandomWalk, &world, metrics, failure))
    }

    /// SIM-003: a participant rejoins every tick; its old token must stop working.
    fn run_auth_churn(&self) -> Result<ScenarioResult, SimError> {
        info!("SIM-003: AuthChurn - token rotation");

        let mut world = SimWorld::new(self.config.clone());
        let ids = world.spawn_participants()?;
        let mut metrics = ScenarioMetrics {
            registrations: ids.len() as u64,
            ..Default::default()
        };
        if ids.is_empty() {
            return Ok(self.finish(
                ScenarioId::AuthChurn,
                &world,
                metrics,
                Some("auth_churn needs at least one participant".to_string()),
            ));
        }

        let stay = MoveAction::new(0.0, 0.0);
        for tick in 0..self.config.ticks {
            let id = ids[(tick as usize) % ids.len()];
            let (stale, fresh) = world.rejoin(id)?;
            metrics.registrations += 1;

            let gateway = world.gateway();
            let stale_results = [
                gateway.act(&stay, id, stale),
                gateway.deregister(id, stale),
            ];
            for result in stale_results {
                match result {
                    Err(EnvError::Unauthorized(_)) => metrics.unauthorized_rejections += 1,
                    _ => metrics.invariant_violations += 1,
                }
            }
            if gateway.act(&stay, id, fresh).is_err() {
                metrics.invariant_violations += 1;
            }

            metrics.messages.merge(world.tick()?);
        }

        let mut failure = Self::check_messages(&world, &metrics);
        if failure.is_none() && metrics.invariant_violations > 0 {
            failure = Some(format!(
                "{} token checks behaved incorrectly",
                metrics.invariant_violations
            ));
        }

        info!(
            "✓ AuthChurn complete: {} stale-token requests rejected",
            metrics.unauthorized_rejections
        );
        Ok(self.finish(ScenarioId::AuthChurn, &world, metrics, failure))
    }

    /// SIM-004: participants without range state are reachable from anywhere.
    fn run_fail_open(&self) -> Result<ScenarioResult, SimError> {
        info!("SIM-004: FailOpen - missing range state");

        let config = SimConfig {
            step_size: 0.0,
            ..self.config.clone()
        };
        let spread = config.comm_range * 4.0;
        let mut world = SimWorld::new(config);

        let n = self.config.num_participants.max(2);
        let mut metrics = ScenarioMetrics::default();
        for i in 0..n {
            let range = if i % 2 == 0 { Some(self.config.comm_range) } else { None };
            world.spawn_at(Location::from_xy(i as f64 * spread, 0.0), range)?;
            metrics.registrations += 1;
        }

        for _ in 0..self.config.ticks {
            metrics.messages.merge(world.tick()?);
        }

        // Ranged participants are all out of each other's range; every other pair fails open.
        let ranged = n.div_ceil(2) as u64;
        let total_pairs = (n * (n - 1)) as u64;
        let blocked_pairs = ranged * (ranged - 1);
        let expected = (total_pairs - blocked_pairs) * self.config.ticks;

        let mut failure = Self::check_messages(&world, &metrics);
        if failure.is_none() && metrics.messages.deliveries != expected {
            failure = Some(format!(
                "expected {} fail-open deliveries, saw {}",
                expected, metrics.messages.deliveries
            ));
        }

        info!("✓ FailOpen complete: {} delivered", metrics.messages.deliveries);
        Ok(self.finish(ScenarioId::FailOpen, &world, metrics, failure))
    }

    /// SIM-005: tokio tasks churn registrations against one gateway.
    fn run_concurrent_join(&self) -> Result<ScenarioResult, SimError> {
        info!("SIM-005: ConcurrentJoin - parallel registration churn");

        let world = SimWorld::new(self.config.clone());
        let gateway = world.gateway().clone();
        let workers = self.config.num_participants.max(1) as u64;
        let rounds = self.config.ticks;
        let seed = self.config.seed;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()?;

        let outcomes = runtime.block_on(async move {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let gateway = gateway.clone();
                    tokio::spawn(churn_worker(gateway, seed, worker, rounds))
                })
                .collect();

            let mut outcomes = Vec::with_capacity(handles.len());
            for handle in handles {
                let outcome = handle.await.map_err(|e| SimError::Worker(e.to_string()))??;
                outcomes.push(outcome);
            }
            Ok::<_, SimError>(outcomes)
        })?;

        let mut metrics = ScenarioMetrics::default();
        for outcome in &outcomes {
            metrics.registrations += outcome.registrations;
            metrics.unauthorized_rejections += outcome.rejections;
            metrics.invariant_violations += outcome.violations;
        }

        let leftover = world.gateway().registry().len();
        let failure = if metrics.invariant_violations > 0 {
            Some(format!("{} torn or misauthorized operations", metrics.invariant_violations))
        } else if leftover != 0 {
            Some(format!("{} participants left registered", leftover))
        } else {
            None
        };

        info!(
            "✓ ConcurrentJoin complete: {} registrations across {} tasks",
            metrics.registrations, workers
        );
        Ok(self.finish(ScenarioId::ConcurrentJoin, &world, metrics, failure))
    }
}

/// What one churn worker observed.
#[derive(Debug, Default)]
struct WorkerOutcome {
    registrations: u64,
    rejections: u64,
    violations: u64,
}

async fn churn_worker(
    gateway: Arc<EnvironmentGateway>,
    seed: u64,
    worker: u64,
    rounds: u64,
) -> Result<WorkerOutcome, SimError> {
    let mut outcome = WorkerOutcome::default();
    let stay = MoveAction::new(0.0, 0.0);
    let env = gateway.config().clone();

    for round in 0..rounds {
        let id = ParticipantId::from_seed(seed ^ ((worker + 1) << 32) ^ (round + 1));
        let request = RegistrationRequest::new(id)
            .with_state(SharedState::new(env.location_state.clone(), Location::from_xy(0.0, 0.0)))
            .with_state(SharedState::new(env.range_state.clone(), 1.0f64));
        let token = gateway.register(request)?.token;
        outcome.registrations += 1;

        if !gateway.registry().validate(id, token) || gateway.get(&env.location_state, id).is_err() {
            outcome.violations += 1;
        }
        gateway.act(&stay, id, token)?;

        match gateway.act(&stay, id, RandomTokenSource.mint()) {
            Err(EnvError::Unauthorized(_)) => outcome.rejections += 1,
            _ => outcome.violations += 1,
        }

        tokio::task::yield_now().await;

        gateway.deregister(id, token)?;
        if gateway.registry().validate(id, token) || gateway.get(&env.location_state, id).is_ok() {
            outcome.violations += 1;
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn runner() -> ScenarioRunner {
        ScenarioRunner::new(7, 6).with_ticks(10)
    }

    #[test]
    fn test_range_partition_passes() {
        let result = runner().run(ScenarioId::RangePartition);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.total_ticks, 10);
        assert!(result.metrics.messages.drops > 0);
        assert_eq!(result.metrics.facts_inserted, result.metrics.messages.messages_sent);
    }

    #[test]
    fn test_random_walk_passes() {
        let result = runner().run(ScenarioId::RandomWalk);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.positions.len(), 6);
    }

    #[test]
    fn test_auth_churn_rejects_stale_tokens() {
        let result = runner().run(ScenarioId::AuthChurn);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.unauthorized_rejections, 20);
        assert_eq!(result.metrics.invariant_violations, 0);
    }

    #[test]
    fn test_fail_open_passes() {
        let result = runner().run(ScenarioId::FailOpen);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.messages.drops > 0);
    }

    #[test]
    fn test_concurrent_join_leaves_registry_empty() {
        let result = runner().run(ScenarioId::ConcurrentJoin);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.registrations, 60);
        assert_eq!(result.metrics.unauthorized_rejections, 60);
    }

    #[test]
    fn test_seeds_matching_spawn_indices_pass() {
        for seed in 0..=4 {
            for scenario in ScenarioId::all() {
                let result = ScenarioRunner::new(seed, 4).with_ticks(3).run(scenario);
                assert!(
                    result.passed,
                    "{} seed={}: {:?}",
                    scenario, seed, result.failure_reason
                );
            }
        }
    }

    #[tokio::test]
    async fn test_churn_worker_round_trips() {
        let gateway = Arc::new(EnvironmentGateway::default());
        let outcome = churn_worker(gateway.clone(), 11, 0, 5).await.unwrap();

        assert_eq!(outcome.registrations, 5);
        assert_eq!(outcome.rejections, 5);
        assert_eq!(outcome.violations, 0);
        assert!(gateway.registry().is_empty());
    }

    #[test]
    fn test_auth_churn_without_participants_fails() {
        let result = ScenarioRunner::new(1, 0).with_ticks(3).run(ScenarioId::AuthChurn);
        assert!(!result.passed);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn property_random_walk_is_reproducible(seed in any::<u64>()) {
            let runner = ScenarioRunner::new(seed, 4).with_ticks(5);
            let first = runner.run(ScenarioId::RandomWalk);
            let second = runner.run(ScenarioId::RandomWalk);

            prop_assert!(first.passed);
            prop_assert_eq!(first.metrics, second.metrics);
            prop_assert_eq!(first.positions, second.positions);
        }
    }
}
