//! Agora Core - registration, shared state and delivery control for
//! multi-agent simulations.
//!
//! This library protects three invariants:
//! 1. **Shared state**: global and participant-scoped entries under concurrent access
//! 2. **Authorization**: capability tokens valid exactly while their owner is registered
//! 3. **Delivery control**: a constraint pipeline that rewrites and vetoes messages
//!
//! # Usage
//!
//! ```ignore
//! use agora_core::{EnvironmentGateway, RegistrationRequest, ConstraintPipeline, RangeConstraint};
//!
//! let gateway = EnvironmentGateway::default();
//! let response = gateway.register(RegistrationRequest::new(id))?;
//!
//! let pipeline = ConstraintPipeline::new().with(Arc::new(RangeConstraint::new(
//!     Arc::new(gateway.location_service()),
//!     Arc::new(gateway.range_service()),
//! )));
//! if let Some(message) = pipeline.evaluate(message)? {
//!     deliver(message);
//! }
//! ```

pub mod config;
pub mod constraint;
pub mod gateway;
pub mod inference;
pub mod range;
pub mod registry;
pub mod shared_state;
pub mod state_services;

// Re-export key types for convenience
pub use config::EnvironmentConfig;
pub use constraint::{ConstraintPipeline, DeliveryConstraint};
pub use gateway::{
    EnvironmentGateway, NoopActionHandler, RegistrationRequest, RegistrationResponse,
    StaticServices,
};
pub use inference::InferenceForwardingConstraint;
pub use range::RangeConstraint;
pub use registry::{ParticipantRegistry, RandomTokenSource};
pub use shared_state::SharedStateStore;
pub use state_services::{StateLocationService, StateRangeService};

#[cfg(test)]
mod tests {
    use super::*;
    use agora_env::{EnvError, Location, Message, ParticipantId, SharedState};
    use std::sync::Arc;

    fn join(gateway: &EnvironmentGateway, x: f64, range: f64) -> (ParticipantId, agora_env::AuthToken) {
        let id = ParticipantId::new();
        let response = gateway
            .register(
                RegistrationRequest::new(id)
                    .with_state(SharedState::new("location", Location::from_xy(x, 0.0)))
                    .with_state(SharedState::new("commsrange", range)),
            )
            .unwrap();
        (id, response.token)
    }

    fn range_pipeline(gateway: &EnvironmentGateway) -> ConstraintPipeline {
        ConstraintPipeline::new().with(Arc::new(RangeConstraint::new(
            Arc::new(gateway.location_service()),
            Arc::new(gateway.range_service()),
        )))
    }

    #[test]
    fn test_range_pipeline_over_registered_state() {
        let gateway = EnvironmentGateway::default();
        let (a, _) = join(&gateway, 0.0, 5.0);
        let (near, _) = join(&gateway, 3.0, 5.0);
        let (far, _) = join(&gateway, 10.0, 5.0);
        let pipeline = range_pipeline(&gateway);

        let to_near = Message::new(a, near, "inform", vec![], 0);
        let to_far = Message::new(a, far, "inform", vec![], 0);

        assert!(pipeline.evaluate(to_near).unwrap().is_some());
        assert!(pipeline.evaluate(to_far).unwrap().is_none());
    }

    #[test]
    fn test_moving_through_state_handle_changes_delivery() {
        let gateway = EnvironmentGateway::default();
        let (a, _) = join(&gateway, 0.0, 5.0);
        let (b, _) = join(&gateway, 10.0, 5.0);
        let pipeline = range_pipeline(&gateway);
        let message = Message::new(a, b, "inform", vec![], 0);

        assert!(pipeline.evaluate(message.clone()).unwrap().is_none());

        gateway
            .get("location", b)
            .unwrap()
            .set(Location::from_xy(4.0, 0.0))
            .unwrap();
        assert!(pipeline.evaluate(message).unwrap().is_some());
    }

    #[test]
    fn test_deregistered_receiver_fails_open() {
        let gateway = EnvironmentGateway::default();
        let (a, _) = join(&gateway, 0.0, 5.0);
        let (b, token) = join(&gateway, 50.0, 5.0);
        let pipeline = range_pipeline(&gateway);
        let message = Message::new(a, b, "inform", vec![], 0);

        assert!(pipeline.evaluate(message.clone()).unwrap().is_none());
        gateway.deregister(b, token).unwrap();
        assert!(pipeline.evaluate(message).unwrap().is_some());
    }

    #[test]
    fn test_out_of_sight_receiver_aborts() {
        let gateway = EnvironmentGateway::default();
        let (a, _) = join(&gateway, 0.0, 5.0);
        let (b, _) = join(&gateway, 50.0, 5.0);

        let pipeline = ConstraintPipeline::new().with(Arc::new(RangeConstraint::new(
            Arc::new(gateway.location_service().perceived_by(a, 20.0)),
            Arc::new(gateway.range_service()),
        )));

        let result = pipeline.evaluate(Message::new(a, b, "inform", vec![], 0));
        assert!(matches!(result, Err(EnvError::Fatal(_))));
    }

    #[test]
    fn test_concurrent_evaluation_and_churn() {
        let gateway = EnvironmentGateway::default();
        let anchors: Vec<_> = (0..4).map(|i| join(&gateway, i as f64, 10.0).0).collect();
        let pipeline = range_pipeline(&gateway);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        let (id, token) = join(&gateway, 1.0, 10.0);
                        gateway.deregister(id, token).unwrap();
                    }
                });
            }
            for &from in &anchors {
                let pipeline = &pipeline;
                let anchors = &anchors;
                scope.spawn(move || {
                    for _ in 0..100 {
                        for &to in anchors {
                            let message = Message::new(from, to, "inform", vec![], 0);
                            assert!(pipeline.evaluate(message).unwrap().is_some());
                        }
                    }
                });
            }
        });

        assert_eq!(gateway.registry().len(), anchors.len());
    }
}
