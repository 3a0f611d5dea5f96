//! Movement actions applied through participant location state.

use agora_core::SharedStateStore;
use agora_env::{Action, ActionHandler, EnvError, Location, ParticipantId};
use nalgebra::Vector3;
use std::any::Any;
use std::sync::Arc;
use tracing::debug;

/// Moves the acting participant by `delta`.
#[derive(Debug, Clone, Copy)]
pub struct MoveAction {
    pub delta: Vector3<f64>,
}

impl MoveAction {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self {
            delta: Vector3::new(dx, dy, 0.0),
        }
    }
}

impl Action for MoveAction {
    fn name(&self) -> &str {
        "move"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Applies [`MoveAction`]s to the actor's location entry, clamped to a square world.
pub struct MoveHandler {
    store: Arc<SharedStateStore>,
    location_state: String,
    world_size: f64,
}

impl MoveHandler {
    pub fn new(store: Arc<SharedStateStore>, location_state: impl Into<String>, world_size: f64) -> Self {
        Self {
            store,
            location_state: location_state.into(),
            world_size,
        }
    }

    fn clamp(&self, location: Location) -> Location {
        let p = location.position;
        Location::new(
            p.x.clamp(0.0, self.world_size),
            p.y.clamp(0.0, self.world_size),
            p.z,
        )
    }
}

impl ActionHandler for MoveHandler {
    fn handle(&self, actor: ParticipantId, action: &dyn Action) -> Result<(), EnvError> {
        let Some(step) = action.as_any().downcast_ref::<MoveAction>() else {
            return Err(EnvError::invalid_request(format!(
                "unsupported action '{}'",
                action.name()
            )));
        };

        let state = self.store.get_participant_state(actor, &self.location_state)?;
        let moved = state.update::<Location, _>(|location| {
            *location = self.clamp(location.translated(step.delta));
            *location
        })?;

        debug!("{} moved to ({:.1}, {:.1})", actor, moved.position.x, moved.position.y);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_env::SharedState;

    #[derive(Debug)]
    struct Wave;

    impl Action for Wave {
        fn name(&self) -> &str {
            "wave"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn setup() -> (MoveHandler, Arc<SharedStateStore>, ParticipantId) {
        let store = SharedStateStore::shared();
        let id = ParticipantId::from_seed(1);
        store.put_participant_state(id, vec![SharedState::new("location", Location::from_xy(5.0, 5.0))]);
        (MoveHandler::new(store.clone(), "location", 10.0), store, id)
    }

    #[test]
    fn test_move_updates_location() {
        let (handler, store, id) = setup();
        handler.handle(id, &MoveAction::new(1.0, -2.0)).unwrap();

        let location = store.get_participant_state(id, "location").unwrap().get::<Location>();
        assert_eq!(location, Some(Location::from_xy(6.0, 3.0)));
    }

    #[test]
    fn test_move_is_clamped() {
        let (handler, store, id) = setup();
        handler.handle(id, &MoveAction::new(100.0, -100.0)).unwrap();

        let location = store.get_participant_state(id, "location").unwrap().get::<Location>();
        assert_eq!(location, Some(Location::from_xy(10.0, 0.0)));
    }

    #[test]
    fn test_unknown_action_rejected() {
        let (handler, _, id) = setup();
        assert!(matches!(handler.handle(id, &Wave), Err(EnvError::InvalidRequest(_))));
    }

    #[test]
    fn test_actor_without_location() {
        let (handler, _, _) = setup();
        let stranger = ParticipantId::from_seed(2);
        assert!(matches!(
            handler.handle(stranger, &MoveAction::new(1.0, 1.0)),
            Err(EnvError::NotFound(_))
        ));
    }
}
