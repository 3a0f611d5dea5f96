//! Range constraint - blocks messages between participants that are out of radio range.

use crate::constraint::DeliveryConstraint;
use agora_env::{
    CommunicationRangeService, EnvError, LocationService, Message, NetworkAddress, ParticipantId,
};
use std::sync::Arc;
use tracing::warn;

/// Blocks delivery when sender and receiver are further apart than the
/// smaller of their communication ranges.
///
/// Missing location or range state fails open: the message is allowed.
/// A fatal answer from the location service is propagated.
pub struct RangeConstraint {
    locations: Arc<dyn LocationService>,
    ranges: Arc<dyn CommunicationRangeService>,
}

impl RangeConstraint {
    pub fn new(
        locations: Arc<dyn LocationService>,
        ranges: Arc<dyn CommunicationRangeService>,
    ) -> Self {
        Self { locations, ranges }
    }

    /// Returns `true` when `a` and `b` cannot hear each other.
    pub fn out_of_range(&self, a: ParticipantId, b: ParticipantId) -> Result<bool, EnvError> {
        match self.link(a, b) {
            Ok((distance, range)) => Ok(distance > range),
            Err(e) if e.is_missing_state() => {
                warn!("Allowing {} -> {} without range facts: {}", a, b, e);
                Ok(false)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Err(EnvError::fatal(format!(
                "range lookup for {} -> {} failed with {} error: {}",
                a,
                b,
                e.kind(),
                e
            ))),
        }
    }

    /// Distance between `a` and `b`, and the smaller of their ranges.
    fn link(&self, a: ParticipantId, b: ParticipantId) -> Result<(f64, f64), EnvError> {
        let a_location = self.locations.agent_location(a)?;
        let b_location = self.locations.agent_location(b)?;
        let a_range = self.ranges.agent_communication_range(a)?;
        let b_range = self.ranges.agent_communication_range(b)?;

        Ok((a_location.distance_to(&b_location), a_range.min(b_range)))
    }
}

impl DeliveryConstraint for RangeConstraint {
    fn name(&self) -> &str {
        "range"
    }

    fn block_delivery(&self, to: &NetworkAddress, message: &Message) -> Result<bool, EnvError> {
        self.out_of_range(message.sender(), to.id)
    }
}
