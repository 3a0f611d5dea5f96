//! Forwards every message to an inference session as a fact.

use crate::constraint::DeliveryConstraint;
use agora_env::{EnvError, InferenceSession, Message, NetworkAddress};
use std::sync::Arc;

/// Inserts messages into an [`InferenceSession`] during the rewrite step.
///
/// Never blocks delivery itself. Rules that want to block based on
/// inferred facts belong in a separate constraint that reads the session.
pub struct InferenceForwardingConstraint {
    session: Arc<dyn InferenceSession>,
}

impl InferenceForwardingConstraint {
    pub fn new(session: Arc<dyn InferenceSession>) -> Self {
        Self { session }
    }
}

impl DeliveryConstraint for InferenceForwardingConstraint {
    fn name(&self) -> &str {
        "inference"
    }

    fn rewrite(&self, message: Message) -> Result<Message, EnvError> {
        self.session.insert_fact(&message);
        Ok(message)
    }

    fn block_delivery(&self, _to: &NetworkAddress, _message: &Message) -> Result<bool, EnvError> {
        Ok(false)
    }
}
