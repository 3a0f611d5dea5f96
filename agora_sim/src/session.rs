//! In-memory inference session that records the facts it is given.

use agora_env::{InferenceSession, Message, ParticipantId};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Stands in for a rule engine: keeps every inserted message.
#[derive(Default)]
pub struct RecordingSession {
    facts: Mutex<Vec<Message>>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of facts inserted so far.
    pub fn fact_count(&self) -> usize {
        self.facts.lock().len()
    }

    /// Facts inserted per sender.
    pub fn facts_by_sender(&self) -> HashMap<ParticipantId, usize> {
        let mut counts = HashMap::new();
        for fact in self.facts.lock().iter() {
            *counts.entry(fact.sender()).or_insert(0) += 1;
        }
        counts
    }

    /// Drains the recorded facts.
    pub fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.facts.lock())
    }
}

impl InferenceSession for RecordingSession {
    fn insert_fact(&self, message: &Message) {
        self.facts.lock().push(message.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_facts() {
        let session = RecordingSession::new();
        let a = ParticipantId::from_seed(1);
        let b = ParticipantId::from_seed(2);

        session.insert_fact(&Message::new(a, b, "inform", vec![], 0));
        session.insert_fact(&Message::new(a, b, "inform", vec![], 1));
        session.insert_fact(&Message::new(b, a, "inform", vec![], 1));

        assert_eq!(session.fact_count(), 3);
        assert_eq!(session.facts_by_sender()[&a], 2);
        assert_eq!(session.take().len(), 3);
        assert_eq!(session.fact_count(), 0);
    }
}
