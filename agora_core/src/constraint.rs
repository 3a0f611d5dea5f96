//! Delivery constraints and the pipeline that chains them.
//!
//! # Evaluation order
//!
//! ```text
//! message ──► rewrite(c1) ──► rewrite(c2) ──► ... ──► rewrite(cn) ──► m'
//!                                                                     │
//!             block(c1, to, m') | block(c2, to, m') | ... | block(cn, to, m')
//!                                                                     │
//!                                              veto? ──► None : Some(m')
//! ```
//!
//! Every constraint runs, even after another has vetoed.

use agora_env::{EnvError, Message, NetworkAddress};
use std::sync::Arc;
use tracing::debug;

/// A pluggable rule that may rewrite or veto a message before delivery.
pub trait DeliveryConstraint: Send + Sync {
    /// Short label for logging.
    fn name(&self) -> &str;

    /// Transforms the message. Constraints that only gate delivery keep the default.
    fn rewrite(&self, message: Message) -> Result<Message, EnvError> {
        Ok(message)
    }

    /// Returns `true` to veto delivery of `message` to `to`.
    ///
    /// An `Err` is reserved for fatal collaborator failures.
    fn block_delivery(&self, to: &NetworkAddress, message: &Message) -> Result<bool, EnvError>;
}

/// Ordered chain of delivery constraints.
///
/// The pipeline holds no mutable state, so concurrent evaluations of
/// unrelated messages only contend inside the constraints' collaborators.
#[derive(Clone, Default)]
pub struct ConstraintPipeline {
    constraints: Vec<Arc<dyn DeliveryConstraint>>,
}

impl ConstraintPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a constraint.
    pub fn add(&mut self, constraint: Arc<dyn DeliveryConstraint>) {
        self.constraints.push(constraint);
    }

    /// Builder form of [`ConstraintPipeline::add`].
    pub fn with(mut self, constraint: Arc<dyn DeliveryConstraint>) -> Self {
        self.add(constraint);
        self
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Names of the constraints in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.constraints.iter().map(|c| c.name()).collect()
    }

    /// Decides whether `message` may reach its recipient.
    ///
    /// # Returns
    /// * `Ok(Some(m))` - delivery allowed, `m` is the rewritten message
    /// * `Ok(None)` - at least one constraint vetoed
    /// * `Err(EnvError::Fatal)` - a constraint hit a contract violation
    pub fn evaluate(&self, message: Message) -> Result<Option<Message>, EnvError> {
        debug!(
            "Evaluating {} -> {} through [{}]",
            message.from.id,
            message.to.id,
            self.names().join(", ")
        );
        let message = self.rewrite_all(message)?;
        let to = message.to.clone();

        if self.is_blocked(&to, &message)? {
            Ok(None)
        } else {
            Ok(Some(message))
        }
    }

    /// Rewrites once, then checks each recipient.
    ///
    /// Each block check sees the rewritten message addressed to that
    /// recipient. Returns the rewritten message and the recipients it may
    /// be delivered to.
    pub fn evaluate_for(
        &self,
        message: Message,
        recipients: &[NetworkAddress],
    ) -> Result<(Message, Vec<NetworkAddress>), EnvError> {
        let message = self.rewrite_all(message)?;

        let mut allowed = Vec::with_capacity(recipients.len());
        for to in recipients {
            let candidate = message.readdressed(to.clone());
            if !self.is_blocked(to, &candidate)? {
                allowed.push(to.clone());
            }
        }

        Ok((message, allowed))
    }

    fn rewrite_all(&self, message: Message) -> Result<Message, EnvError> {
        self.constraints
            .iter()
            .try_fold(message, |message, constraint| constraint.rewrite(message))
    }

    fn is_blocked(&self, to: &NetworkAddress, message: &Message) -> Result<bool, EnvError> {
        let mut blocked = false;
        for constraint in &self.constraints {
            if constraint.block_delivery(to, message)? {
                debug!(
                    "{} blocked delivery {} -> {}",
                    constraint.name(),
                    message.from.id,
                    to.id
                );
                blocked = true;
            }
        }
        Ok(blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_env::ParticipantId;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fixed veto decision, counts how often it was asked.
    struct Fixed {
        block: bool,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(block: bool) -> Arc<Self> {
            Arc::new(Self {
                block,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl DeliveryConstraint for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn block_delivery(&self, _to: &NetworkAddress, _message: &Message) -> Result<bool, EnvError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.block)
        }
    }

    /// Appends a byte to the payload and records the payload it saw at block time.
    struct Tagger {
        tag: u8,
        seen: Mutex<Vec<Vec<u8>>>,
    }

    impl DeliveryConstraint for Tagger {
        fn name(&self) -> &str {
            "tagger"
        }

        fn rewrite(&self, message: Message) -> Result<Message, EnvError> {
            let mut payload = message.payload.clone();
            payload.push(self.tag);
            Ok(message.with_payload(payload))
        }

        fn block_delivery(&self, _to: &NetworkAddress, message: &Message) -> Result<bool, EnvError> {
            self.seen.lock().unwrap().push(message.payload.clone());
            Ok(false)
        }
    }

    struct Broken;

    impl DeliveryConstraint for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn block_delivery(&self, _to: &NetworkAddress, _message: &Message) -> Result<bool, EnvError> {
            Err(EnvError::fatal("geometry exploded"))
        }
    }

    fn message() -> Message {
        Message::new(
            ParticipantId::from_seed(1),
            ParticipantId::from_seed(2),
            "inform",
            vec![0],
            0,
        )
    }

    #[test]
    fn test_empty_pipeline_delivers_unchanged() {
        let pipeline = ConstraintPipeline::new();
        assert_eq!(pipeline.evaluate(message()).unwrap(), Some(message()));
    }

    #[test]
    fn test_rewrites_run_in_order_before_blocks() {
        let first = Arc::new(Tagger { tag: 1, seen: Mutex::new(vec![]) });
        let second = Arc::new(Tagger { tag: 2, seen: Mutex::new(vec![]) });
        let pipeline = ConstraintPipeline::new()
            .with(first.clone())
            .with(second.clone());

        let delivered = pipeline.evaluate(message()).unwrap().unwrap();

        assert_eq!(delivered.payload, vec![0, 1, 2]);
        // Both block checks saw the fully rewritten message
        assert_eq!(*first.seen.lock().unwrap(), vec![vec![0, 1, 2]]);
        assert_eq!(*second.seen.lock().unwrap(), vec![vec![0, 1, 2]]);
        assert_eq!(delivered.from, message().from);
        assert_eq!(delivered.to, message().to);
    }

    #[test]
    fn test_all_constraints_run_after_veto() {
        let veto = Fixed::new(true);
        let later = Fixed::new(false);
        let pipeline = ConstraintPipeline::new()
            .with(veto.clone())
            .with(later.clone());

        assert_eq!(pipeline.evaluate(message()).unwrap(), None);
        assert_eq!(veto.calls.load(Ordering::SeqCst), 1);
        assert_eq!(later.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fatal_error_propagates() {
        let pipeline = ConstraintPipeline::new()
            .with(Fixed::new(false))
            .with(Arc::new(Broken));

        let result = pipeline.evaluate(message());
        assert!(matches!(result, Err(EnvError::Fatal(_))));
    }

    #[test]
    fn test_evaluate_for_filters_recipients() {
        struct BlockTwo;
        impl DeliveryConstraint for BlockTwo {
            fn name(&self) -> &str {
                "block-two"
            }
            fn block_delivery(&self, to: &NetworkAddress, _m: &Message) -> Result<bool, EnvError> {
                Ok(to.id == ParticipantId::from_seed(2))
            }
        }

        let pipeline = ConstraintPipeline::new().with(Arc::new(BlockTwo));
        let recipients: Vec<NetworkAddress> = (2..5)
            .map(|n| NetworkAddress::new(ParticipantId::from_seed(n)))
            .collect();

        let (_, allowed) = pipeline.evaluate_for(message(), &recipients).unwrap();
        assert_eq!(allowed, recipients[1..].to_vec());
    }

    #[test]
    fn test_evaluate_for_addresses_each_recipient() {
        /// Vetoes any message whose recipient field disagrees with the destination.
        struct Misaddressed;
        impl DeliveryConstraint for Misaddressed {
            fn name(&self) -> &str {
                "misaddressed"
            }
            fn block_delivery(&self, to: &NetworkAddress, m: &Message) -> Result<bool, EnvError> {
                Ok(&m.to != to)
            }
        }

        let pipeline = ConstraintPipeline::new()
            .with(Arc::new(Tagger { tag: 9, seen: Mutex::new(vec![]) }))
            .with(Arc::new(Misaddressed));
        assert_eq!(pipeline.names(), vec!["tagger", "misaddressed"]);

        let recipients = vec![
            NetworkAddress::new(ParticipantId::from_seed(3)).with_link("radio-1"),
            NetworkAddress::new(ParticipantId::from_seed(4)).with_link("radio-2"),
        ];

        let (rewritten, allowed) = pipeline.evaluate_for(message(), &recipients).unwrap();
        assert_eq!(allowed, recipients);
        assert_eq!(allowed[0].link.as_deref(), Some("radio-1"));
        assert_eq!(rewritten.payload, vec![0, 9]);
        assert_eq!(rewritten.to, message().to);
    }

    proptest! {
        #[test]
        fn property_block_decision_is_order_independent_or(decisions in proptest::collection::vec(any::<bool>(), 0..6)) {
            let forward = decisions
                .iter()
                .fold(ConstraintPipeline::new(), |p, &block| p.with(Fixed::new(block)));
            let backward = decisions
                .iter()
                .rev()
                .fold(ConstraintPipeline::new(), |p, &block| p.with(Fixed::new(block)));

            let expected_blocked = decisions.iter().any(|&b| b);
            prop_assert_eq!(forward.evaluate(message()).unwrap().is_none(), expected_blocked);
            prop_assert_eq!(backward.evaluate(message()).unwrap().is_none(), expected_blocked);
        }
    }
}
