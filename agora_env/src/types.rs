//! Common types shared by the Agora environment core and its collaborators.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use uuid::{Builder, Uuid};

/// Unique identifier for a participant in the simulated world.
///
/// Uses UUID v4 for global uniqueness without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    /// Creates a new random ParticipantId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a ParticipantId from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Creates a deterministic ParticipantId from a seed (for simulation).
    ///
    /// The result is stamped as a v4 UUID, so it is never nil, including for seed 0.
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&seed.to_le_bytes());
        bytes[8..16].copy_from_slice(&splitmix64(seed).to_le_bytes());
        Self(Builder::from_random_bytes(bytes).into_uuid())
    }

    /// The "absent" identity. Registration requests carrying it are rejected.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns true for the nil identity.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// SplitMix64 finalizer.
fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Capability credential proving current registration.
///
/// Tokens are only minted by a [`crate::TokenSource`] during registration;
/// there is no public constructor from arbitrary bits besides [`AuthToken::from_uuid`],
/// which exists for token sources and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthToken(Uuid);

impl AuthToken {
    /// Wraps raw token bits.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

/// A capability advertised to a participant at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnvironmentService(pub String);

impl EnvironmentService {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EnvironmentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Network address of a participant: identity plus routing metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkAddress {
    /// Participant this address resolves to
    pub id: ParticipantId,

    /// Optional link label (e.g. a radio channel)
    pub link: Option<String>,
}

impl NetworkAddress {
    /// Creates an address with no routing metadata.
    pub fn new(id: ParticipantId) -> Self {
        Self { id, link: None }
    }

    /// Attaches a link label.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

impl From<ParticipantId> for NetworkAddress {
    fn from(id: ParticipantId) -> Self {
        Self::new(id)
    }
}

/// A message travelling between participants.
///
/// Messages are values: constraints that rewrite return a new copy and
/// leave `from`/`to` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Sender address
    pub from: NetworkAddress,

    /// Recipient address
    pub to: NetworkAddress,

    /// Application-level label (e.g. "inform", "request")
    pub kind: String,

    /// Opaque payload bytes
    pub payload: Vec<u8>,

    /// Simulation time the message was sent at
    pub timestamp: u64,
}

impl Message {
    /// Creates a new message.
    pub fn new(
        from: impl Into<NetworkAddress>,
        to: impl Into<NetworkAddress>,
        kind: impl Into<String>,
        payload: Vec<u8>,
        timestamp: u64,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind: kind.into(),
            payload,
            timestamp,
        }
    }

    /// Returns a copy with the payload replaced.
    pub fn with_payload(&self, payload: Vec<u8>) -> Self {
        Self {
            payload,
            ..self.clone()
        }
    }

    /// Returns a copy addressed to a different recipient.
    pub fn readdressed(&self, to: NetworkAddress) -> Self {
        Self {
            to,
            ..self.clone()
        }
    }

    /// Sender identity.
    pub fn sender(&self) -> ParticipantId {
        self.from.id
    }

    /// Returns the payload size in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

/// A position in the simulated world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub position: Vector3<f64>,
}

impl Location {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Vector3::new(x, y, z),
        }
    }

    /// A location on the ground plane.
    pub fn from_xy(x: f64, y: f64) -> Self {
        Self::new(x, y, 0.0)
    }

    /// Euclidean distance to another location.
    pub fn distance_to(&self, other: &Location) -> f64 {
        (self.position - other.position).norm()
    }

    /// Returns this location moved by `delta`.
    pub fn translated(&self, delta: Vector3<f64>) -> Self {
        Self {
            position: self.position + delta,
        }
    }
}

impl From<Vector3<f64>> for Location {
    fn from(position: Vector3<f64>) -> Self {
        Self { position }
    }
}
