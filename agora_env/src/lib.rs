//! Agora Environment Vocabulary
//!
//! This crate holds the types and interfaces shared between the Agora
//! environment core, the simulation harness and any concrete environment:
//!
//! - Identities and credentials (`ParticipantId`, `AuthToken`)
//! - Messages and addresses (`Message`, `NetworkAddress`)
//! - Shared state handles (`SharedState`)
//! - The error taxonomy (`EnvError`)
//! - Collaborator traits the core calls into (location, range, inference,
//!   service generation, action handling, token minting)
//!
//! # Example
//!
//! ```ignore
//! use agora_env::{Location, ParticipantId, SharedState};
//!
//! let id = ParticipantId::new();
//! let location = SharedState::new("location", Location::from_xy(0.0, 0.0));
//! let range = SharedState::new("commsrange", 5.0f64);
//! ```

mod error;
mod services;
mod state;
mod types;

pub use error::EnvError;
pub use services::{
    Action, ActionHandler, CommunicationRangeService, InferenceSession, LocationService,
    ServiceGenerator, TokenSource,
};
pub use state::SharedState;
pub use types::{AuthToken, EnvironmentService, Location, Message, NetworkAddress, ParticipantId};
