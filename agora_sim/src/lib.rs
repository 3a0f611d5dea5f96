//! Agora Simulation Harness
//!
//! This crate wires the environment core to in-memory collaborators and
//! drives it through reproducible scenarios.
//!
//! # Core Principle: Seeded Everything
//!
//! - **Placement & movement**: ChaCha8 RNG derived from the master seed
//! - **Tokens**: `SeededTokenSource`, so credentials replay identically
//! - **Identities**: `ParticipantId::from_seed`
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SimWorld                            │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ EnvironmentGateway (registry + shared state)         │   │
//! │  │   MoveHandler ──► participant "location" entries     │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │       │                        │                            │
//! │  ┌────▼────┐   Message    ┌────▼────┐                       │
//! │  │ Part. A │─────────────►│ Part. B │     ...               │
//! │  └─────────┘      │       └─────────┘                       │
//! │                   ▼                                         │
//! │  ┌───────────────────────────────────┐                      │
//! │  │ ConstraintPipeline                │                      │
//! │  │  InferenceForwarding ─► Recording │                      │
//! │  │  RangeConstraint                  │                      │
//! │  └───────────────────────────────────┘                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use agora_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42, 8).with_ticks(50).run(ScenarioId::RandomWalk);
//! assert!(result.passed);
//! ```

mod actions;
mod error;
mod exporter;
mod keys;
mod runner;
mod session;
mod world;
pub mod scenarios;

pub use actions::{MoveAction, MoveHandler};
pub use error::SimError;
pub use exporter::{ParticipantPosition, SimReport};
pub use keys::SeededTokenSource;
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use session::RecordingSession;
pub use world::{SimConfig, SimParticipant, SimWorld, TickStats, SIM_SERVICES, TIME_STATE};
