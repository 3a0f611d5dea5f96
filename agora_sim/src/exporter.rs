//! JSON report export.
//!
//! Writes one report per scenario run for CI and offline inspection.

use crate::error::SimError;
use crate::runner::{ScenarioMetrics, ScenarioResult};
use agora_env::{Location, ParticipantId};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// Position of a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantPosition {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ParticipantPosition {
    pub fn new(id: ParticipantId, location: Location) -> Self {
        Self {
            id: id.as_uuid().to_string(),
            x: location.position.x,
            y: location.position.y,
            z: location.position.z,
        }
    }
}

/// Complete report for one scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Ticks executed
    pub ticks: u64,

    /// Final result
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    pub metrics: ScenarioMetrics,

    /// Final participant positions
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<ParticipantPosition>,
}

impl SimReport {
    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> Result<(), SimError> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

impl From<&ScenarioResult> for SimReport {
    fn from(result: &ScenarioResult) -> Self {
        Self {
            scenario: result.scenario.name().to_string(),
            seed: result.seed,
            ticks: result.total_ticks,
            passed: result.passed,
            failure_reason: result.failure_reason.clone(),
            metrics: result.metrics,
            participants: result.positions.clone(),
        }
    }
}
