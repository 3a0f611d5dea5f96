//! Simulation scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SIM-001: two clusters out of each other's range
    RangePartition,

    /// SIM-002: participants wander while messaging each other
    RandomWalk,

    /// SIM-003: participants rejoin every tick, stale tokens must bounce
    AuthChurn,

    /// SIM-004: participants without range state
    FailOpen,

    /// SIM-005: concurrent register/act/deregister from many tasks
    ConcurrentJoin,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::RangePartition,
            ScenarioId::RandomWalk,
            ScenarioId::AuthChurn,
            ScenarioId::FailOpen,
            ScenarioId::ConcurrentJoin,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::RangePartition => "range_partition",
            ScenarioId::RandomWalk => "random_walk",
            ScenarioId::AuthChurn => "auth_churn",
            ScenarioId::FailOpen => "fail_open",
            ScenarioId::ConcurrentJoin => "concurrent_join",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::RangePartition => "Two stationary clusters; no message may cross the gap",
            ScenarioId::RandomWalk => "Random movement; every delivery decision must match geometry",
            ScenarioId::AuthChurn => "Rejoin every tick; stale tokens rejected, fresh tokens accepted",
            ScenarioId::FailOpen => "Half the participants lack range state; their messages always pass",
            ScenarioId::ConcurrentJoin => "Tokio tasks churn registrations; no torn registry state",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "range_partition" | "rangepartition" | "sim-001" => Ok(ScenarioId::RangePartition),
            "random_walk" | "randomwalk" | "sim-002" => Ok(ScenarioId::RandomWalk),
            "auth_churn" | "authchurn" | "sim-003" => Ok(ScenarioId::AuthChurn),
            "fail_open" | "failopen" | "sim-004" => Ok(ScenarioId::FailOpen),
            "concurrent_join" | "concurrentjoin" | "sim-005" => Ok(ScenarioId::ConcurrentJoin),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
        assert_eq!("SIM-003".parse::<ScenarioId>(), Ok(ScenarioId::AuthChurn));
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }
}
