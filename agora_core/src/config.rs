//! Environment configuration.

/// Configuration for an [`crate::EnvironmentGateway`].
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// Environment's logical name (for logging)
    pub name: String,

    /// Participant state entry holding a `Location` (default: "location")
    pub location_state: String,

    /// Participant state entry holding the communication range as `f64` (default: "commsrange")
    pub range_state: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            name: "agora-environment".to_string(),
            location_state: "location".to_string(),
            range_state: "commsrange".to_string(),
        }
    }
}
