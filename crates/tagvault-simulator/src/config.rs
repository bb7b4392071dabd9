//! Simulator configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tagvault_core::{Error, Result, constants::DEFAULT_SIMULATOR_DELAY_MS};

/// Configuration for [`TagSimulator`](crate::TagSimulator).
///
/// # Example
///
/// ```
/// use tagvault_simulator::SimulatorConfig;
///
/// let config = SimulatorConfig::default()
///     .with_enabled(true)
///     .with_delay_ms(0)
///     .with_failure_rate(0.1)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulatorConfig {
    /// Route tag operations to the simulator instead of the radio.
    pub enabled: bool,

    /// Simulated scan latency applied before every operation result.
    pub delay_ms: u64,

    /// Probability in `[0, 1]` that an operation fails.
    pub failure_rate: f64,

    /// Seed for the failure draw; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_ms: DEFAULT_SIMULATOR_DELAY_MS,
            failure_rate: 0.0,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = failure_rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// # Errors
    /// Returns `Error::Config` if the failure rate is not a probability.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(Error::Config(format!(
                "failure rate must be between 0 and 1, got {}",
                self.failure_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = SimulatorConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.delay(), Duration::from_millis(800));
        assert_eq!(config.failure_rate, 0.0);
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(0.5, true)]
    #[case(1.0, true)]
    #[case(-0.1, false)]
    #[case(1.5, false)]
    #[case(f64::NAN, false)]
    fn test_validate_failure_rate(#[case] rate: f64, #[case] valid: bool) {
        let config = SimulatorConfig::default().with_failure_rate(rate);
        assert_eq!(config.validate().is_ok(), valid);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SimulatorConfig =
            serde_json::from_str(r#"{"enabled": true, "failureRate": 0.25}"#).unwrap();
        assert!(config.enabled);
        assert_eq!(config.failure_rate, 0.25);
        assert_eq!(config.delay_ms, 800);
        assert_eq!(config.seed, None);
    }
}
