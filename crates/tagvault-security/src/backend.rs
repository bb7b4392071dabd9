//! Backend selection.

use crate::config::{SecurityConfig, TagVaultConfig};
use crate::service::SecurityService;
use tagvault_core::{LockOutcome, LockStatus, Result, TagContent, UnlockOutcome};
use tagvault_hardware::TagBackend;
use tagvault_hardware::devices::AnyTagAccess;
use tagvault_simulator::TagSimulator;
use tracing::info;

/// The backend chosen at startup: the radio or the simulator.
pub enum AnyTagBackend {
    Hardware(SecurityService<AnyTagAccess>),
    Simulator(TagSimulator),
}

impl AnyTagBackend {
    /// Build the backend `config` asks for.
    ///
    /// # Errors
    /// - `Config` for an invalid configuration
    /// - `HardwareUnavailable` if no reader can be opened, or if this build
    ///   has no reader support
    pub fn from_config(config: &TagVaultConfig) -> Result<Self> {
        config.validate()?;

        if config.simulator.enabled {
            info!(
                delay_ms = config.simulator.delay_ms,
                failure_rate = config.simulator.failure_rate,
                "Using simulated tags"
            );
            return Ok(Self::Simulator(TagSimulator::new(config.simulator.clone())?));
        }

        Self::hardware(config.security.clone(), config.reader.as_deref())
    }

    #[cfg(feature = "hardware-pcsc")]
    fn hardware(security: SecurityConfig, reader: Option<&str>) -> Result<Self> {
        use crate::error::map_hardware_error;
        use tagvault_hardware::pcsc::PcscReader;

        let mut access = PcscReader::new().map_err(|e| map_hardware_error("open reader", e))?;
        if let Some(name) = reader {
            access = access
                .with_reader(name)
                .map_err(|e| map_hardware_error("open reader", e))?;
        }

        info!(platform = ?security.platform, "Using PC/SC reader");
        Ok(Self::Hardware(SecurityService::new(
            AnyTagAccess::Pcsc(access),
            security,
        )))
    }

    #[cfg(not(feature = "hardware-pcsc"))]
    fn hardware(_security: SecurityConfig, _reader: Option<&str>) -> Result<Self> {
        Err(tagvault_core::Error::HardwareUnavailable)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Hardware(_) => "hardware",
            Self::Simulator(_) => "simulator",
        }
    }

    /// The simulator, when it is the active backend.
    pub fn simulator(&self) -> Option<&TagSimulator> {
        match self {
            Self::Simulator(simulator) => Some(simulator),
            Self::Hardware(_) => None,
        }
    }
}

impl TagBackend for AnyTagBackend {
    async fn read_tag(&self) -> Result<TagContent> {
        match self {
            Self::Hardware(service) => service.read_tag().await,
            Self::Simulator(simulator) => simulator.read_tag().await,
        }
    }

    async fn write_tag(&self, payload: &serde_json::Value) -> Result<()> {
        match self {
            Self::Hardware(service) => service.write_tag(payload).await,
            Self::Simulator(simulator) => simulator.write_tag(payload).await,
        }
    }

    async fn format_tag(&self) -> Result<()> {
        match self {
            Self::Hardware(service) => service.format_tag().await,
            Self::Simulator(simulator) => simulator.format_tag().await,
        }
    }

    async fn lock_tag(&self, password: &str) -> Result<LockOutcome> {
        match self {
            Self::Hardware(service) => service.lock_tag(password).await,
            Self::Simulator(simulator) => simulator.lock_tag(password).await,
        }
    }

    async fn unlock_tag(&self, password: &str) -> Result<UnlockOutcome> {
        match self {
            Self::Hardware(service) => service.unlock_tag(password).await,
            Self::Simulator(simulator) => simulator.unlock_tag(password).await,
        }
    }

    async fn is_tag_locked(&self) -> Result<LockStatus> {
        match self {
            Self::Hardware(service) => service.is_tag_locked().await,
            Self::Simulator(simulator) => simulator.is_tag_locked().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagvault_simulator::SimulatorConfig;

    #[test]
    fn test_simulator_selected_when_enabled() {
        let config = TagVaultConfig {
            simulator: SimulatorConfig::default().with_enabled(true),
            ..TagVaultConfig::default()
        };
        let backend = AnyTagBackend::from_config(&config).unwrap();
        assert_eq!(backend.name(), "simulator");
        assert!(backend.simulator().is_some());
    }

    #[cfg(not(feature = "hardware-pcsc"))]
    #[test]
    fn test_hardware_unavailable_without_reader_support() {
        let result = AnyTagBackend::from_config(&TagVaultConfig::default());
        assert!(matches!(
            result,
            Err(tagvault_core::Error::HardwareUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_dispatch_to_simulator() {
        let config = TagVaultConfig {
            simulator: SimulatorConfig::default().with_enabled(true).with_delay_ms(0),
            ..TagVaultConfig::default()
        };
        let backend = AnyTagBackend::from_config(&config).unwrap();

        backend
            .write_tag(&serde_json::json!({"deviceId": "DEV-0009"}))
            .await
            .unwrap();
        let read = backend.read_tag().await.unwrap();
        assert_eq!(read.tag_id, tagvault_simulator::EMPTY_TAG);
        assert!(!backend.is_tag_locked().await.unwrap().locked);
    }
}
