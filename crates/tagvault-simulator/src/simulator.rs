//! In-memory tag backend.

use crate::config::SimulatorConfig;
use crate::fixtures::{EMPTY_TAG, TagFixture, default_fixtures};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tagvault_codec::{LockEnvelope, ensure_capacity, from_tag_text, to_tag_text};
use tagvault_core::{
    Error, LockOutcome, LockStatus, LockType, Password, Result, TagContent, UnlockOutcome,
};
use tagvault_hardware::TagBackend;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct Registry {
    tags: Vec<TagFixture>,
    selected: String,
}

impl Registry {
    fn new() -> Self {
        Self {
            tags: default_fixtures(),
            selected: EMPTY_TAG.to_string(),
        }
    }

    fn selected_mut(&mut self) -> Result<&mut TagFixture> {
        let id = &self.selected;
        self.tags
            .iter_mut()
            .find(|tag| &tag.id == id)
            .ok_or_else(|| Error::UnknownTag(id.clone()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simulated tag backend over a registry of named fixtures.
///
/// Every operation waits the configured delay, then fails with
/// `SimulatedFailure` with the configured probability, then acts on the
/// selected fixture with the same checks and errors as the hardware path.
///
/// # Examples
///
/// ```
/// use tagvault_hardware::TagBackend;
/// use tagvault_simulator::{SimulatorConfig, TagSimulator};
///
/// #[tokio::main]
/// async fn main() -> tagvault_core::Result<()> {
///     let simulator = TagSimulator::new(SimulatorConfig::default().with_delay_ms(0))?;
///
///     simulator.write_tag(&serde_json::json!({"a": 1})).await?;
///     let outcome = simulator.lock_tag("secret").await?;
///     assert_eq!(outcome.lock_type.to_string(), "hardware");
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct TagSimulator {
    config: SimulatorConfig,
    registry: Mutex<Registry>,
    rng: Mutex<StdRng>,
}

impl TagSimulator {
    /// Create a simulator seeded with the default fixtures, `EMPTY_TAG`
    /// selected.
    ///
    /// # Errors
    /// Returns `Error::Config` for an invalid configuration.
    pub fn new(config: SimulatorConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        info!(
            delay_ms = config.delay_ms,
            failure_rate = config.failure_rate,
            "Tag simulator created"
        );

        Ok(Self {
            config,
            registry: Mutex::new(Registry::new()),
            rng: Mutex::new(rng),
        })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Select the fixture subsequent operations act on.
    ///
    /// # Errors
    /// Returns `Error::UnknownTag` if no fixture has this id.
    pub fn select_tag(&self, id: &str) -> Result<()> {
        let mut registry = lock(&self.registry);
        if !registry.tags.iter().any(|tag| tag.id == id) {
            return Err(Error::UnknownTag(id.to_string()));
        }
        registry.selected = id.to_string();
        debug!(tag = id, "Fixture selected");
        Ok(())
    }

    /// Restore the default fixtures and selection, discarding all changes.
    pub fn reset_tags(&self) {
        *lock(&self.registry) = Registry::new();
        debug!("Fixtures reset");
    }

    /// Add a fixture, replacing any fixture with the same id.
    pub fn add_tag(&self, fixture: TagFixture) {
        let mut registry = lock(&self.registry);
        debug!(tag = %fixture.id, technology = %fixture.technology, "Fixture added");
        match registry.tags.iter_mut().find(|tag| tag.id == fixture.id) {
            Some(existing) => *existing = fixture,
            None => registry.tags.push(fixture),
        }
    }

    /// Fixture ids in registry order.
    pub fn available_tag_ids(&self) -> Vec<String> {
        lock(&self.registry)
            .tags
            .iter()
            .map(|tag| tag.id.clone())
            .collect()
    }

    /// Snapshot of a fixture.
    pub fn get_tag(&self, id: &str) -> Option<TagFixture> {
        lock(&self.registry)
            .tags
            .iter()
            .find(|tag| tag.id == id)
            .cloned()
    }

    pub fn selected_tag_id(&self) -> String {
        lock(&self.registry).selected.clone()
    }

    /// Model scan latency and a flaky tap.
    async fn scan(&self, operation: &str) -> Result<()> {
        if self.config.delay_ms > 0 {
            tokio::time::sleep(self.config.delay()).await;
        }

        let rate = self.config.failure_rate.clamp(0.0, 1.0);
        if lock(&self.rng).random_bool(rate) {
            warn!(operation, "Injected tag failure");
            return Err(Error::SimulatedFailure {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    /// Run `f` against the selected fixture.
    fn with_selected<T>(&self, f: impl FnOnce(&mut TagFixture) -> Result<T>) -> Result<T> {
        let mut registry = lock(&self.registry);
        f(registry.selected_mut()?)
    }
}

fn ensure_writable(tag: &TagFixture) -> Result<()> {
    if tag.writable {
        Ok(())
    } else {
        Err(Error::ReadOnlyTag)
    }
}

impl TagBackend for TagSimulator {
    async fn read_tag(&self) -> Result<TagContent> {
        self.scan("read").await?;
        self.with_selected(|tag| {
            if tag.locked {
                return Err(Error::TagLocked);
            }
            debug!(tag = %tag.id, "Simulated read");
            Ok(TagContent {
                tag_id: tag.id.clone(),
                content: tag.text().map(from_tag_text),
            })
        })
    }

    async fn write_tag(&self, payload: &serde_json::Value) -> Result<()> {
        let text = to_tag_text(payload)?;
        self.scan("write").await?;
        self.with_selected(|tag| {
            ensure_writable(tag)?;
            if tag.locked || tag.text().is_some_and(LockEnvelope::is_envelope) {
                return Err(Error::TagLocked);
            }
            ensure_capacity(text.len(), Some(tag.max_size))?;

            debug!(tag = %tag.id, bytes = text.len(), "Simulated write");
            tag.content = Some(text);
            Ok(())
        })
    }

    async fn format_tag(&self) -> Result<()> {
        self.scan("format").await?;
        self.with_selected(|tag| {
            ensure_writable(tag)?;
            if tag.locked {
                return Err(Error::TagLocked);
            }
            debug!(tag = %tag.id, "Simulated format");
            tag.content = None;
            tag.password = None;
            Ok(())
        })
    }

    async fn lock_tag(&self, password: &str) -> Result<LockOutcome> {
        let password = Password::for_lock(password)?;
        self.scan("lock").await?;
        self.with_selected(|tag| {
            ensure_writable(tag)?;
            if tag.locked || tag.text().is_some_and(LockEnvelope::is_envelope) {
                return Err(Error::AlreadyLocked);
            }

            if tag.uses_hardware_lock() {
                tag.locked = true;
                tag.password = Some(password.as_str().to_string());
                info!(tag = %tag.id, "Simulated hardware lock");
                return Ok(LockOutcome {
                    lock_type: LockType::Hardware,
                });
            }

            let sealed = LockEnvelope::seal(tag.text(), &password).to_json()?;
            ensure_capacity(sealed.len(), Some(tag.max_size))?;
            tag.content = Some(sealed);
            tag.password = Some(password.as_str().to_string());
            info!(tag = %tag.id, "Simulated software lock");
            Ok(LockOutcome {
                lock_type: LockType::Software,
            })
        })
    }

    async fn unlock_tag(&self, password: &str) -> Result<UnlockOutcome> {
        let password = Password::for_unlock(password)?;
        self.scan("unlock").await?;
        self.with_selected(|tag| {
            if tag.locked {
                let matches = tag
                    .password
                    .as_deref()
                    .is_some_and(|stored| password.matches_page(stored));
                if !matches {
                    return Err(Error::IncorrectPassword);
                }
                tag.locked = false;
                tag.password = None;
                info!(tag = %tag.id, "Simulated hardware unlock");
                return Ok(UnlockOutcome {
                    lock_type: LockType::Hardware,
                    restored_content: tag.text().map(str::to_string),
                });
            }

            let envelope = tag
                .text()
                .and_then(LockEnvelope::parse)
                .ok_or(Error::NotLocked)?;
            // Envelopes sealed here carry their password; foreign ones only
            // get the plausibility check
            if let Some(stored) = tag.password.as_deref()
                && !password.matches(stored)
            {
                return Err(Error::IncorrectPassword);
            }
            let restored = envelope.open(&password)?;
            ensure_writable(tag)?;

            tag.content = restored.clone();
            tag.password = None;
            info!(tag = %tag.id, "Simulated software unlock");
            Ok(UnlockOutcome {
                lock_type: LockType::Software,
                restored_content: restored,
            })
        })
    }

    async fn is_tag_locked(&self) -> Result<LockStatus> {
        self.scan("status").await?;
        self.with_selected(|tag| {
            let status = if tag.locked {
                LockStatus::locked(LockType::Hardware)
            } else if tag.text().is_some_and(LockEnvelope::is_envelope) {
                LockStatus::locked(LockType::Software)
            } else {
                LockStatus::unlocked()
            };
            Ok(status)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{DEVICE_TAG, LOCKED_TAG, LOCKED_TAG_PASSWORD};
    use serde_json::json;

    fn simulator() -> TagSimulator {
        TagSimulator::new(SimulatorConfig::default().with_delay_ms(0)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = TagSimulator::new(SimulatorConfig::default().with_failure_rate(2.0));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_select_unknown_tag() {
        let simulator = simulator();
        assert_eq!(
            simulator.select_tag("NOPE").unwrap_err(),
            Error::UnknownTag("NOPE".into())
        );
        assert_eq!(simulator.selected_tag_id(), EMPTY_TAG);
    }

    #[tokio::test]
    async fn test_read_device_tag() {
        let simulator = simulator();
        simulator.select_tag(DEVICE_TAG).unwrap();

        let content = simulator.read_tag().await.unwrap();
        assert_eq!(content.tag_id, DEVICE_TAG);
        assert_eq!(content.content.unwrap()["deviceId"], "DEV-0001");
    }

    #[tokio::test]
    async fn test_read_locked_tag_is_refused() {
        let simulator = simulator();
        simulator.select_tag(LOCKED_TAG).unwrap();
        assert_eq!(simulator.read_tag().await.unwrap_err(), Error::TagLocked);

        let unlocked = simulator.unlock_tag(LOCKED_TAG_PASSWORD).await.unwrap();
        assert_eq!(unlocked.lock_type, LockType::Hardware);
        assert!(unlocked.restored_content.is_some());
        assert!(simulator.read_tag().await.is_ok());
    }

    #[tokio::test]
    async fn test_password_validated_before_scan() {
        let simulator =
            TagSimulator::new(SimulatorConfig::default().with_delay_ms(0).with_failure_rate(1.0))
                .unwrap();
        assert_eq!(
            simulator.lock_tag("abc").await.unwrap_err(),
            Error::InvalidPassword { min_length: 4 }
        );
        assert_eq!(
            simulator.unlock_tag("").await.unwrap_err(),
            Error::PasswordRequired
        );
    }

    #[tokio::test]
    async fn test_format_destroys_envelope() {
        let simulator = simulator();
        simulator.add_tag(
            TagFixture::new("CLASSIC", tagvault_hardware::TagTechnology::MifareClassic1K)
                .with_content("{\"a\":1}"),
        );
        simulator.select_tag("CLASSIC").unwrap();

        simulator.lock_tag("secret").await.unwrap();
        simulator.format_tag().await.unwrap();

        assert_eq!(simulator.is_tag_locked().await.unwrap(), LockStatus::unlocked());
        assert_eq!(simulator.read_tag().await.unwrap().content, None);
        assert_eq!(
            simulator.write_tag(&json!({"b": 2})).await,
            Ok(())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_applies_before_result() {
        let simulator = TagSimulator::new(SimulatorConfig::default()).unwrap();
        let start = tokio::time::Instant::now();

        simulator.is_tag_locked().await.unwrap();
        assert!(start.elapsed() >= std::time::Duration::from_millis(800));
    }
}
