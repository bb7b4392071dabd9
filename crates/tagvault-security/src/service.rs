//! The security service: tag operations over a real radio.

use crate::config::SecurityConfig;
use crate::error::map_hardware_error;
use crate::retry::write_with_retry;
use crate::session::TagSession;
use crate::strategy::StrategyOutcome;
use tagvault_codec::{LockEnvelope, ensure_capacity, from_tag_text, to_tag_text};
use tagvault_core::{
    Error, LockOutcome, LockStatus, LockType, Password, Result, TagContent, UnlockOutcome,
};
use tagvault_hardware::{TagAccess, TagBackend, TagCapabilities};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Tag operations over a [`TagAccess`] radio.
///
/// Every operation claims the radio, does its work, and releases the radio
/// on every exit path. Concurrent calls are serialized.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use tagvault_hardware::mock::{MockReader, MockTag};
/// use tagvault_hardware::{TagBackend, TagTechnology};
/// use tagvault_security::{SecurityConfig, SecurityService};
///
/// #[tokio::main]
/// async fn main() -> tagvault_core::Result<()> {
///     let (reader, handle) = MockReader::new();
///     handle.present_tag(MockTag::new(vec![0x04, 0xA1, 0x22], TagTechnology::Ntag215));
///
///     let service = SecurityService::new(reader, SecurityConfig::default());
///     service.write_tag(&json!({"deviceId": "DEV-0001"})).await?;
///     service.lock_tag("secret").await?;
///     assert!(service.is_tag_locked().await.is_err());
///
///     let unlocked = service.unlock_tag("secret").await?;
///     assert!(unlocked.restored_content.is_some());
///     Ok(())
/// }
/// ```
pub struct SecurityService<A: TagAccess> {
    access: Mutex<A>,
    config: SecurityConfig,
}

impl<A: TagAccess> SecurityService<A> {
    pub fn new(access: A, config: SecurityConfig) -> Self {
        Self {
            access: Mutex::new(access),
            config,
        }
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Claim the radio and discover the tag in the field.
    async fn session(&self, operation: &str) -> Result<(TagSession<'_, A>, TagCapabilities)> {
        let mut session = TagSession::begin(&self.access, self.config.discovery_timeout())
            .await
            .map_err(|e| map_hardware_error(operation, e))?;

        let tag = session
            .discover()
            .await
            .map_err(|e| map_hardware_error(operation, e))?
            .ok_or(Error::TagNotPresent)?;

        debug!(
            tag_id = %tag.id,
            technology = %tag.technology,
            writable = tag.writable,
            max_size = ?tag.max_size,
            "Tag discovered"
        );
        Ok((session, tag))
    }
}

impl<A: TagAccess> TagBackend for SecurityService<A> {
    async fn read_tag(&self) -> Result<TagContent> {
        let (mut session, tag) = self.session("read tag").await?;
        let text = session
            .read_ndef_text()
            .await
            .map_err(|e| map_hardware_error("read tag", e))?;

        Ok(TagContent {
            tag_id: tag.id.to_hex(),
            content: text.as_deref().map(from_tag_text),
        })
    }

    async fn write_tag(&self, payload: &serde_json::Value) -> Result<()> {
        let text = to_tag_text(payload)?;
        let (mut session, tag) = self.session("write tag").await?;

        if !tag.writable {
            return Err(Error::ReadOnlyTag);
        }

        let current = session
            .read_ndef_text()
            .await
            .map_err(|e| map_hardware_error("write tag", e))?;
        if current.as_deref().is_some_and(LockEnvelope::is_envelope) {
            return Err(Error::TagLocked);
        }

        ensure_capacity(text.len(), tag.max_size)?;
        write_with_retry(&mut session, &text, &self.config.write_retry).await?;

        info!(tag_id = %tag.id, size = text.len(), "Tag written");
        Ok(())
    }

    async fn format_tag(&self) -> Result<()> {
        let (mut session, tag) = self.session("format tag").await?;

        if !tag.writable {
            return Err(Error::ReadOnlyTag);
        }

        write_with_retry(&mut session, "", &self.config.write_retry).await?;

        info!(tag_id = %tag.id, "Tag formatted");
        Ok(())
    }

    async fn lock_tag(&self, password: &str) -> Result<LockOutcome> {
        let password = Password::for_lock(password)?;
        let (mut session, tag) = self.session("lock tag").await?;

        if !tag.writable {
            return Err(Error::ReadOnlyTag);
        }
        if tag.ndef_text.as_deref().is_some_and(LockEnvelope::is_envelope) {
            return Err(Error::AlreadyLocked);
        }

        for strategy in &self.config.strategies {
            match strategy
                .lock(&mut session, &tag, &password, &self.config.write_retry)
                .await?
            {
                StrategyOutcome::Done(outcome) => {
                    info!(tag_id = %tag.id, lock_type = %outcome.lock_type, "Tag locked");
                    return Ok(outcome);
                }
                StrategyOutcome::NotApplicable(reason) => {
                    debug!(%strategy, reason = %reason, "Lock strategy skipped");
                }
            }
        }

        Err(Error::operation_failed(
            "lock tag",
            format!("no lock strategy applies to {}", tag.technology),
        ))
    }

    async fn unlock_tag(&self, password: &str) -> Result<UnlockOutcome> {
        let password = Password::for_unlock(password)?;
        let (mut session, tag) = self.session("unlock tag").await?;

        for strategy in &self.config.strategies {
            match strategy
                .unlock(&mut session, &tag, &password, &self.config.write_retry)
                .await?
            {
                StrategyOutcome::Done(outcome) => {
                    info!(tag_id = %tag.id, lock_type = %outcome.lock_type, "Tag unlocked");
                    return Ok(outcome);
                }
                StrategyOutcome::NotApplicable(reason) => {
                    debug!(%strategy, reason = %reason, "Unlock strategy skipped");
                }
            }
        }

        Err(Error::NotLocked)
    }

    async fn is_tag_locked(&self) -> Result<LockStatus> {
        let (mut session, _tag) = self.session("check lock status").await?;

        // A read-protected tag fails this read with TagLocked
        let text = session
            .read_ndef_text()
            .await
            .map_err(|e| map_hardware_error("check lock status", e))?;

        if text.as_deref().is_some_and(LockEnvelope::is_envelope) {
            Ok(LockStatus::locked(LockType::Software))
        } else {
            Ok(LockStatus::unlocked())
        }
    }
}
