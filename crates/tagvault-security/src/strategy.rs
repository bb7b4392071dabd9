//! Lock strategies.
//!
//! A strategy either completes, fails with a definitive error, or reports
//! that it does not apply to the tag in the field, in which case the service
//! moves on to the next configured strategy.
//!
//! The hardware strategy programs the NTAG21x password registers:
//!
//! | Register | Contents                                   |
//! |----------|--------------------------------------------|
//! | CFG0     | `[MIRROR, RFUI, MIRROR_PAGE, AUTH0]`       |
//! | CFG1     | `[ACCESS, RFUI, RFUI, RFUI]`, bit 7 = PROT |
//! | PWD      | 4-byte password                            |
//! | PACK     | 2-byte acknowledge + 2 RFU bytes           |
//!
//! Setting AUTH0 to the first user page activates protection; PROT extends
//! it to reads.

use crate::config::RetryPolicy;
use crate::error::map_hardware_error;
use crate::retry::write_with_retry;
use crate::session::TagSession;
use serde::{Deserialize, Serialize};
use std::fmt;
use tagvault_codec::{LockEnvelope, ensure_capacity};
use tagvault_core::{
    Error, LockOutcome, LockType, Password, Result, UnlockOutcome,
    constants::{AUTH0_BYTE, AUTH0_DISABLED, FIRST_USER_PAGE, PACK_PATTERN, PROT_BIT},
};
use tagvault_hardware::{HardwareError, PasswordPages, TagAccess, TagCapabilities, TechProfile};
use tracing::{debug, warn};

/// How a tag gets locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockStrategy {
    /// Chip password protection.
    Hardware,
    /// Encrypted envelope written over the content.
    Software,
}

/// Result of running one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome<T> {
    Done(T),
    NotApplicable(String),
}

impl LockStrategy {
    pub fn lock_type(self) -> LockType {
        match self {
            Self::Hardware => LockType::Hardware,
            Self::Software => LockType::Software,
        }
    }

    pub(crate) async fn lock<A: TagAccess>(
        self,
        session: &mut TagSession<'_, A>,
        tag: &TagCapabilities,
        password: &Password,
        retry: &RetryPolicy,
    ) -> Result<StrategyOutcome<LockOutcome>> {
        match self {
            Self::Hardware => hardware_lock(session, tag, password).await,
            Self::Software => software_lock(session, tag, password, retry).await,
        }
    }

    pub(crate) async fn unlock<A: TagAccess>(
        self,
        session: &mut TagSession<'_, A>,
        tag: &TagCapabilities,
        password: &Password,
        retry: &RetryPolicy,
    ) -> Result<StrategyOutcome<UnlockOutcome>> {
        match self {
            Self::Hardware => hardware_unlock(session, tag, password).await,
            Self::Software => software_unlock(session, password, retry).await,
        }
    }
}

impl fmt::Display for LockStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.lock_type().fmt(f)
    }
}

fn is_protected(cfg0: [u8; 4], pages: PasswordPages) -> bool {
    cfg0[AUTH0_BYTE] <= pages.pack
}

/// Switch to page access, or say why the hardware strategy cannot run.
async fn page_access<A: TagAccess>(
    session: &mut TagSession<'_, A>,
    tag: &TagCapabilities,
) -> std::result::Result<PasswordPages, String> {
    let pages = tag
        .technology
        .password_pages()
        .ok_or_else(|| format!("{} has no password registers", tag.technology))?;
    if !tag.supports(TechProfile::PageAccess) {
        return Err("page access not offered".into());
    }
    session
        .renegotiate(TechProfile::PageAccess)
        .await
        .map_err(|e| format!("page access unavailable: {e}"))?;
    Ok(pages)
}

/// Return to NDEF after an aborted hardware attempt.
async fn fall_back<A: TagAccess, T>(
    session: &mut TagSession<'_, A>,
    reason: String,
) -> Result<StrategyOutcome<T>> {
    warn!(reason = %reason, "Hardware protection not applicable");
    session
        .renegotiate(TechProfile::Ndef)
        .await
        .map_err(|e| map_hardware_error("restore NDEF session", e))?;
    Ok(StrategyOutcome::NotApplicable(reason))
}

async fn hardware_lock<A: TagAccess>(
    session: &mut TagSession<'_, A>,
    tag: &TagCapabilities,
    password: &Password,
) -> Result<StrategyOutcome<LockOutcome>> {
    let pages = match page_access(session, tag).await {
        Ok(pages) => pages,
        Err(reason) => return fall_back(session, reason).await,
    };

    let cfg0 = match session.read_page(pages.cfg0).await {
        Ok(cfg0) if is_protected(cfg0, pages) => return Err(Error::AlreadyLocked),
        Ok(cfg0) => cfg0,
        Err(HardwareError::AuthenticationRequired { .. }) => return Err(Error::AlreadyLocked),
        Err(err) => return fall_back(session, format!("cannot read CFG0: {err}")).await,
    };

    if let Err(err) = program_protection(session, pages, cfg0, password).await {
        return fall_back(session, format!("cannot program protection: {err}")).await;
    }

    debug!(technology = %tag.technology, "Password protection active");
    Ok(StrategyOutcome::Done(LockOutcome {
        lock_type: LockType::Hardware,
    }))
}

/// PWD, PACK and PROT first; AUTH0 last, since it switches protection on.
async fn program_protection<A: TagAccess>(
    session: &mut TagSession<'_, A>,
    pages: PasswordPages,
    mut cfg0: [u8; 4],
    password: &Password,
) -> tagvault_hardware::Result<()> {
    session.write_page(pages.pwd, password.page_bytes()).await?;
    session.write_page(pages.pack, PACK_PATTERN).await?;

    let mut cfg1 = session.read_page(pages.cfg1).await?;
    cfg1[0] |= PROT_BIT;
    session.write_page(pages.cfg1, cfg1).await?;

    cfg0[AUTH0_BYTE] = FIRST_USER_PAGE;
    session.write_page(pages.cfg0, cfg0).await
}

async fn clear_protection<A: TagAccess>(
    session: &mut TagSession<'_, A>,
    pages: PasswordPages,
) -> tagvault_hardware::Result<()> {
    let mut cfg0 = session.read_page(pages.cfg0).await?;
    cfg0[AUTH0_BYTE] = AUTH0_DISABLED;
    session.write_page(pages.cfg0, cfg0).await?;

    let mut cfg1 = session.read_page(pages.cfg1).await?;
    cfg1[0] &= !PROT_BIT;
    session.write_page(pages.cfg1, cfg1).await
}

async fn hardware_unlock<A: TagAccess>(
    session: &mut TagSession<'_, A>,
    tag: &TagCapabilities,
    password: &Password,
) -> Result<StrategyOutcome<UnlockOutcome>> {
    let pages = match page_access(session, tag).await {
        Ok(pages) => pages,
        Err(reason) => return fall_back(session, reason).await,
    };

    let protected = match session.read_page(pages.cfg0).await {
        Ok(cfg0) => is_protected(cfg0, pages),
        Err(HardwareError::AuthenticationRequired { .. }) => true,
        Err(err) => return fall_back(session, format!("cannot read CFG0: {err}")).await,
    };
    if !protected {
        return fall_back(session, "password protection not active".into()).await;
    }

    match session.authenticate(password.page_bytes()).await {
        Ok(pack) if pack != PACK_PATTERN[..2] => {
            warn!(pack = ?pack, "Unexpected PACK from tag");
        }
        Ok(_) => {}
        Err(HardwareError::AuthenticationFailed) => return Err(Error::IncorrectPassword),
        Err(err) => return fall_back(session, format!("PWD_AUTH failed: {err}")).await,
    }

    // Authenticated: from here on a failure is a real failure, not a fallback
    clear_protection(session, pages)
        .await
        .map_err(|e| map_hardware_error("remove password protection", e))?;

    let restored_content = match session.read_ndef_text().await {
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err, "Could not read content back after unlock");
            None
        }
    };

    Ok(StrategyOutcome::Done(UnlockOutcome {
        lock_type: LockType::Hardware,
        restored_content,
    }))
}

async fn software_lock<A: TagAccess>(
    session: &mut TagSession<'_, A>,
    tag: &TagCapabilities,
    password: &Password,
    retry: &RetryPolicy,
) -> Result<StrategyOutcome<LockOutcome>> {
    let current = session
        .read_ndef_text()
        .await
        .map_err(|e| map_hardware_error("read tag", e))?;

    if current.as_deref().is_some_and(LockEnvelope::is_envelope) {
        return Err(Error::AlreadyLocked);
    }

    let sealed = LockEnvelope::seal(current.as_deref(), password).to_json()?;
    ensure_capacity(sealed.len(), tag.max_size)?;
    write_with_retry(session, &sealed, retry).await?;

    Ok(StrategyOutcome::Done(LockOutcome {
        lock_type: LockType::Software,
    }))
}

async fn software_unlock<A: TagAccess>(
    session: &mut TagSession<'_, A>,
    password: &Password,
    retry: &RetryPolicy,
) -> Result<StrategyOutcome<UnlockOutcome>> {
    let text = session
        .read_ndef_text()
        .await
        .map_err(|e| map_hardware_error("read tag", e))?;

    let envelope = text
        .as_deref()
        .and_then(LockEnvelope::parse)
        .ok_or(Error::NotLocked)?;
    let restored_content = envelope.open(password)?;

    write_with_retry(session, restored_content.as_deref().unwrap_or(""), retry).await?;

    Ok(StrategyOutcome::Done(UnlockOutcome {
        lock_type: LockType::Software,
        restored_content,
    }))
}
