//! Scoped radio sessions.

use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tagvault_hardware::{HardwareError, Result, TagAccess, TechProfile};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Exclusive, claimed access to the radio.
///
/// Holding a session holds the service's access lock, so operations never
/// interleave. Dropping it releases the radio, whichever way the operation
/// ended.
pub struct TagSession<'a, A: TagAccess> {
    access: MutexGuard<'a, A>,
    timeout: Duration,
}

impl<'a, A: TagAccess> TagSession<'a, A> {
    /// Wait for exclusive access, then claim the radio for NDEF.
    pub async fn begin(access: &'a Mutex<A>, timeout: Duration) -> Result<Self> {
        let access = access.lock().await;
        let mut session = Self { access, timeout };
        session.renegotiate(TechProfile::Ndef).await?;
        Ok(session)
    }

    /// Re-claim the radio for another technology profile.
    ///
    /// # Errors
    /// `Timeout` if the reader does not answer within the session timeout.
    pub async fn renegotiate(&mut self, profile: TechProfile) -> Result<()> {
        debug!(%profile, "Claiming radio");
        let claim = self.access.claim(profile, self.timeout);
        match tokio::time::timeout(self.timeout, claim).await {
            Ok(result) => result,
            Err(_) => Err(HardwareError::timeout(self.timeout.as_millis() as u64)),
        }
    }
}

impl<A: TagAccess> Deref for TagSession<'_, A> {
    type Target = A;

    fn deref(&self) -> &A {
        &self.access
    }
}

impl<A: TagAccess> DerefMut for TagSession<'_, A> {
    fn deref_mut(&mut self) -> &mut A {
        &mut self.access
    }
}

impl<A: TagAccess> Drop for TagSession<'_, A> {
    fn drop(&mut self) {
        self.access.release();
        debug!("Radio released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagvault_hardware::TagTechnology;
    use tagvault_hardware::mock::{MockReader, MockTag};

    const TIMEOUT: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn test_drop_releases() {
        let (reader, handle) = MockReader::new();
        handle.present_tag(MockTag::new(vec![0x04, 0x10], TagTechnology::Ntag213));
        let access = Mutex::new(reader);

        {
            let mut session = TagSession::begin(&access, TIMEOUT).await.unwrap();
            session.renegotiate(TechProfile::PageAccess).await.unwrap();
            assert!(handle.is_claimed());
        }

        assert!(!handle.is_claimed());
        assert_eq!(handle.claim_count(), 1);
        assert_eq!(handle.release_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_claim_still_releases() {
        let (reader, handle) = MockReader::new();
        let access = Mutex::new(reader);

        let result = TagSession::begin(&access, TIMEOUT).await;
        assert!(matches!(result, Err(HardwareError::Timeout { .. })));
        assert!(!handle.is_claimed());
    }
}
