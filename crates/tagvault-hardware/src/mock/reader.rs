//! Mock NFC reader for testing and development.
//!
//! The reader models one radio with at most one tag in its field. A tag is
//! an in-memory NTAG-style chip: user memory holding a TLV-framed NDEF
//! message plus the CFG0/CFG1/PWD/PACK protection pages, with AUTH0 and PROT
//! enforced the way the silicon does.

use crate::{
    HardwareError, Result,
    traits::TagAccess,
    types::{TagCapabilities, TagTechnology, TechProfile},
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tagvault_codec::{decode_message, encode_message};
use tagvault_core::{
    TagId,
    constants::{
        AUTH0_BYTE, AUTH0_DISABLED, CAPABILITY_CONTAINER_PAGE, FIRST_USER_PAGE, PACK_PATTERN,
        PAGE_SIZE, PROT_BIT,
    },
};
use tokio::time::Instant;
use tracing::{debug, trace};

/// How often a pending claim checks the field for a tag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// User memory for chips without a fixed layout.
const DEFAULT_MEMORY_SIZE: usize = 256;

/// NDEF capability container magic number.
const CC_MAGIC: u8 = 0xE1;

/// A simulated tag.
///
/// # Examples
///
/// ```
/// use tagvault_hardware::mock::MockTag;
/// use tagvault_hardware::types::TagTechnology;
///
/// let tag = MockTag::new(vec![0x04, 0xA1, 0xB2, 0xC3], TagTechnology::Ntag215)
///     .with_ndef_text("{\"a\":1}");
/// assert_eq!(tag.ndef_text().as_deref(), Some("{\"a\":1}"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTag {
    id: TagId,
    technology: TagTechnology,
    writable: bool,
    memory: Vec<u8>,
    auth0: u8,
    access: u8,
    password: [u8; PAGE_SIZE],
    pack: [u8; PAGE_SIZE],
}

impl MockTag {
    /// Create a blank, unprotected tag.
    pub fn new(uid: impl Into<Vec<u8>>, technology: TagTechnology) -> Self {
        let size = technology.user_memory().unwrap_or(DEFAULT_MEMORY_SIZE);

        Self {
            id: TagId::new(uid),
            technology,
            writable: true,
            memory: vec![0; size],
            auth0: AUTH0_DISABLED,
            access: 0,
            password: [0xFF; PAGE_SIZE],
            pack: [0; PAGE_SIZE],
        }
    }

    /// Make the tag permanently read-only.
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Pre-load an NDEF text record. Content that does not fit is truncated.
    pub fn with_ndef_text(mut self, text: &str) -> Self {
        if let Ok(encoded) = encode_message(text) {
            let len = encoded.len().min(self.memory.len());
            self.memory.fill(0);
            self.memory[..len].copy_from_slice(&encoded[..len]);
        }
        self
    }

    /// Pre-lock the tag with a hardware password, read and write protected
    /// from the first user page.
    pub fn with_password(mut self, password: [u8; PAGE_SIZE]) -> Self {
        self.password = password;
        self.pack = PACK_PATTERN;
        self.auth0 = FIRST_USER_PAGE;
        self.access |= PROT_BIT;
        self
    }

    pub fn id(&self) -> &TagId {
        &self.id
    }

    pub fn technology(&self) -> TagTechnology {
        self.technology
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Decoded NDEF text, ignoring protection.
    pub fn ndef_text(&self) -> Option<String> {
        decode_message(&self.memory).ok().flatten()
    }

    pub fn auth0(&self) -> u8 {
        self.auth0
    }

    /// Whether the PROT bit gates reads as well as writes.
    pub fn read_protected(&self) -> bool {
        self.access & PROT_BIT != 0
    }

    /// Whether any page is password protected.
    pub fn is_protected(&self) -> bool {
        self.technology.is_page_addressable() && self.protects(self.auth0)
    }

    /// Password bytes currently stored in the PWD page.
    pub fn stored_password(&self) -> [u8; PAGE_SIZE] {
        self.password
    }

    fn user_pages(&self) -> u8 {
        (self.memory.len() / PAGE_SIZE) as u8
    }

    fn last_page(&self) -> u8 {
        match self.technology.password_pages() {
            Some(pages) => pages.pack,
            None => FIRST_USER_PAGE + self.user_pages() - 1,
        }
    }

    /// Whether `page` lies inside the protected area of this chip.
    fn protects(&self, page: u8) -> bool {
        self.auth0 <= self.last_page() && page >= self.auth0
    }

    fn user_offset(&self, page: u8) -> Option<usize> {
        let index = page.checked_sub(FIRST_USER_PAGE)?;
        (index < self.user_pages()).then(|| index as usize * PAGE_SIZE)
    }

    fn capability_container(&self) -> [u8; PAGE_SIZE] {
        let size = (self.memory.len() / 8) as u8;
        let access = if self.writable { 0x00 } else { 0x0F };
        [CC_MAGIC, 0x10, size, access]
    }

    fn read_page(&self, page: u8, authenticated: bool) -> Result<[u8; PAGE_SIZE]> {
        if self.read_protected() && self.protects(page) && !authenticated {
            return Err(HardwareError::authentication_required(page));
        }

        if let Some(offset) = self.user_offset(page) {
            let mut data = [0u8; PAGE_SIZE];
            data.copy_from_slice(&self.memory[offset..offset + PAGE_SIZE]);
            return Ok(data);
        }

        let uid = self.id.as_bytes();
        match page {
            0..=2 => {
                let start = page as usize * PAGE_SIZE;
                let mut data = [0u8; PAGE_SIZE];
                for (slot, byte) in data.iter_mut().zip(uid.iter().skip(start)) {
                    *slot = *byte;
                }
                Ok(data)
            }
            CAPABILITY_CONTAINER_PAGE => Ok(self.capability_container()),
            _ => match self.technology.password_pages() {
                Some(pages) if page == pages.cfg0 => {
                    let mut data = [0x04, 0x00, 0x00, 0x00];
                    data[AUTH0_BYTE] = self.auth0;
                    Ok(data)
                }
                Some(pages) if page == pages.cfg1 => Ok([self.access, 0x00, 0x00, 0x00]),
                // PWD and PACK always read back as zeros
                Some(pages) if page == pages.pwd || page == pages.pack => Ok([0; PAGE_SIZE]),
                _ => Err(HardwareError::invalid_data(format!(
                    "page {page:#04x} out of range"
                ))),
            },
        }
    }

    fn write_page(&mut self, page: u8, data: [u8; PAGE_SIZE], authenticated: bool) -> Result<()> {
        if !self.writable {
            return Err(HardwareError::ReadOnly);
        }
        if self.protects(page) && !authenticated {
            return Err(HardwareError::authentication_required(page));
        }

        if let Some(offset) = self.user_offset(page) {
            self.memory[offset..offset + PAGE_SIZE].copy_from_slice(&data);
            return Ok(());
        }

        match self.technology.password_pages() {
            Some(pages) if page == pages.cfg0 => self.auth0 = data[AUTH0_BYTE],
            Some(pages) if page == pages.cfg1 => self.access = data[0],
            Some(pages) if page == pages.pwd => self.password = data,
            Some(pages) if page == pages.pack => self.pack = data,
            _ => {
                return Err(HardwareError::invalid_data(format!(
                    "page {page:#04x} is not writable"
                )));
            }
        }
        Ok(())
    }

    fn read_text(&self, authenticated: bool) -> Result<Option<String>> {
        if self.read_protected() && self.protects(FIRST_USER_PAGE) && !authenticated {
            return Err(HardwareError::authentication_required(FIRST_USER_PAGE));
        }
        Ok(decode_message(&self.memory)?)
    }

    fn write_text(&mut self, text: &str, authenticated: bool) -> Result<()> {
        if !self.writable {
            return Err(HardwareError::ReadOnly);
        }
        if self.protects(FIRST_USER_PAGE) && !authenticated {
            return Err(HardwareError::authentication_required(FIRST_USER_PAGE));
        }

        let encoded = encode_message(text)?;
        if encoded.len() > self.memory.len() {
            return Err(HardwareError::capacity_exceeded(
                encoded.len(),
                self.memory.len(),
            ));
        }

        self.memory.fill(0);
        self.memory[..encoded.len()].copy_from_slice(&encoded);
        Ok(())
    }

    fn capabilities(&self, authenticated: bool) -> TagCapabilities {
        TagCapabilities {
            id: self.id.clone(),
            technology: self.technology,
            profiles: self.technology.profiles(),
            writable: self.writable,
            max_size: Some(self.memory.len()),
            ndef_text: self.read_text(authenticated).ok().flatten(),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    tag: Option<MockTag>,
    claimed: Option<TechProfile>,
    authenticated: bool,
    claim_count: usize,
    release_count: usize,
    write_attempts: usize,
    failing_writes: usize,
    page_commands_disabled: bool,
    unavailable: bool,
    cancel_next_claim: bool,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock reader implementing [`TagAccess`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tagvault_hardware::mock::{MockReader, MockTag};
/// use tagvault_hardware::traits::TagAccess;
/// use tagvault_hardware::types::{TagTechnology, TechProfile};
///
/// #[tokio::main]
/// async fn main() -> tagvault_hardware::Result<()> {
///     let (mut reader, handle) = MockReader::new();
///     handle.present_tag(MockTag::new(vec![0x04, 0x01, 0x02, 0x03], TagTechnology::Ntag213));
///
///     reader.claim(TechProfile::Ndef, Duration::from_secs(1)).await?;
///     reader.write_ndef_text("hello").await?;
///     assert_eq!(reader.read_ndef_text().await?.as_deref(), Some("hello"));
///     reader.release();
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockReader {
    state: Arc<Mutex<MockState>>,
}

impl MockReader {
    /// Create a reader with an empty field and its control handle.
    pub fn new() -> (Self, MockReaderHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockReaderHandle { state },
        )
    }

    /// Run `f` against the claimed tag.
    fn with_tag<T>(
        &self,
        profile: TechProfile,
        f: impl FnOnce(&mut MockTag, bool) -> Result<T>,
    ) -> Result<T> {
        let mut state = lock(&self.state);
        match state.claimed {
            Some(claimed) if claimed == profile || profile == TechProfile::Ndef => {}
            _ => return Err(HardwareError::not_claimed(profile)),
        }

        let authenticated = state.authenticated;
        let tag = state
            .tag
            .as_mut()
            .ok_or_else(|| HardwareError::communication("tag lost"))?;
        f(tag, authenticated)
    }

    fn page_command(&self) -> Result<()> {
        if lock(&self.state).page_commands_disabled {
            return Err(HardwareError::unsupported("page command"));
        }
        Ok(())
    }
}

impl TagAccess for MockReader {
    async fn claim(&mut self, profile: TechProfile, timeout: Duration) -> Result<()> {
        {
            let mut state = lock(&self.state);
            if state.unavailable {
                return Err(HardwareError::unavailable("NFC is disabled"));
            }
            if std::mem::take(&mut state.cancel_next_claim) {
                return Err(HardwareError::Cancelled);
            }
        }

        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut guard = lock(&self.state);
                let state = &mut *guard;
                if let Some(tag) = &state.tag {
                    if !tag.technology.profiles().contains(&profile) {
                        return Err(HardwareError::unsupported(profile.to_string()));
                    }
                    if state.claimed.is_none() {
                        state.claim_count += 1;
                    }
                    state.claimed = Some(profile);
                    debug!(%profile, tag = %tag.id, "Radio claimed");
                    return Ok(());
                }
            }

            if Instant::now() >= deadline {
                return Err(HardwareError::timeout(timeout.as_millis() as u64));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn release(&mut self) {
        let mut state = lock(&self.state);
        if state.claimed.take().is_some() {
            state.release_count += 1;
            state.authenticated = false;
            trace!("Radio released");
        }
    }

    async fn discover(&mut self) -> Result<Option<TagCapabilities>> {
        let state = lock(&self.state);
        if state.claimed.is_none() {
            return Err(HardwareError::not_claimed(TechProfile::Ndef));
        }
        Ok(state
            .tag
            .as_ref()
            .map(|tag| tag.capabilities(state.authenticated)))
    }

    async fn read_ndef_text(&mut self) -> Result<Option<String>> {
        self.with_tag(TechProfile::Ndef, |tag, authenticated| {
            tag.read_text(authenticated)
        })
    }

    async fn write_ndef_text(&mut self, text: &str) -> Result<()> {
        {
            let mut state = lock(&self.state);
            state.write_attempts += 1;
            if state.failing_writes > 0 {
                state.failing_writes -= 1;
                return Err(HardwareError::write_failed("write not confirmed"));
            }
        }

        self.with_tag(TechProfile::Ndef, |tag, authenticated| {
            tag.write_text(text, authenticated)
        })
    }

    async fn read_page(&mut self, page: u8) -> Result<[u8; 4]> {
        self.page_command()?;
        self.with_tag(TechProfile::PageAccess, |tag, authenticated| {
            tag.read_page(page, authenticated)
        })
    }

    async fn write_page(&mut self, page: u8, data: [u8; 4]) -> Result<()> {
        self.page_command()?;
        {
            let mut state = lock(&self.state);
            if state.failing_writes > 0 {
                state.failing_writes -= 1;
                return Err(HardwareError::write_failed("page write not acknowledged"));
            }
        }

        self.with_tag(TechProfile::PageAccess, |tag, authenticated| {
            tag.write_page(page, data, authenticated)
        })
    }

    async fn authenticate(&mut self, password: [u8; 4]) -> Result<[u8; 2]> {
        self.page_command()?;
        let pack = self.with_tag(TechProfile::PageAccess, |tag, _| {
            if tag.password == password {
                Ok([tag.pack[0], tag.pack[1]])
            } else {
                Err(HardwareError::AuthenticationFailed)
            }
        })?;

        lock(&self.state).authenticated = true;
        Ok(pack)
    }
}

/// Handle for controlling a [`MockReader`] and inspecting what it did.
#[derive(Debug, Clone)]
pub struct MockReaderHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockReaderHandle {
    /// Place a tag in the field, replacing any previous one.
    pub fn present_tag(&self, tag: MockTag) {
        debug!(tag = %tag.id, technology = %tag.technology, "Tag presented");
        lock(&self.state).tag = Some(tag);
    }

    /// Take the tag out of the field.
    pub fn remove_tag(&self) -> Option<MockTag> {
        lock(&self.state).tag.take()
    }

    /// Snapshot of the tag currently in the field.
    pub fn tag(&self) -> Option<MockTag> {
        lock(&self.state).tag.clone()
    }

    /// Fail the next `count` writes (NDEF or page) with a transport error.
    pub fn fail_next_writes(&self, count: usize) {
        lock(&self.state).failing_writes = count;
    }

    /// Answer page commands and PWD_AUTH with "unsupported".
    pub fn disable_page_commands(&self) {
        lock(&self.state).page_commands_disabled = true;
    }

    /// Report NFC as switched off.
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.state).unavailable = unavailable;
    }

    /// Make the next claim fail as if the user dismissed the scan sheet.
    pub fn cancel_next_claim(&self) {
        lock(&self.state).cancel_next_claim = true;
    }

    /// Number of sessions opened.
    pub fn claim_count(&self) -> usize {
        lock(&self.state).claim_count
    }

    /// Number of sessions closed.
    pub fn release_count(&self) -> usize {
        lock(&self.state).release_count
    }

    pub fn is_claimed(&self) -> bool {
        lock(&self.state).claimed.is_some()
    }

    /// Number of NDEF writes attempted, failed ones included.
    pub fn write_attempts(&self) -> usize {
        lock(&self.state).write_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UID: [u8; 7] = [0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
    const TIMEOUT: Duration = Duration::from_secs(1);

    fn ntag215() -> MockTag {
        MockTag::new(UID, TagTechnology::Ntag215)
    }

    #[tokio::test]
    async fn test_claim_requires_tag() {
        let (mut reader, _handle) = MockReader::new();
        let result = reader
            .claim(TechProfile::Ndef, Duration::from_millis(100))
            .await;
        assert!(matches!(result, Err(HardwareError::Timeout { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_claim_waits_for_tag() {
        let (mut reader, handle) = MockReader::new();

        let presenter = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            handle.present_tag(ntag215());
            handle
        });

        reader.claim(TechProfile::Ndef, TIMEOUT).await.unwrap();
        let handle = presenter.await.unwrap();
        assert!(handle.is_claimed());
    }

    #[tokio::test]
    async fn test_page_access_unsupported_on_classic() {
        let (mut reader, handle) = MockReader::new();
        handle.present_tag(MockTag::new(UID, TagTechnology::MifareClassic1K));

        let result = reader.claim(TechProfile::PageAccess, TIMEOUT).await;
        assert!(matches!(result, Err(HardwareError::Unsupported { .. })));
        assert!(!handle.is_claimed());
    }

    #[tokio::test]
    async fn test_page_commands_require_page_access_claim() {
        let (mut reader, handle) = MockReader::new();
        handle.present_tag(ntag215());

        reader.claim(TechProfile::Ndef, TIMEOUT).await.unwrap();
        assert!(matches!(
            reader.read_page(0x83).await,
            Err(HardwareError::NotClaimed { .. })
        ));

        reader.claim(TechProfile::PageAccess, TIMEOUT).await.unwrap();
        assert_eq!(reader.read_page(0x83).await.unwrap()[AUTH0_BYTE], 0xFF);
        assert_eq!(handle.claim_count(), 1);
    }

    #[tokio::test]
    async fn test_ndef_text_roundtrip_in_memory() {
        let (mut reader, handle) = MockReader::new();
        handle.present_tag(ntag215());

        reader.claim(TechProfile::Ndef, TIMEOUT).await.unwrap();
        assert_eq!(reader.read_ndef_text().await.unwrap(), None);

        reader.write_ndef_text("{\"a\":1}").await.unwrap();
        reader.release();

        assert_eq!(handle.tag().unwrap().ndef_text().as_deref(), Some("{\"a\":1}"));
    }

    #[tokio::test]
    async fn test_user_pages_mirror_ndef_memory() {
        let (mut reader, handle) = MockReader::new();
        handle.present_tag(ntag215().with_ndef_text("hi"));

        reader.claim(TechProfile::PageAccess, TIMEOUT).await.unwrap();
        let page = reader.read_page(FIRST_USER_PAGE).await.unwrap();
        assert_eq!(page, [0x03, 0x09, 0xD1, 0x01]);

        let cc = reader.read_page(CAPABILITY_CONTAINER_PAGE).await.unwrap();
        assert_eq!(TagTechnology::from_cc_size(cc[2]), Some(TagTechnology::Ntag215));
    }

    #[tokio::test]
    async fn test_protected_tag_gates_reads_and_writes() {
        let (mut reader, handle) = MockReader::new();
        handle.present_tag(ntag215().with_ndef_text("secret").with_password(*b"1234"));

        reader.claim(TechProfile::PageAccess, TIMEOUT).await.unwrap();
        assert!(matches!(
            reader.read_ndef_text().await,
            Err(HardwareError::AuthenticationRequired { page: 4 })
        ));
        assert!(matches!(
            reader.write_ndef_text("x").await,
            Err(HardwareError::AuthenticationRequired { .. })
        ));
        assert!(matches!(
            reader.read_page(0x83).await,
            Err(HardwareError::AuthenticationRequired { .. })
        ));

        assert!(matches!(
            reader.authenticate(*b"0000").await,
            Err(HardwareError::AuthenticationFailed)
        ));

        let pack = reader.authenticate(*b"1234").await.unwrap();
        assert_eq!(pack, [PACK_PATTERN[0], PACK_PATTERN[1]]);
        assert_eq!(reader.read_ndef_text().await.unwrap().as_deref(), Some("secret"));

        // PWD never reads back
        assert_eq!(reader.read_page(0x85).await.unwrap(), [0; 4]);

        // Authentication ends with the session
        reader.release();
        reader.claim(TechProfile::Ndef, TIMEOUT).await.unwrap();
        assert!(reader.read_ndef_text().await.is_err());
    }

    #[tokio::test]
    async fn test_write_protection_without_prot_bit() {
        let (mut reader, handle) = MockReader::new();
        handle.present_tag(ntag215().with_ndef_text("visible"));

        reader.claim(TechProfile::PageAccess, TIMEOUT).await.unwrap();
        reader.write_page(0x85, *b"abcd").await.unwrap();
        reader.write_page(0x83, [0x04, 0, 0, FIRST_USER_PAGE]).await.unwrap();

        assert_eq!(reader.read_ndef_text().await.unwrap().as_deref(), Some("visible"));
        assert!(matches!(
            reader.write_ndef_text("changed").await,
            Err(HardwareError::AuthenticationRequired { .. })
        ));
        assert!(handle.tag().unwrap().is_protected());
        assert!(!handle.tag().unwrap().read_protected());
    }

    #[tokio::test]
    async fn test_read_only_and_capacity() {
        let (mut reader, handle) = MockReader::new();
        handle.present_tag(MockTag::new(UID, TagTechnology::Ntag213).read_only());

        reader.claim(TechProfile::Ndef, TIMEOUT).await.unwrap();
        assert!(matches!(
            reader.write_ndef_text("x").await,
            Err(HardwareError::ReadOnly)
        ));
        reader.release();

        handle.present_tag(MockTag::new(UID, TagTechnology::Ntag213));
        reader.claim(TechProfile::Ndef, TIMEOUT).await.unwrap();
        let result = reader.write_ndef_text(&"x".repeat(144)).await;
        assert!(matches!(
            result,
            Err(HardwareError::CapacityExceeded { capacity: 144, .. })
        ));
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let (mut reader, handle) = MockReader::new();
        handle.present_tag(ntag215());
        handle.fail_next_writes(1);

        reader.claim(TechProfile::Ndef, TIMEOUT).await.unwrap();
        assert!(matches!(
            reader.write_ndef_text("a").await,
            Err(HardwareError::WriteFailed { .. })
        ));
        reader.write_ndef_text("a").await.unwrap();
        assert_eq!(handle.write_attempts(), 2);
        reader.release();

        handle.cancel_next_claim();
        assert!(matches!(
            reader.claim(TechProfile::Ndef, TIMEOUT).await,
            Err(HardwareError::Cancelled)
        ));

        handle.set_unavailable(true);
        assert!(matches!(
            reader.claim(TechProfile::Ndef, TIMEOUT).await,
            Err(HardwareError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_tag_removed_mid_session() {
        let (mut reader, handle) = MockReader::new();
        handle.present_tag(ntag215());

        reader.claim(TechProfile::Ndef, TIMEOUT).await.unwrap();
        handle.remove_tag();
        assert!(matches!(
            reader.read_ndef_text().await,
            Err(HardwareError::CommunicationError { .. })
        ));
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let (mut reader, handle) = MockReader::new();
        handle.present_tag(ntag215());

        reader.release();
        reader.claim(TechProfile::Ndef, TIMEOUT).await.unwrap();
        reader.release();
        reader.release();

        assert_eq!(handle.claim_count(), 1);
        assert_eq!(handle.release_count(), 1);
        assert!(!handle.is_claimed());
    }
}
