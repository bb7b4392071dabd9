//! PC/SC tag access for ACR122U-compatible readers.
//!
//! Uses the reader's pseudo-APDUs:
//!
//! ```text
//! FF CA 00 00 00                       get UID
//! FF B0 00 <page> 10                   read 4 pages (16 bytes)
//! FF D6 00 <page> 04 <4 bytes>         write 1 page
//! FF 00 00 00 07 D4 42 1B <pwd 4>      PN533 InCommunicateThru PWD_AUTH
//! ```
//!
//! Only NTAG21x / Ultralight tags are supported; the chip is identified from
//! the size byte of its capability container.

use crate::{
    HardwareError, Result,
    traits::TagAccess,
    transfer::{read_user_memory, run_blocking},
    types::{TagCapabilities, TagTechnology, TechProfile},
};
use pcsc::{Card, Context, Protocols, ReaderState, Scope, ShareMode, State};
use std::ffi::CString;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tagvault_codec::{decode_message, encode_message};
use tagvault_core::{
    TagId,
    constants::{CAPABILITY_CONTAINER_PAGE, FIRST_USER_PAGE, PAGE_SIZE},
};
use tracing::{debug, info, warn};

const SW_SUCCESS: [u8; 2] = [0x90, 0x00];
const READ_CHUNK: u8 = 16;

/// Tag access through a PC/SC reader.
///
/// Every PC/SC call blocks, so each one runs on tokio's blocking pool.
pub struct PcscReader {
    context: Context,
    reader_name: Option<CString>,
    session: Option<Session>,
}

struct Session {
    card: Arc<Card>,
    profile: TechProfile,
    uid: Vec<u8>,
    technology: TagTechnology,
    writable: bool,
}

/// A card found on the reader, before the radio is claimed.
struct Connected {
    card: Card,
    uid: Vec<u8>,
    technology: TagTechnology,
    writable: bool,
}

impl std::fmt::Debug for PcscReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcscReader")
            .field("reader_name", &self.reader_name)
            .field("claimed", &self.session.as_ref().map(|s| s.profile))
            .finish()
    }
}

impl PcscReader {
    /// Connect to the PC/SC service. The first reader found is used.
    ///
    /// # Errors
    /// `Unavailable` if the PC/SC service is not running.
    pub fn new() -> Result<Self> {
        let context = Context::establish(Scope::User).map_err(map_pcsc_error)?;
        Ok(Self {
            context,
            reader_name: None,
            session: None,
        })
    }

    /// Use a specific reader instead of the first one.
    pub fn with_reader(mut self, name: &str) -> Result<Self> {
        let name = CString::new(name)
            .map_err(|_| HardwareError::invalid_data("reader name contains NUL"))?;
        self.reader_name = Some(name);
        Ok(self)
    }

    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| HardwareError::not_claimed(TechProfile::Ndef))
    }

    /// The claimed card, checked against the profile the call needs.
    fn card_for(&self, profile: TechProfile) -> Result<Arc<Card>> {
        let session = self.session()?;
        if profile == TechProfile::PageAccess && session.profile != TechProfile::PageAccess {
            return Err(HardwareError::not_claimed(TechProfile::PageAccess));
        }
        Ok(Arc::clone(&session.card))
    }
}

impl TagAccess for PcscReader {
    async fn claim(&mut self, profile: TechProfile, timeout: Duration) -> Result<()> {
        if self.session.is_none() {
            let context = self.context.clone();
            let reader_name = self.reader_name.clone();
            let connected =
                run_blocking(move || connect(&context, reader_name, timeout)).await?;
            self.session = Some(Session {
                card: Arc::new(connected.card),
                profile: TechProfile::Ndef,
                uid: connected.uid,
                technology: connected.technology,
                writable: connected.writable,
            });
        }

        let Some(session) = self.session.as_mut() else {
            return Err(HardwareError::not_claimed(profile));
        };
        if !session.technology.profiles().contains(&profile) {
            return Err(HardwareError::unsupported(profile.to_string()));
        }
        session.profile = profile;
        debug!(%profile, "Radio claimed");
        Ok(())
    }

    fn release(&mut self) {
        if self.session.take().is_some() {
            debug!("Radio released");
        }
    }

    async fn discover(&mut self) -> Result<Option<TagCapabilities>> {
        let session = self.session()?;
        let (id, technology, writable) =
            (TagId::new(session.uid.clone()), session.technology, session.writable);

        let ndef_text = self.read_ndef_text().await.ok().flatten();
        Ok(Some(TagCapabilities {
            id,
            technology,
            profiles: technology.profiles(),
            writable,
            max_size: technology.user_memory(),
            ndef_text,
        }))
    }

    async fn read_ndef_text(&mut self) -> Result<Option<String>> {
        let capacity = self.session()?.technology.user_memory().unwrap_or(64);
        let card = self.card_for(TechProfile::Ndef)?;

        let memory =
            run_blocking(move || read_user_memory(capacity, |page| read_chunk(&card, page)))
                .await?;
        Ok(decode_message(&memory)?)
    }

    async fn write_ndef_text(&mut self, text: &str) -> Result<()> {
        let session = self.session()?;
        if !session.writable {
            return Err(HardwareError::ReadOnly);
        }

        let mut encoded = encode_message(text)?;
        if let Some(capacity) = session.technology.user_memory()
            && encoded.len() > capacity
        {
            return Err(HardwareError::capacity_exceeded(encoded.len(), capacity));
        }
        encoded.resize(encoded.len().div_ceil(PAGE_SIZE) * PAGE_SIZE, 0);

        let card = self.card_for(TechProfile::Ndef)?;
        run_blocking(move || {
            for (index, chunk) in encoded.chunks_exact(PAGE_SIZE).enumerate() {
                let page = u8::try_from(usize::from(FIRST_USER_PAGE) + index)
                    .map_err(|_| HardwareError::invalid_data("message runs past page 255"))?;
                write_one(&card, page, [chunk[0], chunk[1], chunk[2], chunk[3]])?;
            }
            Ok(())
        })
        .await
    }

    async fn read_page(&mut self, page: u8) -> Result<[u8; 4]> {
        let card = self.card_for(TechProfile::PageAccess)?;
        let chunk = run_blocking(move || read_chunk(&card, page)).await?;
        if chunk.len() < PAGE_SIZE {
            return Err(HardwareError::invalid_data("short page read"));
        }
        Ok([chunk[0], chunk[1], chunk[2], chunk[3]])
    }

    async fn write_page(&mut self, page: u8, data: [u8; 4]) -> Result<()> {
        let card = self.card_for(TechProfile::PageAccess)?;
        run_blocking(move || write_one(&card, page, data)).await
    }

    async fn authenticate(&mut self, password: [u8; 4]) -> Result<[u8; 2]> {
        let card = self.card_for(TechProfile::PageAccess)?;

        let mut apdu = vec![0xFF, 0x00, 0x00, 0x00, 0x07, 0xD4, 0x42, 0x1B];
        apdu.extend_from_slice(&password);

        match run_blocking(move || transmit(&card, &apdu)).await? {
            // D5 43 <status> PACK0 PACK1
            Response::Ok(data) if data.len() >= 5 && data[..2] == [0xD5, 0x43] => {
                if data[2] == 0x00 {
                    Ok([data[3], data[4]])
                } else {
                    Err(HardwareError::AuthenticationFailed)
                }
            }
            Response::Ok(data) if data.len() >= 3 && data[..2] == [0xD5, 0x43] => {
                Err(HardwareError::AuthenticationFailed)
            }
            _ => Err(HardwareError::unsupported("PWD_AUTH")),
        }
    }
}

fn read_chunk(card: &Card, page: u8) -> Result<Vec<u8>> {
    match transmit(card, &[0xFF, 0xB0, 0x00, page, READ_CHUNK])? {
        Response::Ok(data) => Ok(data),
        // 63 00 is how the reader reports a NAK from the tag
        Response::Status(0x63, 0x00) => Err(HardwareError::authentication_required(page)),
        Response::Status(sw1, sw2) => Err(HardwareError::communication(format!(
            "read of page {page} failed with SW {sw1:02X}{sw2:02X}"
        ))),
    }
}

fn write_one(card: &Card, page: u8, data: [u8; 4]) -> Result<()> {
    let mut apdu = vec![0xFF, 0xD6, 0x00, page, PAGE_SIZE as u8];
    apdu.extend_from_slice(&data);

    match transmit(card, &apdu)? {
        Response::Ok(_) => Ok(()),
        Response::Status(sw1, sw2) => Err(HardwareError::write_failed(format!(
            "write of page {page} failed with SW {sw1:02X}{sw2:02X}"
        ))),
    }
}

fn connect(
    context: &Context,
    reader_name: Option<CString>,
    timeout: Duration,
) -> Result<Connected> {
    let reader = match reader_name {
        Some(name) => name,
        None => context
            .list_readers_owned()
            .map_err(map_pcsc_error)?
            .into_iter()
            .next()
            .ok_or_else(|| HardwareError::unavailable("no PC/SC reader attached"))?,
    };

    wait_for_card(context, &reader, timeout)?;

    let card = context
        .connect(&reader, ShareMode::Shared, Protocols::ANY)
        .map_err(map_pcsc_error)?;

    let uid = match transmit(&card, &[0xFF, 0xCA, 0x00, 0x00, 0x00])? {
        Response::Ok(uid) => uid,
        Response::Status(..) => return Err(HardwareError::invalid_data("UID not readable")),
    };

    let cc = match transmit(&card, &[0xFF, 0xB0, 0x00, CAPABILITY_CONTAINER_PAGE, 0x04])? {
        Response::Ok(cc) if cc.len() >= 4 => cc,
        _ => return Err(HardwareError::unsupported("tag has no NDEF capability container")),
    };
    let technology = TagTechnology::from_cc_size(cc[2]).unwrap_or(TagTechnology::Generic);
    let writable = cc[3] == 0x00;

    info!(
        reader = ?reader,
        uid = %hex::encode_upper(&uid),
        %technology,
        "Tag connected"
    );
    Ok(Connected {
        card,
        uid,
        technology,
        writable,
    })
}

enum Response {
    Ok(Vec<u8>),
    Status(u8, u8),
}

fn transmit(card: &Card, apdu: &[u8]) -> Result<Response> {
    let mut buffer = [0u8; pcsc::MAX_BUFFER_SIZE];
    let response = card.transmit(apdu, &mut buffer).map_err(map_pcsc_error)?;

    match response {
        [data @ .., sw1, sw2] if [*sw1, *sw2] == SW_SUCCESS => Ok(Response::Ok(data.to_vec())),
        [.., sw1, sw2] => Ok(Response::Status(*sw1, *sw2)),
        _ => Err(HardwareError::invalid_data("empty reader response")),
    }
}

/// Block until a card is present on `reader` or `timeout` elapses.
fn wait_for_card(context: &Context, reader: &CString, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let mut states = [ReaderState::new(reader.clone(), State::UNAWARE)];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match context.get_status_change(remaining, &mut states) {
            Ok(()) => {}
            Err(pcsc::Error::Timeout) => {
                return Err(HardwareError::timeout(timeout.as_millis() as u64));
            }
            Err(err) => return Err(map_pcsc_error(err)),
        }

        if states[0].event_state().intersects(State::PRESENT) {
            return Ok(());
        }
        if remaining.is_zero() {
            return Err(HardwareError::timeout(timeout.as_millis() as u64));
        }
        states[0].sync_current_state();
    }
}

fn map_pcsc_error(err: pcsc::Error) -> HardwareError {
    match err {
        pcsc::Error::NoService
        | pcsc::Error::ServiceStopped
        | pcsc::Error::NoReadersAvailable
        | pcsc::Error::ReaderUnavailable => HardwareError::unavailable(err.to_string()),
        pcsc::Error::Cancelled => HardwareError::Cancelled,
        pcsc::Error::RemovedCard | pcsc::Error::NoSmartcard | pcsc::Error::ResetCard => {
            HardwareError::communication("tag lost")
        }
        other => {
            warn!(error = %other, "PC/SC error");
            HardwareError::communication(other.to_string())
        }
    }
}
