//! Enum wrapper for tag access dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn TagAccess>` is
//! not available. [`AnyTagAccess`] provides concrete dispatch instead, with
//! hardware variants behind feature flags.
//!
//! # Examples
//!
//! ```
//! use tagvault_hardware::devices::AnyTagAccess;
//! use tagvault_hardware::mock::MockReader;
//!
//! let (reader, _handle) = MockReader::new();
//! let access = AnyTagAccess::Mock(reader);
//! assert_eq!(access.name(), "mock");
//! ```

use crate::mock::MockReader;
use crate::traits::TagAccess;
use crate::types::{TagCapabilities, TechProfile};
use crate::Result;
use std::time::Duration;

#[cfg(feature = "hardware-pcsc")]
use crate::pcsc::PcscReader;

#[derive(Debug)]
#[non_exhaustive]
pub enum AnyTagAccess {
    /// In-memory reader for development and testing.
    Mock(MockReader),

    /// PC/SC reader (ACR122U and compatibles).
    #[cfg(feature = "hardware-pcsc")]
    Pcsc(PcscReader),
}

impl AnyTagAccess {
    /// Short name of the underlying implementation, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mock(_) => "mock",
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(_) => "pcsc",
        }
    }
}

impl TagAccess for AnyTagAccess {
    async fn claim(&mut self, profile: TechProfile, timeout: Duration) -> Result<()> {
        match self {
            Self::Mock(device) => device.claim(profile, timeout).await,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(device) => device.claim(profile, timeout).await,
        }
    }

    fn release(&mut self) {
        match self {
            Self::Mock(device) => device.release(),
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(device) => device.release(),
        }
    }

    async fn discover(&mut self) -> Result<Option<TagCapabilities>> {
        match self {
            Self::Mock(device) => device.discover().await,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(device) => device.discover().await,
        }
    }

    async fn read_ndef_text(&mut self) -> Result<Option<String>> {
        match self {
            Self::Mock(device) => device.read_ndef_text().await,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(device) => device.read_ndef_text().await,
        }
    }

    async fn write_ndef_text(&mut self, text: &str) -> Result<()> {
        match self {
            Self::Mock(device) => device.write_ndef_text(text).await,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(device) => device.write_ndef_text(text).await,
        }
    }

    async fn read_page(&mut self, page: u8) -> Result<[u8; 4]> {
        match self {
            Self::Mock(device) => device.read_page(page).await,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(device) => device.read_page(page).await,
        }
    }

    async fn write_page(&mut self, page: u8, data: [u8; 4]) -> Result<()> {
        match self {
            Self::Mock(device) => device.write_page(page, data).await,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(device) => device.write_page(page, data).await,
        }
    }

    async fn authenticate(&mut self, password: [u8; 4]) -> Result<[u8; 2]> {
        match self {
            Self::Mock(device) => device.authenticate(password).await,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(device) => device.authenticate(password).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTag;
    use crate::types::TagTechnology;

    #[tokio::test]
    async fn test_dispatch_to_mock() {
        let (reader, handle) = MockReader::new();
        handle.present_tag(MockTag::new(vec![0x04, 0x01, 0x02, 0x03], TagTechnology::Ntag213));

        let mut access = AnyTagAccess::Mock(reader);
        access
            .claim(TechProfile::Ndef, Duration::from_secs(1))
            .await
            .unwrap();

        let tag = access.discover().await.unwrap().unwrap();
        assert_eq!(tag.id.to_hex(), "04010203");
        assert_eq!(tag.max_size, Some(144));

        access.release();
        assert!(!handle.is_claimed());
    }
}
