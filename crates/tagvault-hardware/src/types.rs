//! Tag descriptors shared by all tag access implementations.

use serde::{Deserialize, Serialize};
use std::fmt;
use tagvault_core::{Error, TagId};

/// Technology profile a radio session is negotiated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechProfile {
    /// Plain NDEF message read/write.
    Ndef,

    /// Raw page read/write plus PWD_AUTH (NTAG21x, Ultralight EV1).
    PageAccess,
}

impl fmt::Display for TechProfile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Ndef => write!(f, "NDEF"),
            Self::PageAccess => write!(f, "page access"),
        }
    }
}

/// Page numbers of the protection configuration block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPages {
    pub cfg0: u8,
    pub cfg1: u8,
    pub pwd: u8,
    pub pack: u8,
}

impl PasswordPages {
    const fn starting_at(cfg0: u8) -> Self {
        Self {
            cfg0,
            cfg1: cfg0 + 1,
            pwd: cfg0 + 2,
            pack: cfg0 + 3,
        }
    }
}

/// Chip model of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum TagTechnology {
    #[serde(rename = "NTAG213")]
    Ntag213,
    #[serde(rename = "NTAG215")]
    Ntag215,
    #[serde(rename = "NTAG216")]
    Ntag216,
    #[serde(rename = "MIFARE_ULTRALIGHT_EV1")]
    UltralightEv1,
    #[serde(rename = "MIFARE_CLASSIC_1K")]
    MifareClassic1K,
    #[serde(rename = "ISO15693")]
    Iso15693,
    #[serde(rename = "GENERIC")]
    Generic,
}

impl TagTechnology {
    /// Upper-case type label, as used in fixture definitions.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ntag213 => "NTAG213",
            Self::Ntag215 => "NTAG215",
            Self::Ntag216 => "NTAG216",
            Self::UltralightEv1 => "MIFARE_ULTRALIGHT_EV1",
            Self::MifareClassic1K => "MIFARE_CLASSIC_1K",
            Self::Iso15693 => "ISO15693",
            Self::Generic => "GENERIC",
        }
    }

    /// Whether the chip supports raw page access and PWD_AUTH.
    #[must_use]
    pub fn is_page_addressable(&self) -> bool {
        self.password_pages().is_some()
    }

    /// Protection configuration pages, for chips that have them.
    #[must_use]
    pub fn password_pages(&self) -> Option<PasswordPages> {
        match self {
            Self::Ntag213 => Some(PasswordPages::starting_at(0x29)),
            Self::Ntag215 => Some(PasswordPages::starting_at(0x83)),
            Self::Ntag216 => Some(PasswordPages::starting_at(0xE3)),
            Self::UltralightEv1 => Some(PasswordPages::starting_at(0x10)),
            _ => None,
        }
    }

    /// User memory available for NDEF data, in bytes.
    #[must_use]
    pub fn user_memory(&self) -> Option<usize> {
        match self {
            Self::Ntag213 => Some(144),
            Self::Ntag215 => Some(504),
            Self::Ntag216 => Some(888),
            Self::UltralightEv1 => Some(48),
            Self::MifareClassic1K => Some(716),
            Self::Iso15693 | Self::Generic => None,
        }
    }

    /// Technology profiles the chip can be claimed for.
    #[must_use]
    pub fn profiles(&self) -> Vec<TechProfile> {
        if self.is_page_addressable() {
            vec![TechProfile::Ndef, TechProfile::PageAccess]
        } else {
            vec![TechProfile::Ndef]
        }
    }

    /// Identify an NTAG21x from the size byte of its capability container.
    #[must_use]
    pub fn from_cc_size(size: u8) -> Option<Self> {
        match size {
            0x12 => Some(Self::Ntag213),
            0x3E => Some(Self::Ntag215),
            0x6D => Some(Self::Ntag216),
            0x06 => Some(Self::UltralightEv1),
            _ => None,
        }
    }
}

impl fmt::Display for TagTechnology {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for TagTechnology {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let technology = match s.to_ascii_uppercase().as_str() {
            "NTAG213" => Self::Ntag213,
            "NTAG215" => Self::Ntag215,
            "NTAG216" => Self::Ntag216,
            "MIFARE_ULTRALIGHT_EV1" | "ULTRALIGHT_EV1" => Self::UltralightEv1,
            "MIFARE_CLASSIC_1K" | "MIFARE_CLASSIC" => Self::MifareClassic1K,
            "ISO15693" => Self::Iso15693,
            "GENERIC" => Self::Generic,
            other => {
                return Err(Error::Config(format!("unknown tag technology {other:?}")));
            }
        };
        Ok(technology)
    }
}

/// What a discovered tag offers during one tap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCapabilities {
    pub id: TagId,
    pub technology: TagTechnology,
    pub profiles: Vec<TechProfile>,
    pub writable: bool,

    /// Capacity in bytes, when known.
    pub max_size: Option<usize>,

    /// Text of the NDEF record at discovery time, if any and readable.
    pub ndef_text: Option<String>,
}

impl TagCapabilities {
    #[must_use]
    pub fn supports(&self, profile: TechProfile) -> bool {
        self.profiles.contains(&profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TagTechnology::Ntag213, 0x29, 144)]
    #[case(TagTechnology::Ntag215, 0x83, 504)]
    #[case(TagTechnology::Ntag216, 0xE3, 888)]
    #[case(TagTechnology::UltralightEv1, 0x10, 48)]
    fn test_page_layout(
        #[case] technology: TagTechnology,
        #[case] cfg0: u8,
        #[case] memory: usize,
    ) {
        let pages = technology.password_pages().unwrap();
        assert_eq!(pages.cfg0, cfg0);
        assert_eq!(pages.pack, cfg0 + 3);
        assert_eq!(technology.user_memory(), Some(memory));
        assert!(technology.profiles().contains(&TechProfile::PageAccess));
    }

    #[test]
    fn test_non_page_addressable() {
        assert!(!TagTechnology::MifareClassic1K.is_page_addressable());
        assert_eq!(TagTechnology::Iso15693.profiles(), vec![TechProfile::Ndef]);
        assert_eq!(TagTechnology::Generic.user_memory(), None);
    }

    #[test]
    fn test_label_roundtrip() {
        for technology in [
            TagTechnology::Ntag213,
            TagTechnology::Ntag215,
            TagTechnology::Ntag216,
            TagTechnology::UltralightEv1,
            TagTechnology::MifareClassic1K,
            TagTechnology::Iso15693,
            TagTechnology::Generic,
        ] {
            assert_eq!(technology.label().parse::<TagTechnology>().unwrap(), technology);
            let json = serde_json::to_string(&technology).unwrap();
            assert_eq!(json, format!("\"{}\"", technology.label()));
        }
        assert!("NTAG999".parse::<TagTechnology>().is_err());
    }

    #[test]
    fn test_cc_size_detection() {
        assert_eq!(TagTechnology::from_cc_size(0x3E), Some(TagTechnology::Ntag215));
        assert_eq!(TagTechnology::from_cc_size(0x00), None);
    }
}
