//! Simulated tag fixtures and the default registry.

use serde::{Deserialize, Serialize};
use tagvault_hardware::TagTechnology;

pub const EMPTY_TAG: &str = "EMPTY_TAG";
pub const DEVICE_TAG: &str = "DEVICE_TAG";
pub const LOCKED_TAG: &str = "LOCKED_TAG";
pub const READ_ONLY_TAG: &str = "READ_ONLY_TAG";

/// Password of the pre-locked default fixture.
pub const LOCKED_TAG_PASSWORD: &str = "1234";

/// Capacity for technologies without a fixed user memory size.
const DEFAULT_MAX_SIZE: usize = 512;

const DEVICE_PAYLOAD: &str = r#"{"deviceId":"DEV-0001","name":"Lobby Sensor","type":"sensor","location":"Building A, Floor 1"}"#;
const LOCKED_PAYLOAD: &str = r#"{"deviceId":"DEV-0042","name":"Server Room Controller","type":"controller"}"#;
const READ_ONLY_PAYLOAD: &str = r#"{"type":"info","message":"Factory programmed tag"}"#;

/// A named simulated tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagFixture {
    pub id: String,

    #[serde(rename = "type")]
    pub technology: TagTechnology,

    /// Capacity in bytes of the compact JSON payload.
    pub max_size: usize,

    pub writable: bool,

    /// Hardware lock flag (page-addressable technologies only).
    #[serde(default)]
    pub locked: bool,

    /// Lock password: the chip password while `locked`, or the password a
    /// software envelope was sealed under. Hardware checks compare only the
    /// first four bytes.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Stored text; `None` for a blank tag.
    #[serde(default)]
    pub content: Option<String>,
}

impl TagFixture {
    /// A blank, writable, unlocked fixture sized for its technology.
    pub fn new(id: impl Into<String>, technology: TagTechnology) -> Self {
        Self {
            id: id.into(),
            technology,
            max_size: technology.user_memory().unwrap_or(DEFAULT_MAX_SIZE),
            writable: true,
            locked: false,
            password: None,
            content: None,
        }
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Mark the fixture as hardware locked under `password`.
    pub fn locked_with(mut self, password: impl Into<String>) -> Self {
        self.locked = true;
        self.password = Some(password.into());
        self
    }

    /// Stored text, with an empty string treated as blank.
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }

    /// Whether the fixture locks with the hardware model.
    pub fn uses_hardware_lock(&self) -> bool {
        self.technology.is_page_addressable()
    }
}

/// The default registry, in registry order.
pub fn default_fixtures() -> Vec<TagFixture> {
    vec![
        TagFixture::new(EMPTY_TAG, TagTechnology::Ntag215),
        TagFixture::new(DEVICE_TAG, TagTechnology::Ntag215).with_content(DEVICE_PAYLOAD),
        TagFixture::new(LOCKED_TAG, TagTechnology::Ntag216)
            .with_content(LOCKED_PAYLOAD)
            .locked_with(LOCKED_TAG_PASSWORD),
        TagFixture::new(READ_ONLY_TAG, TagTechnology::Ntag213)
            .with_content(READ_ONLY_PAYLOAD)
            .read_only(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let fixtures = default_fixtures();
        let ids: Vec<_> = fixtures.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec![EMPTY_TAG, DEVICE_TAG, LOCKED_TAG, READ_ONLY_TAG]);

        assert_eq!(fixtures[0].max_size, 504);
        assert_eq!(fixtures[0].text(), None);
        assert!(fixtures[2].locked);
        assert_eq!(fixtures[2].max_size, 888);
        assert!(!fixtures[3].writable);
        assert_eq!(fixtures[3].max_size, 144);
    }

    #[test]
    fn test_default_payloads_are_json() {
        for fixture in default_fixtures() {
            if let Some(text) = fixture.text() {
                serde_json::from_str::<serde_json::Value>(text).unwrap();
                assert!(text.len() <= fixture.max_size);
            }
        }
    }

    #[test]
    fn test_fixture_json_hides_password() {
        let fixture = TagFixture::new("X", TagTechnology::Ntag213).locked_with("9999");
        let json = serde_json::to_value(&fixture).unwrap();
        assert_eq!(json["type"], "NTAG213");
        assert_eq!(json["maxSize"], 144);
        assert!(json.get("password").is_none());
    }

    #[test]
    fn test_empty_content_is_blank() {
        let fixture = TagFixture::new("X", TagTechnology::Generic).with_content("");
        assert_eq!(fixture.text(), None);
        assert_eq!(fixture.max_size, 512);
        assert!(!fixture.uses_hardware_lock());
    }
}
