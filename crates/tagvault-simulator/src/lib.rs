//! Simulated tag backend for TagVault.
//!
//! [`TagSimulator`] implements the same [`TagBackend`] surface as the
//! hardware-backed security service, against an in-memory registry of
//! named fixtures. Fixture management (`select_tag`, `reset_tags`,
//! `add_tag`, `available_tag_ids`) exists for test setup only.
//!
//! Page-addressable fixtures (NTAG21x, Ultralight EV1) lock with the
//! hardware model: a locked flag and a stored password. Other fixtures get
//! the real software lock envelope.
//!
//! [`TagBackend`]: tagvault_hardware::TagBackend

pub mod config;
pub mod fixtures;
pub mod simulator;

pub use config::SimulatorConfig;
pub use fixtures::{
    DEVICE_TAG, EMPTY_TAG, LOCKED_TAG, LOCKED_TAG_PASSWORD, READ_ONLY_TAG, TagFixture,
    default_fixtures,
};
pub use simulator::TagSimulator;
