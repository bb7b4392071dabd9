//! Tag operations with password protection.
//!
//! [`SecurityService`] runs read, write, format, lock and unlock against a
//! real radio. Locking tries chip password protection first and falls back to
//! an encrypted software envelope when the chip or the radio cannot do it.
//! [`AnyTagBackend`] picks between the service and the
//! [`TagSimulator`](tagvault_simulator::TagSimulator) from configuration.

pub mod backend;
pub mod config;
pub mod error;
mod retry;
pub mod service;
pub mod session;
pub mod strategy;

pub use backend::AnyTagBackend;
pub use config::{Platform, RetryPolicy, SecurityConfig, TagVaultConfig};
pub use error::map_hardware_error;
pub use service::SecurityService;
pub use session::TagSession;
pub use strategy::{LockStrategy, StrategyOutcome};
