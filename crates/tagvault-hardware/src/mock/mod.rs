//! Mock tag access for testing and development.
//!
//! The reader is driven programmatically through its handle: present and
//! remove tags, inject faults, and inspect how the radio was used.

pub mod reader;

pub use reader::{MockReader, MockReaderHandle, MockTag};
