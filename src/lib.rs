//! Keyboard LED control through the host HID subsystem
//!
//! Enumerates keyboards, discovers their LED elements and writes one pattern
//! across them, each LED taking a digit of the pattern in its own base.

pub mod discovery;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod matcher;
pub mod report;

pub use discovery::{DeviceSet, ElementSet, HostSession, LedElement};
pub use driver::{pattern_for_args, Driver, PATTERN_ALL_OFF, PATTERN_ALL_ON};
pub use encoder::{encode_values, ElementRange};
pub use error::LedError;
pub use matcher::build_filter;
pub use report::{DeviceOutcome, LedWrite, OutcomeKind, RunReport};
