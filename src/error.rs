//! LED driver error types

use hidled_host::{DeviceId, ElementId, HostError};
use thiserror::Error;

/// Errors from one enumerate-and-write pass
///
/// `Allocation`, `HostUnavailable` and `Enumeration` abort the pass. The
/// remaining kinds are confined to one device or one element.
#[derive(Error, Debug)]
pub enum LedError {
    /// A filter, collection or value could not be constructed
    #[error("Allocation failure: {0}")]
    Allocation(String),

    /// The HID host could not be created or opened
    #[error("HID host unavailable: {0}")]
    HostUnavailable(#[source] HostError),

    /// The matched device set could not be retrieved
    #[error("Device enumeration failed: {0}")]
    Enumeration(#[source] HostError),

    /// LED elements could not be retrieved for one device
    #[error("Element query failed on {device}: {source}")]
    ElementQuery {
        device: DeviceId,
        #[source]
        source: HostError,
    },

    /// An element reports a logical range with max below min
    #[error("Malformed element: logical max {max} is below logical min {min}")]
    MalformedElement { min: i32, max: i32 },

    /// The host rejected a value for one element
    #[error("Write to {element} on {device} failed: {source}")]
    Write {
        device: DeviceId,
        element: ElementId,
        #[source]
        source: HostError,
    },
}

impl LedError {
    /// Whether this error ends the whole pass
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Allocation(_) | Self::HostUnavailable(_) | Self::Enumeration(_)
        )
    }
}
