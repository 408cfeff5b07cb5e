//! Host error types

use thiserror::Error;

/// Errors reported by a HID host backend
#[derive(Error, Debug)]
pub enum HostError {
    #[error("HID host unavailable: {0}")]
    Unavailable(String),

    #[error("Device enumeration failed: {0}")]
    Enumeration(String),

    #[error("Element query failed: {0}")]
    ElementQuery(String),

    #[error("Value write rejected: {0}")]
    Write(String),

    #[error("Unknown device handle {0}")]
    UnknownDevice(usize),

    #[error("Unknown element handle {element} on device {device}")]
    UnknownElement { device: usize, element: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // HID-specific errors
    #[error("HID error: {0}")]
    Hid(String),

    #[error("HID permission denied: {0}")]
    HidPermissionDenied(String),
}

#[cfg(feature = "hidraw")]
impl From<hidapi::HidError> for HostError {
    fn from(e: hidapi::HidError) -> Self {
        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("EPERM") {
            HostError::HidPermissionDenied(msg)
        } else {
            HostError::Hid(msg)
        }
    }
}
