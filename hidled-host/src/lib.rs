//! HID host abstraction for keyboard LED control
//!
//! This crate provides a unified interface for finding keyboards and writing
//! to their LED elements across different host backends:
//!
//! - evdev (Linux input subsystem, `EV_LED` events)
//! - hidraw (hidapi, boot-protocol keyboard output report)
//! - mock (in-memory, records every call, for tests)

pub mod error;
pub mod mock;
pub mod types;
pub mod usage;

#[cfg(all(feature = "evdev", target_os = "linux"))]
mod evdev_host;
#[cfg(feature = "hidraw")]
mod hidraw_host;

pub use error::HostError;
pub use mock::{MockDevice, MockHost, WriteRecord};
pub use types::{DeviceId, ElementId, ElementInfo, HidValue, MatchScope, UsageFilter};

#[cfg(all(feature = "evdev", target_os = "linux"))]
pub use evdev_host::EvdevHost;
#[cfg(feature = "hidraw")]
pub use hidraw_host::HidrawHost;

use std::collections::HashSet;

/// The core host trait - all backends implement this
///
/// Handles returned by the host stay owned by it. Callers hold them only
/// between the copy call that produced them and the matching release call.
/// Every method blocks until the host has answered.
pub trait HidHost {
    /// Open a connection to the host
    ///
    /// Opening an already open host is not an error.
    fn open(&self) -> Result<(), HostError>;

    /// Close the connection opened by [`HidHost::open`]
    fn close(&self);

    /// Set the criterion used by [`HidHost::copy_matched_devices`]
    fn set_device_filter(&self, filter: &UsageFilter);

    /// Copy out the set of devices matching the current device filter
    fn copy_matched_devices(&self) -> Result<HashSet<DeviceId>, HostError>;

    /// Release device handles obtained from [`HidHost::copy_matched_devices`]
    fn release_devices(&self, devices: &HashSet<DeviceId>);

    /// Check whether a device conforms to a usage page / usage pair
    ///
    /// A `usage` of 0 checks the usage page only.
    fn conforms(&self, device: DeviceId, usage_page: u16, usage: u16) -> bool;

    /// Product name, when the host knows one
    fn device_name(&self, _device: DeviceId) -> Option<String> {
        None
    }

    /// Copy out the elements of a device matching `filter`, in device order
    fn copy_matched_elements(
        &self,
        device: DeviceId,
        filter: &UsageFilter,
    ) -> Result<Vec<ElementId>, HostError>;

    /// Release element handles obtained from [`HidHost::copy_matched_elements`]
    fn release_elements(&self, device: DeviceId, elements: &[ElementId]);

    /// Usage and logical range of an element
    fn element_info(&self, device: DeviceId, element: ElementId)
        -> Result<ElementInfo, HostError>;

    /// Submit a value for one element of a device
    fn write_value(
        &self,
        device: DeviceId,
        element: ElementId,
        value: HidValue,
    ) -> Result<(), HostError>;
}

/// Type alias for a boxed host
pub type BoxedHost = Box<dyn HidHost>;

impl<H: HidHost + ?Sized> HidHost for Box<H> {
    fn open(&self) -> Result<(), HostError> {
        (**self).open()
    }

    fn close(&self) {
        (**self).close()
    }

    fn set_device_filter(&self, filter: &UsageFilter) {
        (**self).set_device_filter(filter)
    }

    fn copy_matched_devices(&self) -> Result<HashSet<DeviceId>, HostError> {
        (**self).copy_matched_devices()
    }

    fn release_devices(&self, devices: &HashSet<DeviceId>) {
        (**self).release_devices(devices)
    }

    fn conforms(&self, device: DeviceId, usage_page: u16, usage: u16) -> bool {
        (**self).conforms(device, usage_page, usage)
    }

    fn device_name(&self, device: DeviceId) -> Option<String> {
        (**self).device_name(device)
    }

    fn copy_matched_elements(
        &self,
        device: DeviceId,
        filter: &UsageFilter,
    ) -> Result<Vec<ElementId>, HostError> {
        (**self).copy_matched_elements(device, filter)
    }

    fn release_elements(&self, device: DeviceId, elements: &[ElementId]) {
        (**self).release_elements(device, elements)
    }

    fn element_info(
        &self,
        device: DeviceId,
        element: ElementId,
    ) -> Result<ElementInfo, HostError> {
        (**self).element_info(device, element)
    }

    fn write_value(
        &self,
        device: DeviceId,
        element: ElementId,
        value: HidValue,
    ) -> Result<(), HostError> {
        (**self).write_value(device, element, value)
    }
}
