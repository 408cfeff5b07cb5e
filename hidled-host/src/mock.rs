//! In-memory host for tests
//!
//! Devices and their elements are declared up front. Failures can be scripted
//! per call site, and every acquire, release and write is recorded so tests
//! can inspect what the caller did instead of relying on return values.

use std::collections::HashSet;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::HostError;
use crate::types::{DeviceId, ElementId, ElementInfo, HidValue, UsageFilter};
use crate::usage::{PAGE_GENERIC_DESKTOP, USAGE_GD_KEYBOARD};
use crate::HidHost;

/// A simulated device
#[derive(Debug, Clone)]
pub struct MockDevice {
    name: String,
    /// Usage pairs the device conforms to
    usages: Vec<(u16, u16)>,
    elements: Vec<ElementInfo>,
    fail_element_query: bool,
    /// Element indices whose writes are rejected
    failing_writes: Vec<usize>,
    /// Element indices whose properties cannot be read
    unreadable: Vec<usize>,
}

impl MockDevice {
    /// Device with no usages at all
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            usages: Vec::new(),
            elements: Vec::new(),
            fail_element_query: false,
            failing_writes: Vec::new(),
            unreadable: Vec::new(),
        }
    }

    /// Device conforming to Generic Desktop / Keyboard
    pub fn keyboard(name: &str) -> Self {
        Self::new(name).with_usage(PAGE_GENERIC_DESKTOP, USAGE_GD_KEYBOARD)
    }

    pub fn with_usage(mut self, usage_page: u16, usage: u16) -> Self {
        self.usages.push((usage_page, usage));
        self
    }

    pub fn with_element(mut self, info: ElementInfo) -> Self {
        self.elements.push(info);
        self
    }

    /// Add a binary LED element
    pub fn with_led(self, usage: u16) -> Self {
        self.with_element(ElementInfo::binary_led(usage))
    }

    /// Make element queries on this device fail
    pub fn failing_element_query(mut self) -> Self {
        self.fail_element_query = true;
        self
    }

    /// Make writes to the element at `index` fail
    pub fn failing_write(mut self, index: usize) -> Self {
        self.failing_writes.push(index);
        self
    }

    /// Make the properties of the element at `index` unreadable
    pub fn unreadable_element(mut self, index: usize) -> Self {
        self.unreadable.push(index);
        self
    }

    fn conforms(&self, usage_page: u16, usage: u16) -> bool {
        self.usages
            .iter()
            .any(|&(p, u)| p == usage_page && (usage == 0 || u == usage))
    }

    fn matches(&self, filter: &UsageFilter) -> bool {
        filter.is_unconstrained() || self.usages.iter().any(|&(p, u)| filter.matches(p, u))
    }
}

/// One write as seen by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRecord {
    pub device: DeviceId,
    pub element: ElementId,
    pub value: HidValue,
}

#[derive(Debug, Default)]
struct MockState {
    open: bool,
    opens: usize,
    closes: usize,
    device_filter: Option<UsageFilter>,
    device_sets_acquired: usize,
    device_sets_released: usize,
    element_sets_acquired: usize,
    element_sets_released: usize,
    element_queries: Vec<DeviceId>,
    writes: Vec<WriteRecord>,
}

/// Host that serves declared devices from memory
pub struct MockHost {
    devices: Vec<MockDevice>,
    fail_open: bool,
    fail_enumeration: bool,
    apply_device_filter: bool,
    state: Mutex<MockState>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            fail_open: false,
            fail_enumeration: false,
            apply_device_filter: true,
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn with_device(mut self, device: MockDevice) -> Self {
        self.devices.push(device);
        self
    }

    /// Make [`HidHost::open`] fail
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Make [`HidHost::copy_matched_devices`] fail
    pub fn failing_enumeration(mut self) -> Self {
        self.fail_enumeration = true;
        self
    }

    /// Report every declared device regardless of the device filter
    ///
    /// Simulates a host whose matching is coarser than a conformance check.
    pub fn report_all_devices(mut self) -> Self {
        self.apply_device_filter = false;
        self
    }

    pub fn opens(&self) -> usize {
        self.state.lock().opens
    }

    pub fn closes(&self) -> usize {
        self.state.lock().closes
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    pub fn device_filter(&self) -> Option<UsageFilter> {
        self.state.lock().device_filter
    }

    /// (acquired, released) device sets
    pub fn device_set_counts(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.device_sets_acquired, state.device_sets_released)
    }

    /// (acquired, released) element sets
    pub fn element_set_counts(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.element_sets_acquired, state.element_sets_released)
    }

    /// Devices that had their elements queried, in call order
    pub fn element_queries(&self) -> Vec<DeviceId> {
        self.state.lock().element_queries.clone()
    }

    /// All writes in submission order
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state.lock().writes.clone()
    }

    /// Writes submitted to one device
    pub fn writes_to(&self, device: DeviceId) -> Vec<WriteRecord> {
        self.state
            .lock()
            .writes
            .iter()
            .filter(|w| w.device == device)
            .copied()
            .collect()
    }

    /// Everything acquired has been released exactly once
    pub fn is_balanced(&self) -> bool {
        let state = self.state.lock();
        state.opens == state.closes
            && state.device_sets_acquired == state.device_sets_released
            && state.element_sets_acquired == state.element_sets_released
    }

    fn device(&self, id: DeviceId) -> Result<&MockDevice, HostError> {
        self.devices.get(id.0).ok_or(HostError::UnknownDevice(id.0))
    }
}

impl HidHost for MockHost {
    fn open(&self) -> Result<(), HostError> {
        if self.fail_open {
            return Err(HostError::Unavailable("mock host refused to open".into()));
        }
        let mut state = self.state.lock();
        if !state.open {
            state.open = true;
            state.opens += 1;
        }
        Ok(())
    }

    fn close(&self) {
        // Every call counts, so a second close shows up as unbalanced
        let mut state = self.state.lock();
        state.open = false;
        state.closes += 1;
    }

    fn set_device_filter(&self, filter: &UsageFilter) {
        self.state.lock().device_filter = Some(*filter);
    }

    fn copy_matched_devices(&self) -> Result<HashSet<DeviceId>, HostError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(HostError::Unavailable("mock host is not open".into()));
        }
        if self.fail_enumeration {
            return Err(HostError::Enumeration("mock enumeration failure".into()));
        }

        let filter = state.device_filter;
        let devices = self
            .devices
            .iter()
            .enumerate()
            .filter(|(_, d)| match (self.apply_device_filter, filter) {
                (true, Some(f)) => d.matches(&f),
                _ => true,
            })
            .map(|(i, _)| DeviceId(i))
            .collect::<HashSet<_>>();

        state.device_sets_acquired += 1;
        debug!("Mock host matched {} devices", devices.len());
        Ok(devices)
    }

    fn release_devices(&self, _devices: &HashSet<DeviceId>) {
        self.state.lock().device_sets_released += 1;
    }

    fn conforms(&self, device: DeviceId, usage_page: u16, usage: u16) -> bool {
        self.device(device)
            .map(|d| d.conforms(usage_page, usage))
            .unwrap_or(false)
    }

    fn device_name(&self, device: DeviceId) -> Option<String> {
        self.device(device).ok().map(|d| d.name.clone())
    }

    fn copy_matched_elements(
        &self,
        device: DeviceId,
        filter: &UsageFilter,
    ) -> Result<Vec<ElementId>, HostError> {
        let dev = self.device(device)?;
        let mut state = self.state.lock();
        state.element_queries.push(device);
        if dev.fail_element_query {
            return Err(HostError::ElementQuery(format!(
                "mock element query failure on {}",
                dev.name
            )));
        }

        // Unreadable elements are always reported so the caller sees them
        let elements = dev
            .elements
            .iter()
            .enumerate()
            .filter(|(i, e)| dev.unreadable.contains(i) || filter.matches(e.usage_page, e.usage))
            .map(|(i, _)| ElementId(i))
            .collect();

        state.element_sets_acquired += 1;
        Ok(elements)
    }

    fn release_elements(&self, _device: DeviceId, _elements: &[ElementId]) {
        self.state.lock().element_sets_released += 1;
    }

    fn element_info(
        &self,
        device: DeviceId,
        element: ElementId,
    ) -> Result<ElementInfo, HostError> {
        let dev = self.device(device)?;
        if dev.unreadable.contains(&element.0) {
            return Err(HostError::UnknownElement {
                device: device.0,
                element: element.0,
            });
        }
        dev.elements
            .get(element.0)
            .copied()
            .ok_or(HostError::UnknownElement {
                device: device.0,
                element: element.0,
            })
    }

    fn write_value(
        &self,
        device: DeviceId,
        element: ElementId,
        value: HidValue,
    ) -> Result<(), HostError> {
        let dev = self.device(device)?;
        if element.0 >= dev.elements.len() {
            return Err(HostError::UnknownElement {
                device: device.0,
                element: element.0,
            });
        }
        if dev.failing_writes.contains(&element.0) {
            return Err(HostError::Write(format!(
                "mock write rejected for {} {}",
                dev.name, element
            )));
        }
        self.state.lock().writes.push(WriteRecord {
            device,
            element,
            value,
        });
        Ok(())
    }
}
