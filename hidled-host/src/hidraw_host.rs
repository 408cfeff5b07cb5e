//! hidraw host via hidapi
//!
//! Devices are the HID top-level collections hidapi reports, matched on their
//! usage page / usage pair. Without a report descriptor parser the element
//! model is fixed: a conforming keyboard exposes the five boot-protocol LEDs
//! (Num, Caps, Scroll, Compose, Kana), written as a one-byte output report
//! with report ID 0. Keyboards whose LED report carries a report ID are not
//! driven correctly by this backend; use evdev for those.

use std::collections::HashSet;
use std::ffi::CString;

use hidapi::{HidApi, HidDevice};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::HostError;
use crate::types::{DeviceId, ElementId, ElementInfo, HidValue, UsageFilter};
use crate::usage::{self, BOOT_KEYBOARD_LEDS, PAGE_GENERIC_DESKTOP, USAGE_GD_KEYBOARD};
use crate::HidHost;

/// Report ID used for the boot keyboard output report
const BOOT_REPORT_ID: u8 = 0x00;

struct HidrawDevice {
    path: CString,
    usage_page: u16,
    usage: u16,
    product: Option<String>,
    /// Opened lazily on first write
    handle: Option<HidDevice>,
    /// Last output report sent, one bit per boot LED
    led_bits: u8,
}

impl HidrawDevice {
    fn conforms(&self, usage_page: u16, usage: u16) -> bool {
        self.usage_page == usage_page && (usage == 0 || self.usage == usage)
    }

    fn is_keyboard(&self) -> bool {
        self.conforms(PAGE_GENERIC_DESKTOP, USAGE_GD_KEYBOARD)
    }
}

struct HidrawState {
    api: HidApi,
    devices: Vec<HidrawDevice>,
}

/// Host backed by hidapi
pub struct HidrawHost {
    state: Mutex<Option<HidrawState>>,
    device_filter: Mutex<Option<UsageFilter>>,
}

impl Default for HidrawHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HidrawHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(None),
            device_filter: Mutex::new(None),
        }
    }
}

/// Set or clear one LED bit in a boot keyboard output report
fn boot_report_with(bits: u8, bit: usize, on: bool) -> u8 {
    let mask = 1u8 << bit;
    if on {
        bits | mask
    } else {
        bits & !mask
    }
}

impl HidHost for HidrawHost {
    fn open(&self) -> Result<(), HostError> {
        let mut state = self.state.lock();
        if state.is_some() {
            return Ok(());
        }
        let api = HidApi::new().map_err(|e| HostError::Unavailable(e.to_string()))?;
        let devices: Vec<HidrawDevice> = api
            .device_list()
            .map(|info| HidrawDevice {
                path: info.path().to_owned(),
                usage_page: info.usage_page(),
                usage: info.usage(),
                product: info.product_string().map(|s| s.to_string()),
                handle: None,
                led_bits: 0,
            })
            .collect();
        info!("Found {} HID collections", devices.len());
        *state = Some(HidrawState { api, devices });
        Ok(())
    }

    fn close(&self) {
        self.state.lock().take();
    }

    fn set_device_filter(&self, filter: &UsageFilter) {
        *self.device_filter.lock() = Some(*filter);
    }

    fn copy_matched_devices(&self) -> Result<HashSet<DeviceId>, HostError> {
        let state = self.state.lock();
        let state = state
            .as_ref()
            .ok_or_else(|| HostError::Enumeration("host is not open".into()))?;
        let filter = *self.device_filter.lock();

        Ok(state
            .devices
            .iter()
            .enumerate()
            .filter(|(_, d)| filter.map_or(true, |f| f.matches(d.usage_page, d.usage)))
            .map(|(i, d)| {
                debug!(
                    "Matched {} usage {:04X}:{:04X}",
                    d.path.to_string_lossy(),
                    d.usage_page,
                    d.usage
                );
                DeviceId(i)
            })
            .collect())
    }

    fn release_devices(&self, _devices: &HashSet<DeviceId>) {}

    fn conforms(&self, device: DeviceId, usage_page: u16, usage: u16) -> bool {
        self.state
            .lock()
            .as_ref()
            .and_then(|s| s.devices.get(device.0))
            .is_some_and(|d| d.conforms(usage_page, usage))
    }

    fn device_name(&self, device: DeviceId) -> Option<String> {
        self.state
            .lock()
            .as_ref()
            .and_then(|s| s.devices.get(device.0))
            .and_then(|d| d.product.clone())
    }

    fn copy_matched_elements(
        &self,
        device: DeviceId,
        filter: &UsageFilter,
    ) -> Result<Vec<ElementId>, HostError> {
        let state = self.state.lock();
        let dev = state
            .as_ref()
            .and_then(|s| s.devices.get(device.0))
            .ok_or(HostError::UnknownDevice(device.0))?;

        if !dev.is_keyboard() {
            return Ok(Vec::new());
        }
        Ok(BOOT_KEYBOARD_LEDS
            .iter()
            .enumerate()
            .filter(|&(_, &led)| filter.matches(usage::PAGE_LEDS, led))
            .map(|(i, _)| ElementId(i))
            .collect())
    }

    fn release_elements(&self, _device: DeviceId, _elements: &[ElementId]) {}

    fn element_info(
        &self,
        device: DeviceId,
        element: ElementId,
    ) -> Result<ElementInfo, HostError> {
        BOOT_KEYBOARD_LEDS
            .get(element.0)
            .map(|&led| ElementInfo::binary_led(led))
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
        if element.0 >= BOOT_KEYBOARD_LEDS.len() {
            return Err(HostError::UnknownElement {
                device: device.0,
                element: element.0,
            });
        }

        let mut guard = self.state.lock();
        let HidrawState { api, devices } = guard
            .as_mut()
            .ok_or_else(|| HostError::Write("host is not open".into()))?;
        let dev = devices
            .get_mut(device.0)
            .ok_or(HostError::UnknownDevice(device.0))?;

        if dev.handle.is_none() {
            dev.handle = Some(api.open_path(&dev.path)?);
        }
        let bits = boot_report_with(dev.led_bits, element.0, value.value != 0);
        if let Some(handle) = dev.handle.as_ref() {
            handle.write(&[BOOT_REPORT_ID, bits])?;
        }
        dev.led_bits = bits;

        debug!(
            "{}: boot LED report = {:#04x}",
            dev.path.to_string_lossy(),
            bits
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_report_sets_and_clears_bits() {
        let bits = boot_report_with(0, 1, true);
        assert_eq!(bits, 0b0000_0010);
        let bits = boot_report_with(bits, 0, true);
        assert_eq!(bits, 0b0000_0011);
        let bits = boot_report_with(bits, 1, false);
        assert_eq!(bits, 0b0000_0001);
    }

    #[test]
    fn test_sequential_writes_compose() {
        // Num on, Caps off, Scroll on: each write keeps the earlier bits
        let bits = [(0, true), (1, false), (2, true)]
            .iter()
            .fold(0u8, |bits, &(bit, on)| boot_report_with(bits, bit, on));
        assert_eq!(bits, 0b0000_0101);
    }

    #[test]
    fn test_element_info_is_boot_led() {
        let host = HidrawHost::new();
        let info = host.element_info(DeviceId(0), ElementId(1)).unwrap();
        assert_eq!(info, ElementInfo::binary_led(usage::led::CAPS_LOCK));
        assert!(host.element_info(DeviceId(0), ElementId(5)).is_err());
    }

    #[test]
    #[ignore] // Requires hidraw access (run with: cargo test -- --ignored)
    fn test_open_real_api() {
        let host = HidrawHost::new();
        host.open().unwrap();
        let _ = host.copy_matched_devices().unwrap();
        host.close();
    }
}
