//! evdev host for the Linux input subsystem
//!
//! Keyboards are the `/dev/input/event*` nodes that report the letter keys
//! and Enter. Their LED elements are the `EV_LED` codes the kernel lists for
//! the node, each an on/off indicator translated back to its HID LED usage.
//! Writing LED state needs write access to the event node (root, or the
//! `input` group on most distributions).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use evdev::{Device, EventType, InputEvent, Key, Synchronization};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::HostError;
use crate::types::{DeviceId, ElementId, ElementInfo, HidValue, UsageFilter};
use crate::usage::{self, PAGE_GENERIC_DESKTOP, PAGE_LEDS, USAGE_GD_KEYBOARD};
use crate::HidHost;

/// Directory holding the event nodes
const INPUT_DIR: &str = "/dev/input";

/// One LED on an event node
struct EvdevLed {
    /// Linux `LED_*` code
    code: u16,
    info: ElementInfo,
}

struct EvdevDevice {
    path: PathBuf,
    name: Option<String>,
    is_keyboard: bool,
    leds: Vec<EvdevLed>,
    device: Device,
}

impl EvdevDevice {
    fn probe(path: PathBuf, device: Device) -> Self {
        let is_keyboard = device.supported_keys().is_some_and(|keys| {
            keys.contains(Key::KEY_A) && keys.contains(Key::KEY_Z) && keys.contains(Key::KEY_ENTER)
        });

        let mut leds = Vec::new();
        if let Some(supported) = device.supported_leds() {
            for led in supported.iter() {
                match usage::led_usage_for_linux_code(led.0) {
                    Some(hid_usage) => leds.push(EvdevLed {
                        code: led.0,
                        info: ElementInfo::binary_led(hid_usage),
                    }),
                    None => debug!("{}: no HID usage for LED code {}", path.display(), led.0),
                }
            }
        }

        Self {
            name: device.name().map(str::to_string),
            path,
            is_keyboard,
            leds,
            device,
        }
    }

    fn conforms(&self, usage_page: u16, usage: u16) -> bool {
        match (usage_page, usage) {
            (PAGE_GENERIC_DESKTOP, 0) | (PAGE_GENERIC_DESKTOP, USAGE_GD_KEYBOARD) => {
                self.is_keyboard
            }
            (PAGE_LEDS, _) => !self.leds.is_empty(),
            _ => false,
        }
    }
}

/// Host backed by evdev event nodes
pub struct EvdevHost {
    input_dir: PathBuf,
    devices: Mutex<Option<Vec<EvdevDevice>>>,
    device_filter: Mutex<Option<UsageFilter>>,
}

impl Default for EvdevHost {
    fn default() -> Self {
        Self::new()
    }
}

impl EvdevHost {
    pub fn new() -> Self {
        Self::with_input_dir(INPUT_DIR)
    }

    /// Use a different event node directory
    pub fn with_input_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            input_dir: dir.as_ref().to_path_buf(),
            devices: Mutex::new(None),
            device_filter: Mutex::new(None),
        }
    }

    fn scan(&self) -> Result<Vec<EvdevDevice>, HostError> {
        let entries = std::fs::read_dir(&self.input_dir).map_err(|e| {
            HostError::Unavailable(format!("{}: {}", self.input_dir.display(), e))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("event"))
            })
            .collect();
        paths.sort();

        let mut devices = Vec::with_capacity(paths.len());
        for path in paths {
            match Device::open(&path) {
                Ok(device) => devices.push(EvdevDevice::probe(path, device)),
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }
        Ok(devices)
    }
}

impl HidHost for EvdevHost {
    fn open(&self) -> Result<(), HostError> {
        let mut devices = self.devices.lock();
        if devices.is_some() {
            return Ok(());
        }
        let scanned = self.scan()?;
        if scanned.is_empty() {
            warn!(
                "No readable event nodes under {} (missing permissions?)",
                self.input_dir.display()
            );
        }
        info!("Opened {} event nodes", scanned.len());
        *devices = Some(scanned);
        Ok(())
    }

    fn close(&self) {
        // Dropping the devices closes their file descriptors
        self.devices.lock().take();
    }

    fn set_device_filter(&self, filter: &UsageFilter) {
        *self.device_filter.lock() = Some(*filter);
    }

    fn copy_matched_devices(&self) -> Result<HashSet<DeviceId>, HostError> {
        let devices = self.devices.lock();
        let devices = devices
            .as_ref()
            .ok_or_else(|| HostError::Enumeration("host is not open".into()))?;
        let criterion = self
            .device_filter
            .lock()
            .and_then(|f| f.usage_page().map(|page| (page, f.usage().unwrap_or(0))));

        let matched = devices
            .iter()
            .enumerate()
            .filter(|(_, d)| criterion.map_or(true, |(page, usage)| d.conforms(page, usage)))
            .map(|(i, d)| {
                debug!("Matched {} ({})", d.path.display(), d.name.as_deref().unwrap_or("?"));
                DeviceId(i)
            })
            .collect();
        Ok(matched)
    }

    fn release_devices(&self, _devices: &HashSet<DeviceId>) {
        // Handles are indices into the scan; the nodes stay open until close()
    }

    fn conforms(&self, device: DeviceId, usage_page: u16, usage: u16) -> bool {
        self.devices
            .lock()
            .as_ref()
            .and_then(|devices| devices.get(device.0))
            .is_some_and(|d| d.conforms(usage_page, usage))
    }

    fn device_name(&self, device: DeviceId) -> Option<String> {
        self.devices
            .lock()
            .as_ref()
            .and_then(|devices| devices.get(device.0))
            .and_then(|d| d.name.clone())
    }

    fn copy_matched_elements(
        &self,
        device: DeviceId,
        filter: &UsageFilter,
    ) -> Result<Vec<ElementId>, HostError> {
        let devices = self.devices.lock();
        let dev = devices
            .as_ref()
            .and_then(|devices| devices.get(device.0))
            .ok_or(HostError::UnknownDevice(device.0))?;

        Ok(dev
            .leds
            .iter()
            .enumerate()
            .filter(|(_, led)| filter.matches(led.info.usage_page, led.info.usage))
            .map(|(i, _)| ElementId(i))
            .collect())
    }

    fn release_elements(&self, _device: DeviceId, _elements: &[ElementId]) {}

    fn element_info(
        &self,
        device: DeviceId,
        element: ElementId,
    ) -> Result<ElementInfo, HostError> {
        let devices = self.devices.lock();
        devices
            .as_ref()
            .and_then(|devices| devices.get(device.0))
            .and_then(|d| d.leds.get(element.0))
            .map(|led| led.info)
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
        let mut devices = self.devices.lock();
        let dev = devices
            .as_mut()
            .and_then(|devices| devices.get_mut(device.0))
            .ok_or(HostError::UnknownDevice(device.0))?;
        let (code, led_usage) = dev
            .leds
            .get(element.0)
            .map(|led| (led.code, led.info.usage))
            .ok_or(HostError::UnknownElement {
                device: device.0,
                element: element.0,
            })?;

        // The kernel stamps events itself, so value.timestamp is not forwarded
        let events = [
            InputEvent::new(EventType::LED, code, value.value),
            InputEvent::new(
                EventType::SYNCHRONIZATION,
                Synchronization::SYN_REPORT.0,
                0,
            ),
        ];
        dev.device
            .send_events(&events)
            .map_err(|e| HostError::Write(format!("{}: {}", dev.path.display(), e)))?;

        debug!(
            "{}: LED {} ({}) = {}",
            dev.path.display(),
            code,
            usage::led_name(led_usage),
            value.value
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_dir_is_unavailable() {
        let host = EvdevHost::with_input_dir("/nonexistent/hidled-input");
        assert!(matches!(host.open(), Err(HostError::Unavailable(_))));
    }

    #[test]
    fn test_enumeration_before_open_fails() {
        let host = EvdevHost::new();
        assert!(matches!(
            host.copy_matched_devices(),
            Err(HostError::Enumeration(_))
        ));
    }

    #[test]
    #[ignore] // Requires readable /dev/input (run with: cargo test -- --ignored)
    fn test_scan_real_devices() {
        let host = EvdevHost::new();
        host.open().unwrap();
        host.set_device_filter(&UsageFilter::page_usage(
            crate::MatchScope::Device,
            PAGE_GENERIC_DESKTOP,
            USAGE_GD_KEYBOARD,
        ));
        let devices = host.copy_matched_devices().unwrap();
        for id in devices {
            assert!(host.conforms(id, PAGE_GENERIC_DESKTOP, USAGE_GD_KEYBOARD));
        }
        host.close();
    }
}
