//! One enumerate-and-write pass over the host's keyboards
//!
//! The pass is strictly sequential: devices in enumeration order, elements in
//! discovery order, one blocking host call at a time. There is no timeout; a
//! host call that never returns blocks the pass.

use hidled_host::{DeviceId, HidHost, HidValue, UsageFilter};
use tracing::{debug, info, warn};

use crate::discovery::{self, HostSession, LedElement};
use crate::encoder::{self, ElementRange};
use crate::error::LedError;
use crate::matcher;
use crate::report::{DeviceOutcome, OutcomeKind, RunReport};

/// Pattern used when the tool is run without arguments
pub const PATTERN_ALL_ON: u64 = 0xFF;

/// Pattern used when the tool is run with any argument
pub const PATTERN_ALL_OFF: u64 = 0x00;

/// Pattern selected by the number of positional arguments
pub fn pattern_for_args(count: usize) -> u64 {
    if count == 0 {
        PATTERN_ALL_ON
    } else {
        PATTERN_ALL_OFF
    }
}

/// Drives the LEDs of every keyboard on a host to one pattern
pub struct Driver<'h, H: HidHost + ?Sized> {
    host: &'h H,
    pattern: u64,
}

impl<'h, H: HidHost + ?Sized> Driver<'h, H> {
    pub fn new(host: &'h H, pattern: u64) -> Self {
        Self { host, pattern }
    }

    /// Run one pass
    ///
    /// `Err` means the pass was aborted during setup and no device was
    /// touched. Per-device and per-element failures are logged and counted in
    /// the report instead. Either way, everything acquired from the host has
    /// been released when this returns.
    pub fn run(&self) -> Result<RunReport, LedError> {
        let device_filter = matcher::keyboard_filter()?;
        let session = HostSession::open(self.host)?;
        let devices = discovery::enumerate_devices(&session, &device_filter)?;

        let mut report = RunReport::new(self.pattern);
        report.devices_enumerated = devices.len();
        if devices.is_empty() {
            info!("No keyboards found");
            return Ok(report);
        }

        let element_filter = matcher::led_filter()?;
        for &device in devices.iter() {
            let outcome = self.process_device(&session, device, &device_filter, &element_filter);
            report.record(outcome);
        }

        info!("{}", report);
        Ok(report)
    }

    fn process_device(
        &self,
        session: &HostSession<'h, H>,
        device: DeviceId,
        device_filter: &UsageFilter,
        element_filter: &UsageFilter,
    ) -> DeviceOutcome {
        let host = session.host();
        let name = host.device_name(device);
        let label = name.as_deref().unwrap_or("unnamed device");

        // Re-check against the enumeration criteria; a match-all filter has none
        let conforms = device_filter.usage_page().map_or(true, |page| {
            host.conforms(device, page, device_filter.usage().unwrap_or(0))
        });
        if !conforms {
            debug!("{device} ({label}): not a keyboard, skipping");
            return DeviceOutcome::new(device, name, OutcomeKind::NotKeyboard);
        }

        let elements = match discovery::discover_led_elements(session, device, element_filter) {
            Ok(elements) => elements,
            Err(e) => {
                warn!("{label}: {e}");
                return DeviceOutcome::new(device, name, OutcomeKind::ElementQueryFailed);
            }
        };
        if elements.is_empty() {
            debug!("{device} ({label}): no LED elements");
            return DeviceOutcome::new(device, name, OutcomeKind::NoLeds);
        }

        let mut outcome = DeviceOutcome::new(device, name, OutcomeKind::Written);

        // Malformed elements are dropped before encoding and take no digit
        let mut targets: Vec<&LedElement> = Vec::with_capacity(elements.len());
        let mut ranges = Vec::with_capacity(elements.len());
        for led in elements.leds() {
            match ElementRange::new(led.info.logical_min, led.info.logical_max) {
                Ok(range) => {
                    targets.push(led);
                    ranges.push(range);
                }
                Err(e) => {
                    warn!("{device} {}: {e}", led.id);
                    outcome.malformed_elements += 1;
                }
            }
        }

        let values = encoder::encode_values(self.pattern, &ranges);
        for (led, value) in targets.into_iter().zip(values) {
            match host.write_value(device, led.id, HidValue::immediate(value)) {
                Ok(()) => {
                    debug!("{device} {}: wrote {value}", led.id);
                    outcome.push_write(led.id.0, led.info.usage, value);
                }
                Err(source) => {
                    let err = LedError::Write {
                        device,
                        element: led.id,
                        source,
                    };
                    warn!("{err}");
                    outcome.failed_writes += 1;
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hidled_host::usage::led;
    use hidled_host::{ElementId, ElementInfo, MockDevice, MockHost};

    #[test]
    fn test_pattern_for_args() {
        assert_eq!(pattern_for_args(0), 0xFF);
        assert_eq!(pattern_for_args(1), 0x00);
        assert_eq!(pattern_for_args(4), 0x00);
    }

    #[test]
    fn test_all_on_lights_every_lock_led() {
        let host = MockHost::new().with_device(
            MockDevice::keyboard("kbd")
                .with_led(led::NUM_LOCK)
                .with_led(led::CAPS_LOCK)
                .with_led(led::SCROLL_LOCK),
        );
        let report = Driver::new(&host, PATTERN_ALL_ON).run().unwrap();
        let values: Vec<_> = host.writes().iter().map(|w| w.value.value).collect();
        assert_eq!(values, vec![1, 1, 1]);
        assert_eq!(report.leds_written, 3);
        assert!(host.is_balanced());
    }

    #[test]
    fn test_writes_follow_discovery_order() {
        let host = MockHost::new().with_device(
            MockDevice::keyboard("kbd")
                .with_led(led::NUM_LOCK)
                .with_led(led::CAPS_LOCK)
                .with_led(led::SCROLL_LOCK),
        );
        Driver::new(&host, 0b110).run().unwrap();
        let writes: Vec<_> = host
            .writes()
            .iter()
            .map(|w| (w.element, w.value.value))
            .collect();
        assert_eq!(
            writes,
            vec![(ElementId(0), 0), (ElementId(1), 1), (ElementId(2), 1)]
        );
    }

    #[test]
    fn test_values_are_immediate() {
        let host =
            MockHost::new().with_device(MockDevice::keyboard("kbd").with_led(led::CAPS_LOCK));
        Driver::new(&host, 1).run().unwrap();
        assert_eq!(host.writes()[0].value, HidValue::new(0, 1));
    }

    #[test]
    fn test_malformed_element_takes_no_digit() {
        let host = MockHost::new().with_device(
            MockDevice::keyboard("kbd")
                .with_led(led::NUM_LOCK)
                .with_element(ElementInfo {
                    usage_page: hidled_host::usage::PAGE_LEDS,
                    usage: led::CAPS_LOCK,
                    logical_min: 5,
                    logical_max: 2,
                })
                .with_led(led::SCROLL_LOCK),
        );
        let report = Driver::new(&host, 0b10).run().unwrap();
        let writes: Vec<_> = host
            .writes()
            .iter()
            .map(|w| (w.element, w.value.value))
            .collect();
        assert_eq!(writes, vec![(ElementId(0), 0), (ElementId(2), 1)]);
        assert_eq!(report.malformed_elements, 1);
        assert!(host.is_balanced());
    }

    #[test]
    fn test_conformance_uses_the_enumeration_usage() {
        // Same usage page as a keyboard, different usage
        let host = MockHost::new()
            .report_all_devices()
            .with_device(
                MockDevice::new("mouse")
                    .with_usage(hidled_host::usage::PAGE_GENERIC_DESKTOP, 0x02)
                    .with_led(led::CAPS_LOCK),
            )
            .with_device(MockDevice::keyboard("kbd").with_led(led::CAPS_LOCK));
        let report = Driver::new(&host, PATTERN_ALL_ON).run().unwrap();
        assert_eq!(report.devices[0].kind, OutcomeKind::NotKeyboard);
        assert_eq!(report.devices[1].kind, OutcomeKind::Written);
        assert!(host.writes_to(DeviceId(0)).is_empty());
        assert_eq!(host.element_queries(), vec![DeviceId(1)]);
    }

    #[test]
    fn test_empty_host_is_a_no_op() {
        let host = MockHost::new();
        let report = Driver::new(&host, PATTERN_ALL_ON).run().unwrap();
        assert_eq!(report.devices_enumerated, 0);
        assert!(host.writes().is_empty());
        assert!(host.is_balanced());
    }
}
