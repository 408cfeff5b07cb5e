//! Summary of one enumerate-and-write pass

use std::fmt;

use hidled_host::usage;
use hidled_host::DeviceId;
use serde::Serialize;

/// What happened to one enumerated device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Did not conform to the keyboard usage
    NotKeyboard,
    /// LED element query failed
    ElementQueryFailed,
    /// Conforming keyboard with no LED elements
    NoLeds,
    /// LED values were submitted (individual writes may still have failed)
    Written,
}

/// One LED write that the host accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedWrite {
    pub element: usize,
    pub usage: u16,
    pub name: &'static str,
    pub value: i32,
}

/// Per-device result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceOutcome {
    pub device: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: OutcomeKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub written: Vec<LedWrite>,
    pub malformed_elements: usize,
    pub failed_writes: usize,
}

impl DeviceOutcome {
    pub fn new(device: DeviceId, name: Option<String>, kind: OutcomeKind) -> Self {
        Self {
            device: device.0,
            name,
            kind,
            written: Vec::new(),
            malformed_elements: 0,
            failed_writes: 0,
        }
    }

    /// Record an accepted write
    pub fn push_write(&mut self, element: usize, led_usage: u16, value: i32) {
        self.written.push(LedWrite {
            element,
            usage: led_usage,
            name: usage::led_name(led_usage),
            value,
        });
    }
}

/// Counters and per-device outcomes for a completed pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub pattern: u64,
    pub devices_enumerated: usize,
    pub not_keyboard: usize,
    pub element_query_failures: usize,
    pub without_leds: usize,
    pub devices_written: usize,
    pub leds_written: usize,
    pub malformed_elements: usize,
    pub failed_writes: usize,
    pub devices: Vec<DeviceOutcome>,
}

impl RunReport {
    pub fn new(pattern: u64) -> Self {
        Self {
            pattern,
            ..Default::default()
        }
    }

    /// Fold one device outcome into the counters
    pub fn record(&mut self, outcome: DeviceOutcome) {
        match outcome.kind {
            OutcomeKind::NotKeyboard => self.not_keyboard += 1,
            OutcomeKind::ElementQueryFailed => self.element_query_failures += 1,
            OutcomeKind::NoLeds => self.without_leds += 1,
            OutcomeKind::Written => self.devices_written += 1,
        }
        self.leds_written += outcome.written.len();
        self.malformed_elements += outcome.malformed_elements;
        self.failed_writes += outcome.failed_writes;
        self.devices.push(outcome);
    }

    /// Devices that were skipped without any write attempt
    pub fn skipped(&self) -> usize {
        self.not_keyboard + self.element_query_failures + self.without_leds
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pattern {:#04x}: {} devices, {} keyboards written ({} LEDs), {} skipped",
            self.pattern,
            self.devices_enumerated,
            self.devices_written,
            self.leds_written,
            self.skipped()
        )?;
        if self.failed_writes > 0 {
            write!(f, ", {} failed writes", self.failed_writes)?;
        }
        if self.malformed_elements > 0 {
            write!(f, ", {} malformed elements", self.malformed_elements)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_updates_counters() {
        let mut report = RunReport::new(0xFF);
        report.record(DeviceOutcome::new(DeviceId(0), None, OutcomeKind::NotKeyboard));

        let mut written = DeviceOutcome::new(DeviceId(1), Some("kbd".into()), OutcomeKind::Written);
        written.push_write(0, usage::led::NUM_LOCK, 1);
        written.push_write(1, usage::led::CAPS_LOCK, 1);
        written.failed_writes = 1;
        report.record(written);
        report.devices_enumerated = 2;

        assert_eq!(report.not_keyboard, 1);
        assert_eq!(report.devices_written, 1);
        assert_eq!(report.leds_written, 2);
        assert_eq!(report.failed_writes, 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(
            report.to_string(),
            "pattern 0xff: 2 devices, 1 keyboards written (2 LEDs), 1 skipped, 1 failed writes"
        );
    }

    #[test]
    fn test_json_shape() {
        let mut report = RunReport::new(0);
        let mut outcome = DeviceOutcome::new(DeviceId(3), None, OutcomeKind::Written);
        outcome.push_write(0, usage::led::CAPS_LOCK, 0);
        report.record(outcome);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["leds_written"], 1);
        assert_eq!(json["devices"][0]["kind"], "written");
        assert_eq!(json["devices"][0]["written"][0]["name"], "Caps Lock");
        assert!(json["devices"][0].get("name").is_none());
    }
}
