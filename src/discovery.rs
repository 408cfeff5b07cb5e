//! Device enumeration and LED element discovery
//!
//! Everything acquired from the host is wrapped in a guard that releases it
//! on drop, so a pass that returns early still hands every session, device
//! set and element set back exactly once.

use std::collections::HashSet;

use hidled_host::usage::PAGE_LEDS;
use hidled_host::{DeviceId, ElementId, ElementInfo, HidHost, UsageFilter};
use tracing::{debug, warn};

use crate::error::LedError;

/// Open connection to a host, closed on drop
pub struct HostSession<'h, H: HidHost + ?Sized> {
    host: &'h H,
}

impl<'h, H: HidHost + ?Sized> HostSession<'h, H> {
    /// Open the host
    pub fn open(host: &'h H) -> Result<Self, LedError> {
        host.open().map_err(LedError::HostUnavailable)?;
        Ok(Self { host })
    }

    pub fn host(&self) -> &'h H {
        self.host
    }
}

impl<H: HidHost + ?Sized> Drop for HostSession<'_, H> {
    fn drop(&mut self) {
        self.host.close();
    }
}

/// Devices matched by one enumeration, in iteration order
pub struct DeviceSet<'h, H: HidHost + ?Sized> {
    host: &'h H,
    /// The set exactly as the host handed it out
    matched: HashSet<DeviceId>,
    ordered: Vec<DeviceId>,
}

impl<'h, H: HidHost + ?Sized> DeviceSet<'h, H> {
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeviceId> {
        self.ordered.iter()
    }

    pub fn as_slice(&self) -> &[DeviceId] {
        &self.ordered
    }
}

impl<H: HidHost + ?Sized> Drop for DeviceSet<'_, H> {
    fn drop(&mut self) {
        self.host.release_devices(&self.matched);
    }
}

/// Apply `filter` and copy out the matching devices
///
/// The host's set is unordered; the returned sequence is sorted by handle so
/// each device is visited once, in a stable order for the pass.
pub fn enumerate_devices<'h, H: HidHost + ?Sized>(
    session: &HostSession<'h, H>,
    filter: &UsageFilter,
) -> Result<DeviceSet<'h, H>, LedError> {
    let host = session.host();
    host.set_device_filter(filter);

    let matched = host.copy_matched_devices().map_err(LedError::Enumeration)?;
    let mut set = DeviceSet {
        host,
        matched,
        ordered: Vec::new(),
    };

    // Dropping `set` on failure releases what the host handed out
    set.ordered
        .try_reserve_exact(set.matched.len())
        .map_err(|e| LedError::Allocation(format!("device sequence: {e}")))?;
    set.ordered.extend(set.matched.iter().copied());
    set.ordered.sort_unstable();

    debug!("Enumerated {} devices matching {}", set.len(), filter);
    Ok(set)
}

/// One LED element with its descriptor properties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedElement {
    pub id: ElementId,
    pub info: ElementInfo,
}

/// LED elements of one device, released on drop
pub struct ElementSet<'h, H: HidHost + ?Sized> {
    host: &'h H,
    device: DeviceId,
    /// Handles exactly as the host handed them out
    acquired: Vec<ElementId>,
    leds: Vec<LedElement>,
}

impl<H: HidHost + ?Sized> ElementSet<'_, H> {
    pub fn leds(&self) -> &[LedElement] {
        &self.leds
    }

    pub fn len(&self) -> usize {
        self.leds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leds.is_empty()
    }
}

impl<H: HidHost + ?Sized> Drop for ElementSet<'_, H> {
    fn drop(&mut self) {
        self.host.release_elements(self.device, &self.acquired);
    }
}

/// Copy out the LED elements of a device, in device order
///
/// The caller checks keyboard conformance first. Elements the host returns
/// off the LED usage page, or whose properties cannot be read, are left out.
pub fn discover_led_elements<'h, H: HidHost + ?Sized>(
    session: &HostSession<'h, H>,
    device: DeviceId,
    filter: &UsageFilter,
) -> Result<ElementSet<'h, H>, LedError> {
    let host = session.host();
    let acquired = host
        .copy_matched_elements(device, filter)
        .map_err(|source| LedError::ElementQuery { device, source })?;

    let mut leds = Vec::with_capacity(acquired.len());
    for &id in &acquired {
        match host.element_info(device, id) {
            Ok(info) if info.usage_page == PAGE_LEDS => leds.push(LedElement { id, info }),
            Ok(info) => debug!(
                "{device}: skipping {id} on usage page {:#06x}",
                info.usage_page
            ),
            Err(e) => warn!("{device}: cannot read {id}: {e}"),
        }
    }

    Ok(ElementSet {
        host,
        device,
        acquired,
        leds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{keyboard_filter, led_filter};
    use hidled_host::usage::led;
    use hidled_host::{MockDevice, MockHost};

    #[test]
    fn test_session_closes_on_drop() {
        let host = MockHost::new();
        {
            let _session = HostSession::open(&host).unwrap();
            assert!(host.is_open());
        }
        assert!(!host.is_open());
        assert_eq!((host.opens(), host.closes()), (1, 1));
    }

    #[test]
    fn test_session_closes_exactly_once() {
        let host = MockHost::new();
        drop(HostSession::open(&host).unwrap());
        assert_eq!((host.opens(), host.closes()), (1, 1));
        assert!(host.is_balanced());

        // A stray close on top of the guard's is visible
        host.close();
        assert_eq!((host.opens(), host.closes()), (1, 2));
        assert!(!host.is_balanced());
    }

    #[test]
    fn test_session_open_failure() {
        let host = MockHost::new().failing_open();
        let err = HostSession::open(&host).err().unwrap();
        assert!(matches!(err, LedError::HostUnavailable(_)));
        assert_eq!(host.closes(), 0);
    }

    #[test]
    fn test_enumeration_is_sorted_and_released() {
        let host = MockHost::new()
            .with_device(MockDevice::keyboard("a"))
            .with_device(MockDevice::keyboard("b"))
            .with_device(MockDevice::keyboard("c"));
        let session = HostSession::open(&host).unwrap();
        {
            let devices = enumerate_devices(&session, &keyboard_filter().unwrap()).unwrap();
            assert_eq!(devices.as_slice(), &[DeviceId(0), DeviceId(1), DeviceId(2)]);
            assert_eq!(host.device_set_counts(), (1, 0));
        }
        assert_eq!(host.device_set_counts(), (1, 1));
        assert_eq!(host.device_filter(), Some(keyboard_filter().unwrap()));
    }

    #[test]
    fn test_enumeration_failure() {
        let host = MockHost::new().failing_enumeration();
        let session = HostSession::open(&host).unwrap();
        let err = enumerate_devices(&session, &keyboard_filter().unwrap())
            .err()
            .unwrap();
        assert!(matches!(err, LedError::Enumeration(_)));
        assert_eq!(host.device_set_counts(), (0, 0));
    }

    #[test]
    fn test_discovery_keeps_led_page_only() {
        let host = MockHost::new().with_device(
            MockDevice::keyboard("kbd")
                .with_led(led::NUM_LOCK)
                .with_led(led::CAPS_LOCK),
        );
        let session = HostSession::open(&host).unwrap();
        let elements =
            discover_led_elements(&session, DeviceId(0), &led_filter().unwrap()).unwrap();
        let usages: Vec<_> = elements.leds().iter().map(|e| e.info.usage).collect();
        assert_eq!(usages, vec![led::NUM_LOCK, led::CAPS_LOCK]);
        drop(elements);
        assert_eq!(host.element_set_counts(), (1, 1));
    }

    #[test]
    fn test_discovery_drops_unreadable_elements() {
        let host = MockHost::new().with_device(
            MockDevice::keyboard("kbd")
                .with_led(led::NUM_LOCK)
                .with_led(led::CAPS_LOCK)
                .unreadable_element(0),
        );
        let session = HostSession::open(&host).unwrap();
        let elements =
            discover_led_elements(&session, DeviceId(0), &led_filter().unwrap()).unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements.leds()[0].id, ElementId(1));
    }

    #[test]
    fn test_discovery_failure_is_per_device() {
        let host = MockHost::new().with_device(MockDevice::keyboard("kbd").failing_element_query());
        let session = HostSession::open(&host).unwrap();
        let err = discover_led_elements(&session, DeviceId(0), &led_filter().unwrap())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            LedError::ElementQuery {
                device: DeviceId(0),
                ..
            }
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_discovery_of_ledless_keyboard_is_empty() {
        let host = MockHost::new().with_device(MockDevice::keyboard("kbd"));
        let session = HostSession::open(&host).unwrap();
        let elements =
            discover_led_elements(&session, DeviceId(0), &led_filter().unwrap()).unwrap();
        assert!(elements.is_empty());
    }
}
