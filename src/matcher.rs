//! Usage filter construction for device and element queries

use hidled_host::usage::{PAGE_GENERIC_DESKTOP, PAGE_LEDS, USAGE_GD_KEYBOARD};
use hidled_host::{MatchScope, UsageFilter};

use crate::error::LedError;

/// Build a usage page / usage filter
///
/// A `usage_page` of 0 gives a filter that matches everything at `scope`, and
/// `usage` is ignored. A `usage` of 0 constrains the usage page only. Values
/// that do not fit a 16-bit HID usage cannot be represented and fail with
/// [`LedError::Allocation`].
pub fn build_filter(
    scope: MatchScope,
    usage_page: u32,
    usage: u32,
) -> Result<UsageFilter, LedError> {
    if usage_page == 0 {
        return Ok(UsageFilter::any(scope));
    }
    let page = to_usage16("usage page", usage_page)?;
    if usage == 0 {
        return Ok(UsageFilter::page(scope, page));
    }
    let usage = to_usage16("usage", usage)?;
    Ok(UsageFilter::page_usage(scope, page, usage))
}

/// Device filter for Generic Desktop / Keyboard
pub fn keyboard_filter() -> Result<UsageFilter, LedError> {
    build_filter(
        MatchScope::Device,
        PAGE_GENERIC_DESKTOP.into(),
        USAGE_GD_KEYBOARD.into(),
    )
}

/// Element filter for anything on the LED usage page
pub fn led_filter() -> Result<UsageFilter, LedError> {
    build_filter(MatchScope::Element, PAGE_LEDS.into(), 0)
}

fn to_usage16(what: &str, value: u32) -> Result<u16, LedError> {
    u16::try_from(value).map_err(|_| {
        LedError::Allocation(format!("{what} {value:#x} does not fit a 16-bit HID usage"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_page_matches_all_devices() {
        for usage in [0, 0x06, 0xFFFF, u32::MAX] {
            let filter = build_filter(MatchScope::Device, 0, usage).unwrap();
            assert!(filter.is_unconstrained());
            assert_eq!(filter.usage(), None);
            assert!(filter.matches(0x01, 0x06));
            assert!(filter.matches(0x0C, 0x01));
        }
    }

    #[test]
    fn test_page_only() {
        let filter = build_filter(MatchScope::Element, 0x08, 0).unwrap();
        assert_eq!(filter.scope(), MatchScope::Element);
        assert_eq!(filter.usage_page(), Some(0x08));
        assert_eq!(filter.usage(), None);
    }

    #[test]
    fn test_page_and_usage() {
        let filter = build_filter(MatchScope::Device, 0x01, 0x06).unwrap();
        assert_eq!(filter.usage_page(), Some(0x01));
        assert_eq!(filter.usage(), Some(0x06));
        assert!(!filter.matches(0x01, 0x02));
    }

    #[test]
    fn test_unrepresentable_page_fails() {
        let err = build_filter(MatchScope::Device, 0x1_0000, 0).unwrap_err();
        assert!(matches!(err, LedError::Allocation(_)));
    }

    #[test]
    fn test_unrepresentable_usage_fails() {
        let err = build_filter(MatchScope::Device, 0x01, 0x2_0000).unwrap_err();
        assert!(matches!(err, LedError::Allocation(_)));
    }

    #[test]
    fn test_standard_filters() {
        let kbd = keyboard_filter().unwrap();
        assert_eq!(kbd.scope(), MatchScope::Device);
        assert!(kbd.matches(PAGE_GENERIC_DESKTOP, USAGE_GD_KEYBOARD));

        let leds = led_filter().unwrap();
        assert_eq!(leds.scope(), MatchScope::Element);
        assert!(leds.matches(PAGE_LEDS, 0x02));
        assert!(!leds.matches(0x07, 0x39));
    }
}
