//! Common types for the host layer

use std::fmt;

/// What a filter is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchScope {
    /// Device-level query (top-level application collection)
    Device,
    /// Element-level query (one control or indicator on a device)
    Element,
}

/// Usage page / usage matching criteria
///
/// A usage is only ever stored together with a usage page, so a filter with
/// no usage page matches everything at its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UsageFilter {
    scope: MatchScope,
    usage_page: Option<u16>,
    usage: Option<u16>,
}

impl UsageFilter {
    /// Filter that matches every device or element
    pub const fn any(scope: MatchScope) -> Self {
        Self {
            scope,
            usage_page: None,
            usage: None,
        }
    }

    /// Filter constrained by usage page only
    pub const fn page(scope: MatchScope, usage_page: u16) -> Self {
        Self {
            scope,
            usage_page: Some(usage_page),
            usage: None,
        }
    }

    /// Filter constrained by usage page and usage
    pub const fn page_usage(scope: MatchScope, usage_page: u16, usage: u16) -> Self {
        Self {
            scope,
            usage_page: Some(usage_page),
            usage: Some(usage),
        }
    }

    pub fn scope(&self) -> MatchScope {
        self.scope
    }

    pub fn usage_page(&self) -> Option<u16> {
        self.usage_page
    }

    pub fn usage(&self) -> Option<u16> {
        self.usage
    }

    /// True when the filter places no constraint at all
    pub fn is_unconstrained(&self) -> bool {
        self.usage_page.is_none()
    }

    /// Check a candidate usage pair against this filter
    pub fn matches(&self, usage_page: u16, usage: u16) -> bool {
        match (self.usage_page, self.usage) {
            (None, _) => true,
            (Some(page), None) => page == usage_page,
            (Some(page), Some(u)) => page == usage_page && u == usage,
        }
    }
}

impl fmt::Display for UsageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = match self.scope {
            MatchScope::Device => "device",
            MatchScope::Element => "element",
        };
        match (self.usage_page, self.usage) {
            (None, _) => write!(f, "{scope}:*"),
            (Some(page), None) => write!(f, "{scope}:{page:#06x}/*"),
            (Some(page), Some(usage)) => write!(f, "{scope}:{page:#06x}/{usage:#06x}"),
        }
    }
}

/// Non-owning handle to a device held by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(pub usize);

/// Non-owning handle to one element of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub usize);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev#{}", self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "elem#{}", self.0)
    }
}

/// Snapshot of an element's descriptor properties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementInfo {
    pub usage_page: u16,
    pub usage: u16,
    /// Inclusive lower bound of accepted values
    pub logical_min: i32,
    /// Inclusive upper bound of accepted values
    pub logical_max: i32,
}

impl ElementInfo {
    /// A single on/off LED on the LED usage page
    pub const fn binary_led(usage: u16) -> Self {
        Self {
            usage_page: crate::usage::PAGE_LEDS,
            usage,
            logical_min: 0,
            logical_max: 1,
        }
    }
}

/// Value submitted to an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidValue {
    /// Host timestamp for the value; 0 applies it immediately
    pub timestamp: u64,
    pub value: i32,
}

impl HidValue {
    pub const fn new(timestamp: u64, value: i32) -> Self {
        Self { timestamp, value }
    }

    /// Value applied immediately
    pub const fn immediate(value: i32) -> Self {
        Self::new(0, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconstrained_filter_matches_anything() {
        let filter = UsageFilter::any(MatchScope::Device);
        assert!(filter.is_unconstrained());
        assert!(filter.matches(0x01, 0x06));
        assert!(filter.matches(0xFF00, 0x01));
    }

    #[test]
    fn test_page_only_filter() {
        let filter = UsageFilter::page(MatchScope::Element, 0x08);
        assert!(filter.matches(0x08, 0x01));
        assert!(filter.matches(0x08, 0x02));
        assert!(!filter.matches(0x07, 0x01));
    }

    #[test]
    fn test_page_usage_filter() {
        let filter = UsageFilter::page_usage(MatchScope::Device, 0x01, 0x06);
        assert!(filter.matches(0x01, 0x06));
        assert!(!filter.matches(0x01, 0x02));
        assert!(!filter.matches(0x0C, 0x06));
    }

    #[test]
    fn test_filter_display() {
        assert_eq!(UsageFilter::any(MatchScope::Device).to_string(), "device:*");
        assert_eq!(
            UsageFilter::page(MatchScope::Element, 0x08).to_string(),
            "element:0x0008/*"
        );
        assert_eq!(
            UsageFilter::page_usage(MatchScope::Device, 0x01, 0x06).to_string(),
            "device:0x0001/0x0006"
        );
    }
}
