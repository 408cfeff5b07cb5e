//! HID usage tables used by the LED tool
//!
//! Only the handful of usage pages and usages needed to find keyboards and
//! their indicator LEDs are listed here.

/// Generic Desktop usage page
pub const PAGE_GENERIC_DESKTOP: u16 = 0x01;

/// Keyboard/Keypad usage page
pub const PAGE_KEYBOARD: u16 = 0x07;

/// LED usage page
pub const PAGE_LEDS: u16 = 0x08;

/// Generic Desktop: Keyboard
pub const USAGE_GD_KEYBOARD: u16 = 0x06;

/// LED page usages
pub mod led {
    pub const NUM_LOCK: u16 = 0x01;
    pub const CAPS_LOCK: u16 = 0x02;
    pub const SCROLL_LOCK: u16 = 0x03;
    pub const COMPOSE: u16 = 0x04;
    pub const KANA: u16 = 0x05;
    pub const MUTE: u16 = 0x09;
    pub const MAIL: u16 = 0x19;
    pub const STAND_BY: u16 = 0x27;
    pub const GENERIC_INDICATOR: u16 = 0x4B;
    pub const SYSTEM_SUSPEND: u16 = 0x4C;
    pub const EXTERNAL_POWER: u16 = 0x4D;
}

/// Linux `LED_*` codes paired with the HID LED usage the kernel maps onto them
///
/// Mirrors the `HID_UP_LED` branch of the kernel's hid-input mapping.
pub const LINUX_LED_USAGES: &[(u16, u16)] = &[
    (0x00, led::NUM_LOCK),          // LED_NUML
    (0x01, led::CAPS_LOCK),         // LED_CAPSL
    (0x02, led::SCROLL_LOCK),       // LED_SCROLLL
    (0x03, led::COMPOSE),           // LED_COMPOSE
    (0x04, led::KANA),              // LED_KANA
    (0x05, led::STAND_BY),          // LED_SLEEP
    (0x06, led::SYSTEM_SUSPEND),    // LED_SUSPEND
    (0x07, led::MUTE),              // LED_MUTE
    (0x08, led::GENERIC_INDICATOR), // LED_MISC
    (0x09, led::MAIL),              // LED_MAIL
    (0x0A, led::EXTERNAL_POWER),    // LED_CHARGING
];

/// Boot-protocol keyboard output report LEDs, one per bit starting at bit 0
pub const BOOT_KEYBOARD_LEDS: &[u16] = &[
    led::NUM_LOCK,
    led::CAPS_LOCK,
    led::SCROLL_LOCK,
    led::COMPOSE,
    led::KANA,
];

/// HID LED usage for a Linux `LED_*` code
pub fn led_usage_for_linux_code(code: u16) -> Option<u16> {
    LINUX_LED_USAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, usage)| *usage)
}

/// Human readable name for an LED usage
pub fn led_name(usage: u16) -> &'static str {
    match usage {
        led::NUM_LOCK => "Num Lock",
        led::CAPS_LOCK => "Caps Lock",
        led::SCROLL_LOCK => "Scroll Lock",
        led::COMPOSE => "Compose",
        led::KANA => "Kana",
        led::MUTE => "Mute",
        led::MAIL => "Mail",
        led::STAND_BY => "Stand-by",
        led::GENERIC_INDICATOR => "Generic Indicator",
        led::SYSTEM_SUSPEND => "System Suspend",
        led::EXTERNAL_POWER => "External Power",
        _ => "LED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_leds_map_to_boot_usages() {
        assert_eq!(led_usage_for_linux_code(0x00), Some(led::NUM_LOCK));
        assert_eq!(led_usage_for_linux_code(0x01), Some(led::CAPS_LOCK));
        assert_eq!(led_usage_for_linux_code(0x02), Some(led::SCROLL_LOCK));
    }

    #[test]
    fn test_unmapped_linux_code() {
        assert_eq!(led_usage_for_linux_code(0x0F), None);
    }

    #[test]
    fn test_boot_leds_are_a_prefix_of_linux_table() {
        for (bit, usage) in BOOT_KEYBOARD_LEDS.iter().enumerate() {
            assert_eq!(led_usage_for_linux_code(bit as u16), Some(*usage));
        }
    }

    #[test]
    fn test_led_names() {
        assert_eq!(led_name(led::CAPS_LOCK), "Caps Lock");
        assert_eq!(led_name(0x7F), "LED");
    }
}
