//! Mixed-radix LED value encoding
//!
//! One pattern integer drives every LED of a device. Each element is a digit
//! whose base is the size of its logical range, least significant first: with
//! three on/off LEDs, pattern `0b101` lights the first and third.

use crate::error::LedError;

/// Validated logical range of an element (`min <= max`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementRange {
    min: i32,
    max: i32,
}

impl ElementRange {
    /// Validate a logical range
    pub fn new(min: i32, max: i32) -> Result<Self, LedError> {
        if max < min {
            return Err(LedError::MalformedElement { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    /// Number of distinct values, always at least 1
    pub fn radix(&self) -> u64 {
        (i64::from(self.max) - i64::from(self.min) + 1) as u64
    }

    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Split `pattern` into one value per range
///
/// Every range gets a value, including those past the point where the
/// pattern is used up; they receive their minimum.
pub fn encode_values(pattern: u64, ranges: &[ElementRange]) -> Vec<i32> {
    let mut remaining = pattern;
    ranges
        .iter()
        .map(|range| {
            let radix = range.radix();
            let digit = remaining % radix;
            remaining /= radix;
            // digit < radix, so min + digit <= max
            (i64::from(range.min) + digit as i64) as i32
        })
        .collect()
}
