//! Compressed validity time encoding.
//!
//! A validity time is carried in a single byte: the high nibble is the mantissa `a`, the low
//! nibble the exponent `b`, and the value in seconds is `C * (1 + a / 16) * 2^b`.

use std::time::Duration;

/// The scaling factor `C`, in seconds.
pub const SCALING_FACTOR: f64 = 0.0625;

/// A validity time in its one-byte wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidityTime(u8);

impl ValidityTime {
    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    pub fn to_byte(self) -> u8 {
        self.0
    }

    /// Encodes a number of seconds, rounding the mantissa to the nearest representable value.
    ///
    /// Values below `C` encode as the smallest representable time, values above the largest
    /// representable time saturate.
    pub fn from_secs_f64(secs: f64) -> Self {
        if !(secs >= SCALING_FACTOR) {
            return Self(0);
        }

        // Largest b such that C * 2^b <= secs.
        let mut b: u32 = 0;
        while b < 15 && SCALING_FACTOR * f64::from(1u32 << (b + 1)) <= secs {
            b += 1;
        }

        let a = (16.0 * (secs / (SCALING_FACTOR * f64::from(1u32 << b)) - 1.0)).round();
        let (a, b) = if a >= 16.0 { (0, b + 1) } else { (a as u8, b) };

        if b > 15 {
            return Self(u8::MAX);
        }

        Self(a << 4 | b as u8)
    }

    pub fn from_duration(duration: Duration) -> Self {
        Self::from_secs_f64(duration.as_secs_f64())
    }

    /// Decodes the validity time into seconds.
    pub fn as_secs_f64(&self) -> f64 {
        let a = f64::from(self.0 >> 4);
        let b = self.0 & 0x0f;

        SCALING_FACTOR * (1.0 + a / 16.0) * f64::from(1u32 << b)
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs_f64(self.as_secs_f64())
    }

    /// The validity time as a table time-to-live in milliseconds.
    pub fn as_millis(&self) -> u64 {
        (self.as_secs_f64() * 1000.0) as u64
    }
}
