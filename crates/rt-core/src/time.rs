//! Wall-clock instants.
//!
//! Telemetry timing is measured in whole milliseconds since the Unix epoch.
//! The report receiver stamps each datagram with `Millis::now()`; everything
//! downstream does integer arithmetic on those stamps so elapsed-time
//! comparisons are exact.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Millis(pub u64);

impl Millis {
    pub const ZERO: Millis = Millis(0);

    /// Current wall-clock time.  A clock set before 1970 reads as zero.
    pub fn now() -> Self {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Millis(ms)
    }

    /// Signed milliseconds from `earlier` to `self`.
    #[inline]
    pub fn since(self, earlier: Millis) -> i64 {
        self.0 as i64 - earlier.0 as i64
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::Add<u64> for Millis {
    type Output = Millis;
    #[inline]
    fn add(self, rhs: u64) -> Millis {
        Millis(self.0 + rhs)
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
