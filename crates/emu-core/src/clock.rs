//! Master clock configuration.

use crate::Ticks;

/// Master clock of the machine hosting a peripheral.
///
/// Peripherals that time signals (baud rates, scan rates) derive their
/// periods from this frequency so they share the scheduler's time base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// Crystal frequency in Hz (e.g., `24_883_200` for the VT100).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Ticks per period of a signal running at `rate_hz` (integer division).
    ///
    /// Returns `Ticks::ZERO` for a zero rate.
    #[must_use]
    pub const fn ticks_per_period(&self, rate_hz: u64) -> Ticks {
        if rate_hz == 0 {
            Ticks::ZERO
        } else {
            Ticks::new(self.frequency_hz / rate_hz)
        }
    }
}
