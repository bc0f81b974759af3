//! Master clock configuration.

/// Master crystal of a system.
///
/// Every chip runs at an integer division of this frequency; the NES CPU
/// takes 12 master clocks per cycle and the PPU 4 per dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// Crystal frequency in Hz (`21_477_272` for an NTSC NES).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Frequency of a component clocked every `divider` master ticks,
    /// rounded to the nearest hertz.
    #[must_use]
    pub const fn divided(&self, divider: u64) -> u64 {
        (self.frequency_hz + divider / 2) / divider
    }

    /// Master ticks per frame at the given frame rate (integer division).
    #[must_use]
    pub const fn ticks_per_frame(&self, frames_per_second: u64) -> u64 {
        self.frequency_hz / frames_per_second
    }
}
