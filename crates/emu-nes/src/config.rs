//! NES configuration.

use emu_core::MasterClock;
use ricoh_apu_2a03::{Channel, MAX_SAMPLE_RATE};

/// Video region. Only NTSC timing is emulated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum NesRegion {
    /// 60 Hz, 262 scanlines, 1,789,773 Hz CPU.
    #[default]
    Ntsc,
}

impl NesRegion {
    /// Master crystal frequency in Hz.
    #[must_use]
    pub const fn crystal_hz(self) -> u64 {
        match self {
            Self::Ntsc => 21_477_272,
        }
    }

    #[must_use]
    pub const fn master_clock(self) -> MasterClock {
        MasterClock::new(self.crystal_hz())
    }

    /// Master clocks per CPU cycle.
    #[must_use]
    pub const fn cpu_divider(self) -> u64 {
        match self {
            Self::Ntsc => 12,
        }
    }

    /// Master clocks per PPU dot.
    #[must_use]
    pub const fn ppu_divider(self) -> u64 {
        match self {
            Self::Ntsc => 4,
        }
    }

    /// CPU frequency in Hz.
    #[must_use]
    pub const fn cpu_hz(self) -> u64 {
        self.master_clock().divided(self.cpu_divider())
    }

    /// CPU cycles run by one call to `run_one_frame`.
    #[must_use]
    pub const fn cycles_per_frame(self) -> i64 {
        match self {
            Self::Ntsc => 29_780,
        }
    }
}

pub const MIN_SAMPLE_RATE: u32 = 8_000;
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Machine options fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct NesConfig {
    /// Output audio rate in Hz.
    pub sample_rate: u32,
    /// Run ANE, LXA, SHA, SHX, SHY and TAS with their usual results instead
    /// of halting the CPU.
    pub unstable_opcodes: bool,
    /// Let undriven bits of the PPU I/O latch decay after ~30 frames.
    pub open_bus_decay: bool,
    /// Per-channel volume, in [`Channel`] order.
    pub channel_volumes: [f64; Channel::COUNT],
    /// Per-channel pan, 0.0 (left) to 2.0 (right); 1.0 is centred.
    pub channel_panning: [f64; Channel::COUNT],
}

impl Default for NesConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            unstable_opcodes: false,
            open_bus_decay: true,
            channel_volumes: [1.0; Channel::COUNT],
            channel_panning: [1.0; Channel::COUNT],
        }
    }
}

impl NesConfig {
    /// Sample rate clamped to what the mixer supports.
    #[must_use]
    pub fn clamped_sample_rate(&self) -> u32 {
        self.sample_rate.clamp(MIN_SAMPLE_RATE, MAX_SAMPLE_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ntsc_clock_rates() {
        let region = NesRegion::Ntsc;
        assert_eq!(region.cpu_hz(), 1_789_773);
        assert_eq!(region.master_clock().divided(region.ppu_divider()), 5_369_318);
    }

    #[test]
    fn sample_rate_is_clamped() {
        let mut config = NesConfig {
            sample_rate: 1_000,
            ..NesConfig::default()
        };
        assert_eq!(config.clamped_sample_rate(), 8_000);
        config.sample_rate = 192_000;
        assert_eq!(config.clamped_sample_rate(), 96_000);
        config.sample_rate = 44_100;
        assert_eq!(config.clamped_sample_rate(), 44_100);
    }
}
