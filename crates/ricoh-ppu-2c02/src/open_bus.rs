//! The PPU I/O latch.
//!
//! The data lines between the CPU and the PPU hold the last value driven
//! on them. Reads of write-only registers, and the unused bits of some
//! readable ones, return that value. Each bit slowly discharges: a bit
//! that is not driven high again within about 600 ms reads back as 0.

/// Frames a latched 1 bit survives without a refresh.
pub const DECAY_FRAMES: u64 = 30;

#[derive(Debug, Clone, Default)]
pub struct IoLatch {
    value: u8,
    /// Frame each bit was last driven high.
    stamps: [u64; 8],
    decay: bool,
}

impl IoLatch {
    #[must_use]
    pub fn new(decay: bool) -> Self {
        Self {
            decay,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn value(&self) -> u8 {
        self.value
    }

    /// Drive the bits in `mask` to `val` on `frame`.
    pub fn set(&mut self, val: u8, mask: u8, frame: u64) {
        for (bit, stamp) in self.stamps.iter_mut().enumerate() {
            let m = 1 << bit;
            if mask & m != 0 && val & m != 0 {
                *stamp = frame;
            }
        }
        self.value = (self.value & !mask) | (val & mask);
    }

    /// Clear the bits not refreshed for [`DECAY_FRAMES`].
    pub fn decay(&mut self, frame: u64) {
        if !self.decay {
            return;
        }
        for (bit, &stamp) in self.stamps.iter().enumerate() {
            if frame.saturating_sub(stamp) > DECAY_FRAMES {
                self.value &= !(1 << bit);
            }
        }
    }

    pub fn clear(&mut self) {
        self.value = 0;
        self.stamps = [0; 8];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_update_keeps_other_bits() {
        let mut latch = IoLatch::new(true);
        latch.set(0xFF, 0xFF, 0);
        latch.set(0x00, 0x1F, 0);
        assert_eq!(latch.value(), 0xE0);
    }

    #[test]
    fn bits_decay_after_thirty_frames() {
        let mut latch = IoLatch::new(true);
        latch.set(0xF0, 0xFF, 10);
        latch.set(0x0F, 0x0F, 30);
        latch.decay(40);
        assert_eq!(latch.value(), 0xFF);
        latch.decay(41);
        assert_eq!(latch.value(), 0x0F);
        latch.decay(61);
        assert_eq!(latch.value(), 0x00);
    }

    #[test]
    fn decay_can_be_disabled() {
        let mut latch = IoLatch::new(false);
        latch.set(0xAA, 0xFF, 0);
        latch.decay(1_000);
        assert_eq!(latch.value(), 0xAA);
    }
}
