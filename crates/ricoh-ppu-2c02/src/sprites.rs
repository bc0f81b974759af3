//! Sprite evaluation and the eight sprite output units.
//!
//! Evaluation for the next line runs in one pass at dot 257 rather than
//! across dots 65-256. A $2004 read in that window returns the primary OAM
//! byte at OAMADDR, not the byte the evaluator would be fetching.

use crate::VideoBus;
use crate::ppu::Ppu;
use crate::registers::status;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    x: u8,
    attr: u8,
    lo: u8,
    hi: u8,
}

/// Sprites selected for the next scanline.
#[derive(Debug, Clone)]
pub struct SpriteUnit {
    secondary: [u8; 32],
    slots: [Slot; 8],
    count: u8,
    /// OAM entry 0 is in slot 0.
    zero_on_line: bool,
}

impl Default for SpriteUnit {
    fn default() -> Self {
        Self {
            secondary: [0xFF; 32],
            slots: [Slot::default(); 8],
            count: 0,
            zero_on_line: false,
        }
    }
}

impl SpriteUnit {
    pub(crate) fn clear_line(&mut self) {
        self.slots = [Slot::default(); 8];
        self.count = 0;
        self.zero_on_line = false;
    }

    #[must_use]
    pub const fn count(&self) -> u8 {
        self.count
    }
}

/// An opaque sprite pixel.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SpritePixel {
    pixel: u8,
    palette: u8,
    pub(crate) behind: bool,
    pub(crate) zero: bool,
}

impl SpritePixel {
    /// Offset in palette RAM.
    pub(crate) const fn palette_addr(self) -> u8 {
        0x10 | (self.palette << 2) | self.pixel
    }
}

impl Ppu {
    /// Pick the sprites covering the next scanline and fetch their
    /// patterns.
    pub(crate) fn evaluate_sprites<B: VideoBus + ?Sized>(&mut self, bus: &mut B) {
        let height = self.ctrl.sprite_height();
        let line = self.scanline;
        let in_range = |y: u8| line.wrapping_sub(u16::from(y)) < height;

        let unit = &mut self.sprites;
        unit.secondary = [0xFF; 32];
        unit.count = 0;
        unit.zero_on_line = false;

        for n in 0..64 {
            if !in_range(self.oam[n * 4]) {
                continue;
            }
            if unit.count < 8 {
                let dst = usize::from(unit.count) * 4;
                unit.secondary[dst..dst + 4].copy_from_slice(&self.oam[n * 4..n * 4 + 4]);
                unit.zero_on_line |= n == 0;
                unit.count += 1;
                continue;
            }
            // With eight sprites found the hardware keeps scanning, but
            // it advances the byte index together with the sprite index
            // on every miss, comparing tile, attribute and X bytes as if
            // they were Y coordinates.
            let mut m = 0;
            for n in n + 1..64 {
                if in_range(self.oam[(n * 4 + m) & 0xFF]) {
                    self.status.set_bits(status::OVERFLOW, true);
                    break;
                }
                m = (m + 1) & 3;
            }
            break;
        }

        for i in 0..8 {
            if i >= usize::from(self.sprites.count) {
                self.sprites.slots[i] = Slot::default();
                continue;
            }
            let entry = &self.sprites.secondary[i * 4..i * 4 + 4];
            let (y, tile, attr, x) = (entry[0], entry[1], entry[2], entry[3]);

            let mut row = line.wrapping_sub(u16::from(y));
            if attr & 0x80 != 0 {
                row = height - 1 - row;
            }
            let (table, tile) = if height == 16 {
                // 8x16: bit 0 picks the table, the bottom half is the next tile.
                (u16::from(tile & 1) * 0x1000, (tile & 0xFE) + u8::from(row >= 8))
            } else {
                (self.ctrl.sprite_table(), tile)
            };
            let addr = table + u16::from(tile) * 16 + (row & 7);
            let mut lo = bus.read(addr);
            let mut hi = bus.read(addr + 8);
            if attr & 0x40 != 0 {
                lo = lo.reverse_bits();
                hi = hi.reverse_bits();
            }
            self.sprites.slots[i] = Slot { x, attr, lo, hi };
        }
    }

    /// First opaque sprite pixel at column `x`, in OAM order.
    pub(crate) fn sprite_pixel(&self, x: usize) -> Option<SpritePixel> {
        if !self.mask.sprites() || (x < 8 && !self.mask.sprites_left()) {
            return None;
        }
        let unit = &self.sprites;
        unit.slots[..usize::from(unit.count)]
            .iter()
            .enumerate()
            .find_map(|(i, slot)| {
                let offset = x.checked_sub(usize::from(slot.x)).filter(|&o| o < 8)?;
                let shift = 7 - offset;
                let pixel = (((slot.hi >> shift) & 1) << 1) | ((slot.lo >> shift) & 1);
                (pixel != 0).then_some(SpritePixel {
                    pixel,
                    palette: slot.attr & 0x03,
                    behind: slot.attr & 0x20 != 0,
                    zero: unit.zero_on_line && i == 0,
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{Ctrl, Mask, PpuReg};

    struct Chr([u8; 0x2000]);

    impl VideoBus for Chr {
        fn read(&mut self, addr: u16) -> u8 {
            self.peek(addr)
        }

        fn write(&mut self, _addr: u16, _val: u8) {}

        fn peek(&self, addr: u16) -> u8 {
            self.0.get(usize::from(addr)).copied().unwrap_or(0)
        }
    }

    fn ppu_on_line(line: u16) -> Ppu {
        let mut ppu = Ppu::new(false);
        ppu.scanline = line;
        ppu.oam.fill(200);
        ppu
    }

    #[test]
    fn oam_data_reads_during_evaluation_window() {
        let mut ppu = ppu_on_line(50);
        ppu.mask = Mask(0x18);
        ppu.oam_addr = 5;
        ppu.oam[5] = 0x42;
        ppu.dot = 30;
        assert_eq!(ppu.peek(PpuReg::OamData), 0xFF);
        ppu.dot = 100;
        assert_eq!(ppu.peek(PpuReg::OamData), 0x42);
    }

    #[test]
    fn selects_at_most_eight() {
        let mut ppu = ppu_on_line(50);
        for n in 0..10 {
            ppu.oam[n * 4] = 45;
        }
        ppu.evaluate_sprites(&mut Chr([0; 0x2000]));
        assert_eq!(ppu.sprites.count(), 8);
        assert!(ppu.sprites.zero_on_line);
        assert!(ppu.status.bit(status::OVERFLOW));
    }

    #[test]
    fn overflow_bug_misses_real_overflow() {
        let mut ppu = ppu_on_line(50);
        for n in 0..9 {
            ppu.oam[n * 4] = 50;
        }
        // The scan after the ninth hit reads the true Y byte only for
        // sprites 9, 13, 17, ...; every other sprite is compared on a
        // tile, attribute or X byte.
        for n in 9..64 {
            if (n - 9) % 4 != 0 {
                ppu.oam[n * 4] = 50;
            }
        }
        ppu.evaluate_sprites(&mut Chr([0; 0x2000]));
        assert_eq!(ppu.sprites.count(), 8);
        assert!(!ppu.status.bit(status::OVERFLOW));
    }

    #[test]
    fn overflow_bug_false_positive() {
        let mut ppu = ppu_on_line(50);
        for n in 0..9 {
            ppu.oam[n * 4] = 50;
        }
        // Sprite 10 is compared on its tile byte.
        ppu.oam[10 * 4 + 1] = 50;
        ppu.evaluate_sprites(&mut Chr([0; 0x2000]));
        assert!(ppu.status.bit(status::OVERFLOW));
    }

    #[test]
    fn fetches_flipped_patterns() {
        let mut chr = [0u8; 0x2000];
        // Tile 2, row 3: low plane 0b1000_0000.
        chr[2 * 16 + 3] = 0x80;
        let mut ppu = ppu_on_line(13);
        ppu.oam[0..4].copy_from_slice(&[10, 2, 0x40, 100]);
        ppu.mask = Mask(0x14);
        ppu.evaluate_sprites(&mut Chr(chr));
        assert_eq!(ppu.sprites.slots[0].lo, 0x01);
        let px = ppu.sprite_pixel(107).map(|p| p.palette_addr());
        assert_eq!(px, Some(0x11));
        assert!(ppu.sprite_pixel(106).is_none());
    }

    #[test]
    fn tall_sprites_use_tile_bit_zero_as_table() {
        let mut chr = [0u8; 0x2000];
        // Bottom half of the pair at $1000: tile 5, row 1.
        chr[0x1000 + 5 * 16 + 1] = 0xFF;
        let mut ppu = ppu_on_line(9);
        ppu.ctrl = Ctrl(0x20);
        ppu.oam[0..4].copy_from_slice(&[0, 5, 0, 0]);
        ppu.evaluate_sprites(&mut Chr(chr));
        assert_eq!(ppu.sprites.slots[0].lo, 0xFF);
    }

    #[test]
    fn left_column_clipping() {
        let mut chr = [0u8; 0x2000];
        chr[0] = 0xFF;
        let mut ppu = ppu_on_line(0);
        ppu.oam[0..4].copy_from_slice(&[0, 0, 0, 0]);
        ppu.mask = Mask(0x10);
        ppu.evaluate_sprites(&mut Chr(chr));
        assert!(ppu.sprite_pixel(3).is_none());
        ppu.mask = Mask(0x14);
        assert!(ppu.sprite_pixel(3).is_some());
    }
}
