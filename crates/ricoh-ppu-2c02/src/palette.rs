//! Master palette and palette RAM.

/// 2C02 master palette as 0xRRGGBB.
#[rustfmt::skip]
pub const PALETTE: [u32; 64] = [
    0x7C7C7C, 0x0000FC, 0x0000BC, 0x4428BC, 0x940084, 0xA80020, 0xA81000, 0x881400,
    0x503000, 0x007800, 0x006800, 0x005800, 0x004058, 0x000000, 0x000000, 0x000000,
    0xBCBCBC, 0x0078F8, 0x0058F8, 0x6844FC, 0xD800CC, 0xE40058, 0xF83800, 0xE45C10,
    0xAC7C00, 0x00B800, 0x00A800, 0x00A844, 0x008888, 0x000000, 0x000000, 0x000000,
    0xF8F8F8, 0x3CBCFC, 0x6888FC, 0x9878F8, 0xF878F8, 0xF85898, 0xF87858, 0xFCA044,
    0xF8B800, 0xB8F818, 0x58D854, 0x58F898, 0x00E8D8, 0x787878, 0x000000, 0x000000,
    0xFCFCFC, 0xA4E4FC, 0xB8B8F8, 0xD8B8F8, 0xF8B8F8, 0xF8A4C0, 0xF0D0B0, 0xFCE0A8,
    0xF8D878, 0xD8F878, 0xB8F8B8, 0xB8F8D8, 0x00FCFC, 0xF8D8F8, 0x000000, 0x000000,
];

/// Palette RAM contents seen at power on.
#[rustfmt::skip]
const POWER_ON: [u8; 32] = [
    0x09, 0x01, 0x00, 0x01, 0x00, 0x02, 0x02, 0x0D, 0x08, 0x10, 0x08, 0x24, 0x00, 0x00, 0x04, 0x2C,
    0x09, 0x01, 0x34, 0x03, 0x00, 0x04, 0x00, 0x14, 0x08, 0x3A, 0x00, 0x02, 0x00, 0x20, 0x2C, 0x08,
];

/// The 32 bytes at $3F00-$3F1F (mirrored up to $3FFF).
///
/// Entries $10/$14/$18/$1C are the same cells as $00/$04/$08/$0C.
#[derive(Debug, Clone)]
pub struct PaletteRam([u8; 32]);

impl Default for PaletteRam {
    fn default() -> Self {
        Self(POWER_ON)
    }
}

impl PaletteRam {
    const fn index(addr: u16) -> usize {
        let i = (addr & 0x1F) as usize;
        if i & 0x13 == 0x10 { i & 0x0F } else { i }
    }

    /// Six-bit colour index at `addr`.
    #[must_use]
    pub const fn read(&self, addr: u16) -> u8 {
        self.0[Self::index(addr)] & 0x3F
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        self.0[Self::index(addr)] = val & 0x3F;
    }

    pub fn power_on(&mut self) {
        self.0 = POWER_ON;
    }
}

/// Convert a colour index to RGBA bytes, applying greyscale and the
/// emphasis bits of PPUMASK.
///
/// Each emphasis bit dims the two other primaries to 13/16.
#[must_use]
pub fn to_rgba(index: u8, greyscale: bool, emphasis: u8) -> [u8; 4] {
    let index = if greyscale { index & 0x30 } else { index & 0x3F };
    let rgb = PALETTE[usize::from(index)];
    let mut c = [(rgb >> 16) & 0xFF, (rgb >> 8) & 0xFF, rgb & 0xFF];
    if emphasis != 0 {
        for (bit, keep) in [(1, 0), (2, 1), (4, 2)] {
            if emphasis & bit != 0 {
                for (i, ch) in c.iter_mut().enumerate() {
                    if i != keep {
                        *ch = *ch * 13 / 16;
                    }
                }
            }
        }
    }
    [c[0] as u8, c[1] as u8, c[2] as u8, 0xFF]
}
