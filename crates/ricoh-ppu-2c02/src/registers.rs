//! CPU-visible PPU registers and the internal scroll address.

use emu_core::map::{RegAccess, RegDesc};

/// A PPU register, as decoded from the CPU address ($2000 + n, mirrored
/// every 8 bytes up to $3FFF).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpuReg {
    Ctrl,
    Mask,
    Status,
    OamAddr,
    OamData,
    Scroll,
    Addr,
    Data,
}

const fn reg(name: &'static str, offset: u16, access: RegAccess, id: PpuReg) -> RegDesc<PpuReg> {
    RegDesc {
        name,
        offset,
        bank: 0,
        access,
        romask: 0,
        id,
    }
}

/// $2002. CPU writes never reach the flags.
pub(crate) const PPUSTATUS: RegDesc<PpuReg> = reg("PPUSTATUS", 2, RegAccess::ReadOnly, PpuReg::Status).with_romask(0xFF);

/// The eight registers, relative to $2000.
pub const REGISTERS: &[RegDesc<PpuReg>] = &[
    reg("PPUCTRL", 0, RegAccess::WriteOnly, PpuReg::Ctrl),
    reg("PPUMASK", 1, RegAccess::WriteOnly, PpuReg::Mask),
    PPUSTATUS,
    reg("OAMADDR", 3, RegAccess::WriteOnly, PpuReg::OamAddr),
    reg("OAMDATA", 4, RegAccess::ReadWrite, PpuReg::OamData),
    reg("PPUSCROLL", 5, RegAccess::WriteOnly, PpuReg::Scroll),
    reg("PPUADDR", 6, RegAccess::WriteOnly, PpuReg::Addr),
    reg("PPUDATA", 7, RegAccess::ReadWrite, PpuReg::Data),
];

impl PpuReg {
    /// Register selected by a CPU address in $2000-$3FFF.
    #[must_use]
    pub const fn from_addr(addr: u16) -> Self {
        match addr & 7 {
            0 => Self::Ctrl,
            1 => Self::Mask,
            2 => Self::Status,
            3 => Self::OamAddr,
            4 => Self::OamData,
            5 => Self::Scroll,
            6 => Self::Addr,
            _ => Self::Data,
        }
    }
}

/// PPUCTRL ($2000).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ctrl(pub u8);

impl Ctrl {
    pub const fn nametable(self) -> u8 {
        self.0 & 0x03
    }

    /// VRAM address step after a PPUDATA access.
    pub const fn increment(self) -> u16 {
        if self.0 & 0x04 != 0 { 32 } else { 1 }
    }

    /// Pattern table base for 8x8 sprites.
    pub const fn sprite_table(self) -> u16 {
        if self.0 & 0x08 != 0 { 0x1000 } else { 0 }
    }

    pub const fn bg_table(self) -> u16 {
        if self.0 & 0x10 != 0 { 0x1000 } else { 0 }
    }

    pub const fn sprite_height(self) -> u16 {
        if self.0 & 0x20 != 0 { 16 } else { 8 }
    }

    pub const fn nmi(self) -> bool {
        self.0 & 0x80 != 0
    }
}

/// PPUMASK ($2001).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mask(pub u8);

impl Mask {
    pub const fn greyscale(self) -> bool {
        self.0 & 0x01 != 0
    }

    pub const fn bg_left(self) -> bool {
        self.0 & 0x02 != 0
    }

    pub const fn sprites_left(self) -> bool {
        self.0 & 0x04 != 0
    }

    pub const fn bg(self) -> bool {
        self.0 & 0x08 != 0
    }

    pub const fn sprites(self) -> bool {
        self.0 & 0x10 != 0
    }

    pub const fn rendering(self) -> bool {
        self.0 & 0x18 != 0
    }

    /// Emphasis bits: bit 0 red, bit 1 green, bit 2 blue.
    pub const fn emphasis(self) -> u8 {
        self.0 >> 5
    }
}

/// PPUSTATUS bits.
pub mod status {
    pub const OVERFLOW: u8 = 0x20;
    pub const SPRITE0_HIT: u8 = 0x40;
    pub const VBLANK: u8 = 0x80;
}

/// The 15-bit VRAM address / scroll register ("loopy" v and t).
///
/// ```text
/// yyy NN YYYYY XXXXX
/// ||| || ||||| +++++-- coarse X
/// ||| || +++++-------- coarse Y
/// ||| ++-------------- nametable select
/// +++----------------- fine Y
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Loopy(pub u16);

impl Loopy {
    pub const fn coarse_x(self) -> u16 {
        self.0 & 0x1F
    }

    pub const fn coarse_y(self) -> u16 {
        (self.0 >> 5) & 0x1F
    }

    pub const fn nametable(self) -> u16 {
        (self.0 >> 10) & 0x03
    }

    pub const fn fine_y(self) -> u16 {
        (self.0 >> 12) & 0x07
    }

    pub fn set_coarse_x(&mut self, v: u8) {
        self.0 = (self.0 & !0x001F) | (u16::from(v) & 0x1F);
    }

    pub fn set_coarse_y(&mut self, v: u8) {
        self.0 = (self.0 & !0x03E0) | ((u16::from(v) & 0x1F) << 5);
    }

    pub fn set_nametable(&mut self, v: u8) {
        self.0 = (self.0 & !0x0C00) | ((u16::from(v) & 0x03) << 10);
    }

    pub fn set_fine_y(&mut self, v: u8) {
        self.0 = (self.0 & !0x7000) | ((u16::from(v) & 0x07) << 12);
    }

    /// Address on the PPU bus (14 bits).
    pub const fn addr(self) -> u16 {
        self.0 & 0x3FFF
    }

    /// Nametable byte address of the current tile.
    pub const fn nt_addr(self) -> u16 {
        0x2000 | (self.0 & 0x0FFF)
    }

    /// Attribute byte address of the current tile.
    pub const fn at_addr(self) -> u16 {
        0x23C0 | (self.nametable() << 10) | ((self.coarse_y() >> 2) << 3) | (self.coarse_x() >> 2)
    }

    /// Shift selecting the tile's 2-bit palette in its attribute byte.
    pub const fn at_shift(self) -> u16 {
        ((self.coarse_y() & 2) << 1) | (self.coarse_x() & 2)
    }

    pub fn increment_x(&mut self) {
        if self.coarse_x() == 31 {
            self.0 = (self.0 & !0x001F) ^ 0x0400;
        } else {
            self.0 += 1;
        }
    }

    pub fn increment_y(&mut self) {
        if self.fine_y() < 7 {
            self.0 += 0x1000;
            return;
        }
        self.0 &= !0x7000;
        match self.coarse_y() {
            29 => {
                self.set_coarse_y(0);
                self.0 ^= 0x0800;
            }
            31 => self.set_coarse_y(0),
            y => self.set_coarse_y(y as u8 + 1),
        }
    }

    /// v: ....A.. ...BCDEF <- t
    pub fn copy_horizontal(&mut self, t: Self) {
        self.0 = (self.0 & !0x041F) | (t.0 & 0x041F);
    }

    /// v: GHIA.BC DEF..... <- t
    pub fn copy_vertical(&mut self, t: Self) {
        self.0 = (self.0 & !0x7BE0) | (t.0 & 0x7BE0);
    }
}
