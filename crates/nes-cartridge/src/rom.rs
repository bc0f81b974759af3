//! Cartridge contents and the iNES / NES 2.0 file reader.

use crate::CartridgeError;

/// Nametable arrangement of the two CIRAM pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mirroring {
    /// $2000=$2400 (A), $2800=$2C00 (B).
    #[default]
    Horizontal,
    /// $2000=$2800 (A), $2400=$2C00 (B).
    Vertical,
    /// Four distinct nametables backed by cartridge VRAM.
    FourScreen,
    OneScreenA,
    OneScreenB,
}

impl Mirroring {
    /// CIRAM page used by each of the four logical nametables.
    #[must_use]
    pub const fn pages(self) -> [u8; 4] {
        match self {
            Self::Horizontal => [0, 0, 1, 1],
            Self::Vertical => [0, 1, 0, 1],
            Self::FourScreen => [0, 1, 2, 3],
            Self::OneScreenA => [0, 0, 0, 0],
            Self::OneScreenB => [1, 1, 1, 1],
        }
    }
}

/// A loaded cartridge image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rom {
    pub prg_rom: Vec<u8>,
    /// Empty when the board has CHR RAM instead.
    pub chr_rom: Vec<u8>,
    pub mapper_id: u16,
    pub submapper: u8,
    pub mirroring: Mirroring,
    pub has_battery: bool,
    /// Bytes of work RAM at $6000. Zero means the board default.
    pub prg_ram_size: usize,
    /// Bytes of CHR RAM. Zero means the board default.
    pub chr_ram_size: usize,
}

pub const MAGIC: &[u8; 4] = b"NES\x1A";
const HEADER_LEN: usize = 16;
const TRAINER_LEN: usize = 512;

impl Rom {
    /// Parse an iNES or NES 2.0 image.
    pub fn from_ines(data: &[u8]) -> Result<Self, CartridgeError> {
        let header: &[u8; HEADER_LEN] = data
            .get(..HEADER_LEN)
            .and_then(|h| h.try_into().ok())
            .ok_or(CartridgeError::TooShort {
                expected: HEADER_LEN,
                got: data.len(),
            })?;
        if &header[..4] != MAGIC {
            return Err(CartridgeError::BadMagic);
        }

        let nes2 = header[7] & 0x0C == 0x08;
        let flags6 = header[6];
        let mut mapper_id = u16::from(flags6 >> 4) | u16::from(header[7] & 0xF0);
        let mut submapper = 0;
        let (prg_len, chr_len, prg_ram_size, chr_ram_size);
        if nes2 {
            mapper_id |= u16::from(header[8] & 0x0F) << 8;
            submapper = header[8] >> 4;
            prg_len = rom_size(header[4], header[9] & 0x0F, 0x4000);
            chr_len = rom_size(header[5], header[9] >> 4, 0x2000);
            prg_ram_size = ram_size(header[10] & 0x0F) + ram_size(header[10] >> 4);
            chr_ram_size = ram_size(header[11] & 0x0F) + ram_size(header[11] >> 4);
        } else {
            prg_len = usize::from(header[4]) * 0x4000;
            chr_len = usize::from(header[5]) * 0x2000;
            prg_ram_size = usize::from(header[8]) * 0x2000;
            chr_ram_size = 0;
        }

        let mirroring = if flags6 & 0x08 != 0 {
            Mirroring::FourScreen
        } else if flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let mut off = HEADER_LEN;
        if flags6 & 0x04 != 0 {
            off += TRAINER_LEN;
        }
        let expected = off + prg_len + chr_len;
        if data.len() < expected {
            return Err(CartridgeError::TooShort {
                expected,
                got: data.len(),
            });
        }

        Ok(Self {
            prg_rom: data[off..off + prg_len].to_vec(),
            chr_rom: data[off + prg_len..expected].to_vec(),
            mapper_id,
            submapper,
            mirroring,
            has_battery: flags6 & 0x02 != 0,
            prg_ram_size,
            chr_ram_size,
        })
    }
}

/// NES 2.0 ROM size: a 12-bit unit count, or exponent-multiplier notation
/// when the high nibble is $F.
fn rom_size(lsb: u8, msb: u8, unit: usize) -> usize {
    if msb == 0x0F {
        let exp = u32::from(lsb >> 2);
        let mul = usize::from(lsb & 3) * 2 + 1;
        1usize.checked_shl(exp).map_or(0, |n| n * mul)
    } else {
        (usize::from(msb) << 8 | usize::from(lsb)) * unit
    }
}

/// NES 2.0 RAM size: `64 << shift`, zero meaning none.
fn ram_size(shift: u8) -> usize {
    if shift == 0 { 0 } else { 64 << shift }
}
