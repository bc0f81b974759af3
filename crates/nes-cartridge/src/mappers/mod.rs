//! Board implementations.

mod axrom;
mod cnrom;
mod gxrom;
mod mmc1;
mod nrom;
mod uxrom;

pub use axrom::AxRom;
pub use cnrom::CnRom;
pub use gxrom::GxRom;
pub use mmc1::Mmc1;
pub use nrom::Nrom;
pub use uxrom::UxRom;

#[cfg(test)]
pub(crate) mod testing {
    use emu_core::map::{MemMap, Table};

    use crate::{Buses, Mirroring, Rom};

    /// Bare CPU and PPU tables for a board to map onto.
    pub struct Rig {
        pub cpu: Table<()>,
        pub ppu: Table<()>,
    }

    impl Rig {
        pub fn new() -> Self {
            Self {
                cpu: Table::new("cpu"),
                ppu: Table::new("ppu"),
            }
        }

        pub fn buses(&mut self) -> Buses<'_> {
            Buses {
                cpu: &mut self.cpu,
                ppu: &mut self.ppu,
            }
        }

        pub fn cpu(&self, addr: u16) -> Option<u8> {
            self.cpu.peek_mem(addr)
        }

        pub fn ppu(&self, addr: u16) -> Option<u8> {
            self.ppu.peek_mem(addr)
        }
    }

    /// Every byte of PRG holds its 16 KB bank number, every byte of CHR its
    /// 4 KB bank number.
    pub fn rom(mapper_id: u16, prg_banks: usize, chr_banks: usize) -> Rom {
        Rom {
            prg_rom: (0..prg_banks * 0x4000).map(|i| (i >> 14) as u8).collect(),
            chr_rom: (0..chr_banks * 0x2000).map(|i| (i >> 12) as u8).collect(),
            mapper_id,
            mirroring: Mirroring::Vertical,
            ..Rom::default()
        }
    }
}
