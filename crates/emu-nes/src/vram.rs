//! The PPU's bus: pattern tables and nametables.
//!
//! Everything below $3F00 is mapped by the cartridge (CHR windows and the
//! CIRAM pages selected by its mirroring). Palette RAM lives in the PPU.

use emu_core::map::{Handler, MemMap, Table};
use log::trace;
use ricoh_ppu_2c02::VideoBus;

pub(crate) struct Vram {
    pub(crate) table: Table<()>,
}

impl Vram {
    pub(crate) fn new() -> Self {
        Self {
            table: Table::new("ppu"),
        }
    }
}

/// An undriven PPU read sees the low address byte still held by the
/// address latch.
const fn undriven(addr: u16) -> u8 {
    addr as u8
}

impl VideoBus for Vram {
    fn read(&mut self, addr: u16) -> u8 {
        self.peek(addr)
    }

    fn write(&mut self, addr: u16, val: u8) {
        match self.table.search(addr) {
            Handler::Mem(slot) => {
                self.table.write_mem(&slot, addr, val);
            }
            _ => trace!("write ${val:02X} to unmapped PPU ${addr:04X}"),
        }
    }

    fn peek(&self, addr: u16) -> u8 {
        self.table.peek_mem(addr).unwrap_or_else(|| undriven(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::map::Region;

    #[test]
    fn unmapped_reads_return_low_address_byte() {
        let mut vram = Vram::new();
        assert_eq!(vram.read(0x1234), 0x34);
    }

    #[test]
    fn writes_reach_mapped_memory() {
        let mut vram = Vram::new();
        let block = vram.table.add_block(vec![0; 0x800]);
        vram.table
            .map_mem(0x2000, 0x27FF, Region::new(block, 0, 0x800), false)
            .unwrap_or_else(|e| panic!("{e}"));
        vram.write(0x2010, 0x99);
        assert_eq!(vram.peek(0x2010), 0x99);
        assert_eq!(vram.table.block(block)[0x10], 0x99);
    }
}
