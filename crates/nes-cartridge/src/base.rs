//! Memory plumbing shared by every board: PRG/CHR windows, work RAM and
//! nametable mirroring.

use emu_core::map::{Access, BlockId, MapError, MemMap, Region};
use log::{debug, error};

use crate::{CartridgeError, Mirroring, Rom};

/// The two buses a cartridge is plugged into.
pub struct Buses<'a> {
    pub cpu: &'a mut dyn MemMap,
    pub ppu: &'a mut dyn MemMap,
}

const DEFAULT_PRG_RAM: usize = 0x2000;
const DEFAULT_CHR_RAM: usize = 0x2000;
const NAMETABLE: u32 = 0x400;

/// Blocks a board owns on the two buses.
#[derive(Debug)]
pub struct Base {
    prg: BlockId,
    prg_len: u32,
    chr: BlockId,
    chr_len: u32,
    chr_access: Access,
    prg_ram: BlockId,
    prg_ram_len: u32,
    vram: BlockId,
    mirroring: Mirroring,
    /// PRG windows report writes back to the mapper.
    registers: bool,
}

impl Base {
    /// Copy the ROM into blocks on both buses and map work RAM and the
    /// header's nametable mirroring. PRG and CHR windows are left to the
    /// board.
    pub fn new(rom: &Rom, bus: &mut Buses<'_>, registers: bool) -> Result<Self, CartridgeError> {
        let prg_len = rom.prg_rom.len();
        if prg_len < 0x2000 || !prg_len.is_power_of_two() || prg_len > 1 << 24 {
            return Err(CartridgeError::BadPrgSize(prg_len));
        }
        let chr_len = rom.chr_rom.len();
        if chr_len != 0 && (chr_len < 0x2000 || !chr_len.is_power_of_two() || chr_len > 1 << 24) {
            return Err(CartridgeError::BadChrSize(chr_len));
        }

        let prg = bus.cpu.add_block(rom.prg_rom.clone());
        let (chr, chr_access) = if chr_len == 0 {
            let size = ram_len(rom.chr_ram_size, DEFAULT_CHR_RAM);
            (bus.ppu.add_block(vec![0; size]), Access::ReadWrite)
        } else {
            (bus.ppu.add_block(rom.chr_rom.clone()), Access::ReadOnly)
        };
        let chr_len = bus.ppu.block(chr).len() as u32;

        let prg_ram_len = ram_len(rom.prg_ram_size, DEFAULT_PRG_RAM);
        let prg_ram = bus.cpu.add_block(vec![0; prg_ram_len]);

        let vram_len = if rom.mirroring == Mirroring::FourScreen { 4 } else { 2 };
        let vram = bus.ppu.add_block(vec![0; vram_len * NAMETABLE as usize]);

        let mut base = Self {
            prg,
            prg_len: prg_len as u32,
            chr,
            chr_len,
            chr_access,
            prg_ram,
            prg_ram_len: prg_ram_len as u32,
            vram,
            mirroring: rom.mirroring,
            registers,
        };
        base.map_prg_ram(bus.cpu, true)?;
        base.set_mirroring(bus.ppu, rom.mirroring)?;
        Ok(base)
    }

    /// Map PRG ROM page `page` (counted in `window`-sized units, negative
    /// from the end) at `begin`.
    ///
    /// A ROM smaller than the window is mirrored across it.
    pub fn map_prg(
        &self,
        cpu: &mut dyn MemMap,
        begin: u16,
        window: u32,
        page: i32,
    ) -> Result<(), MapError> {
        let size = window.min(self.prg_len);
        let mut region = Region::new(self.prg, page_base(self.prg_len, size, page), size)
            .access(if self.registers {
                Access::ReadOnlySilent
            } else {
                Access::ReadOnly
            });
        if self.registers {
            region = region.notify();
        }
        cpu.map_mem(begin, window_end(begin, window), region, true)
    }

    /// Map CHR page `page` (in `window`-sized units, negative from the end)
    /// at PPU address `begin`.
    pub fn map_chr(
        &self,
        ppu: &mut dyn MemMap,
        begin: u16,
        window: u32,
        page: i32,
    ) -> Result<(), MapError> {
        let size = window.min(self.chr_len);
        let region = Region::new(self.chr, page_base(self.chr_len, size, page), size)
            .access(self.chr_access);
        ppu.map_mem(begin, window_end(begin, window), region, true)
    }

    /// Number of `window`-sized PRG pages.
    #[must_use]
    pub const fn prg_pages(&self, window: u32) -> u32 {
        let pages = self.prg_len / window;
        if pages == 0 { 1 } else { pages }
    }

    /// Map or unmap the work RAM at $6000-$7FFF.
    pub fn map_prg_ram(&self, cpu: &mut dyn MemMap, enabled: bool) -> Result<(), MapError> {
        if enabled {
            let size = self.prg_ram_len.min(0x2000);
            cpu.map_mem(0x6000, 0x7FFF, Region::new(self.prg_ram, 0, size), true)
        } else {
            cpu.unmap(0x6000, 0x7FFF);
            Ok(())
        }
    }

    #[must_use]
    pub const fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    /// Point the four nametables (and their $3000 mirror) at VRAM pages.
    pub fn set_mirroring(&mut self, ppu: &mut dyn MemMap, mirroring: Mirroring) -> Result<(), MapError> {
        let pages = ppu.block(self.vram).len() as u32 / NAMETABLE;
        for (i, page) in mirroring.pages().into_iter().enumerate() {
            let region = Region::new(self.vram, u32::from(page) % pages * NAMETABLE, NAMETABLE);
            let begin = 0x2000 + i as u16 * 0x400;
            ppu.map_mem(begin, begin + 0x3FF, region, true)?;
            let mirror = begin + 0x1000;
            ppu.map_mem(mirror, (mirror + 0x3FF).min(0x3EFF), region, true)?;
        }
        if mirroring != self.mirroring {
            debug!("mirroring {:?} -> {mirroring:?}", self.mirroring);
        }
        self.mirroring = mirroring;
        Ok(())
    }

    /// Value a write lands with when the ROM drives the data bus too.
    #[must_use]
    pub fn bus_conflict(cpu: &dyn MemMap, addr: u16, val: u8) -> u8 {
        cpu.peek_mem(addr).map_or(val, |rom| rom & val)
    }
}

/// Log a bank switch that could not be applied. Sizes are checked at load
/// time, so this only fires on a board bug.
pub(crate) fn check(board: &str, result: Result<(), MapError>) {
    if let Err(e) = result {
        error!("{board}: bank switch failed: {e}");
    }
}

fn ram_len(requested: usize, default: usize) -> usize {
    if requested == 0 {
        default
    } else {
        requested.next_power_of_two()
    }
}

fn page_base(len: u32, size: u32, page: i32) -> u32 {
    let count = (len / size).max(1) as i32;
    page.rem_euclid(count) as u32 * size
}

fn window_end(begin: u16, window: u32) -> u16 {
    (u32::from(begin) + window - 1).min(0xFFFF) as u16
}
