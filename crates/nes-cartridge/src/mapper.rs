//! The board interface and board selection.

use emu_core::Observable;
use log::info;

use crate::mappers::{AxRom, CnRom, GxRom, Mmc1, Nrom, UxRom};
use crate::{Buses, CartridgeError, Mirroring, Rom};

/// A cartridge board.
///
/// Boards build their mappings on the CPU and PPU buses when loaded. PRG
/// windows of boards with registers are mapped with write notification;
/// the machine forwards every CPU write that lands on them here.
pub trait Mapper: Observable {
    fn name(&self) -> &'static str;

    /// A CPU write hit the register window. `cycle` is the CPU cycle count
    /// at the time of the write.
    fn write(&mut self, addr: u16, val: u8, cycle: i64, bus: &mut Buses<'_>);

    fn mirroring(&self) -> Mirroring;
}

/// Instantiate the board for `rom` and map it onto both buses.
pub fn load(rom: &Rom, bus: &mut Buses<'_>) -> Result<Box<dyn Mapper>, CartridgeError> {
    let mapper: Box<dyn Mapper> = match rom.mapper_id {
        0 => Box::new(Nrom::new(rom, bus)?),
        1 => Box::new(Mmc1::new(rom, bus)?),
        2 => Box::new(UxRom::new(rom, bus)?),
        3 => Box::new(CnRom::new(rom, bus)?),
        7 => Box::new(AxRom::new(rom, bus)?),
        66 => Box::new(GxRom::new(rom, bus)?),
        id => return Err(CartridgeError::UnknownMapper(id)),
    };
    info!(
        "mapper {} ({}), PRG {}K, CHR {}K, {:?}",
        rom.mapper_id,
        mapper.name(),
        rom.prg_rom.len() / 1024,
        rom.chr_rom.len() / 1024,
        mapper.mirroring()
    );
    Ok(mapper)
}
