use emu_core::{Observable, Value};
use log::trace;

use crate::base::check;
use crate::{Base, Buses, CartridgeError, Mapper, Mirroring, Rom};

/// CNROM (mapper 3): fixed PRG, switchable 8 KB CHR bank.
pub struct CnRom {
    base: Base,
    chr_bank: u8,
    bus_conflicts: bool,
}

impl CnRom {
    pub fn new(rom: &Rom, bus: &mut Buses<'_>) -> Result<Self, CartridgeError> {
        let base = Base::new(rom, bus, true)?;
        base.map_prg(bus.cpu, 0x8000, 0x8000, 0)?;
        base.map_chr(bus.ppu, 0x0000, 0x2000, 0)?;
        Ok(Self {
            base,
            chr_bank: 0,
            bus_conflicts: rom.submapper == 2,
        })
    }
}

impl Mapper for CnRom {
    fn name(&self) -> &'static str {
        "CNROM"
    }

    fn write(&mut self, addr: u16, val: u8, _cycle: i64, bus: &mut Buses<'_>) {
        let val = if self.bus_conflicts {
            Base::bus_conflict(bus.cpu, addr, val)
        } else {
            val
        };
        let bank = val & 0x03;
        if bank != self.chr_bank {
            trace!("CNROM: CHR bank {} -> {bank}", self.chr_bank);
            self.chr_bank = bank;
            check(self.name(), self.base.map_chr(bus.ppu, 0x0000, 0x2000, i32::from(bank)));
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.base.mirroring()
    }
}

impl Observable for CnRom {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "chr_bank" => Some(self.chr_bank.into()),
            "mirroring" => Some(format!("{:?}", self.mirroring()).into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["chr_bank", "mirroring"]
    }
}
