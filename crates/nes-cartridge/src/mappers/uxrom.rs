use emu_core::{Observable, Value};
use log::trace;

use crate::base::check;
use crate::{Base, Buses, CartridgeError, Mapper, Mirroring, Rom};

/// UxROM (mapper 2): switchable 16 KB bank at $8000, last bank fixed at
/// $C000.
pub struct UxRom {
    base: Base,
    bank: u8,
    bank_mask: u8,
    bus_conflicts: bool,
}

impl UxRom {
    pub fn new(rom: &Rom, bus: &mut Buses<'_>) -> Result<Self, CartridgeError> {
        let base = Base::new(rom, bus, true)?;
        base.map_prg(bus.cpu, 0x8000, 0x4000, 0)?;
        base.map_prg(bus.cpu, 0xC000, 0x4000, -1)?;
        base.map_chr(bus.ppu, 0x0000, 0x2000, 0)?;
        let bank_mask = (base.prg_pages(0x4000) - 1) as u8;
        Ok(Self {
            base,
            bank: 0,
            bank_mask,
            bus_conflicts: rom.submapper == 2,
        })
    }
}

impl Mapper for UxRom {
    fn name(&self) -> &'static str {
        "UxROM"
    }

    fn write(&mut self, addr: u16, val: u8, _cycle: i64, bus: &mut Buses<'_>) {
        let val = if self.bus_conflicts {
            Base::bus_conflict(bus.cpu, addr, val)
        } else {
            val
        };
        let bank = val & self.bank_mask;
        if bank != self.bank {
            trace!("UxROM: PRG bank {} -> {bank}", self.bank);
            self.bank = bank;
            check(self.name(), self.base.map_prg(bus.cpu, 0x8000, 0x4000, i32::from(bank)));
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.base.mirroring()
    }
}

impl Observable for UxRom {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "prg_bank" => Some(self.bank.into()),
            "mirroring" => Some(format!("{:?}", self.mirroring()).into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["prg_bank", "mirroring"]
    }
}
