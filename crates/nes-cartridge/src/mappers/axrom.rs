use emu_core::{Observable, Value};
use log::trace;

use crate::base::check;
use crate::{Base, Buses, CartridgeError, Mapper, Mirroring, Rom};

/// AxROM (mapper 7): 32 KB PRG banks and one-screen mirroring picked by
/// the same register.
pub struct AxRom {
    base: Base,
    bank: u8,
    bus_conflicts: bool,
}

impl AxRom {
    pub fn new(rom: &Rom, bus: &mut Buses<'_>) -> Result<Self, CartridgeError> {
        let mut base = Base::new(rom, bus, true)?;
        base.map_prg(bus.cpu, 0x8000, 0x8000, 0)?;
        base.map_chr(bus.ppu, 0x0000, 0x2000, 0)?;
        base.set_mirroring(bus.ppu, Mirroring::OneScreenA)?;
        Ok(Self {
            base,
            bank: 0,
            bus_conflicts: rom.submapper == 2,
        })
    }
}

impl Mapper for AxRom {
    fn name(&self) -> &'static str {
        "AxROM"
    }

    fn write(&mut self, addr: u16, val: u8, _cycle: i64, bus: &mut Buses<'_>) {
        let val = if self.bus_conflicts {
            Base::bus_conflict(bus.cpu, addr, val)
        } else {
            val
        };
        let bank = val & 0x07;
        if bank != self.bank {
            trace!("AxROM: PRG bank {} -> {bank}", self.bank);
            self.bank = bank;
            check(self.name(), self.base.map_prg(bus.cpu, 0x8000, 0x8000, i32::from(bank)));
        }
        let mirroring = if val & 0x10 != 0 {
            Mirroring::OneScreenB
        } else {
            Mirroring::OneScreenA
        };
        if mirroring != self.base.mirroring() {
            check(self.name(), self.base.set_mirroring(bus.ppu, mirroring));
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.base.mirroring()
    }
}

impl Observable for AxRom {
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
