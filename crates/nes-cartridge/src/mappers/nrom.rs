use emu_core::{Observable, Value};
use log::trace;

use crate::{Base, Buses, CartridgeError, Mapper, Mirroring, Rom};

/// NROM (mapper 0): 16 or 32 KB PRG, 8 KB CHR, no registers.
pub struct Nrom {
    base: Base,
}

impl Nrom {
    pub fn new(rom: &Rom, bus: &mut Buses<'_>) -> Result<Self, CartridgeError> {
        let base = Base::new(rom, bus, false)?;
        base.map_prg(bus.cpu, 0x8000, 0x8000, 0)?;
        base.map_chr(bus.ppu, 0x0000, 0x2000, 0)?;
        Ok(Self { base })
    }
}

impl Mapper for Nrom {
    fn name(&self) -> &'static str {
        "NROM"
    }

    fn write(&mut self, addr: u16, val: u8, _cycle: i64, _bus: &mut Buses<'_>) {
        trace!("NROM: ignored write ${val:02X} to ${addr:04X}");
    }

    fn mirroring(&self) -> Mirroring {
        self.base.mirroring()
    }
}

impl Observable for Nrom {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "mirroring" => Some(format!("{:?}", self.mirroring()).into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["mirroring"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappers::testing::{Rig, rom};

    #[test]
    fn sixteen_k_is_mirrored() {
        let mut rig = Rig::new();
        let mut rom = rom(0, 1, 1);
        rom.prg_rom[0x3FFC] = 0x34;
        rom.prg_rom[0x3FFD] = 0x12;
        Nrom::new(&rom, &mut rig.buses()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(rig.cpu(0xBFFC), Some(0x34));
        assert_eq!(rig.cpu(0xFFFD), Some(0x12));
    }

    #[test]
    fn thirty_two_k_is_linear() {
        let mut rig = Rig::new();
        Nrom::new(&rom(0, 2, 1), &mut rig.buses()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(rig.cpu(0x8000), Some(0));
        assert_eq!(rig.cpu(0xC000), Some(1));
        assert_eq!(rig.ppu(0x1000), Some(1));
    }

    #[test]
    fn header_mirroring_applies() {
        let mut rig = Rig::new();
        let nrom = Nrom::new(&rom(0, 1, 1), &mut rig.buses()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(nrom.mirroring(), Mirroring::Vertical);
        assert_eq!(nrom.query("mirroring"), Some(Value::String("Vertical".into())));
    }
}
