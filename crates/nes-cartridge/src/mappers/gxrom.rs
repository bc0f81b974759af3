use emu_core::{Observable, Value};
use log::trace;

use crate::base::check;
use crate::{Base, Buses, CartridgeError, Mapper, Mirroring, Rom};

/// GxROM (mapper 66): one register selecting a 32 KB PRG bank (bits 4-5)
/// and an 8 KB CHR bank (bits 0-1).
pub struct GxRom {
    base: Base,
    prg_bank: u8,
    chr_bank: u8,
}

impl GxRom {
    pub fn new(rom: &Rom, bus: &mut Buses<'_>) -> Result<Self, CartridgeError> {
        let base = Base::new(rom, bus, true)?;
        base.map_prg(bus.cpu, 0x8000, 0x8000, 0)?;
        base.map_chr(bus.ppu, 0x0000, 0x2000, 0)?;
        Ok(Self {
            base,
            prg_bank: 0,
            chr_bank: 0,
        })
    }
}

impl Mapper for GxRom {
    fn name(&self) -> &'static str {
        "GxROM"
    }

    fn write(&mut self, _addr: u16, val: u8, _cycle: i64, bus: &mut Buses<'_>) {
        let prg = (val >> 4) & 0x03;
        let chr = val & 0x03;
        if prg != self.prg_bank {
            trace!("GxROM: PRG bank {} -> {prg}", self.prg_bank);
            self.prg_bank = prg;
            check(self.name(), self.base.map_prg(bus.cpu, 0x8000, 0x8000, i32::from(prg)));
        }
        if chr != self.chr_bank {
            trace!("GxROM: CHR bank {} -> {chr}", self.chr_bank);
            self.chr_bank = chr;
            check(self.name(), self.base.map_chr(bus.ppu, 0x0000, 0x2000, i32::from(chr)));
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.base.mirroring()
    }
}

impl Observable for GxRom {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "prg_bank" => Some(self.prg_bank.into()),
            "chr_bank" => Some(self.chr_bank.into()),
            "mirroring" => Some(format!("{:?}", self.mirroring()).into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["prg_bank", "chr_bank", "mirroring"]
    }
}
