use emu_core::map::MapError;
use emu_core::{Observable, Value};
use log::trace;

use crate::base::check;
use crate::{Base, Buses, CartridgeError, Mapper, Mirroring, Rom};

/// MMC1 (mapper 1, SxROM).
///
/// Registers are loaded serially: five writes to $8000-$FFFF shift in bit 0
/// of each value, LSB first, and the fifth write stores the result in the
/// register selected by address bits 13-14. A write with bit 7 set resets
/// the shift register and selects PRG mode 3. The chip ignores a write on
/// the cycle right after another one, so the double write of a
/// read-modify-write instruction only counts once.
pub struct Mmc1 {
    base: Base,
    shift: u8,
    count: u8,
    control: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_bank: u8,
    last_write: Option<i64>,
}

const POWER_ON_CONTROL: u8 = 0x0C;

impl Mmc1 {
    pub fn new(rom: &Rom, bus: &mut Buses<'_>) -> Result<Self, CartridgeError> {
        let mut mmc1 = Self {
            base: Base::new(rom, bus, true)?,
            shift: 0,
            count: 0,
            control: POWER_ON_CONTROL,
            chr_bank0: 0,
            chr_bank1: 0,
            prg_bank: 0,
            last_write: None,
        };
        mmc1.apply_prg(bus)?;
        mmc1.apply_chr(bus)?;
        Ok(mmc1)
    }

    const fn prg_mode(&self) -> u8 {
        (self.control >> 2) & 0x03
    }

    const fn chr_4k(&self) -> bool {
        self.control & 0x10 != 0
    }

    fn apply_prg(&self, bus: &mut Buses<'_>) -> Result<(), MapError> {
        let bank = i32::from(self.prg_bank & 0x0F);
        match self.prg_mode() {
            0 | 1 => self.base.map_prg(bus.cpu, 0x8000, 0x8000, bank >> 1)?,
            2 => {
                self.base.map_prg(bus.cpu, 0x8000, 0x4000, 0)?;
                self.base.map_prg(bus.cpu, 0xC000, 0x4000, bank)?;
            }
            _ => {
                self.base.map_prg(bus.cpu, 0x8000, 0x4000, bank)?;
                self.base.map_prg(bus.cpu, 0xC000, 0x4000, -1)?;
            }
        }
        self.base.map_prg_ram(bus.cpu, self.prg_bank & 0x10 == 0)?;
        Ok(())
    }

    fn apply_chr(&self, bus: &mut Buses<'_>) -> Result<(), MapError> {
        if self.chr_4k() {
            self.base.map_chr(bus.ppu, 0x0000, 0x1000, i32::from(self.chr_bank0))?;
            self.base.map_chr(bus.ppu, 0x1000, 0x1000, i32::from(self.chr_bank1))?;
        } else {
            self.base.map_chr(bus.ppu, 0x0000, 0x2000, i32::from(self.chr_bank0 >> 1))?;
        }
        Ok(())
    }

    fn apply_mirroring(&mut self, bus: &mut Buses<'_>) -> Result<(), MapError> {
        let mirroring = match self.control & 0x03 {
            0 => Mirroring::OneScreenA,
            1 => Mirroring::OneScreenB,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        };
        if mirroring != self.base.mirroring() {
            self.base.set_mirroring(bus.ppu, mirroring)?;
        }
        Ok(())
    }

    fn store(&mut self, addr: u16, val: u8, bus: &mut Buses<'_>) {
        let result = match (addr >> 13) & 0x03 {
            0 => {
                trace!("MMC1: control ${val:02X}");
                self.control = val;
                self.apply_mirroring(bus)
                    .and_then(|()| self.apply_prg(bus))
                    .and_then(|()| self.apply_chr(bus))
            }
            1 => {
                trace!("MMC1: CHR bank 0 = {val}");
                self.chr_bank0 = val;
                self.apply_chr(bus)
            }
            2 => {
                trace!("MMC1: CHR bank 1 = {val}");
                self.chr_bank1 = val;
                self.apply_chr(bus)
            }
            _ => {
                trace!("MMC1: PRG bank = {val}");
                self.prg_bank = val;
                self.apply_prg(bus)
            }
        };
        check(self.name(), result);
    }
}

impl Mapper for Mmc1 {
    fn name(&self) -> &'static str {
        "MMC1"
    }

    fn write(&mut self, addr: u16, val: u8, cycle: i64, bus: &mut Buses<'_>) {
        let consecutive = self.last_write.is_some_and(|prev| cycle - prev < 2);
        self.last_write = Some(cycle);

        if val & 0x80 != 0 {
            self.shift = 0;
            self.count = 0;
            self.control |= 0x0C;
            check(self.name(), self.apply_prg(bus));
            return;
        }
        if consecutive {
            return;
        }

        self.shift |= (val & 1) << self.count;
        self.count += 1;
        if self.count == 5 {
            let data = self.shift;
            self.shift = 0;
            self.count = 0;
            self.store(addr, data, bus);
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.base.mirroring()
    }
}

impl Observable for Mmc1 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "control" => Some(self.control.into()),
            "shift" => Some(self.shift.into()),
            "shift_count" => Some(self.count.into()),
            "prg_bank" => Some(self.prg_bank.into()),
            "chr_bank0" => Some(self.chr_bank0.into()),
            "chr_bank1" => Some(self.chr_bank1.into()),
            "mirroring" => Some(format!("{:?}", self.mirroring()).into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "control",
            "shift",
            "shift_count",
            "prg_bank",
            "chr_bank0",
            "chr_bank1",
            "mirroring",
        ]
    }
}
