//! NES CPU bus.
//!
//! Routes CPU addresses through a [`Table`] to internal RAM, the PPU and
//! APU register banks, the controller ports and the cartridge, and drives
//! the rest of the machine: every CPU access is one cycle, split into a
//! start and an end half so the PPU sits at the right dot when the access
//! happens and when interrupts are sampled.

use emu_core::map::{Handler, MemMap, Region, RegSlot, Table};
use emu_core::{Bus, Observable};
use log::{debug, trace, warn};
use nes_cartridge::{Buses, Mapper, Rom};
use ricoh_apu_2a03::{Apu, ApuReg, DmcDma};
use ricoh_ppu_2c02::{HEIGHT, Ppu, PpuReg, WIDTH};

use crate::controller::Controller;
use crate::debugger::Debugger;
use crate::dma::Dma;
use crate::vram::Vram;
use crate::{LoadError, NesConfig, NesRegion};

/// What a CPU address decodes to besides memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Io {
    Ppu(PpuReg),
    Apu(ApuReg),
    /// $4014.
    OamDma,
    /// $4016 reads and the strobe write.
    Port1,
    /// $4017: controller 2 on reads, APU frame counter on writes.
    Port2,
    /// $4018-$401F, the disabled APU test registers.
    OpenBus,
}

/// Master clocks per CPU cycle spent before (start) and after (end) the
/// bus access. Reads and writes latch at different points of the cycle.
const READ_START: i64 = 5;
const READ_END: i64 = 7;
const WRITE_START: i64 = 7;
const WRITE_END: i64 = 5;

/// The PPU runs this many master clocks behind the CPU.
const PPU_OFFSET: i64 = 1;

const RAM_SIZE: u32 = 0x800;
/// Controller reads drive bit 6 high; bits 5 and 7 float.
const PORT_HIGH: u8 = 0x40;
pub(crate) const PORT_OPEN_BUS: u8 = 0xA0;
pub(crate) const FRAME_BYTES: usize = WIDTH * HEIGHT * 4;

pub struct NesBus {
    pub(crate) table: Table<Io>,
    pub(crate) vram: Vram,
    pub(crate) ppu: Ppu,
    pub(crate) apu: Apu,
    pub(crate) mapper: Box<dyn Mapper>,
    pub(crate) ports: [Controller; 2],
    pub(crate) dma: Dma,
    pub(crate) debugger: Option<Box<dyn Debugger>>,

    /// Number of the CPU cycle in progress; -1 before the first.
    pub(crate) cycle: i64,
    pub(crate) master_clock: i64,
    ppu_clock: i64,
    ppu_divider: i64,
    /// Last value driven on the data bus.
    pub(crate) open_bus: u8,
    stall: u32,

    /// Copy of the last frame the PPU finished.
    frame: Box<[u8]>,
    shown_frame: u64,
    frames_completed: u64,
}

impl NesBus {
    /// Wire up a machine around `rom`.
    pub fn new(rom: &Rom, config: &NesConfig) -> Result<Self, LoadError> {
        let mut table = Table::new("cpu");
        let mut vram = Vram::new();

        let ram = table.add_block(vec![0; RAM_SIZE as usize]);
        table.map_mem(0x0000, 0x1FFF, Region::new(ram, 0, RAM_SIZE), false)?;
        table.map_regs(0x2000, 0x3FFF, 8, 0, ricoh_ppu_2c02::REGISTERS, Io::Ppu)?;
        table.map_regs(0x4000, 0x401F, 0x20, 0, ricoh_apu_2a03::REGISTERS, Io::Apu)?;
        table.map_device(0x4014, 0x4014, Io::OamDma, false)?;
        table.map_device(0x4016, 0x4016, Io::Port1, false)?;
        table.map_device(0x4017, 0x4017, Io::Port2, false)?;
        table.map_device(0x4018, 0x401F, Io::OpenBus, false)?;

        let mapper = nes_cartridge::load(
            rom,
            &mut Buses {
                cpu: &mut table,
                ppu: &mut vram.table,
            },
        )?;

        let mut apu = Apu::new(config.clamped_sample_rate());
        apu.set_channel_mix(config.channel_volumes, config.channel_panning);

        Ok(Self {
            table,
            vram,
            ppu: Ppu::new(config.open_bus_decay),
            apu,
            mapper,
            ports: [Controller::new(), Controller::new()],
            dma: Dma::new(),
            debugger: None,
            cycle: -1,
            master_clock: 0,
            ppu_clock: 0,
            ppu_divider: NesRegion::Ntsc.ppu_divider() as i64,
            open_bus: 0,
            stall: 0,
            frame: vec![0; FRAME_BYTES].into_boxed_slice(),
            shown_frame: 0,
            frames_completed: 0,
        })
    }

    /// Reset the chips on the bus. Memory and the cartridge are kept.
    pub fn reset(&mut self, soft: bool) {
        debug!("bus {} reset at cycle {}", if soft { "soft" } else { "hard" }, self.cycle);
        self.ppu.reset(soft);
        self.apu.reset(soft);
        self.dma.reset();
        self.stall = 0;
        if !soft {
            self.cycle = -1;
            self.master_clock = 0;
            self.ppu_clock = 0;
            self.open_bus = 0;
            self.ports = [Controller::new(), Controller::new()];
        }
        self.shown_frame = self.ppu.frame();
    }

    /// Last frame the PPU completed, RGBA.
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    pub const fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    pub(crate) fn cycle_begin(&mut self, for_read: bool) {
        self.master_clock += if for_read { READ_START } else { WRITE_START };
        self.cycle += 1;
        self.run_ppu();
        self.apu.tick(self.cycle);
        self.poll_dmc();
    }

    pub(crate) fn cycle_end(&mut self, for_read: bool) {
        self.master_clock += if for_read { READ_END } else { WRITE_END };
        self.run_ppu();
    }

    /// Cycles spent on DMA count as stalls for the CPU.
    pub(crate) fn stall_cycle(&mut self) {
        self.stall += 1;
    }

    fn run_ppu(&mut self) {
        let target = self.master_clock - PPU_OFFSET;
        while self.ppu_clock + self.ppu_divider <= target {
            self.ppu.tick(&mut self.vram);
            self.ppu_clock += self.ppu_divider;
            if self.ppu.frame() != self.shown_frame {
                self.shown_frame = self.ppu.frame();
                self.frames_completed += 1;
                self.frame.copy_from_slice(self.ppu.framebuffer());
            }
        }
    }

    /// Hand DMA requests raised by the DMC to the DMA unit.
    fn poll_dmc(&mut self) {
        while let Some(req) = self.apu.take_dma_request() {
            match req {
                DmcDma::Start => self.dma.start_dmc(),
                DmcDma::Stop => self.dma.stop_dmc(),
            }
        }
    }

    fn buses(&mut self) -> (&mut dyn Mapper, Buses<'_>) {
        (
            self.mapper.as_mut(),
            Buses {
                cpu: &mut self.table,
                ppu: &mut self.vram.table,
            },
        )
    }

    /// Read with side effects but without advancing the clock.
    pub fn read_handler(&mut self, addr: u16) -> u8 {
        match self.table.search(addr) {
            Handler::Mem(slot) => {
                let val = self.table.read_mem(&slot, addr);
                self.open_bus = val;
                val
            }
            Handler::Reg(RegSlot { id, .. }) | Handler::Device(id) => self.read_io(id, addr),
            Handler::Unmapped => {
                warn!("read from unmapped ${addr:04X}, open bus ${:02X}", self.open_bus);
                self.open_bus
            }
        }
    }

    fn read_io(&mut self, io: Io, addr: u16) -> u8 {
        match io {
            Io::Ppu(reg) => {
                let val = self.ppu.read(reg, &mut self.vram);
                self.open_bus = val;
                val
            }
            // $4015 drives bits 0-4, 6 and 7; bit 5 floats and the read
            // does not update the bus.
            Io::Apu(reg) => match self.apu.read(reg) {
                Some(status) => status | (self.open_bus & 0x20),
                None => self.open_bus,
            },
            Io::Port1 | Io::Port2 => {
                let port = usize::from(io == Io::Port2);
                let val = PORT_HIGH | (self.open_bus & PORT_OPEN_BUS) | self.ports[port].read();
                self.open_bus = val;
                val
            }
            Io::OamDma | Io::OpenBus => {
                trace!("read from write-only ${addr:04X}");
                self.open_bus
            }
        }
    }

    /// Side-effect free read.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        match self.table.search(addr) {
            Handler::Mem(slot) => self.table.read_mem(&slot, addr),
            Handler::Reg(RegSlot { id, .. }) | Handler::Device(id) => match id {
                Io::Ppu(reg) => self.ppu.peek(reg),
                Io::Apu(reg) => self
                    .apu
                    .peek(reg)
                    .map_or(self.open_bus, |status| status | (self.open_bus & 0x20)),
                Io::Port1 => PORT_HIGH | (self.open_bus & PORT_OPEN_BUS) | self.ports[0].peek(),
                Io::Port2 => PORT_HIGH | (self.open_bus & PORT_OPEN_BUS) | self.ports[1].peek(),
                Io::OamDma | Io::OpenBus => self.open_bus,
            },
            Handler::Unmapped => self.open_bus,
        }
    }

    /// Write without advancing the clock.
    pub fn write_handler(&mut self, addr: u16, val: u8) {
        self.open_bus = val;
        match self.table.search(addr) {
            Handler::Mem(slot) => {
                self.table.write_mem(&slot, addr, val);
                if slot.notify {
                    let cycle = self.cycle;
                    let (mapper, mut buses) = self.buses();
                    mapper.write(addr, val, cycle, &mut buses);
                }
            }
            Handler::Reg(RegSlot { id, .. }) | Handler::Device(id) => self.write_io(id, val),
            Handler::Unmapped => warn!("write ${val:02X} to unmapped ${addr:04X}"),
        }
    }

    fn write_io(&mut self, io: Io, val: u8) {
        match io {
            Io::Ppu(reg) => self.ppu.write(reg, val, &mut self.vram),
            Io::Apu(reg) => {
                self.apu.write(reg, val);
                self.poll_dmc();
            }
            Io::OamDma => self.dma.start_oam(val),
            Io::Port1 => {
                for port in &mut self.ports {
                    port.write(val);
                }
            }
            Io::Port2 => {
                self.apu.write(ApuReg::FrameCounter, val);
                self.poll_dmc();
            }
            Io::OpenBus => {}
        }
    }
}

impl Bus for NesBus {
    fn read(&mut self, address: u16) -> u8 {
        self.process_dma(address);
        self.cycle_begin(true);
        let val = self.read_handler(address);
        self.cycle_end(true);
        if let Some(debugger) = self.debugger.as_mut() {
            debugger.watch_read(address);
        }
        val
    }

    fn write(&mut self, address: u16, value: u8) {
        self.cycle_begin(false);
        self.write_handler(address, value);
        self.cycle_end(false);
        if let Some(debugger) = self.debugger.as_mut() {
            debugger.watch_write(address, value);
        }
    }

    fn peek(&self, address: u16) -> u8 {
        NesBus::peek(self, address)
    }

    fn nmi_line(&self) -> bool {
        self.ppu.nmi_line()
    }

    fn irq_line(&self) -> bool {
        self.apu.irq_line()
    }

    fn take_stall_cycles(&mut self) -> u32 {
        std::mem::take(&mut self.stall)
    }
}

impl Observable for NesBus {
    fn query(&self, path: &str) -> Option<emu_core::Value> {
        if let Some(rest) = path.strip_prefix("dma.") {
            return self.dma.query(rest);
        }
        match path {
            "cycle" => Some(self.cycle.into()),
            "master_clock" => Some(self.master_clock.into()),
            "open_bus" => Some(self.open_bus.into()),
            "port1" => Some(self.ports[0].buttons().into()),
            "port2" => Some(self.ports[1].buttons().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cycle",
            "master_clock",
            "open_bus",
            "port1",
            "port2",
            "dma.oam_running",
            "dma.oam_page",
            "dma.dmc_running",
            "dma.need_halt",
        ]
    }
}
