//! The whole console.
//!
//! The CPU owns the timeline: each of its bus accesses runs the PPU three
//! dots and the APU one cycle (see `NesBus`). A frame is a fixed budget of
//! 29,780 CPU cycles; the video frame handed out is the last one the PPU
//! finished, and audio is flushed from the mixer at the same point.

use std::io::Write;

use emu_core::{Observable, Value, parse_address};
use log::{debug, info};
use mos_6502::Mos6502;
use nes_cartridge::Rom;

use crate::bus::{FRAME_BYTES, NesBus};
use crate::debugger::Debugger;
use crate::tracer::{TraceState, Tracer, format_line};
use crate::{LoadError, NesConfig, NesRegion};

/// Interleaved stereo samples produced by `run_one_frame`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioBuffer {
    samples: Vec<i16>,
}

impl AudioBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Left/right interleaved samples.
    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Number of stereo sample pairs.
    #[must_use]
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Hand the samples to the caller, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.samples)
    }
}

/// An NES with a cartridge inserted.
pub struct Core {
    cpu: Mos6502,
    bus: NesBus,
    rom: Rom,
    config: NesConfig,
    tracer: Option<Tracer>,
    /// CPU cycle the current frame ends on.
    frame_end: i64,
    frame_count: u64,
    halt_reported: bool,
}

impl Core {
    /// Build a console around `rom` with the default configuration.
    pub fn new(rom: &Rom) -> Result<Self, LoadError> {
        Self::with_config(rom, &NesConfig::default())
    }

    pub fn with_config(rom: &Rom, config: &NesConfig) -> Result<Self, LoadError> {
        let bus = NesBus::new(rom, config)?;
        let mut core = Self {
            cpu: Self::new_cpu(config),
            bus,
            rom: rom.clone(),
            config: config.clone(),
            tracer: None,
            frame_end: 0,
            frame_count: 0,
            halt_reported: false,
        };
        core.power_on();
        Ok(core)
    }

    fn new_cpu(config: &NesConfig) -> Mos6502 {
        let mut cpu = Mos6502::new();
        cpu.unstable_opcodes = config.unstable_opcodes;
        cpu
    }

    fn power_on(&mut self) {
        self.bus.reset(false);
        self.cpu.reset(&mut self.bus, false);
        self.frame_end = self.cpu.cycles();
        info!(
            "power on: mapper {} ({}), reset vector ${:04X}",
            self.rom.mapper_id,
            self.bus.mapper.name(),
            self.cpu.regs.pc
        );
    }

    /// Press the reset button (`soft`) or cycle the power.
    ///
    /// A soft reset keeps RAM, cartridge state and the APU frame counter
    /// mode. A hard reset rebuilds the machine from the ROM, so two hard
    /// resets in a row leave identical state.
    pub fn reset(&mut self, soft: bool) {
        self.halt_reported = false;
        self.frame_count = 0;
        if soft {
            debug!("soft reset");
            self.bus.reset(true);
            self.cpu.reset(&mut self.bus, true);
            self.frame_end = self.cpu.cycles();
            return;
        }
        match NesBus::new(&self.rom, &self.config) {
            Ok(mut bus) => {
                bus.debugger = self.bus.debugger.take();
                self.bus = bus;
            }
            // The same ROM and config loaded once already.
            Err(e) => log::error!("hard reset could not rebuild the machine: {e}"),
        }
        self.cpu = Self::new_cpu(&self.config);
        self.power_on();
    }

    /// Run one video frame's worth of CPU cycles.
    ///
    /// Instructions are not split, so a frame may end a few cycles late;
    /// the next frame is shortened to match. `video` receives the last completed frame as 256x240 RGBA (as much
    /// of it as fits); `audio` gets the samples mixed during the frame
    /// appended. Stops early if the CPU halts.
    pub fn run_one_frame(&mut self, video: &mut [u8], audio: &mut AudioBuffer) {
        self.frame_end += NesRegion::Ntsc.cycles_per_frame();
        self.run_cycles(self.frame_end - self.cpu.cycles());

        self.bus.apu.end_frame();
        let start = audio.samples.len();
        audio.samples.resize(start + self.bus.apu.samples().len(), 0);
        let n = self.bus.apu.drain_samples(&mut audio.samples[start..]);
        audio.samples.truncate(start + n);

        let n = video.len().min(FRAME_BYTES);
        video[..n].copy_from_slice(&self.bus.frame()[..n]);

        self.frame_count += 1;
        if let Some(tracer) = self.tracer.as_mut() {
            tracer.flush();
        }
        if let Some(debugger) = self.bus.debugger.as_mut() {
            debugger.frame_end();
        }
    }

    /// Run whole instructions until at least `cycles` more CPU cycles have
    /// passed, or the CPU halts.
    pub fn run_cycles(&mut self, cycles: i64) {
        let until = self.cpu.cycles() + cycles;
        while self.cpu.cycles() < until {
            if self.cpu.halted() {
                self.report_halt();
                return;
            }
            self.step();
        }
    }

    /// Execute one instruction, plus the interrupt sequence it lets in.
    pub fn step(&mut self) {
        if self.cpu.halted() {
            self.report_halt();
            return;
        }
        let pc = self.cpu.regs.pc;
        if let Some(tracer) = self.tracer.as_mut() {
            let state = TraceState {
                regs: self.cpu.regs,
                scanline: self.bus.ppu.scanline(),
                dot: self.bus.ppu.dot(),
                cycles: self.cpu.cycles(),
            };
            let bus = &self.bus;
            let line = format_line(&state, |addr| bus.peek(addr));
            if !tracer.write_line(&line) {
                self.tracer = None;
            }
        }
        if let Some(debugger) = self.bus.debugger.as_mut() {
            debugger.trace(pc);
        }

        self.cpu.step(&mut self.bus);

        if let Some(event) = self.cpu.take_interrupt() {
            if let Some(debugger) = self.bus.debugger.as_mut() {
                debugger.interrupt(event.from, event.to, event.nmi);
            }
        }
    }

    fn report_halt(&mut self) {
        if self.halt_reported {
            return;
        }
        self.halt_reported = true;
        let msg = format!(
            "CPU halted at ${:04X}, cycle {}",
            self.cpu.regs.pc.wrapping_sub(1),
            self.cpu.cycles()
        );
        if let Some(debugger) = self.bus.debugger.as_mut() {
            debugger.halt(&msg);
        }
    }

    /// Set the pads: bits 0-7 are A, B, Select, Start, Up, Down, Left,
    /// Right.
    pub fn load_input(&mut self, pad1: u8, pad2: u8) {
        self.bus.ports[0].set_buttons(pad1);
        self.bus.ports[1].set_buttons(pad2);
    }

    /// Debugger read: has the side effects of a CPU read but takes no time.
    pub fn read_cpu(&mut self, addr: u16) -> u8 {
        self.bus.read_handler(addr)
    }

    #[must_use]
    pub fn peek_cpu(&self, addr: u16) -> u8 {
        self.bus.peek(addr)
    }

    /// Debugger write: has the side effects of a CPU write but takes no
    /// time.
    pub fn write_cpu(&mut self, addr: u16, val: u8) {
        self.bus.write_handler(addr, val);
    }

    /// Start tracing every instruction to `out`, or stop with `None`.
    pub fn trace(&mut self, out: Option<Box<dyn Write>>) {
        if let Some(tracer) = self.tracer.as_mut() {
            tracer.flush();
        }
        self.tracer = out.map(Tracer::new);
    }

    pub fn set_debugger(&mut self, debugger: impl Debugger + 'static) {
        self.bus.debugger = Some(Box::new(debugger));
    }

    pub fn remove_debugger(&mut self) -> Option<Box<dyn Debugger>> {
        self.bus.debugger.take()
    }

    #[must_use]
    pub const fn halted(&self) -> bool {
        self.cpu.halted()
    }

    #[must_use]
    pub const fn cpu(&self) -> &Mos6502 {
        &self.cpu
    }

    /// The CPU, for test harnesses that set registers directly.
    pub fn cpu_mut(&mut self) -> &mut Mos6502 {
        &mut self.cpu
    }

    /// Last completed video frame, RGBA.
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        self.bus.frame()
    }

    /// Calls to `run_one_frame` since the last reset.
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Frames the PPU has completed since power-on.
    #[must_use]
    pub const fn ppu_frames(&self) -> u64 {
        self.bus.frames_completed()
    }

    #[must_use]
    pub const fn config(&self) -> &NesConfig {
        &self.config
    }
}

const QUERY_PATHS: &[&str] = &[
    "cpu.<path>",
    "ppu.<path>",
    "apu.<path>",
    "cart.name",
    "cart.<path>",
    "bus.<path>",
    "memory.<address>",
    "cycle",
    "master_clock",
    "frame_count",
];

impl Observable for Core {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("cpu.") {
            self.cpu.query(rest)
        } else if let Some(rest) = path.strip_prefix("ppu.") {
            self.bus.ppu.query(rest)
        } else if let Some(rest) = path.strip_prefix("apu.") {
            self.bus.apu.query(rest)
        } else if let Some(rest) = path.strip_prefix("cart.") {
            match rest {
                "name" => Some(self.bus.mapper.name().into()),
                "mapper" => Some(self.rom.mapper_id.into()),
                _ => self.bus.mapper.query(rest),
            }
        } else if let Some(rest) = path.strip_prefix("bus.") {
            self.bus.query(rest)
        } else if let Some(rest) = path.strip_prefix("memory.") {
            parse_address(rest).map(|addr| self.bus.peek(addr).into())
        } else {
            match path {
                "cycle" => Some(self.cpu.cycles().into()),
                "master_clock" => Some(self.bus.master_clock.into()),
                "frame_count" => Some(self.frame_count.into()),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        QUERY_PATHS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// NROM: `program` at $8000, NMI handler `RTI` at $9000.
    fn core(program: &[u8]) -> Core {
        let mut prg = vec![0xEA; 0x8000];
        prg[..program.len()].copy_from_slice(program);
        prg[0x1000] = 0x40;
        prg[0x7FFA..].copy_from_slice(&[0x00, 0x90, 0x00, 0x80, 0x00, 0x90]);
        let rom = Rom {
            prg_rom: prg,
            chr_rom: vec![0; 0x2000],
            ..Rom::default()
        };
        Core::new(&rom).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn reset_loads_vector_and_burns_cycles() {
        let core = core(&[]);
        assert_eq!(core.cpu().regs.pc, 0x8000);
        assert_eq!(core.cpu().cycles(), 7);
        assert_eq!(core.query("cycle"), Some(Value::I64(7)));
    }

    #[test]
    fn frame_runs_the_cycle_budget() {
        let mut core = core(&[0x4C, 0x00, 0x80]);
        let mut video = vec![0; FRAME_BYTES];
        let mut audio = AudioBuffer::new();
        let start = core.cpu().cycles();
        core.run_one_frame(&mut video, &mut audio);
        let ran = core.cpu().cycles() - start;
        assert!((29_780..29_783).contains(&ran), "{ran}");
        for _ in 0..9 {
            core.run_one_frame(&mut video, &mut audio);
        }
        let ran = core.cpu().cycles() - start;
        assert!((297_800..297_803).contains(&ran), "{ran}");
        assert_eq!(core.frame_count(), 10);
        assert!(!audio.is_empty());
        assert_eq!(audio.samples().len() % 2, 0);
    }

    #[test]
    fn jam_stops_the_frame() {
        struct Halts(std::rc::Rc<std::cell::Cell<u32>>);
        impl Debugger for Halts {
            fn halt(&mut self, _msg: &str) {
                self.0.set(self.0.get() + 1);
            }
        }

        let mut core = core(&[0x02]);
        let count = std::rc::Rc::new(std::cell::Cell::new(0));
        core.set_debugger(Halts(count.clone()));
        let mut audio = AudioBuffer::new();
        core.run_one_frame(&mut [], &mut audio);
        core.run_one_frame(&mut [], &mut audio);
        assert!(core.halted());
        assert_eq!(count.get(), 1);
        assert!(core.cpu().cycles() < 100);

        core.reset(true);
        assert!(!core.halted());
    }

    #[test]
    fn hard_reset_twice_is_idempotent() {
        // Store to RAM, then spin.
        let mut core = core(&[0xA9, 0x42, 0x85, 0x10, 0x4C, 0x04, 0x80]);
        core.run_cycles(100);
        assert_eq!(core.peek_cpu(0x0010), 0x42);
        core.reset(false);
        let first: Vec<_> = ["cpu.pc", "cpu.sp", "cpu.p", "cycle", "master_clock", "ppu.dot", "memory.0x10"]
            .iter()
            .map(|p| core.query(p))
            .collect();
        core.reset(false);
        let second: Vec<_> = ["cpu.pc", "cpu.sp", "cpu.p", "cycle", "master_clock", "ppu.dot", "memory.0x10"]
            .iter()
            .map(|p| core.query(p))
            .collect();
        assert_eq!(first, second);
        assert_eq!(core.peek_cpu(0x0010), 0);
    }

    #[test]
    fn soft_reset_keeps_ram() {
        let mut core = core(&[0xA9, 0x42, 0x85, 0x10, 0x4C, 0x04, 0x80]);
        core.run_cycles(100);
        core.reset(true);
        assert_eq!(core.peek_cpu(0x0010), 0x42);
        assert_eq!(core.cpu().regs.pc, 0x8000);
    }

    #[test]
    fn nmi_reaches_the_debugger() {
        #[derive(Default)]
        struct Log(std::rc::Rc<std::cell::RefCell<Vec<(u16, u16, bool)>>>);
        impl Debugger for Log {
            fn interrupt(&mut self, prev_pc: u16, cur_pc: u16, is_nmi: bool) {
                self.0.borrow_mut().push((prev_pc, cur_pc, is_nmi));
            }
        }

        // Enable NMI, then spin.
        let mut core = core(&[0xA9, 0x80, 0x8D, 0x00, 0x20, 0x4C, 0x05, 0x80]);
        let log = Log::default();
        let events = log.0.clone();
        core.set_debugger(log);
        core.run_one_frame(&mut [], &mut AudioBuffer::new());
        core.run_one_frame(&mut [], &mut AudioBuffer::new());
        let events = events.borrow();
        assert!(!events.is_empty());
        assert!(events.iter().all(|&(_, to, nmi)| nmi && to == 0x9000));
    }

    #[test]
    fn memory_and_cart_queries() {
        let mut core = core(&[]);
        core.write_cpu(0x0123, 0x77);
        assert_eq!(core.query("memory.$0123"), Some(Value::U8(0x77)));
        assert_eq!(core.query("cart.name"), Some(Value::String("NROM".into())));
        assert_eq!(core.query("cart.mapper"), Some(Value::U16(0)));
        assert!(core.query("ppu.scanline").is_some());
        assert!(core.query("apu.status").is_some());
        assert_eq!(core.query("nonsense"), None);
    }
}
