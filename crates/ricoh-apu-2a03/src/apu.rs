//! The APU proper: register decoding, catch-up scheduling and the audio
//! frame clock.
//!
//! The channels are not stepped every CPU cycle. [`Apu::tick`] only counts
//! cycles and runs the channels when something observable could happen:
//! a register was touched, a frame counter step is one cycle away, the DMC
//! has work to do, or a DMC interrupt is due. Register accesses always
//! catch up first, so software sees the same state as with per-cycle
//! stepping.

use emu_core::map::{Reg8, RegAccess, RegDesc};
use emu_core::{Observable, Value};
use log::{debug, trace};

use crate::dmc::{Dmc, DmcDma};
use crate::frame_counter::{FrameCounter, FrameTick};
use crate::mixer::{CYCLE_LENGTH, Channel, Mixer};
use crate::noise::Noise;
use crate::square::Square;
use crate::triangle::Triangle;

/// An APU register, as seen from the CPU bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApuReg {
    /// $4000-$4003; the payload is the offset within the channel.
    Square1(u8),
    /// $4004-$4007.
    Square2(u8),
    /// $4008-$400B.
    Triangle(u8),
    /// $400C-$400F.
    Noise(u8),
    /// $4010-$4013.
    Dmc(u8),
    /// $4015.
    Status,
    /// $4017 (write side).
    FrameCounter,
}

const fn reg(name: &'static str, offset: u16, bank: u8, access: RegAccess, id: ApuReg) -> RegDesc<ApuReg> {
    RegDesc {
        name,
        offset,
        bank,
        access,
        romask: 0,
        id,
    }
}

/// $4015. Only the five channel enables exist on the write side.
const SND_CHN: RegDesc<ApuReg> = reg("SND_CHN", 0x15, 0, RegAccess::ReadWrite, ApuReg::Status).with_romask(0xE0);

/// Register layout relative to $4000.
///
/// Bank 0 holds everything the APU owns outright. $4017 is in bank 1: it
/// shares its address with the second controller port, so the machine
/// decodes it and forwards writes.
pub const REGISTERS: &[RegDesc<ApuReg>] = &[
    reg("SQ1_VOL", 0x00, 0, RegAccess::WriteOnly, ApuReg::Square1(0)),
    reg("SQ1_SWEEP", 0x01, 0, RegAccess::WriteOnly, ApuReg::Square1(1)),
    reg("SQ1_LO", 0x02, 0, RegAccess::WriteOnly, ApuReg::Square1(2)),
    reg("SQ1_HI", 0x03, 0, RegAccess::WriteOnly, ApuReg::Square1(3)),
    reg("SQ2_VOL", 0x04, 0, RegAccess::WriteOnly, ApuReg::Square2(0)),
    reg("SQ2_SWEEP", 0x05, 0, RegAccess::WriteOnly, ApuReg::Square2(1)),
    reg("SQ2_LO", 0x06, 0, RegAccess::WriteOnly, ApuReg::Square2(2)),
    reg("SQ2_HI", 0x07, 0, RegAccess::WriteOnly, ApuReg::Square2(3)),
    reg("TRI_LINEAR", 0x08, 0, RegAccess::WriteOnly, ApuReg::Triangle(0)),
    reg("TRI_UNUSED", 0x09, 0, RegAccess::WriteOnly, ApuReg::Triangle(1)),
    reg("TRI_LO", 0x0A, 0, RegAccess::WriteOnly, ApuReg::Triangle(2)),
    reg("TRI_HI", 0x0B, 0, RegAccess::WriteOnly, ApuReg::Triangle(3)),
    reg("NOISE_VOL", 0x0C, 0, RegAccess::WriteOnly, ApuReg::Noise(0)),
    reg("NOISE_UNUSED", 0x0D, 0, RegAccess::WriteOnly, ApuReg::Noise(1)),
    reg("NOISE_LO", 0x0E, 0, RegAccess::WriteOnly, ApuReg::Noise(2)),
    reg("NOISE_HI", 0x0F, 0, RegAccess::WriteOnly, ApuReg::Noise(3)),
    reg("DMC_FREQ", 0x10, 0, RegAccess::WriteOnly, ApuReg::Dmc(0)),
    reg("DMC_RAW", 0x11, 0, RegAccess::WriteOnly, ApuReg::Dmc(1)),
    reg("DMC_START", 0x12, 0, RegAccess::WriteOnly, ApuReg::Dmc(2)),
    reg("DMC_LEN", 0x13, 0, RegAccess::WriteOnly, ApuReg::Dmc(3)),
    SND_CHN,
    reg("FRAME_COUNTER", 0x17, 1, RegAccess::WriteOnly, ApuReg::FrameCounter),
];

/// The 2A03 audio unit.
pub struct Apu {
    square1: Square,
    square2: Square,
    triangle: Triangle,
    noise: Noise,
    dmc: Dmc,
    frame_counter: FrameCounter,
    mixer: Mixer,
    /// Channel enables last written to $4015.
    enable: Reg8,

    /// APU cycle the channels have been run up to.
    prev_cycle: u32,
    /// APU cycle within the current audio frame.
    cur_cycle: u32,
    need_to_run: bool,
    /// CPU cycle of the current tick; the parity sets some write delays.
    cpu_cycle: i64,
}

impl Apu {
    /// An APU mixing to `sample_rate` Hz stereo.
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        let mut apu = Self {
            square1: Square::new(Channel::Square1),
            square2: Square::new(Channel::Square2),
            triangle: Triangle::new(),
            noise: Noise::new(),
            dmc: Dmc::new(),
            frame_counter: FrameCounter::default(),
            mixer: Mixer::new(sample_rate),
            enable: SND_CHN.cell(0),
            prev_cycle: 0,
            cur_cycle: 0,
            need_to_run: false,
            cpu_cycle: 0,
        };
        apu.reset(false);
        apu
    }

    pub fn reset(&mut self, soft: bool) {
        debug!("apu {} reset", if soft { "soft" } else { "hard" });
        self.cur_cycle = 0;
        self.prev_cycle = 0;
        self.need_to_run = false;
        self.enable = SND_CHN.cell(0);
        self.square1.reset(soft);
        self.square2.reset(soft);
        self.triangle.reset(soft);
        self.noise.reset(soft);
        self.dmc.reset(soft);
        self.frame_counter.reset(soft);
        if !soft {
            self.mixer.reset();
        }
    }

    /// Per-channel volume and pan, in [`Channel`] order.
    pub fn set_channel_mix(&mut self, volumes: [f64; Channel::COUNT], panning: [f64; Channel::COUNT]) {
        self.mixer.set_channel_mix(volumes, panning);
    }

    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    /// Advance one CPU cycle. `cpu_cycle` is the cycle being started.
    pub fn tick(&mut self, cpu_cycle: i64) {
        self.cpu_cycle = cpu_cycle;
        self.cur_cycle += 1;
        if self.cur_cycle as usize == CYCLE_LENGTH - 1 {
            self.end_frame();
        } else if self.needs_run() {
            self.run();
        }
    }

    fn odd_cycle(&self) -> bool {
        self.cpu_cycle & 1 != 0
    }

    fn needs_run(&mut self) -> bool {
        if self.dmc.need_to_run() || self.need_to_run {
            self.need_to_run = false;
            return true;
        }
        let cycles = self.cur_cycle - self.prev_cycle;
        self.frame_counter.need_to_run(cycles) || self.dmc.irq_pending(cycles)
    }

    /// Bring every unit up to the current cycle.
    pub fn run(&mut self) {
        let mut cycles = (self.cur_cycle - self.prev_cycle) as i32;
        while cycles > 0 {
            let (ran, tick) = self.frame_counter.run(&mut cycles);
            self.prev_cycle += ran;
            if let Some(tick) = tick {
                self.frame_tick(tick);
            }

            self.square1.envelope.length.reload();
            self.square2.envelope.length.reload();
            self.noise.envelope.length.reload();
            self.triangle.length.reload();

            let (mixer, target) = (&mut self.mixer, self.prev_cycle);
            self.square1.run(mixer, target);
            self.square2.run(mixer, target);
            self.noise.run(mixer, target);
            self.triangle.run(mixer, target);
            self.dmc.run(mixer, target);
        }
    }

    fn frame_tick(&mut self, tick: FrameTick) {
        self.square1.envelope.tick();
        self.square2.envelope.tick();
        self.triangle.tick_linear_counter();
        self.noise.envelope.tick();

        if tick == FrameTick::Half {
            self.square1.envelope.length.tick();
            self.square2.envelope.length.tick();
            self.triangle.length.tick();
            self.noise.envelope.length.tick();

            self.square1.tick_sweep();
            self.square2.tick_sweep();
        }
    }

    /// Close the audio frame and queue its samples.
    ///
    /// Runs on its own every [`CYCLE_LENGTH`] cycles; the machine also calls
    /// it at the end of each video frame so samples never lag a frame.
    pub fn end_frame(&mut self) {
        self.dmc.process_clock();
        self.run();
        self.square1.timer.end_frame();
        self.square2.timer.end_frame();
        self.triangle.timer.end_frame();
        self.noise.timer.end_frame();
        self.dmc.timer.end_frame();

        self.mixer.play(self.cur_cycle);
        self.cur_cycle = 0;
        self.prev_cycle = 0;
    }

    fn status(&self) -> u8 {
        let mut status = 0;
        for (bit, on) in [
            self.square1.status(),
            self.square2.status(),
            self.triangle.status(),
            self.noise.status(),
            self.dmc.status(),
        ]
        .into_iter()
        .enumerate()
        {
            status |= u8::from(on) << bit;
        }
        if self.frame_counter.irq {
            status |= 0x40;
        }
        if self.dmc.irq {
            status |= 0x80;
        }
        status
    }

    /// CPU read. Write-only registers return `None` (open bus).
    pub fn read(&mut self, reg: ApuReg) -> Option<u8> {
        match reg {
            ApuReg::Status => {
                self.run();
                let status = self.status();
                self.frame_counter.irq = false;
                Some(status)
            }
            _ => None,
        }
    }

    /// Side-effect free read.
    #[must_use]
    pub fn peek(&self, reg: ApuReg) -> Option<u8> {
        match reg {
            ApuReg::Status => Some(self.status()),
            _ => None,
        }
    }

    pub fn write(&mut self, reg: ApuReg, val: u8) {
        self.run();
        match reg {
            ApuReg::Square1(r) => self.square1.write(u16::from(r), val),
            ApuReg::Square2(r) => self.square2.write(u16::from(r), val),
            ApuReg::Triangle(r) => self.triangle.write(u16::from(r), val),
            ApuReg::Noise(r) => self.noise.write(u16::from(r), val),
            ApuReg::Dmc(r) => self.dmc.write(&mut self.mixer, u16::from(r), val),
            ApuReg::Status => {
                self.enable.write(val);
                trace!("status = {:02X}", self.enable.value);
                self.dmc.irq = false;
                self.square1.envelope.length.set_enabled(self.enable.bit(0x01));
                self.square2.envelope.length.set_enabled(self.enable.bit(0x02));
                self.triangle.length.set_enabled(self.enable.bit(0x04));
                self.noise.envelope.length.set_enabled(self.enable.bit(0x08));
                let odd = self.odd_cycle();
                self.dmc.set_enabled(self.enable.bit(0x10), odd);
            }
            ApuReg::FrameCounter => {
                let odd = self.odd_cycle();
                self.frame_counter.write(val, odd);
            }
        }
        self.need_to_run = true;
    }

    /// Level of the APU's interrupt output (frame or DMC).
    #[must_use]
    pub const fn irq_line(&self) -> bool {
        self.frame_counter.irq || self.dmc.irq
    }

    /// Next DMA request raised by the DMC, in the order raised.
    pub fn take_dma_request(&mut self) -> Option<DmcDma> {
        self.dmc.requests.pop_front()
    }

    /// Address the DMC wants read.
    #[must_use]
    pub const fn dmc_address(&self) -> u16 {
        self.dmc.current_addr()
    }

    /// Complete a DMC DMA with the fetched byte.
    pub fn set_dmc_read_buffer(&mut self, val: u8) {
        self.dmc.set_read_buffer(val);
    }

    /// Interleaved stereo samples produced so far.
    #[must_use]
    pub fn samples(&self) -> &[i16] {
        self.mixer.samples()
    }

    /// Move queued samples into `out`; returns the count copied.
    pub fn drain_samples(&mut self, out: &mut [i16]) -> usize {
        self.mixer.drain_into(out)
    }
}

const QUERY_PATHS: &[&str] = &[
    "status",
    "enable",
    "irq",
    "cycle",
    "frame_counter.five_step",
    "frame_counter.irq",
    "square1.period",
    "square1.length",
    "square1.output",
    "square2.period",
    "square2.length",
    "square2.output",
    "triangle.length",
    "triangle.linear",
    "triangle.output",
    "noise.length",
    "noise.output",
    "dmc.level",
    "dmc.output",
    "dmc.sample_addr",
    "dmc.sample_len",
    "dmc.address",
    "dmc.remaining",
    "dmc.irq",
];

impl Observable for Apu {
    fn query(&self, path: &str) -> Option<Value> {
        Some(match path {
            "status" => self.status().into(),
            "enable" => self.enable.value.into(),
            "irq" => self.irq_line().into(),
            "cycle" => self.cur_cycle.into(),
            "frame_counter.five_step" => self.frame_counter.five_step().into(),
            "frame_counter.irq" => self.frame_counter.irq.into(),
            "square1.period" => self.square1.real_period().into(),
            "square1.length" => self.square1.envelope.length.counter().into(),
            "square1.output" => self.square1.output().into(),
            "square2.period" => self.square2.real_period().into(),
            "square2.length" => self.square2.envelope.length.counter().into(),
            "square2.output" => self.square2.output().into(),
            "triangle.length" => self.triangle.length.counter().into(),
            "triangle.linear" => self.triangle.linear_counter().into(),
            "triangle.output" => self.triangle.output().into(),
            "noise.length" => self.noise.envelope.length.counter().into(),
            "noise.output" => self.noise.output().into(),
            "dmc.level" => self.dmc.level().into(),
            "dmc.output" => self.dmc.output().into(),
            "dmc.sample_addr" => self.dmc.sample_addr().into(),
            "dmc.sample_len" => self.dmc.sample_len().into(),
            "dmc.address" => self.dmc.current_addr().into(),
            "dmc.remaining" => self.dmc.remaining().into(),
            "dmc.irq" => self.dmc.irq.into(),
            _ => return None,
        })
    }

    fn query_paths(&self) -> &'static [&'static str] {
        QUERY_PATHS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tick `n` CPU cycles starting after `start`.
    fn run_cycles(apu: &mut Apu, start: &mut i64, n: u32) {
        for _ in 0..n {
            *start += 1;
            apu.tick(*start);
        }
    }

    fn powered_on() -> (Apu, i64) {
        let mut apu = Apu::new(48_000);
        let mut cycle = 0;
        run_cycles(&mut apu, &mut cycle, 10);
        (apu, cycle)
    }

    #[test]
    fn silent_by_default() {
        let (mut apu, mut cycle) = powered_on();
        run_cycles(&mut apu, &mut cycle, 30_000);
        assert!(!apu.samples().is_empty());
        assert!(apu.samples().iter().all(|&s| s == 0));
    }

    #[test]
    fn enable_register_drops_unused_bits() {
        let (mut apu, _) = powered_on();
        apu.write(ApuReg::Status, 0xFF);
        assert_eq!(apu.query("enable"), Some(Value::U8(0x1F)));
        apu.write(ApuReg::Status, 0xE5);
        assert_eq!(apu.query("enable"), Some(Value::U8(0x05)));
        let desc = REGISTERS.iter().find(|d| d.id == ApuReg::Status);
        assert_eq!(desc.map(|d| d.romask), Some(0xE0));
    }

    #[test]
    fn status_reflects_length_counters() {
        let (mut apu, mut cycle) = powered_on();
        apu.write(ApuReg::Status, 0x0F);
        apu.write(ApuReg::Square1(3), 0x08);
        apu.write(ApuReg::Noise(3), 0x08);
        run_cycles(&mut apu, &mut cycle, 2);
        assert_eq!(apu.read(ApuReg::Status), Some(0x09));
    }

    #[test]
    fn disabling_clears_length() {
        let (mut apu, mut cycle) = powered_on();
        apu.write(ApuReg::Status, 0x01);
        apu.write(ApuReg::Square1(3), 0x08);
        run_cycles(&mut apu, &mut cycle, 2);
        apu.write(ApuReg::Status, 0x00);
        assert_eq!(apu.peek(ApuReg::Status), Some(0x00));
    }

    #[test]
    fn frame_irq_in_four_step_mode() {
        let (mut apu, mut cycle) = powered_on();
        run_cycles(&mut apu, &mut cycle, 29_840);
        assert!(apu.irq_line());
        assert_eq!(apu.read(ApuReg::Status).map(|s| s & 0x40), Some(0x40));
        // Reading status acknowledges it.
        assert!(!apu.irq_line());
    }

    #[test]
    fn no_irq_in_five_step_mode() {
        let (mut apu, mut cycle) = powered_on();
        apu.write(ApuReg::FrameCounter, 0x80);
        run_cycles(&mut apu, &mut cycle, 40_000);
        assert!(!apu.irq_line());
    }

    #[test]
    fn inhibit_flag_suppresses_irq() {
        let (mut apu, mut cycle) = powered_on();
        apu.write(ApuReg::FrameCounter, 0x40);
        run_cycles(&mut apu, &mut cycle, 40_000);
        assert!(!apu.irq_line());
    }

    #[test]
    fn length_counter_runs_out_on_half_frames() {
        let (mut apu, mut cycle) = powered_on();
        apu.write(ApuReg::Status, 0x01);
        apu.write(ApuReg::Square1(0), 0x10);
        // Index 3 loads 2: two half-frame clocks empty it.
        apu.write(ApuReg::Square1(3), 0x18);
        run_cycles(&mut apu, &mut cycle, 14_913);
        assert_eq!(apu.peek(ApuReg::Status).map(|s| s & 1), Some(1));
        run_cycles(&mut apu, &mut cycle, 15_000);
        assert_eq!(apu.peek(ApuReg::Status).map(|s| s & 1), Some(0));
    }

    #[test]
    fn pulse_produces_audio() {
        let (mut apu, mut cycle) = powered_on();
        apu.write(ApuReg::Status, 0x01);
        apu.write(ApuReg::Square1(0), 0xBF);
        apu.write(ApuReg::Square1(2), 0xFD);
        apu.write(ApuReg::Square1(3), 0x08);
        run_cycles(&mut apu, &mut cycle, 20_000);
        assert!(apu.samples().iter().any(|&s| s != 0));
        assert_eq!(apu.query("square1.period"), Some(Value::U16(0xFD)));
    }

    #[test]
    fn dmc_enable_requests_dma() {
        let (mut apu, mut cycle) = powered_on();
        apu.write(ApuReg::Dmc(2), 0x00);
        apu.write(ApuReg::Dmc(3), 0x01);
        apu.write(ApuReg::Status, 0x10);
        run_cycles(&mut apu, &mut cycle, 4);
        assert_eq!(apu.take_dma_request(), Some(DmcDma::Start));
        assert_eq!(apu.dmc_address(), 0xC000);
        apu.set_dmc_read_buffer(0xAA);
        assert_eq!(apu.dmc_address(), 0xC001);
        assert_eq!(apu.peek(ApuReg::Status).map(|s| s & 0x10), Some(0x10));
    }

    #[test]
    fn dmc_irq_acknowledged_by_status_write() {
        let (mut apu, mut cycle) = powered_on();
        apu.write(ApuReg::Dmc(0), 0x80);
        apu.write(ApuReg::Dmc(3), 0x00);
        apu.write(ApuReg::Status, 0x10);
        run_cycles(&mut apu, &mut cycle, 4);
        apu.set_dmc_read_buffer(0x00);
        assert!(apu.irq_line());
        assert_eq!(apu.peek(ApuReg::Status).map(|s| s & 0x80), Some(0x80));
        apu.write(ApuReg::Status, 0x00);
        assert!(!apu.irq_line());
    }

    #[test]
    fn write_only_registers_read_open_bus() {
        let (mut apu, _) = powered_on();
        assert_eq!(apu.read(ApuReg::Square1(0)), None);
        assert_eq!(apu.peek(ApuReg::FrameCounter), None);
    }

    #[test]
    fn register_table_covers_channel_window() {
        let bank0: Vec<u16> = REGISTERS.iter().filter(|r| r.bank == 0).map(|r| r.offset).collect();
        assert_eq!(bank0.len(), 21);
        assert!(!bank0.contains(&0x14));
        assert!(!bank0.contains(&0x16));
        assert!(!bank0.contains(&0x17));
    }
}
