//! The 2C02 state machine.
//!
//! One [`Ppu::tick`] is one dot. A frame is 341 dots by 262 scanlines:
//!
//! - 0-239: visible, pixels are output and tiles fetched
//! - 240: post-render, idle
//! - 241: vblank starts at dot 1
//! - 261: pre-render, flags cleared and the vertical scroll reloaded
//!
//! With rendering enabled, the pre-render line of every odd frame is one
//! dot shorter.

use emu_core::map::Reg8;
use emu_core::{Observable, Value};
use log::{debug, trace};

use crate::VideoBus;
use crate::open_bus::IoLatch;
use crate::palette::{PaletteRam, to_rgba};
use crate::registers::{Ctrl, Loopy, Mask, PPUSTATUS, PpuReg, status};
use crate::sprites::SpriteUnit;

pub const WIDTH: usize = 256;
pub const HEIGHT: usize = 240;
pub const DOTS_PER_LINE: u16 = 341;
pub const LINES_PER_FRAME: u16 = 262;
pub const VBLANK_LINE: u16 = 241;
pub const PRE_RENDER_LINE: u16 = 261;

pub struct Ppu {
    pub(crate) ctrl: Ctrl,
    pub(crate) mask: Mask,
    pub(crate) status: Reg8,
    pub(crate) oam_addr: u8,

    pub(crate) v: Loopy,
    t: Loopy,
    fine_x: u8,
    write_latch: bool,
    read_buffer: u8,

    pub(crate) scanline: u16,
    pub(crate) dot: u16,
    odd_frame: bool,
    frame: u64,
    /// $2002 was read just before vblank would have been flagged.
    suppress_vblank: bool,

    palette: PaletteRam,
    pub(crate) oam: [u8; 256],
    pub(crate) sprites: SpriteUnit,

    // Background fetch latches and shifters.
    nt: u8,
    at: u8,
    bg_lo: u8,
    bg_hi: u8,
    pattern_lo: u16,
    pattern_hi: u16,
    attr_lo: u16,
    attr_hi: u16,

    latch: IoLatch,
    framebuffer: Vec<u8>,
}

impl Ppu {
    #[must_use]
    pub fn new(open_bus_decay: bool) -> Self {
        Self {
            ctrl: Ctrl::default(),
            mask: Mask::default(),
            status: PPUSTATUS.cell(0),
            oam_addr: 0,
            v: Loopy::default(),
            t: Loopy::default(),
            fine_x: 0,
            write_latch: false,
            read_buffer: 0,
            scanline: 0,
            dot: 0,
            odd_frame: false,
            frame: 0,
            suppress_vblank: false,
            palette: PaletteRam::default(),
            oam: [0; 256],
            sprites: SpriteUnit::default(),
            nt: 0,
            at: 0,
            bg_lo: 0,
            bg_hi: 0,
            pattern_lo: 0,
            pattern_hi: 0,
            attr_lo: 0,
            attr_hi: 0,
            latch: IoLatch::new(open_bus_decay),
            framebuffer: vec![0; WIDTH * HEIGHT * 4],
        }
    }

    /// A soft reset clears the control registers and the write toggle;
    /// a hard reset also restores power-on memory contents.
    pub fn reset(&mut self, soft: bool) {
        debug!("ppu {} reset", if soft { "soft" } else { "hard" });
        self.ctrl = Ctrl::default();
        self.mask = Mask::default();
        self.t = Loopy::default();
        self.fine_x = 0;
        self.write_latch = false;
        self.read_buffer = 0;
        self.odd_frame = false;
        self.suppress_vblank = false;
        self.scanline = 0;
        self.dot = 0;
        if !soft {
            self.status = PPUSTATUS.cell(0);
            self.oam_addr = 0;
            self.v = Loopy::default();
            self.frame = 0;
            self.palette.power_on();
            self.oam = [0; 256];
            self.sprites = SpriteUnit::default();
            self.latch.clear();
            self.framebuffer.fill(0);
        }
    }

    /// Level of the /NMI output: vblank flagged with NMI enabled.
    #[must_use]
    pub const fn nmi_line(&self) -> bool {
        self.status.bit(status::VBLANK) && self.ctrl.nmi()
    }

    #[must_use]
    pub const fn scanline(&self) -> u16 {
        self.scanline
    }

    /// Next dot to be processed on the current scanline.
    #[must_use]
    pub const fn dot(&self) -> u16 {
        self.dot
    }

    /// Frames completed since power on.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// 256x240 RGBA, row-major.
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    #[must_use]
    pub const fn oam(&self) -> &[u8; 256] {
        &self.oam
    }

    #[must_use]
    pub const fn palette_ram(&self) -> &PaletteRam {
        &self.palette
    }

    const fn rendering(&self) -> bool {
        self.mask.rendering()
    }

    /// True on the lines where the PPU fetches from memory.
    const fn on_render_line(&self) -> bool {
        self.scanline < 240 || self.scanline == PRE_RENDER_LINE
    }

    /// Run one dot.
    pub fn tick<B: VideoBus + ?Sized>(&mut self, bus: &mut B) {
        match self.scanline {
            0..=239 => self.render_dot(bus, false),
            PRE_RENDER_LINE => self.render_dot(bus, true),
            VBLANK_LINE if self.dot == 1 => self.enter_vblank(),
            _ => {}
        }
        self.advance();
    }

    fn advance(&mut self) {
        self.dot += 1;
        if self.dot < DOTS_PER_LINE {
            return;
        }
        self.dot = 0;
        self.scanline += 1;
        if self.scanline == LINES_PER_FRAME {
            self.scanline = 0;
            self.frame += 1;
            self.odd_frame = !self.odd_frame;
        }
    }

    fn enter_vblank(&mut self) {
        if self.suppress_vblank {
            trace!("vblank suppressed by $2002 read");
        } else {
            self.status.set_bits(status::VBLANK, true);
        }
        self.suppress_vblank = false;
        self.latch.decay(self.frame);
    }

    fn render_dot<B: VideoBus + ?Sized>(&mut self, bus: &mut B, pre_render: bool) {
        let dot = self.dot;
        if pre_render && dot == 1 {
            self.status.set_bits(status::VBLANK | status::SPRITE0_HIT | status::OVERFLOW, false);
            self.sprites.clear_line();
        }

        if !pre_render && (1..=256).contains(&dot) {
            self.output_pixel();
        }

        if !self.rendering() {
            return;
        }

        if (1..=256).contains(&dot) || (321..=336).contains(&dot) {
            self.fetch_background(bus);
            self.shift_background();
        }

        match dot {
            256 => self.v.increment_y(),
            257 => {
                self.v.copy_horizontal(self.t);
                if !pre_render {
                    self.evaluate_sprites(bus);
                }
            }
            280..=304 if pre_render => self.v.copy_vertical(self.t),
            339 if pre_render && self.odd_frame => self.dot = 340,
            _ => {}
        }
        if (257..=320).contains(&dot) {
            self.oam_addr = 0;
        }
    }

    /// One step of the 8-dot tile fetch cycle.
    fn fetch_background<B: VideoBus + ?Sized>(&mut self, bus: &mut B) {
        let dot = self.dot;
        let step = if dot >= 321 { dot - 321 } else { dot - 1 };
        match step & 7 {
            0 => {
                if dot != 321 {
                    self.reload_shifters();
                }
                self.nt = bus.read(self.v.nt_addr());
            }
            2 => {
                let at = bus.read(self.v.at_addr());
                self.at = (at >> self.v.at_shift()) & 0x03;
            }
            4 => {
                let addr = self.bg_pattern_addr();
                self.bg_lo = bus.read(addr);
            }
            6 => {
                let addr = self.bg_pattern_addr() + 8;
                self.bg_hi = bus.read(addr);
            }
            7 => self.v.increment_x(),
            _ => {}
        }
    }

    fn bg_pattern_addr(&self) -> u16 {
        self.ctrl.bg_table() + u16::from(self.nt) * 16 + self.v.fine_y()
    }

    fn reload_shifters(&mut self) {
        self.pattern_lo = (self.pattern_lo & 0xFF00) | u16::from(self.bg_lo);
        self.pattern_hi = (self.pattern_hi & 0xFF00) | u16::from(self.bg_hi);
        let fill = |bit: u8| if bit != 0 { 0xFF } else { 0x00 };
        self.attr_lo = (self.attr_lo & 0xFF00) | fill(self.at & 1);
        self.attr_hi = (self.attr_hi & 0xFF00) | fill(self.at & 2);
    }

    fn shift_background(&mut self) {
        self.pattern_lo <<= 1;
        self.pattern_hi <<= 1;
        self.attr_lo <<= 1;
        self.attr_hi <<= 1;
    }

    /// Background pixel and palette at the current dot.
    fn background_pixel(&self) -> (u8, u8) {
        if !self.mask.bg() || (self.dot <= 8 && !self.mask.bg_left()) {
            return (0, 0);
        }
        let bit = 0x8000 >> self.fine_x;
        let pick = |reg: u16| u8::from(reg & bit != 0);
        let pixel = (pick(self.pattern_hi) << 1) | pick(self.pattern_lo);
        let palette = (pick(self.attr_hi) << 1) | pick(self.attr_lo);
        (pixel, palette)
    }

    fn output_pixel(&mut self) {
        let x = usize::from(self.dot - 1);
        let y = usize::from(self.scanline);

        let colour = if self.rendering() {
            let (bg, bg_palette) = self.background_pixel();
            let sprite = self.sprite_pixel(x);

            let addr = match sprite {
                Some(sp) if bg != 0 => {
                    if sp.zero && x != 255 && self.mask.bg() && self.mask.sprites() {
                        self.status.set_bits(status::SPRITE0_HIT, true);
                    }
                    if sp.behind {
                        (bg_palette << 2) | bg
                    } else {
                        sp.palette_addr()
                    }
                }
                Some(sp) => sp.palette_addr(),
                None if bg != 0 => (bg_palette << 2) | bg,
                None => 0,
            };
            self.palette.read(0x3F00 | u16::from(addr))
        } else if self.v.addr() >= 0x3F00 {
            // With rendering off, a palette address in v selects the backdrop.
            self.palette.read(self.v.addr())
        } else {
            self.palette.read(0x3F00)
        };

        let rgba = to_rgba(colour, self.mask.greyscale(), self.mask.emphasis());
        let offset = (y * WIDTH + x) * 4;
        self.framebuffer[offset..offset + 4].copy_from_slice(&rgba);
    }

    /// PPUDATA address step. During rendering an access instead bumps
    /// both the coarse X and the Y scroll.
    fn step_vram_addr(&mut self) {
        if self.rendering() && self.on_render_line() {
            self.v.increment_x();
            self.v.increment_y();
        } else {
            self.v = Loopy(self.v.0.wrapping_add(self.ctrl.increment()) & 0x7FFF);
        }
    }

    /// Value of $2002 without side effects.
    fn status_value(&self) -> u8 {
        (self.status.value & 0xE0) | (self.latch.value() & 0x1F)
    }

    fn oam_data_value(&self) -> u8 {
        if self.rendering() && self.scanline < 240 && (1..=64).contains(&self.dot) {
            // Secondary OAM is being cleared.
            0xFF
        } else {
            self.oam[usize::from(self.oam_addr)]
        }
    }

    /// CPU read.
    pub fn read<B: VideoBus + ?Sized>(&mut self, reg: PpuReg, bus: &mut B) -> u8 {
        let frame = self.frame;
        match reg {
            PpuReg::Status => {
                let val = self.status_value();
                self.status.set_bits(status::VBLANK, false);
                self.write_latch = false;
                if self.scanline == VBLANK_LINE && self.dot == 1 {
                    self.suppress_vblank = true;
                }
                self.latch.set(val, 0xE0, frame);
                val
            }
            PpuReg::OamData => {
                let val = self.oam_data_value();
                self.latch.set(val, 0xFF, frame);
                val
            }
            PpuReg::Data => {
                let addr = self.v.addr();
                let val = if addr >= 0x3F00 {
                    let colour = self.palette.read(addr) & if self.mask.greyscale() { 0x30 } else { 0x3F };
                    // The buffer still picks up the nametable byte underneath.
                    self.read_buffer = bus.read(addr & 0x2FFF);
                    self.latch.set(colour, 0x3F, frame);
                    self.latch.value()
                } else {
                    let val = self.read_buffer;
                    self.read_buffer = bus.read(addr);
                    self.latch.set(val, 0xFF, frame);
                    val
                };
                self.step_vram_addr();
                val
            }
            _ => self.latch.value(),
        }
    }

    /// Side-effect free read.
    #[must_use]
    pub fn peek(&self, reg: PpuReg) -> u8 {
        match reg {
            PpuReg::Status => self.status_value(),
            PpuReg::OamData => self.oam_data_value(),
            PpuReg::Data => {
                let addr = self.v.addr();
                if addr >= 0x3F00 {
                    (self.palette.read(addr) & 0x3F) | (self.latch.value() & 0xC0)
                } else {
                    self.read_buffer
                }
            }
            _ => self.latch.value(),
        }
    }

    /// Byte at `addr` on the PPU bus, without side effects.
    #[must_use]
    pub fn peek_vram<B: VideoBus + ?Sized>(&self, addr: u16, bus: &B) -> u8 {
        let addr = addr & 0x3FFF;
        if addr >= 0x3F00 {
            self.palette.read(addr)
        } else {
            bus.peek(addr)
        }
    }

    /// CPU write.
    pub fn write<B: VideoBus + ?Sized>(&mut self, reg: PpuReg, val: u8, bus: &mut B) {
        self.latch.set(val, 0xFF, self.frame);
        trace!("{reg:?} = {val:02X} at {},{}", self.scanline, self.dot);
        match reg {
            PpuReg::Ctrl => {
                self.ctrl = Ctrl(val);
                self.t.set_nametable(val);
            }
            PpuReg::Mask => self.mask = Mask(val),
            PpuReg::Status => {
                self.status.write(val);
            }
            PpuReg::OamAddr => self.oam_addr = val,
            PpuReg::OamData => self.write_oam(val),
            PpuReg::Scroll => {
                if self.write_latch {
                    self.t.set_fine_y(val);
                    self.t.set_coarse_y(val >> 3);
                } else {
                    self.fine_x = val & 0x07;
                    self.t.set_coarse_x(val >> 3);
                }
                self.write_latch = !self.write_latch;
            }
            PpuReg::Addr => {
                if self.write_latch {
                    self.t = Loopy((self.t.0 & 0x7F00) | u16::from(val));
                    self.v = self.t;
                } else {
                    // Bit 14 of t is cleared by the first write.
                    self.t = Loopy((self.t.0 & 0x00FF) | (u16::from(val & 0x3F) << 8));
                }
                self.write_latch = !self.write_latch;
            }
            PpuReg::Data => {
                let addr = self.v.addr();
                if addr >= 0x3F00 {
                    self.palette.write(addr, val);
                } else {
                    bus.write(addr, val);
                }
                self.step_vram_addr();
            }
        }
    }

    /// $2004 write; also the target of OAM DMA.
    pub fn write_oam(&mut self, val: u8) {
        if self.rendering() && self.on_render_line() {
            // Ignored, but the address still moves to the next sprite.
            self.oam_addr = self.oam_addr.wrapping_add(4);
            return;
        }
        // Bits 2-4 of the attribute byte do not exist.
        let val = if self.oam_addr & 3 == 2 { val & 0xE3 } else { val };
        self.oam[usize::from(self.oam_addr)] = val;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }
}

const QUERY_PATHS: &[&str] = &[
    "scanline",
    "dot",
    "frame",
    "odd_frame",
    "ctrl",
    "mask",
    "status",
    "oam_addr",
    "v",
    "t",
    "fine_x",
    "write_latch",
    "read_buffer",
    "nmi",
    "open_bus",
    "sprite_count",
];

impl Observable for Ppu {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("oam.") {
            let idx: u8 = rest.parse().ok()?;
            return Some(self.oam[usize::from(idx)].into());
        }
        if let Some(rest) = path.strip_prefix("palette.") {
            let idx: u16 = rest.parse().ok()?;
            return (idx < 32).then(|| self.palette.read(0x3F00 + idx).into());
        }
        Some(match path {
            "scanline" => self.scanline.into(),
            "dot" => self.dot.into(),
            "frame" => self.frame.into(),
            "odd_frame" => self.odd_frame.into(),
            "ctrl" => self.ctrl.0.into(),
            "mask" => self.mask.0.into(),
            "status" => self.status.value.into(),
            "oam_addr" => self.oam_addr.into(),
            "v" => self.v.0.into(),
            "t" => self.t.0.into(),
            "fine_x" => self.fine_x.into(),
            "write_latch" => self.write_latch.into(),
            "read_buffer" => self.read_buffer.into(),
            "nmi" => self.nmi_line().into(),
            "open_bus" => self.latch.value().into(),
            "sprite_count" => self.sprites.count().into(),
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

    /// 16 KB flat PPU address space: pattern tables plus four nametables.
    struct FlatVram(Vec<u8>);

    impl FlatVram {
        fn new() -> Self {
            Self(vec![0; 0x4000])
        }
    }

    impl VideoBus for FlatVram {
        fn read(&mut self, addr: u16) -> u8 {
            self.0[usize::from(addr & 0x3FFF)]
        }

        fn write(&mut self, addr: u16, val: u8) {
            self.0[usize::from(addr & 0x3FFF)] = val;
        }

        fn peek(&self, addr: u16) -> u8 {
            self.0[usize::from(addr & 0x3FFF)]
        }
    }

    fn run_to(ppu: &mut Ppu, bus: &mut FlatVram, scanline: u16, dot: u16) {
        while ppu.scanline != scanline || ppu.dot != dot {
            ppu.tick(bus);
        }
    }

    #[test]
    fn vblank_sets_and_status_read_clears() {
        let mut ppu = Ppu::new(true);
        let mut bus = FlatVram::new();
        run_to(&mut ppu, &mut bus, 241, 2);
        assert_eq!(ppu.peek(PpuReg::Status) & 0x80, 0x80);
        assert_eq!(ppu.read(PpuReg::Status, &mut bus) & 0x80, 0x80);
        assert_eq!(ppu.peek(PpuReg::Status) & 0x80, 0);
    }

    #[test]
    fn peek_does_not_clear_vblank() {
        let mut ppu = Ppu::new(true);
        let mut bus = FlatVram::new();
        run_to(&mut ppu, &mut bus, 250, 0);
        let first = ppu.peek(PpuReg::Status);
        assert_eq!(ppu.peek(PpuReg::Status), first);
        assert_eq!(first & 0x80, 0x80);
    }

    #[test]
    fn status_read_just_before_vblank_suppresses_it() {
        let mut ppu = Ppu::new(true);
        let mut bus = FlatVram::new();
        ppu.write(PpuReg::Ctrl, 0x80, &mut bus);
        run_to(&mut ppu, &mut bus, 241, 1);
        assert_eq!(ppu.read(PpuReg::Status, &mut bus) & 0x80, 0);
        ppu.tick(&mut bus);
        assert!(!ppu.nmi_line());
        assert_eq!(ppu.peek(PpuReg::Status) & 0x80, 0);
    }

    #[test]
    fn nmi_line_follows_ctrl_during_vblank() {
        let mut ppu = Ppu::new(true);
        let mut bus = FlatVram::new();
        run_to(&mut ppu, &mut bus, 245, 0);
        assert!(!ppu.nmi_line());
        ppu.write(PpuReg::Ctrl, 0x80, &mut bus);
        assert!(ppu.nmi_line());
        ppu.write(PpuReg::Ctrl, 0x00, &mut bus);
        assert!(!ppu.nmi_line());
    }

    #[test]
    fn pre_render_clears_flags() {
        let mut ppu = Ppu::new(true);
        let mut bus = FlatVram::new();
        run_to(&mut ppu, &mut bus, 260, 0);
        ppu.status.set_bits(status::SPRITE0_HIT | status::OVERFLOW, true);
        run_to(&mut ppu, &mut bus, 261, 2);
        assert_eq!(ppu.status.value & 0xE0, 0);
    }

    #[test]
    fn status_writes_keep_the_flags() {
        let mut ppu = Ppu::new(true);
        let mut bus = FlatVram::new();
        ppu.status.set_bits(status::SPRITE0_HIT, true);
        ppu.write(PpuReg::Status, 0x00, &mut bus);
        assert!(ppu.status.bit(status::SPRITE0_HIT));
        ppu.write(PpuReg::Status, 0xFF, &mut bus);
        assert_eq!(ppu.status.value, status::SPRITE0_HIT);
        // The write still lands on the I/O latch.
        assert_eq!(ppu.peek(PpuReg::Status), status::SPRITE0_HIT | 0x1F);
    }

    #[test]
    fn frame_is_89342_dots_without_rendering() {
        let mut ppu = Ppu::new(true);
        let mut bus = FlatVram::new();
        for _ in 0..89_342 * 2 {
            ppu.tick(&mut bus);
        }
        assert_eq!((ppu.scanline, ppu.dot, ppu.frame), (0, 0, 2));
    }

    #[test]
    fn odd_frames_skip_a_dot_when_rendering() {
        let mut ppu = Ppu::new(true);
        let mut bus = FlatVram::new();
        ppu.write(PpuReg::Mask, 0x08, &mut bus);
        let mut dots = 0;
        while ppu.frame < 2 {
            ppu.tick(&mut bus);
            dots += 1;
        }
        assert_eq!(dots, 89_342 + 89_341);
    }

    #[test]
    fn scroll_and_addr_share_the_write_toggle() {
        let mut ppu = Ppu::new(true);
        let mut bus = FlatVram::new();
        ppu.write(PpuReg::Scroll, 0x7D, &mut bus); // coarse X 15, fine X 5
        ppu.write(PpuReg::Scroll, 0x5E, &mut bus); // coarse Y 11, fine Y 6
        assert_eq!(ppu.fine_x, 5);
        assert_eq!(ppu.t.coarse_x(), 15);
        assert_eq!(ppu.t.coarse_y(), 11);
        assert_eq!(ppu.t.fine_y(), 6);

        ppu.read(PpuReg::Status, &mut bus);
        ppu.write(PpuReg::Addr, 0x3F, &mut bus);
        ppu.write(PpuReg::Addr, 0x10, &mut bus);
        assert_eq!(ppu.v.0, 0x3F10);
    }

    #[test]
    fn ppudata_reads_are_buffered_except_palette() {
        let mut ppu = Ppu::new(true);
        let mut bus = FlatVram::new();
        bus.0[0x2005] = 0x42;
        bus.0[0x2F00] = 0x99;
        ppu.write(PpuReg::Addr, 0x20, &mut bus);
        ppu.write(PpuReg::Addr, 0x05, &mut bus);
        assert_eq!(ppu.read(PpuReg::Data, &mut bus), 0x00);
        ppu.write(PpuReg::Addr, 0x20, &mut bus);
        ppu.write(PpuReg::Addr, 0x05, &mut bus);
        ppu.read(PpuReg::Data, &mut bus);
        assert_eq!(ppu.read(PpuReg::Data, &mut bus), 0x42);

        ppu.write(PpuReg::Addr, 0x3F, &mut bus);
        ppu.write(PpuReg::Addr, 0x00, &mut bus);
        ppu.write(PpuReg::Data, 0x21, &mut bus);
        ppu.write(PpuReg::Addr, 0x3F, &mut bus);
        ppu.write(PpuReg::Addr, 0x00, &mut bus);
        assert_eq!(ppu.read(PpuReg::Data, &mut bus) & 0x3F, 0x21);
        assert_eq!(ppu.read_buffer, 0x99);
    }

    #[test]
    fn palette_write_through_sprite_backdrop_mirror() {
        let mut ppu = Ppu::new(true);
        let mut bus = FlatVram::new();
        ppu.write(PpuReg::Addr, 0x3F, &mut bus);
        ppu.write(PpuReg::Addr, 0x10, &mut bus);
        ppu.write(PpuReg::Data, 0x2C, &mut bus);
        assert_eq!(ppu.peek_vram(0x3F00, &bus), 0x2C);
    }

    #[test]
    fn increment_32_mode() {
        let mut ppu = Ppu::new(true);
        let mut bus = FlatVram::new();
        ppu.write(PpuReg::Ctrl, 0x04, &mut bus);
        ppu.write(PpuReg::Addr, 0x20, &mut bus);
        ppu.write(PpuReg::Addr, 0x00, &mut bus);
        ppu.write(PpuReg::Data, 1, &mut bus);
        ppu.write(PpuReg::Data, 2, &mut bus);
        assert_eq!(bus.0[0x2000], 1);
        assert_eq!(bus.0[0x2020], 2);
        assert_eq!(ppu.v.0, 0x2040);
    }

    #[test]
    fn write_only_registers_read_the_io_latch() {
        let mut ppu = Ppu::new(true);
        let mut bus = FlatVram::new();
        ppu.write(PpuReg::Mask, 0x1E, &mut bus);
        assert_eq!(ppu.read(PpuReg::Ctrl, &mut bus), 0x1E);
        // $2002 fills its low bits from the latch.
        assert_eq!(ppu.read(PpuReg::Status, &mut bus) & 0x1F, 0x1E);
    }

    #[test]
    fn oam_data_writes_increment_address() {
        let mut ppu = Ppu::new(true);
        let mut bus = FlatVram::new();
        ppu.write(PpuReg::OamAddr, 0xFE, &mut bus);
        ppu.write(PpuReg::OamData, 0xFF, &mut bus);
        ppu.write(PpuReg::OamData, 0x11, &mut bus);
        // Attribute bytes drop their unused bits.
        assert_eq!(ppu.oam[0xFE], 0xE3);
        assert_eq!(ppu.oam[0xFF], 0x11);
        assert_eq!(ppu.oam_addr, 0x00);
        ppu.write(PpuReg::OamAddr, 0xFF, &mut bus);
        assert_eq!(ppu.read(PpuReg::OamData, &mut bus), 0x11);
    }

    #[test]
    fn backdrop_fills_screen_when_rendering_disabled() {
        let mut ppu = Ppu::new(true);
        let mut bus = FlatVram::new();
        ppu.write(PpuReg::Addr, 0x3F, &mut bus);
        ppu.write(PpuReg::Addr, 0x00, &mut bus);
        ppu.write(PpuReg::Data, 0x30, &mut bus);
        ppu.write(PpuReg::Addr, 0x00, &mut bus);
        ppu.write(PpuReg::Addr, 0x00, &mut bus);
        run_to(&mut ppu, &mut bus, 240, 0);
        let white = to_rgba(0x30, false, 0);
        assert!(ppu.framebuffer().chunks_exact(4).all(|px| px == white));
    }

    #[test]
    fn background_tile_is_drawn() {
        let mut ppu = Ppu::new(true);
        let mut bus = FlatVram::new();
        // Tile 1: solid colour 3.
        for row in 0..8 {
            bus.0[16 + row] = 0xFF;
            bus.0[16 + row + 8] = 0xFF;
        }
        bus.0[0x2000] = 1;
        ppu.palette.write(0x3F00, 0x0F);
        ppu.palette.write(0x3F03, 0x16);
        ppu.write(PpuReg::Mask, 0x0A, &mut bus);
        // Start from the pre-render line so the first tiles are prefetched.
        run_to(&mut ppu, &mut bus, 261, 0);
        run_to(&mut ppu, &mut bus, 1, 0);
        let red = to_rgba(0x16, false, 0);
        let black = to_rgba(0x0F, false, 0);
        let fb = ppu.framebuffer();
        assert_eq!(&fb[0..4], &red);
        assert_eq!(&fb[7 * 4..8 * 4], &red);
        assert_eq!(&fb[8 * 4..9 * 4], &black);
    }

    #[test]
    fn hard_reset_twice_is_idempotent() {
        let mut a = Ppu::new(true);
        let mut bus = FlatVram::new();
        a.write(PpuReg::Ctrl, 0x90, &mut bus);
        run_to(&mut a, &mut bus, 100, 5);
        a.reset(false);
        let once = (a.query("v"), a.query("ctrl"), a.oam, a.scanline, a.dot);
        a.reset(false);
        assert_eq!(once, (a.query("v"), a.query("ctrl"), a.oam, a.scanline, a.dot));
    }
}
