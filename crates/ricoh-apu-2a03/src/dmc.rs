//! Delta modulation channel ($4010-$4013).
//!
//! The DMC plays 1-bit delta samples fetched from CPU memory. It cannot
//! read memory itself: when its one-byte buffer runs dry it queues a
//! [`DmcDma::Start`] request, and the machine answers through
//! [`Dmc::set_read_buffer`] once the DMA unit has stolen the bus.

use std::collections::VecDeque;

use log::{debug, trace};

use crate::mixer::{Channel, Mixer};
use crate::timer::Timer;

/// CPU cycles per output bit (NTSC).
const PERIODS: [u16; 16] = [
    428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
];

/// A DMA request raised by the DMC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmcDma {
    /// Fetch the byte at [`Dmc::current_addr`].
    Start,
    /// Cancel a fetch that has not started yet.
    Stop,
}

#[derive(Debug, Clone)]
pub(crate) struct Dmc {
    pub(crate) timer: Timer,

    sample_addr: u16,
    sample_len: u16,
    level: u8,
    irq_enabled: bool,
    looped: bool,

    current_addr: u16,
    remaining: u16,
    read_buffer: u8,
    buffer_empty: bool,

    shift: u8,
    bits_left: u8,
    silence: bool,
    need_to_run: bool,
    disable_delay: u8,
    start_delay: u8,

    /// DMC interrupt flag (status bit 7).
    pub(crate) irq: bool,
    pub(crate) requests: VecDeque<DmcDma>,
}

impl Dmc {
    pub(crate) fn new() -> Self {
        Self {
            timer: Timer::new(Channel::Dmc),
            sample_addr: 0xC000,
            sample_len: 1,
            level: 0,
            irq_enabled: false,
            looped: false,
            current_addr: 0,
            remaining: 0,
            read_buffer: 0,
            buffer_empty: true,
            shift: 0,
            bits_left: 8,
            silence: true,
            need_to_run: false,
            disable_delay: 0,
            start_delay: 0,
            irq: false,
            requests: VecDeque::with_capacity(4),
        }
    }

    pub(crate) fn reset(&mut self, soft: bool) {
        self.timer.reset();
        if !soft {
            self.sample_addr = 0xC000;
            self.sample_len = 1;
        }
        self.level = 0;
        self.irq_enabled = false;
        self.looped = false;
        self.current_addr = 0;
        self.remaining = 0;
        self.read_buffer = 0;
        self.buffer_empty = true;
        self.shift = 0;
        self.bits_left = 8;
        self.silence = true;
        self.need_to_run = false;
        self.start_delay = 0;
        self.disable_delay = 0;
        self.irq = false;
        self.requests.clear();

        // Preloaded so the timer does not expire on the first cycle.
        self.timer.period = PERIODS[0] - 1;
        self.timer.timer = self.timer.period;
    }

    pub(crate) fn write(&mut self, mixer: &mut Mixer, reg: u16, val: u8) {
        match reg & 3 {
            0 => {
                self.irq_enabled = val & 0x80 != 0;
                self.looped = val & 0x40 != 0;
                self.timer.period = PERIODS[usize::from(val & 0x0F)] - 1;
                if !self.irq_enabled {
                    self.irq = false;
                }
            }
            1 => {
                let new = i16::from(val & 0x7F);
                let prev = i16::from(self.level);
                let mut level = new;
                // Large jumps are halved to soften the click.
                if (new - prev).abs() > 50 {
                    level -= (new - prev) / 2;
                }
                self.level = level as u8;
                self.timer.add_output(mixer, self.level as i8);
            }
            2 => self.sample_addr = 0xC000 | (u16::from(val) << 6),
            _ => self.sample_len = (u16::from(val) << 4) | 1,
        }
        trace!(
            "dmc reg {reg} = {val:02X}: addr {:04X} len {} level {}",
            self.sample_addr, self.sample_len, self.level
        );
    }

    fn init_sample(&mut self) {
        self.current_addr = self.sample_addr;
        self.remaining = self.sample_len;
        self.need_to_run |= self.remaining > 0;
    }

    fn start_transfer(&mut self) {
        if self.buffer_empty && self.remaining > 0 {
            self.requests.push_back(DmcDma::Start);
        }
    }

    pub(crate) const fn current_addr(&self) -> u16 {
        self.current_addr
    }

    /// Deliver the byte fetched by DMA.
    pub(crate) fn set_read_buffer(&mut self, val: u8) {
        if self.remaining > 0 {
            self.read_buffer = val;
            self.buffer_empty = false;

            self.current_addr = self.current_addr.wrapping_add(1);
            if self.current_addr == 0 {
                self.current_addr = 0x8000;
            }

            self.remaining -= 1;
            if self.remaining == 0 {
                if self.looped {
                    debug!("dmc sample restart at {:04X}", self.sample_addr);
                    self.init_sample();
                } else if self.irq_enabled {
                    self.irq = true;
                }
            }
        }

        // A one-byte sample fetched just before the bit counter reloads
        // would otherwise be lost.
        if self.sample_len == 1 && !self.looped && self.bits_left == 1 && self.timer.timer < 2 {
            self.shift = self.read_buffer;
            self.buffer_empty = false;
            self.init_sample();
            self.disable_delay = 3;
        }
    }

    pub(crate) fn run(&mut self, mixer: &mut Mixer, target: u32) {
        while self.timer.run(target) {
            if !self.silence {
                if self.shift & 1 != 0 {
                    if self.level <= 125 {
                        self.level += 2;
                    }
                } else if self.level >= 2 {
                    self.level -= 2;
                }
                self.shift >>= 1;
            }

            self.bits_left -= 1;
            if self.bits_left == 0 {
                self.bits_left = 8;
                if self.buffer_empty {
                    self.silence = true;
                } else {
                    self.silence = false;
                    self.shift = self.read_buffer;
                    self.buffer_empty = true;
                    self.need_to_run = true;
                    self.start_transfer();
                }
            }

            self.timer.add_output(mixer, self.level as i8);
        }
    }

    /// Whether the sample would run out, raising an IRQ, within `cycles`.
    pub(crate) fn irq_pending(&self, cycles: u32) -> bool {
        if self.irq_enabled && self.remaining > 0 {
            let bits = u32::from(self.bits_left) + (u32::from(self.remaining) - 1) * 8;
            bits * u32::from(self.timer.period) <= cycles
        } else {
            false
        }
    }

    pub(crate) const fn status(&self) -> bool {
        self.remaining > 0
    }

    /// $4015 bit 4. Both directions take effect after 2 or 3 cycles
    /// depending on CPU cycle parity.
    pub(crate) fn set_enabled(&mut self, enabled: bool, odd_cycle: bool) {
        let delay = if odd_cycle { 3 } else { 2 };
        if !enabled {
            if self.disable_delay == 0 {
                self.disable_delay = delay;
            }
            self.need_to_run = true;
        } else if self.remaining == 0 {
            self.init_sample();
            self.start_delay = delay;
            self.need_to_run = true;
        }
    }

    pub(crate) fn process_clock(&mut self) {
        if self.disable_delay != 0 {
            self.disable_delay -= 1;
            if self.disable_delay == 0 {
                self.remaining = 0;
                self.requests.push_back(DmcDma::Stop);
            }
        }
        if self.start_delay != 0 {
            self.start_delay -= 1;
            if self.start_delay == 0 {
                self.start_transfer();
            }
        }
        self.need_to_run = self.disable_delay != 0 || self.start_delay != 0 || self.remaining != 0;
    }

    pub(crate) fn need_to_run(&mut self) -> bool {
        if self.need_to_run {
            self.process_clock();
        }
        self.need_to_run
    }

    pub(crate) const fn output(&self) -> u8 {
        self.timer.last_output() as u8
    }

    pub(crate) const fn level(&self) -> u8 {
        self.level
    }

    pub(crate) const fn sample_addr(&self) -> u16 {
        self.sample_addr
    }

    pub(crate) const fn sample_len(&self) -> u16 {
        self.sample_len
    }

    pub(crate) const fn remaining(&self) -> u16 {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dmc() -> (Dmc, Mixer) {
        let mut dmc = Dmc::new();
        dmc.reset(false);
        (dmc, Mixer::new(48_000))
    }

    #[test]
    fn address_and_length_formulas() {
        let (mut dmc, mut mixer) = dmc();
        dmc.write(&mut mixer, 2, 0x01);
        dmc.write(&mut mixer, 3, 0x02);
        assert_eq!(dmc.sample_addr(), 0xC040);
        assert_eq!(dmc.sample_len(), 0x21);
    }

    #[test]
    fn direct_load_sets_level() {
        let (mut dmc, mut mixer) = dmc();
        dmc.write(&mut mixer, 1, 0x20);
        assert_eq!(dmc.level(), 0x20);
        assert_eq!(dmc.output(), 0x20);
    }

    #[test]
    fn large_direct_load_jump_is_halved() {
        let (mut dmc, mut mixer) = dmc();
        dmc.write(&mut mixer, 1, 0x7F);
        // 127 - 0 > 50, so the step is cut in half.
        assert_eq!(dmc.level(), 127 - 63);
    }

    #[test]
    fn enable_requests_dma_after_delay() {
        let (mut dmc, _) = dmc();
        dmc.set_enabled(true, false);
        assert!(dmc.status());
        dmc.process_clock();
        assert!(dmc.requests.is_empty());
        dmc.process_clock();
        assert_eq!(dmc.requests.pop_front(), Some(DmcDma::Start));
    }

    #[test]
    fn disable_stops_after_delay() {
        let (mut dmc, _) = dmc();
        dmc.set_enabled(true, false);
        dmc.set_enabled(false, true);
        for _ in 0..3 {
            dmc.process_clock();
        }
        assert!(!dmc.status());
        assert!(dmc.requests.contains(&DmcDma::Stop));
    }

    #[test]
    fn last_byte_raises_irq_when_enabled() {
        let (mut dmc, mut mixer) = dmc();
        dmc.write(&mut mixer, 0, 0x80);
        dmc.write(&mut mixer, 3, 0x00); // one byte
        dmc.set_enabled(true, false);
        dmc.set_read_buffer(0x55);
        assert!(dmc.irq);
        assert!(!dmc.status());
    }

    #[test]
    fn loop_restarts_sample() {
        let (mut dmc, mut mixer) = dmc();
        dmc.write(&mut mixer, 0, 0x40);
        dmc.write(&mut mixer, 2, 0x10);
        dmc.write(&mut mixer, 3, 0x00);
        dmc.set_enabled(true, false);
        dmc.set_read_buffer(0x00);
        assert!(!dmc.irq);
        assert_eq!(dmc.remaining(), 1);
        assert_eq!(dmc.current_addr(), 0xC400);
    }

    #[test]
    fn address_wraps_to_8000() {
        let (mut dmc, mut mixer) = dmc();
        dmc.write(&mut mixer, 2, 0xFF); // $FFC0
        dmc.write(&mut mixer, 3, 0x04); // 65 bytes
        dmc.set_enabled(true, false);
        for _ in 0..0x40 {
            dmc.buffer_empty = true;
            dmc.set_read_buffer(0);
        }
        assert_eq!(dmc.current_addr(), 0x8000);
        assert_eq!(dmc.remaining(), 1);
    }

    #[test]
    fn output_unit_moves_level_by_two() {
        let (mut dmc, mut mixer) = dmc();
        dmc.write(&mut mixer, 0, 0x0F); // fastest rate
        dmc.write(&mut mixer, 1, 0x30);
        dmc.set_enabled(true, false);
        dmc.set_read_buffer(0xFF);
        // Eight silent bits from the empty shifter, then eight 1-bits.
        dmc.run(&mut mixer, 2000);
        assert_eq!(dmc.level(), 0x30 + 16);
        assert_eq!(dmc.output(), 0x30 + 16);
    }
}
