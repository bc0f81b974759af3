//! Frame counter ($4017): the sequencer that clocks envelopes, the
//! triangle linear counter, length counters and sweeps, and raises the
//! frame interrupt in 4-step mode.

use log::debug;

/// Cycle of each sequencer step, per mode.
const STEP_CYCLES: [[i32; 6]; 2] = [
    [7457, 14913, 22371, 29828, 29829, 29830],
    [7457, 14913, 22371, 29829, 37281, 37282],
];

/// Which units a sequencer step clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameTick {
    /// Envelopes and the triangle linear counter.
    Quarter,
    /// Quarter, plus length counters and sweeps.
    Half,
}

const STEP_TICKS: [Option<FrameTick>; 6] = [
    Some(FrameTick::Quarter),
    Some(FrameTick::Half),
    Some(FrameTick::Quarter),
    None,
    Some(FrameTick::Half),
    None,
];

#[derive(Debug, Clone, Default)]
pub(crate) struct FrameCounter {
    prev_cycle: i32,
    step: usize,
    /// 0: 4-step mode, 1: 5-step mode.
    mode: usize,
    inhibit_irq: bool,
    /// Suppresses a second tick within two cycles of the last one.
    block_tick: u8,
    /// Pending $4017 value, or -1.
    new_value: i16,
    write_delay: i8,

    /// Frame interrupt flag (status bit 6).
    pub(crate) irq: bool,
}

impl FrameCounter {
    pub(crate) fn reset(&mut self, soft: bool) {
        self.prev_cycle = 0;
        // The mode survives a soft reset and is applied again.
        if !soft {
            self.mode = 0;
        }
        self.step = 0;
        self.new_value = if self.mode == 1 { 0x80 } else { 0 };
        self.write_delay = 3;
        self.inhibit_irq = false;
        self.block_tick = 0;
        self.irq = false;
    }

    /// $4017 write; the mode change lands 3 or 4 cycles later.
    pub(crate) fn write(&mut self, val: u8, odd_cycle: bool) {
        debug!("frame counter = {val:02X}");
        self.new_value = i16::from(val);
        self.write_delay = if odd_cycle { 4 } else { 3 };
        self.inhibit_irq = val & 0x40 != 0;
        if self.inhibit_irq {
            self.irq = false;
        }
    }

    /// Consume up to `cycles` cycles, stopping at the next sequencer step.
    /// Returns the cycles consumed and the tick to apply, if any.
    pub(crate) fn run(&mut self, cycles: &mut i32) -> (u32, Option<FrameTick>) {
        let step_cycle = STEP_CYCLES[self.mode][self.step];
        let mut tick = None;
        let ran;

        if self.prev_cycle + *cycles >= step_cycle {
            if !self.inhibit_irq && self.mode == 0 && self.step >= 3 {
                self.irq = true;
            }
            if self.block_tick == 0 {
                tick = STEP_TICKS[self.step];
                if tick.is_some() {
                    self.block_tick = 2;
                }
            }

            ran = (step_cycle - self.prev_cycle).max(0);
            *cycles -= ran;

            self.step += 1;
            if self.step == 6 {
                self.step = 0;
                self.prev_cycle = 0;
            } else {
                self.prev_cycle += ran;
            }
        } else {
            ran = *cycles;
            *cycles = 0;
            self.prev_cycle += ran;
        }

        if self.new_value >= 0 {
            self.write_delay -= 1;
            if self.write_delay == 0 {
                self.mode = usize::from(self.new_value & 0x80 != 0);
                self.write_delay = -1;
                self.step = 0;
                self.prev_cycle = 0;
                self.new_value = -1;

                // Entering 5-step mode clocks everything at once.
                if self.mode == 1 && self.block_tick == 0 {
                    tick = Some(FrameTick::Half);
                    self.block_tick = 2;
                }
            }
        }

        if self.block_tick > 0 {
            self.block_tick -= 1;
        }

        (ran as u32, tick)
    }

    /// Whether running `cycles` more cycles could change anything.
    pub(crate) fn need_to_run(&self, cycles: u32) -> bool {
        self.new_value >= 0
            || self.block_tick > 0
            || self.prev_cycle + cycles as i32 >= STEP_CYCLES[self.mode][self.step] - 1
    }

    pub(crate) const fn five_step(&self) -> bool {
        self.mode == 1
    }
}
