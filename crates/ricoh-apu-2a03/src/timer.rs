//! Channel timer: a down-counter clocked by the CPU that reports each
//! reload to its channel, plus the channel's last output level.

use crate::mixer::{Channel, Mixer};

#[derive(Debug, Clone)]
pub(crate) struct Timer {
    pub(crate) channel: Channel,
    /// APU cycle the timer has been run up to.
    prev_cycle: u32,
    pub(crate) timer: u16,
    pub(crate) period: u16,
    last_output: i8,
}

impl Timer {
    pub(crate) const fn new(channel: Channel) -> Self {
        Self {
            channel,
            prev_cycle: 0,
            timer: 0,
            period: 0,
            last_output: 0,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.prev_cycle = 0;
        self.timer = 0;
        self.period = 0;
        self.last_output = 0;
    }

    /// Send a level change to the mixer, stamped with the current cycle.
    pub(crate) fn add_output(&mut self, mixer: &mut Mixer, output: i8) {
        if output != self.last_output {
            let delta = i16::from(output) - i16::from(self.last_output);
            mixer.add_delta(self.channel, self.prev_cycle, delta);
            self.last_output = output;
        }
    }

    pub(crate) const fn last_output(&self) -> i8 {
        self.last_output
    }

    /// Advance towards `target`. Returns true, with the timer positioned
    /// at the reload, each time the counter expires on the way; call again
    /// until it returns false.
    pub(crate) fn run(&mut self, target: u32) -> bool {
        let cycles = target.wrapping_sub(self.prev_cycle) as u16;
        if cycles > self.timer {
            self.prev_cycle += u32::from(self.timer) + 1;
            self.timer = self.period;
            return true;
        }
        self.timer -= cycles;
        self.prev_cycle = target;
        false
    }

    pub(crate) fn end_frame(&mut self) {
        self.prev_cycle = 0;
    }
}
