//! Triangle channel ($4008-$400B).

use log::trace;

use crate::length_counter::LengthCounter;
use crate::mixer::{Channel, Mixer};
use crate::timer::Timer;

const SEQUENCE: [i8; 32] = [
    15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0, //
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,
];

#[derive(Debug, Clone)]
pub(crate) struct Triangle {
    pub(crate) length: LengthCounter,
    pub(crate) timer: Timer,

    linear_counter: u8,
    linear_reload_value: u8,
    linear_reload: bool,
    /// Control flag: also halts the length counter.
    linear_control: bool,

    pos: u8,
}

impl Triangle {
    pub(crate) fn new() -> Self {
        Self {
            length: LengthCounter::default(),
            timer: Timer::new(Channel::Triangle),
            linear_counter: 0,
            linear_reload_value: 0,
            linear_reload: false,
            linear_control: false,
            pos: 0,
        }
    }

    pub(crate) fn reset(&mut self, soft: bool) {
        self.timer.reset();
        self.length.reset(soft, true);
        self.linear_counter = 0;
        self.linear_reload_value = 0;
        self.linear_reload = false;
        self.linear_control = false;
        self.pos = 0;
    }

    pub(crate) fn write(&mut self, reg: u16, val: u8) {
        match reg & 3 {
            0 => {
                self.linear_control = val & 0x80 != 0;
                self.linear_reload_value = val & 0x7F;
                self.length.init(self.linear_control);
            }
            1 => {}
            2 => self.timer.period = (self.timer.period & 0xFF00) | u16::from(val),
            _ => {
                self.length.load(val >> 3);
                self.timer.period = (self.timer.period & 0xFF) | (u16::from(val & 0x07) << 8);
                self.linear_reload = true;
            }
        }
        trace!("triangle reg {reg} = {val:02X}: period {}", self.timer.period);
    }

    pub(crate) fn run(&mut self, mixer: &mut Mixer, target: u32) {
        while self.timer.run(target) {
            if self.length.status() && self.linear_counter > 0 {
                self.pos = (self.pos + 1) & 0x1F;
                // Ultrasonic periods hold the current level instead.
                if self.timer.period >= 2 {
                    self.timer.add_output(mixer, SEQUENCE[usize::from(self.pos)]);
                }
            }
        }
    }

    /// Quarter-frame clock.
    pub(crate) fn tick_linear_counter(&mut self) {
        if self.linear_reload {
            self.linear_counter = self.linear_reload_value;
        } else if self.linear_counter > 0 {
            self.linear_counter -= 1;
        }
        if !self.linear_control {
            self.linear_reload = false;
        }
    }

    pub(crate) const fn status(&self) -> bool {
        self.length.status()
    }

    pub(crate) const fn linear_counter(&self) -> u8 {
        self.linear_counter
    }

    pub(crate) const fn output(&self) -> u8 {
        self.timer.last_output() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing() -> Triangle {
        let mut tri = Triangle::new();
        tri.length.set_enabled(true);
        tri.write(0, 0x7F);
        tri.write(2, 0x10);
        tri.write(3, 0x08);
        tri.length.reload();
        tri.tick_linear_counter();
        tri
    }

    #[test]
    fn linear_counter_reloads_then_counts_down() {
        let mut tri = playing();
        assert_eq!(tri.linear_counter(), 0x7F);
        tri.tick_linear_counter();
        assert_eq!(tri.linear_counter(), 0x7E);
    }

    #[test]
    fn control_flag_keeps_reloading() {
        let mut tri = Triangle::new();
        tri.write(0, 0x85);
        tri.write(3, 0x00);
        tri.tick_linear_counter();
        tri.tick_linear_counter();
        assert_eq!(tri.linear_counter(), 5);
    }

    #[test]
    fn steps_through_sequence() {
        let mut mixer = Mixer::new(48_000);
        let mut tri = playing();
        let mut levels = Vec::new();
        for cycle in (17..=17 * 32).step_by(17) {
            tri.run(&mut mixer, cycle);
            levels.push(tri.output());
        }
        assert_eq!(levels[..4], [14, 13, 12, 11]);
        assert!(levels.contains(&0));
        assert!(levels.contains(&15));
    }

    #[test]
    fn silent_without_linear_counter() {
        let mut mixer = Mixer::new(48_000);
        let mut tri = Triangle::new();
        tri.length.set_enabled(true);
        tri.write(2, 0x10);
        tri.write(3, 0x08);
        tri.length.reload();
        tri.run(&mut mixer, 1000);
        assert_eq!(tri.output(), 0);
    }
}
