//! Volume envelope of the pulse and noise channels. The envelope owns the
//! channel's length counter because both share the loop/halt bit.

use crate::length_counter::LengthCounter;

#[derive(Debug, Clone, Default)]
pub(crate) struct Envelope {
    constant_volume: bool,
    volume: u8,
    start: bool,
    divider: i8,
    counter: u8,
    pub(crate) length: LengthCounter,
}

impl Envelope {
    /// Configure from a `--LC VVVV` register write.
    pub(crate) fn init(&mut self, reg: u8) {
        self.length.init(reg & 0x20 != 0);
        self.constant_volume = reg & 0x10 != 0;
        self.volume = reg & 0x0F;
    }

    /// Restart on the next quarter-frame clock.
    pub(crate) fn restart(&mut self) {
        self.start = true;
    }

    pub(crate) fn reset(&mut self, soft: bool) {
        self.length.reset(soft, false);
        self.constant_volume = false;
        self.volume = 0;
        self.start = false;
        self.divider = 0;
        self.counter = 0;
    }

    /// Output volume, 0 while the length counter is empty.
    pub(crate) const fn output(&self) -> u8 {
        if !self.length.status() {
            0
        } else if self.constant_volume {
            self.volume
        } else {
            self.counter
        }
    }

    /// Quarter-frame clock.
    pub(crate) fn tick(&mut self) {
        if self.start {
            self.start = false;
            self.counter = 15;
            self.divider = self.volume as i8;
            return;
        }
        self.divider -= 1;
        if self.divider < 0 {
            self.divider = self.volume as i8;
            if self.counter > 0 {
                self.counter -= 1;
            } else if self.length.halted() {
                self.counter = 15;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sounding(reg: u8) -> Envelope {
        let mut env = Envelope::default();
        env.init(reg);
        env.length.set_enabled(true);
        env.length.load(1);
        env.length.reload();
        env
    }

    #[test]
    fn constant_volume() {
        let env = sounding(0x17);
        assert_eq!(env.output(), 7);
    }

    #[test]
    fn decays_one_step_per_period_plus_one() {
        let mut env = sounding(0x01);
        env.restart();
        env.tick();
        assert_eq!(env.output(), 15);
        env.tick();
        assert_eq!(env.output(), 15);
        env.tick();
        assert_eq!(env.output(), 14);
    }

    #[test]
    fn loops_when_halted() {
        let mut env = sounding(0x20);
        env.restart();
        for _ in 0..16 {
            env.tick();
        }
        assert_eq!(env.output(), 0);
        env.tick();
        assert_eq!(env.output(), 15);
    }

    #[test]
    fn silent_without_length() {
        let mut env = Envelope::default();
        env.init(0x1F);
        assert_eq!(env.output(), 0);
    }
}
