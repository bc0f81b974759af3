//! Pulse channels ($4000-$4007).

use log::trace;

use crate::envelope::Envelope;
use crate::mixer::{Channel, Mixer};
use crate::timer::Timer;

/// Duty sequences, read backwards as the sequencer counts down.
const DUTY: [[u8; 8]; 4] = [
    [0, 0, 0, 0, 0, 0, 0, 1],
    [0, 0, 0, 0, 0, 0, 1, 1],
    [0, 0, 0, 0, 1, 1, 1, 1],
    [1, 1, 1, 1, 1, 1, 0, 0],
];

#[derive(Debug, Clone)]
pub(crate) struct Square {
    pub(crate) envelope: Envelope,
    pub(crate) timer: Timer,
    /// Pulse 1 negates with one's complement (subtracts one more).
    ones_complement: bool,

    duty: u8,
    duty_pos: u8,

    sweep_enabled: bool,
    sweep_period: u8,
    sweep_negate: bool,
    sweep_shift: u8,
    reload_sweep: bool,
    sweep_divider: u8,
    target_period: u32,
    real_period: u16,
}

impl Square {
    pub(crate) fn new(channel: Channel) -> Self {
        Self {
            envelope: Envelope::default(),
            timer: Timer::new(channel),
            ones_complement: channel == Channel::Square1,
            duty: 0,
            duty_pos: 0,
            sweep_enabled: false,
            sweep_period: 0,
            sweep_negate: false,
            sweep_shift: 0,
            reload_sweep: false,
            sweep_divider: 0,
            target_period: 0,
            real_period: 0,
        }
    }

    pub(crate) fn reset(&mut self, soft: bool) {
        self.envelope.reset(soft);
        self.timer.reset();
        self.duty = 0;
        self.duty_pos = 0;
        self.real_period = 0;
        self.sweep_enabled = false;
        self.sweep_period = 0;
        self.sweep_negate = false;
        self.sweep_shift = 0;
        self.reload_sweep = false;
        self.sweep_divider = 0;
        self.update_target_period();
    }

    /// Register write; `reg` is the offset within the channel (0-3).
    pub(crate) fn write(&mut self, reg: u16, val: u8) {
        match reg & 3 {
            0 => {
                self.envelope.init(val);
                self.duty = val >> 6;
            }
            1 => {
                self.sweep_enabled = val & 0x80 != 0;
                self.sweep_negate = val & 0x08 != 0;
                self.sweep_period = ((val & 0x70) >> 4) + 1;
                self.sweep_shift = val & 0x07;
                self.update_target_period();
                self.reload_sweep = true;
            }
            2 => self.set_period((self.real_period & 0x0700) | u16::from(val)),
            _ => {
                self.envelope.length.load(val >> 3);
                self.set_period((self.real_period & 0xFF) | (u16::from(val & 0x07) << 8));
                self.duty_pos = 0;
                self.envelope.restart();
            }
        }
        trace!(
            "{:?} reg {reg} = {val:02X}: period {} duty {}",
            self.timer.channel, self.real_period, self.duty
        );
    }

    fn muted(&self) -> bool {
        self.real_period < 8 || (!self.sweep_negate && self.target_period > 0x7FF)
    }

    fn update_target_period(&mut self) {
        let period = u32::from(self.real_period);
        let shifted = period >> self.sweep_shift;
        self.target_period = if self.sweep_negate {
            let target = period - shifted;
            if self.ones_complement { target.wrapping_sub(1) } else { target }
        } else {
            period + shifted
        };
    }

    fn set_period(&mut self, period: u16) {
        self.real_period = period;
        self.timer.period = period * 2 + 1;
        self.update_target_period();
    }

    fn update_output(&mut self, mixer: &mut Mixer) {
        let out = if self.muted() {
            0
        } else {
            DUTY[usize::from(self.duty)][usize::from(self.duty_pos)] * self.envelope.output()
        };
        self.timer.add_output(mixer, out as i8);
    }

    pub(crate) fn run(&mut self, mixer: &mut Mixer, target: u32) {
        while self.timer.run(target) {
            self.duty_pos = self.duty_pos.wrapping_sub(1) & 7;
            self.update_output(mixer);
        }
    }

    /// Half-frame sweep clock.
    pub(crate) fn tick_sweep(&mut self) {
        self.sweep_divider = self.sweep_divider.wrapping_sub(1);
        if self.sweep_divider == 0 {
            if self.sweep_shift > 0
                && self.sweep_enabled
                && self.real_period >= 8
                && self.target_period <= 0x7FF
            {
                self.set_period(self.target_period as u16);
            }
            self.sweep_divider = self.sweep_period;
        }
        if self.reload_sweep {
            self.sweep_divider = self.sweep_period;
            self.reload_sweep = false;
        }
    }

    pub(crate) const fn status(&self) -> bool {
        self.envelope.length.status()
    }

    pub(crate) const fn real_period(&self) -> u16 {
        self.real_period
    }

    pub(crate) const fn output(&self) -> u8 {
        self.timer.last_output() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(channel: Channel) -> Square {
        let mut sq = Square::new(channel);
        sq.reset(false);
        sq.envelope.length.set_enabled(true);
        sq
    }

    #[test]
    fn period_registers_combine() {
        let mut sq = enabled(Channel::Square1);
        sq.write(2, 0xAB);
        sq.write(3, 0x05);
        assert_eq!(sq.real_period(), 0x5AB);
        assert_eq!(sq.timer.period, 0x5AB * 2 + 1);
    }

    #[test]
    fn low_period_mutes() {
        let mut sq = enabled(Channel::Square2);
        sq.write(0, 0xBF);
        sq.write(2, 0x07);
        sq.write(3, 0x08);
        sq.envelope.length.reload();
        assert!(sq.muted());
        sq.write(2, 0x08);
        assert!(!sq.muted());
    }

    #[test]
    fn sweep_negate_differs_between_channels() {
        let mut p1 = enabled(Channel::Square1);
        let mut p2 = enabled(Channel::Square2);
        for sq in [&mut p1, &mut p2] {
            sq.write(2, 0x00);
            sq.write(3, 0x01); // period $100
            sq.write(1, 0x89); // enabled, negate, shift 1
        }
        assert_eq!(p1.target_period, 0x7F);
        assert_eq!(p2.target_period, 0x80);
    }

    #[test]
    fn sweep_updates_period_on_divider_expiry() {
        let mut sq = enabled(Channel::Square2);
        sq.write(2, 0x00);
        sq.write(3, 0x01);
        sq.write(1, 0x81); // enabled, period 1, shift 1
        sq.tick_sweep(); // reload
        assert_eq!(sq.real_period(), 0x100);
        sq.tick_sweep();
        assert_eq!(sq.real_period(), 0x180);
    }

    #[test]
    fn overflowing_target_mutes_without_negate() {
        let mut sq = enabled(Channel::Square1);
        sq.write(2, 0xFF);
        sq.write(3, 0x07);
        sq.write(1, 0x01);
        assert!(sq.muted());
    }

    #[test]
    fn produces_square_wave() {
        let mut mixer = Mixer::new(48_000);
        let mut sq = enabled(Channel::Square1);
        sq.write(0, 0xBF); // 50% duty, constant volume 15
        sq.write(2, 0x40);
        sq.write(3, 0x08);
        sq.envelope.length.reload();
        let mut seen = Vec::new();
        for cycle in (0..2000).step_by(10) {
            sq.run(&mut mixer, cycle);
            seen.push(sq.output());
        }
        assert!(seen.contains(&15));
        assert!(seen.contains(&0));
    }
}
