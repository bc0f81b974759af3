//! Noise channel ($400C-$400F).

use log::trace;

use crate::envelope::Envelope;
use crate::mixer::{Channel, Mixer};
use crate::timer::Timer;

/// Timer periods in CPU cycles (NTSC).
const PERIODS: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];

#[derive(Debug, Clone)]
pub(crate) struct Noise {
    pub(crate) envelope: Envelope,
    pub(crate) timer: Timer,
    /// 15-bit linear feedback shift register.
    shift: u16,
    /// Short mode: feedback from bit 6 instead of bit 1.
    mode: bool,
}

impl Noise {
    pub(crate) fn new() -> Self {
        Self {
            envelope: Envelope::default(),
            timer: Timer::new(Channel::Noise),
            shift: 1,
            mode: false,
        }
    }

    pub(crate) fn reset(&mut self, soft: bool) {
        self.envelope.reset(soft);
        self.timer.reset();
        self.timer.period = PERIODS[0] - 1;
        self.shift = 1;
        self.mode = false;
    }

    pub(crate) fn write(&mut self, reg: u16, val: u8) {
        match reg & 3 {
            0 => self.envelope.init(val),
            1 => {}
            2 => {
                self.timer.period = PERIODS[usize::from(val & 0x0F)] - 1;
                self.mode = val & 0x80 != 0;
            }
            _ => {
                self.envelope.length.load(val >> 3);
                self.envelope.restart();
            }
        }
        trace!("noise reg {reg} = {val:02X}: period {} mode {}", self.timer.period, self.mode);
    }

    pub(crate) fn run(&mut self, mixer: &mut Mixer, target: u32) {
        while self.timer.run(target) {
            let tap = if self.mode { 6 } else { 1 };
            let feedback = (self.shift ^ (self.shift >> tap)) & 1;
            self.shift = (self.shift >> 1) | (feedback << 14);

            let out = if self.shift & 1 != 0 { 0 } else { self.envelope.output() };
            self.timer.add_output(mixer, out as i8);
        }
    }

    pub(crate) const fn status(&self) -> bool {
        self.envelope.length.status()
    }

    pub(crate) const fn output(&self) -> u8 {
        self.timer.last_output() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lfsr_long_mode_period() {
        let mut mixer = Mixer::new(48_000);
        let mut noise = Noise::new();
        noise.reset(false);
        noise.timer.period = 0;
        let start = noise.shift;
        let mut steps = 0u32;
        loop {
            steps += 1;
            noise.run(&mut mixer, steps);
            if noise.shift == start {
                break;
            }
        }
        assert_eq!(steps, 32767);
    }

    #[test]
    fn lfsr_short_mode_period() {
        let mut mixer = Mixer::new(48_000);
        let mut noise = Noise::new();
        noise.reset(false);
        noise.write(2, 0x80);
        noise.timer.period = 0;
        let start = noise.shift;
        let mut steps = 0u32;
        loop {
            steps += 1;
            noise.run(&mut mixer, steps);
            if noise.shift == start || steps > 40_000 {
                break;
            }
        }
        // 31 or 93 depending on which short cycle the seed sits on.
        assert!(steps == 31 || steps == 93, "{steps} steps");
    }

    #[test]
    fn produces_envelope_volume() {
        let mut mixer = Mixer::new(48_000);
        let mut noise = Noise::new();
        noise.reset(false);
        noise.envelope.length.set_enabled(true);
        noise.write(0, 0x1A);
        noise.write(3, 0x08);
        noise.envelope.length.reload();
        let mut seen = Vec::new();
        for cycle in (0..2000).step_by(5) {
            noise.run(&mut mixer, cycle);
            seen.push(noise.output());
        }
        assert!(seen.contains(&10));
        assert!(seen.contains(&0));
    }
}
