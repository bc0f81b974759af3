//! Non-linear channel mixer.
//!
//! Channels report level changes as deltas stamped with the APU cycle they
//! happened on. At the end of each audio frame the mixer replays the
//! changes in time order, converts the five channel levels to an output
//! volume with the NESdev mixing approximation, and feeds the volume steps
//! to one band-limited buffer per side.
//!
//! Volume and pan are held in 16.16 fixed point, so the mix is integer
//! arithmetic and bit-identical across hosts.

use blip_buf::BlipBuf;

/// NTSC CPU clock.
pub const CLOCK_RATE: u32 = 1_789_773;
/// Highest supported output rate.
pub const MAX_SAMPLE_RATE: u32 = 96_000;
/// APU cycles per audio frame.
pub const CYCLE_LENGTH: usize = 10_000;

/// Room for one audio frame per side, with slack.
const MAX_SAMPLES_PER_FRAME: usize = MAX_SAMPLE_RATE as usize / 60 * 4 * 2;

/// 1.0 in the mixer's 16.16 fixed point.
const ONE: i64 = 1 << 16;
/// Triangle and noise weights in the TND sum (2.7516713261, 1.8493587125).
const TRIANGLE_WEIGHT: i64 = 180_334;
const NOISE_WEIGHT: i64 = 121_200;
/// `95.88 * 5000` and `159.79 * 5000`.
const SQUARE_SCALE: i64 = 479_400;
const TND_SCALE: i64 = 798_950;
/// Undrained output beyond this many interleaved samples (one second at
/// the highest rate) is dropped, oldest first.
const MAX_QUEUED: usize = MAX_SAMPLE_RATE as usize * 2;

/// The five sound channels, in register order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Square1,
    Square2,
    Triangle,
    Noise,
    Dmc,
}

impl Channel {
    pub const COUNT: usize = 5;

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

pub struct Mixer {
    left: BlipBuf,
    right: BlipBuf,
    prev_left: i16,
    prev_right: i16,

    volumes: [i64; Channel::COUNT],
    panning: [i64; Channel::COUNT],
    has_panning: bool,

    timestamps: Vec<u32>,
    deltas: Box<[[i16; CYCLE_LENGTH]; Channel::COUNT]>,
    levels: [i16; Channel::COUNT],

    sample_rate: u32,
    /// Interleaved stereo samples produced since the last drain.
    output: Vec<i16>,
    scratch: Vec<i16>,
}

impl Mixer {
    /// A mixer producing `sample_rate` Hz stereo output. The rate is
    /// clamped to 8000..=96000.
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        let mut mixer = Self {
            left: BlipBuf::new(MAX_SAMPLES_PER_FRAME as u32),
            right: BlipBuf::new(MAX_SAMPLES_PER_FRAME as u32),
            prev_left: 0,
            prev_right: 0,
            volumes: [ONE; Channel::COUNT],
            panning: [ONE; Channel::COUNT],
            has_panning: false,
            timestamps: Vec::with_capacity(CYCLE_LENGTH),
            deltas: Box::new([[0; CYCLE_LENGTH]; Channel::COUNT]),
            levels: [0; Channel::COUNT],
            sample_rate: sample_rate.clamp(8_000, MAX_SAMPLE_RATE),
            output: Vec::with_capacity(MAX_SAMPLES_PER_FRAME * 2),
            scratch: vec![0; MAX_SAMPLES_PER_FRAME * 2 + 1],
        };
        mixer.update_rates();
        mixer
    }

    pub fn reset(&mut self) {
        self.prev_left = 0;
        self.prev_right = 0;
        self.left.clear();
        self.right.clear();
        self.timestamps.clear();
        for ch in self.deltas.iter_mut() {
            ch.fill(0);
        }
        self.levels = [0; Channel::COUNT];
        self.output.clear();
        self.update_rates();
    }

    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Per-channel volume (0.0..=1.0 nominal) and pan (0.0 left, 1.0
    /// centre, 2.0 right). Both are quantised to 16.16 fixed point.
    pub fn set_channel_mix(&mut self, volumes: [f64; Channel::COUNT], panning: [f64; Channel::COUNT]) {
        self.volumes = volumes.map(|v| to_fixed(v, 0.0, 4.0));
        self.panning = panning.map(|p| to_fixed(p, 0.0, 2.0));
        let has_panning = self.panning.iter().any(|&p| p != ONE);
        if has_panning && !self.has_panning {
            self.left.clear();
            self.right.clear();
        }
        self.has_panning = has_panning;
    }

    fn update_rates(&mut self) {
        let (clock, rate) = (f64::from(CLOCK_RATE), f64::from(self.sample_rate));
        self.left.set_rates(clock, rate);
        self.right.set_rates(clock, rate);
    }

    /// Record a level change of `delta` on `channel` at APU cycle `time`.
    pub fn add_delta(&mut self, channel: Channel, time: u32, delta: i16) {
        if delta == 0 {
            return;
        }
        let Some(slot) = self.deltas[channel.index()].get_mut(time as usize) else {
            log::warn!(target: "ricoh_apu_2a03::mixer", "delta at cycle {time} past end of audio frame");
            return;
        };
        *slot += delta;
        self.timestamps.push(time);
    }

    /// Scaled level of one channel on one side, 16.16.
    fn channel_output(&self, ch: Channel, right: bool) -> i64 {
        let i = ch.index();
        let pan = if right { self.panning[i] } else { 2 * ONE - self.panning[i] };
        i64::from(self.levels[i]) * self.volumes[i] * pan / ONE
    }

    fn output_volume(&self, right: bool) -> i16 {
        let square = self.channel_output(Channel::Square1, right)
            + self.channel_output(Channel::Square2, right);
        let tnd = self.channel_output(Channel::Dmc, right)
            + (TRIANGLE_WEIGHT * self.channel_output(Channel::Triangle, right)
                + NOISE_WEIGHT * self.channel_output(Channel::Noise, right))
                / ONE;

        let square_volume = nonlinear(square, SQUARE_SCALE, 8128);
        let tnd_volume = nonlinear(tnd, TND_SCALE, 22638);
        i16::try_from(square_volume + tnd_volume).unwrap_or(i16::MAX)
    }

    /// Replay the frame's deltas into the sample buffers and close the
    /// frame at `time` cycles.
    fn end_frame(&mut self, time: u32) {
        self.timestamps.sort_unstable();
        self.timestamps.dedup();

        for k in 0..self.timestamps.len() {
            let stamp = self.timestamps[k];
            for ch in 0..Channel::COUNT {
                self.levels[ch] += self.deltas[ch][stamp as usize];
            }

            let out = self.output_volume(false).wrapping_mul(4);
            self.left.add_delta(stamp, i32::from(out) - i32::from(self.prev_left));
            self.prev_left = out;

            if self.has_panning {
                let out = self.output_volume(true).wrapping_mul(4);
                self.right.add_delta(stamp, i32::from(out) - i32::from(self.prev_right));
                self.prev_right = out;
            }
        }

        self.left.end_frame(time);
        if self.has_panning {
            self.right.end_frame(time);
        }

        self.timestamps.clear();
        for ch in self.deltas.iter_mut() {
            ch.fill(0);
        }
    }

    /// Close the audio frame and append its samples to the output queue.
    pub fn play(&mut self, time: u32) {
        self.end_frame(time);

        let out = &mut self.scratch;
        let count = self.left.read_samples(&mut out[..MAX_SAMPLES_PER_FRAME * 2], true);
        if self.has_panning {
            self.right.read_samples(&mut out[1..=count * 2], true);
        } else {
            for i in (0..count * 2).step_by(2) {
                out[i + 1] = out[i];
            }
        }
        self.output.extend_from_slice(&out[..count * 2]);
        if self.output.len() > MAX_QUEUED {
            let excess = (self.output.len() - MAX_QUEUED + 1) & !1;
            self.output.drain(..excess);
        }
    }

    /// Interleaved stereo samples waiting to be consumed.
    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.output
    }

    /// Move up to `out.len()` queued samples into `out`, returning how many
    /// were copied. A partial stereo pair is never split.
    pub fn drain_into(&mut self, out: &mut [i16]) -> usize {
        let n = self.output.len().min(out.len() & !1);
        out[..n].copy_from_slice(&self.output[..n]);
        self.output.drain(..n);
        n
    }

    /// Current mixed level of each channel.
    #[must_use]
    pub const fn levels(&self) -> [i16; Channel::COUNT] {
        self.levels
    }
}

/// Quantise a host-supplied factor to 16.16, clamped to `lo..=hi`.
fn to_fixed(v: f64, lo: f64, hi: f64) -> i64 {
    let v = if v.is_nan() { 1.0 } else { v.clamp(lo, hi) };
    (v * 65_536.0).round() as i64
}

/// `scale / (divisor / x + 100)` for a 16.16 `x`, truncated. Zero and
/// negative sums are silent.
const fn nonlinear(x: i64, scale: i64, divisor: i64) -> i64 {
    if x <= 0 { 0 } else { scale * x / (divisor * ONE + 100 * x) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_channels_produce_silence() {
        let mut mixer = Mixer::new(48_000);
        mixer.play(9_999);
        let samples = mixer.samples();
        assert!(samples.len() >= 500);
        assert!(samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn square_step_is_audible_and_mono_mirrors_left() {
        let mut mixer = Mixer::new(48_000);
        mixer.add_delta(Channel::Square1, 10, 15);
        mixer.play(9_999);
        let samples = mixer.samples();
        assert!(samples.iter().any(|&s| s > 1000));
        for pair in samples.chunks_exact(2) {
            assert_eq!(pair[0], pair[1]);
        }
        assert_eq!(mixer.levels()[Channel::Square1.index()], 15);
    }

    #[test]
    fn deltas_at_same_cycle_are_merged() {
        let mut mixer = Mixer::new(44_100);
        mixer.add_delta(Channel::Triangle, 5, 7);
        mixer.add_delta(Channel::Noise, 5, 3);
        mixer.add_delta(Channel::Triangle, 5, -2);
        mixer.play(1_000);
        assert_eq!(mixer.levels()[Channel::Triangle.index()], 5);
        assert_eq!(mixer.levels()[Channel::Noise.index()], 3);
    }

    #[test]
    fn drain_keeps_pairs_together() {
        let mut mixer = Mixer::new(48_000);
        mixer.play(9_999);
        let total = mixer.samples().len();
        let mut out = [0i16; 7];
        assert_eq!(mixer.drain_into(&mut out), 6);
        assert_eq!(mixer.samples().len(), total - 6);
    }

    #[test]
    fn panning_splits_sides() {
        let mut mixer = Mixer::new(48_000);
        let mut pan = [1.0; Channel::COUNT];
        pan[Channel::Square1.index()] = 0.0;
        mixer.set_channel_mix([1.0; Channel::COUNT], pan);
        mixer.add_delta(Channel::Square1, 10, 15);
        mixer.play(9_999);
        let samples = mixer.samples();
        let left_peak = samples.iter().step_by(2).copied().max().unwrap_or(0);
        let right_peak = samples.iter().skip(1).step_by(2).copied().max().unwrap_or(0);
        assert!(left_peak > 1000);
        assert_eq!(right_peak, 0);
    }

    #[test]
    fn fixed_point_mix_matches_nesdev_formula() {
        let mut mixer = Mixer::new(48_000);
        mixer.levels = [15, 15, 15, 15, 127];
        let square = (95.88 * 5000.0 / (8128.0 / 30.0 + 100.0)) as i64;
        assert_eq!(nonlinear(30 * ONE, SQUARE_SCALE, 8128), square);
        let volume = i64::from(mixer.output_volume(false));
        let tnd = 159.79 * 5000.0 / (22638.0 / (127.0 + 2.751_671_326_1 * 15.0 + 1.849_358_712_5 * 15.0) + 100.0);
        assert!((volume - square - tnd as i64).abs() <= 1, "{volume}");
    }

    #[test]
    fn volume_scales_the_channel_level() {
        let mut mixer = Mixer::new(48_000);
        mixer.levels[Channel::Square1.index()] = 10;
        let full = mixer.output_volume(false);
        let mut volumes = [1.0; Channel::COUNT];
        volumes[Channel::Square1.index()] = 0.5;
        mixer.set_channel_mix(volumes, [1.0; Channel::COUNT]);
        mixer.levels[Channel::Square1.index()] = 20;
        assert_eq!(mixer.output_volume(false), full);
        assert!(!mixer.has_panning);
    }

    #[test]
    fn hard_right_pan_silences_left() {
        let mut mixer = Mixer::new(48_000);
        mixer.set_channel_mix([1.0; Channel::COUNT], [2.0; Channel::COUNT]);
        mixer.levels = [15, 15, 15, 15, 64];
        assert_eq!(mixer.output_volume(false), 0);
        assert!(mixer.output_volume(true) > 0);
    }
}
