//! Ricoh 2A03 audio processing unit.
//!
//! Two pulse channels, a triangle, a noise generator and the delta
//! modulation channel, sequenced by the frame counter and mixed through a
//! band-limited resampler into interleaved stereo `i16` samples.
//!
//! The APU never touches the CPU bus. Interrupts are exposed as a level
//! ([`Apu::irq_line`]) and DMC sample fetches as requests the machine
//! drains with [`Apu::take_dma_request`] and answers with
//! [`Apu::set_dmc_read_buffer`].

mod apu;
mod dmc;
mod envelope;
mod frame_counter;
mod length_counter;
mod mixer;
mod noise;
mod square;
mod timer;
mod triangle;

pub use apu::{Apu, ApuReg, REGISTERS};
pub use dmc::DmcDma;
pub use mixer::{CLOCK_RATE, CYCLE_LENGTH, Channel, MAX_SAMPLE_RATE, Mixer};
