//! Cycle-accurate NES emulator core.
//!
//! The NES master clock ticks at 21,477,272 Hz (NTSC crystal). The PPU
//! ticks at crystal/4 (5,369,318 Hz) and the CPU at crystal/12
//! (1,789,773 Hz), giving a 3:1 PPU:CPU ratio. The APU runs off the CPU
//! clock.
//!
//! [`Core`] is the whole console: load an iNES image with
//! [`Rom::from_ines`], build a core, then call [`Core::run_one_frame`] once
//! per video frame. Each call yields a 256x240 RGBA frame and the stereo
//! audio mixed meanwhile.

mod bus;
#[cfg(feature = "capture")]
pub mod capture;
mod config;
mod controller;
mod debugger;
mod dma;
mod error;
mod nes;
mod tracer;
mod vram;

pub use config::{DEFAULT_SAMPLE_RATE, MIN_SAMPLE_RATE, NesConfig, NesRegion};
pub use controller::{Controller, button};
pub use debugger::Debugger;
pub use error::LoadError;
pub use nes::{AudioBuffer, Core};
pub use nes_cartridge::{CartridgeError, Mirroring, Rom};
pub use tracer::{TraceState, Tracer, format_line};

/// Width and height of the video frame in pixels.
pub use ricoh_ppu_2c02::{HEIGHT, WIDTH};
