//! Ricoh 2C02 picture processing unit.
//!
//! The PPU owns its registers, OAM and palette RAM. Everything else on its
//! bus (pattern tables, nametables) belongs to the machine and the
//! cartridge and is reached through [`VideoBus`].

mod open_bus;
mod palette;
mod ppu;
mod registers;
mod sprites;

pub use open_bus::{DECAY_FRAMES, IoLatch};
pub use palette::{PALETTE, PaletteRam, to_rgba};
pub use ppu::{DOTS_PER_LINE, HEIGHT, LINES_PER_FRAME, PRE_RENDER_LINE, Ppu, VBLANK_LINE, WIDTH};
pub use registers::{Ctrl, Loopy, Mask, PpuReg, REGISTERS, status};
pub use sprites::SpriteUnit;

/// The PPU's view of $0000-$3EFF.
///
/// Palette accesses ($3F00-$3FFF) never reach the bus.
pub trait VideoBus {
    fn read(&mut self, addr: u16) -> u8;

    fn write(&mut self, addr: u16, val: u8);

    /// Read without side effects.
    fn peek(&self, addr: u16) -> u8;
}
