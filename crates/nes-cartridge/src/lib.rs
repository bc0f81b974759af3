//! NES cartridges.
//!
//! A [`Rom`] holds the image; [`load`] picks the board for its mapper
//! number and maps PRG, CHR, work RAM and nametables onto the CPU and PPU
//! routing tables. Supported boards: NROM (0), MMC1 (1), UxROM (2),
//! CNROM (3), AxROM (7) and GxROM (66).

mod base;
mod error;
mod mapper;
mod mappers;
mod rom;

pub use base::{Base, Buses};
pub use error::CartridgeError;
pub use mapper::{Mapper, load};
pub use rom::{MAGIC, Mirroring, Rom};
