//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use emu_nes::Rom;

/// Build an NROM iNES image: 32K PRG with `code` at $8000, 8K CHR.
///
/// NMI and IRQ point at an `RTI` in the last byte before the vectors;
/// reset points at $8000.
pub fn nrom(code: &[u8], chr: &[u8], vertical: bool) -> Vec<u8> {
    let mut image = vec![0u8; 16 + 0x8000 + 0x2000];
    image[..4].copy_from_slice(b"NES\x1a");
    image[4] = 2;
    image[5] = 1;
    image[6] = u8::from(vertical);

    let prg = &mut image[16..16 + 0x8000];
    prg[..code.len()].copy_from_slice(code);
    prg[0x7FF9] = 0x40; // RTI at $FFF9
    prg[0x7FFA..].copy_from_slice(&[0xF9, 0xFF, 0x00, 0x80, 0xF9, 0xFF]);

    image[16 + 0x8000..16 + 0x8000 + chr.len()].copy_from_slice(chr);
    image
}

pub fn parse(image: &[u8]) -> Rom {
    Rom::from_ines(image).unwrap_or_else(|e| panic!("{e}"))
}

/// Where the test ROM collection lives.
pub fn rom_dir() -> PathBuf {
    std::env::var_os("NES_TEST_ROMS").map_or_else(
        || PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../test-roms"),
        PathBuf::from,
    )
}

/// Load a ROM from the collection, or `None` (with a message) if absent.
pub fn load_rom(name: &str) -> Option<Rom> {
    let path = rom_dir().join(name);
    match std::fs::read(&path) {
        Ok(data) => Some(parse(&data)),
        Err(_) => {
            eprintln!("{} not found, skipping", path.display());
            None
        }
    }
}
