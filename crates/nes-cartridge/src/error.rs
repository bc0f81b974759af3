use emu_core::map::MapError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartridgeError {
    #[error("unsupported mapper {0}")]
    UnknownMapper(u16),
    #[error("PRG ROM size {0:#X} is not a power of two of at least 8 KB")]
    BadPrgSize(usize),
    #[error("CHR size {0:#X} is not a power of two of at least 8 KB")]
    BadChrSize(usize),
    #[error("image truncated: need {expected} bytes, got {got}")]
    TooShort { expected: usize, got: usize },
    #[error("missing iNES signature")]
    BadMagic,
    #[error(transparent)]
    Map(#[from] MapError),
}
