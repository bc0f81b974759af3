use emu_core::map::MapError;
use nes_cartridge::CartridgeError;
use thiserror::Error;

/// Why a cartridge could not be plugged in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("unsupported mapper {0}")]
    UnknownMapper(u16),
    #[error("bad PRG ROM size: {0} bytes")]
    BadPrgSize(usize),
    #[error("bad CHR ROM size: {0} bytes")]
    BadChrSize(usize),
    #[error("overlapping bus mapping at ${begin:04X}-${end:04X}")]
    OverlappingRange { begin: u16, end: u16 },
}

impl From<MapError> for LoadError {
    fn from(e: MapError) -> Self {
        match e {
            MapError::Overlap { begin, end } => Self::OverlappingRange { begin, end },
            // Only a board mapping a window its ROM cannot fill gets here.
            MapError::BadSize(size) | MapError::OutOfBlock { size, .. } => {
                Self::BadPrgSize(size as usize)
            }
        }
    }
}

impl From<CartridgeError> for LoadError {
    fn from(e: CartridgeError) -> Self {
        match e {
            CartridgeError::UnknownMapper(id) => Self::UnknownMapper(id),
            CartridgeError::BadPrgSize(n) => Self::BadPrgSize(n),
            CartridgeError::BadChrSize(n) => Self::BadChrSize(n),
            CartridgeError::Map(e) => e.into(),
            CartridgeError::TooShort { got, .. } => Self::BadPrgSize(got),
            CartridgeError::BadMagic => Self::BadPrgSize(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cartridge_errors_convert() {
        assert_eq!(
            LoadError::from(CartridgeError::UnknownMapper(4)),
            LoadError::UnknownMapper(4)
        );
        assert_eq!(
            LoadError::from(CartridgeError::Map(MapError::Overlap {
                begin: 0x8000,
                end: 0xFFFF
            })),
            LoadError::OverlappingRange {
                begin: 0x8000,
                end: 0xFFFF
            }
        );
    }

    #[test]
    fn messages() {
        assert_eq!(LoadError::UnknownMapper(9).to_string(), "unsupported mapper 9");
        assert_eq!(
            LoadError::OverlappingRange { begin: 0x2000, end: 0x2007 }.to_string(),
            "overlapping bus mapping at $2000-$2007"
        );
    }
}
