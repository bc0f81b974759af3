//! Hardware register descriptors.

/// Who may access a register through the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegAccess {
    ReadWrite,
    /// Writes are ignored.
    ReadOnly,
    /// Reads return the bus open value.
    WriteOnly,
}

impl RegAccess {
    #[must_use]
    pub const fn readable(self) -> bool {
        !matches!(self, RegAccess::WriteOnly)
    }

    #[must_use]
    pub const fn writable(self) -> bool {
        !matches!(self, RegAccess::ReadOnly)
    }
}

/// Static description of one register of a component.
///
/// A component publishes a table of these; the table is mapped into a
/// routing [`Table`](super::Table) with `map_regs`, and accesses come back
/// to the component tagged with `id`.
#[derive(Debug, Clone, Copy)]
pub struct RegDesc<R> {
    pub name: &'static str,
    /// Offset from the start of the component's register window.
    pub offset: u16,
    /// Register bank. Only registers of the requested bank are mapped.
    pub bank: u8,
    pub access: RegAccess,
    /// Bits set here keep their old value on writes.
    pub romask: u8,
    pub id: R,
}

impl<R: Copy> RegDesc<R> {
    /// The same descriptor with `romask` bits kept on writes.
    #[must_use]
    pub const fn with_romask(self, romask: u8) -> Self {
        Self { romask, ..self }
    }

    /// A backing cell for this register holding `value`.
    #[must_use]
    pub const fn cell(&self, value: u8) -> Reg8 {
        Reg8::new(value, self.romask)
    }
}

/// An 8-bit register with a read-only bit mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reg8 {
    pub value: u8,
    pub romask: u8,
}

impl Reg8 {
    #[must_use]
    pub const fn new(value: u8, romask: u8) -> Self {
        Self { value, romask }
    }

    /// Store `val`, keeping the bits covered by `romask`. Returns the old value.
    pub fn write(&mut self, val: u8) -> u8 {
        let old = self.value;
        self.value = (old & self.romask) | (val & !self.romask);
        old
    }

    /// Set or clear the bits in `mask`, bypassing `romask`.
    pub fn set_bits(&mut self, mask: u8, on: bool) {
        if on {
            self.value |= mask;
        } else {
            self.value &= !mask;
        }
    }

    #[must_use]
    pub const fn bit(&self, mask: u8) -> bool {
        self.value & mask != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_preserves_read_only_bits() {
        let mut r = Reg8::new(0b1010_0000, 0xE0);
        let old = r.write(0b0101_1111);
        assert_eq!(old, 0b1010_0000);
        assert_eq!(r.value, 0b1011_1111);
    }

    #[test]
    fn cell_takes_the_descriptor_mask() {
        let desc = RegDesc {
            name: "CTRL",
            offset: 0,
            bank: 0,
            access: RegAccess::ReadWrite,
            romask: 0,
            id: (),
        }
        .with_romask(0xF0);
        let mut r = desc.cell(0x30);
        r.write(0xCF);
        assert_eq!(r.value, 0x3F);
    }

    #[test]
    fn set_bits_ignores_romask() {
        let mut r = Reg8::new(0, 0xFF);
        r.set_bits(0x80, true);
        assert!(r.bit(0x80));
        r.set_bits(0x80, false);
        assert_eq!(r.value, 0);
    }
}
