//! Programmer-visible registers.

use crate::flags::{B, I, Status, U};

/// 2A03 register file.
///
/// The stack lives at $0100-$01FF; `sp` points at the next free slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub p: Status,
}

impl Default for Registers {
    fn default() -> Self {
        Self::power_on()
    }
}

impl Registers {
    /// Register state at power-on. PC is loaded from the reset vector by
    /// the CPU's reset sequence.
    #[must_use]
    pub const fn power_on() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            p: Status(B | U | I),
        }
    }

    /// Stack address for a push; decrements SP.
    pub fn push_addr(&mut self) -> u16 {
        let addr = self.stack_addr();
        self.sp = self.sp.wrapping_sub(1);
        addr
    }

    /// Stack address for a pull; increments SP first.
    pub fn pull_addr(&mut self) -> u16 {
        self.sp = self.sp.wrapping_add(1);
        self.stack_addr()
    }

    #[must_use]
    pub const fn stack_addr(&self) -> u16 {
        0x0100 | self.sp as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_wraps_inside_page_one() {
        let mut r = Registers::power_on();
        r.sp = 0x00;
        assert_eq!(r.push_addr(), 0x0100);
        assert_eq!(r.sp, 0xFF);
        assert_eq!(r.pull_addr(), 0x0100);
        assert_eq!(r.sp, 0x00);
    }
}
