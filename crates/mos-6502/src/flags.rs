//! Processor status register (P).

/// Carry.
pub const C: u8 = 0x01;

/// Zero.
pub const Z: u8 = 0x02;

/// Interrupt disable. When set, IRQ is ignored.
pub const I: u8 = 0x04;

/// Decimal mode. Stored and pushed, but the 2A03 has no BCD arithmetic.
pub const D: u8 = 0x08;

/// Break. Only meaningful in the copy pushed on the stack: set by BRK/PHP,
/// clear when pushed by IRQ/NMI.
pub const B: u8 = 0x10;

/// Unused bit. Always 1 on the stack.
pub const U: u8 = 0x20;

/// Overflow.
pub const V: u8 = 0x40;

/// Negative.
pub const N: u8 = 0x80;

/// Bits PLP and RTI take from the stack; B and U keep their current value.
pub const PULL_MASK: u8 = 0b1100_1111;

/// Processor status register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status(pub u8);

impl Status {
    #[must_use]
    pub const fn new() -> Self {
        Self(U)
    }

    /// Value as the outside world sees it: U set, B clear.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        (self.0 | U) & !B
    }

    /// Value pushed by BRK and PHP.
    #[must_use]
    pub const fn to_byte_brk(self) -> u8 {
        self.0 | U | B
    }

    /// Value pushed by IRQ and NMI.
    #[must_use]
    pub const fn to_byte_irq(self) -> u8 {
        (self.0 | U) & !B
    }

    /// Load a value pulled from the stack.
    pub fn pull(&mut self, value: u8) {
        self.0 = (self.0 & !PULL_MASK) | (value & PULL_MASK);
    }

    #[must_use]
    pub const fn is_set(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    pub fn clear(&mut self, flag: u8) {
        self.0 &= !flag;
    }

    pub fn set_if(&mut self, flag: u8, condition: bool) {
        if condition {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }

    /// N from bit 7, Z from `value == 0`.
    pub fn check_nz(&mut self, value: u8) {
        self.set_if(N, value & 0x80 != 0);
        self.set_if(Z, value == 0);
    }

    /// C and V after `sum = x + y (+ carry)`.
    pub fn check_cv(&mut self, x: u8, y: u8, sum: u16) {
        self.set_if(C, sum > 0xFF);
        let s = sum as u8;
        self.set_if(V, (x ^ s) & (y ^ s) & 0x80 != 0);
    }
}
