//! Standard joypad.
//!
//! A serial shift register behind $4016/$4017. While strobe (bit 0 of a
//! $4016 write) is high the register keeps reloading from the buttons;
//! the falling edge latches them. Each read returns bit 0 and shifts in a
//! 1, so a ninth read onwards returns 1.

/// Button bit positions in the byte passed to `Core::load_input`.
pub mod button {
    pub const A: u8 = 0;
    pub const B: u8 = 1;
    pub const SELECT: u8 = 2;
    pub const START: u8 = 3;
    pub const UP: u8 = 4;
    pub const DOWN: u8 = 5;
    pub const LEFT: u8 = 6;
    pub const RIGHT: u8 = 7;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Controller {
    buttons: u8,
    shift: u8,
    strobe: bool,
}

impl Controller {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buttons: 0,
            shift: 0,
            strobe: false,
        }
    }

    /// Replace the pressed-button byte.
    pub fn set_buttons(&mut self, buttons: u8) {
        self.buttons = buttons;
        if self.strobe {
            self.shift = buttons;
        }
    }

    #[must_use]
    pub const fn buttons(&self) -> u8 {
        self.buttons
    }

    /// Serial data bit (bit 0) for a $4016/$4017 read.
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            return self.buttons & 1;
        }
        let bit = self.shift & 1;
        self.shift = (self.shift >> 1) | 0x80;
        bit
    }

    /// Next data bit without clocking the register.
    #[must_use]
    pub const fn peek(&self) -> u8 {
        if self.strobe {
            self.buttons & 1
        } else {
            self.shift & 1
        }
    }

    /// $4016 write: bit 0 drives strobe.
    pub fn write(&mut self, val: u8) {
        let strobe = val & 1 != 0;
        if self.strobe || strobe {
            self.shift = self.buttons;
        }
        self.strobe = strobe;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latch_and_shift_out() {
        let mut c = Controller::new();
        c.set_buttons(1 << button::A | 1 << button::START);
        c.write(1);
        c.write(0);

        let bits: Vec<u8> = (0..8).map(|_| c.read()).collect();
        assert_eq!(bits, [1, 0, 0, 1, 0, 0, 0, 0]);
        assert_eq!(c.read(), 1);
        assert_eq!(c.read(), 1);
    }

    #[test]
    fn strobe_high_reports_a() {
        let mut c = Controller::new();
        c.set_buttons(1 << button::A);
        c.write(1);
        assert_eq!(c.read(), 1);
        assert_eq!(c.read(), 1);
        c.set_buttons(0);
        assert_eq!(c.read(), 0);
    }

    #[test]
    fn buttons_after_latch_do_not_leak() {
        let mut c = Controller::new();
        c.set_buttons(0b0101_0101);
        c.write(1);
        c.write(0);
        c.set_buttons(0xFF);
        assert_eq!(c.read(), 1);
        assert_eq!(c.read(), 0);
    }

    #[test]
    fn peek_does_not_shift() {
        let mut c = Controller::new();
        c.set_buttons(0b10);
        c.write(1);
        c.write(0);
        assert_eq!(c.peek(), 0);
        assert_eq!(c.peek(), 0);
        assert_eq!(c.read(), 0);
        assert_eq!(c.peek(), 1);
    }
}
