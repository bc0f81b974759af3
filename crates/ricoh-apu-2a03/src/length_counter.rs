//! Length counter shared by the pulse, triangle and noise channels.
//!
//! Loads and halt changes are staged and committed by [`LengthCounter::reload`]
//! after the frame counter has had its chance to clock the counter on the
//! same cycle: a load that races a half-frame clock is ignored when the
//! clock already changed the counter.

/// Counter load values, indexed by the top 5 bits of the register write.
const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, //
    12, 16, 24, 18, 48, 20, 96, 22, 192, 24, 72, 26, 16, 28, 32, 30,
];

#[derive(Debug, Clone, Default)]
pub(crate) struct LengthCounter {
    enabled: bool,
    halt: bool,
    new_halt: bool,
    counter: u8,
    reload_val: u8,
    prev_val: u8,
}

impl LengthCounter {
    /// Stage a new halt flag.
    pub(crate) fn init(&mut self, halt: bool) {
        self.new_halt = halt;
    }

    /// Stage a counter load from table entry `index`.
    pub(crate) fn load(&mut self, index: u8) {
        if self.enabled {
            self.reload_val = LENGTH_TABLE[usize::from(index & 0x1F)];
            self.prev_val = self.counter;
        }
    }

    /// A soft reset disables the channel. `keep_counter` leaves the count
    /// and halt state alone, as the triangle does.
    pub(crate) fn reset(&mut self, soft: bool, keep_counter: bool) {
        if soft && keep_counter {
            self.enabled = false;
        } else {
            *self = Self::default();
        }
    }

    pub(crate) const fn status(&self) -> bool {
        self.counter > 0
    }

    pub(crate) const fn halted(&self) -> bool {
        self.halt
    }

    pub(crate) const fn counter(&self) -> u8 {
        self.counter
    }

    /// Commit staged writes.
    pub(crate) fn reload(&mut self) {
        if self.reload_val != 0 {
            if self.counter == self.prev_val {
                self.counter = self.reload_val;
            }
            self.reload_val = 0;
        }
        self.halt = self.new_halt;
    }

    /// Half-frame clock.
    pub(crate) fn tick(&mut self) {
        if self.counter > 0 && !self.halt {
            self.counter -= 1;
        }
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.counter = 0;
        }
        self.enabled = enabled;
    }
}
