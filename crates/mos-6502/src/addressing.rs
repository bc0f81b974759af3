//! Bus cycles and operand resolution.
//!
//! Every helper here is exactly one bus access per cycle, dummy accesses
//! included: the NES has read-sensitive registers ($2002, $2007, $4015,
//! $4016/7), so a dummy read at the wrong address is visible to software.

use emu_core::Bus;

use crate::Mos6502;
use crate::opcodes::{A, Mode, Opcode, X};

const fn page_crossed(a: u16, b: u16) -> bool {
    a & 0xFF00 != b & 0xFF00
}

impl Mos6502 {
    pub(crate) fn read(&mut self, bus: &mut impl Bus, addr: u16) -> u8 {
        let value = bus.read(addr);
        self.end_cycle(bus);
        value
    }

    pub(crate) fn dummy_read(&mut self, bus: &mut impl Bus, addr: u16) {
        let _ = self.read(bus, addr);
    }

    pub(crate) fn write(&mut self, bus: &mut impl Bus, addr: u16, value: u8) {
        bus.write(addr, value);
        self.end_cycle(bus);
    }

    /// Read the byte at PC and advance PC.
    pub(crate) fn fetch(&mut self, bus: &mut impl Bus) -> u8 {
        let value = self.read(bus, self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    pub(crate) fn fetch_word(&mut self, bus: &mut impl Bus) -> u16 {
        let lo = self.fetch(bus);
        let hi = self.fetch(bus);
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn read_word(&mut self, bus: &mut impl Bus, addr: u16) -> u16 {
        let lo = self.read(bus, addr);
        let hi = self.read(bus, addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Pointer read from the zero page; the high byte wraps to $00.
    fn read_zp_word(&mut self, bus: &mut impl Bus, zp: u8) -> u16 {
        let lo = self.read(bus, u16::from(zp));
        let hi = self.read(bus, u16::from(zp.wrapping_add(1)));
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn push(&mut self, bus: &mut impl Bus, value: u8) {
        let addr = self.regs.push_addr();
        self.write(bus, addr, value);
    }

    pub(crate) fn pull(&mut self, bus: &mut impl Bus) -> u8 {
        let addr = self.regs.pull_addr();
        self.read(bus, addr)
    }

    /// High byte first.
    pub(crate) fn push_word(&mut self, bus: &mut impl Bus, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.push(bus, hi);
        self.push(bus, lo);
    }

    pub(crate) fn pull_word(&mut self, bus: &mut impl Bus) -> u16 {
        let lo = self.pull(bus);
        let hi = self.pull(bus);
        u16::from_le_bytes([lo, hi])
    }

    /// Resolve the effective address of `op`, performing the mode's own
    /// cycles. Immediate mode returns the address of the operand byte; the
    /// implied and accumulator modes perform their dummy read at PC and
    /// return 0.
    pub(crate) fn operand(&mut self, bus: &mut impl Bus, op: Opcode) -> u16 {
        match op.mode {
            Mode::Imp | Mode::Acc => {
                self.dummy_read(bus, self.regs.pc);
                0
            }
            Mode::Imm => {
                let addr = self.regs.pc;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                addr
            }
            Mode::Rel => {
                let offset = self.fetch(bus) as i8;
                self.regs.pc.wrapping_add_signed(i16::from(offset))
            }
            Mode::Zpg => u16::from(self.fetch(bus)),
            Mode::Zpx | Mode::Zpy => {
                let base = self.fetch(bus);
                self.dummy_read(bus, u16::from(base));
                let index = if op.mode == Mode::Zpx { self.regs.x } else { self.regs.y };
                u16::from(base.wrapping_add(index))
            }
            Mode::Abs => self.fetch_word(bus),
            Mode::Abx | Mode::Aby => {
                let base = self.fetch_word(bus);
                let index = if op.mode == Mode::Abx { self.regs.x } else { self.regs.y };
                let addr = base.wrapping_add(u16::from(index));
                // The first access uses the un-carried high byte.
                let partial = (addr & 0x00FF) | (base & 0xFF00);
                if !op.has(X) || page_crossed(base, addr) {
                    self.dummy_read(bus, partial);
                }
                addr
            }
            Mode::Ind => {
                let ptr = self.fetch_word(bus);
                let lo = self.read(bus, ptr);
                // JMP ($xxFF) takes its high byte from $xx00.
                let hi = self.read(bus, (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF));
                u16::from_le_bytes([lo, hi])
            }
            Mode::Izx => {
                let zp = self.fetch(bus);
                self.dummy_read(bus, u16::from(zp));
                self.read_zp_word(bus, zp.wrapping_add(self.regs.x))
            }
            Mode::Izy => {
                let zp = self.fetch(bus);
                let base = self.read_zp_word(bus, zp);
                let addr = base.wrapping_add(u16::from(self.regs.y));
                let crossed = page_crossed(base, addr);
                if crossed && (op.has(X) || op.has(A)) {
                    self.dummy_read(bus, addr.wrapping_sub(0x100));
                } else if op.has(A) {
                    self.dummy_read(bus, addr);
                }
                addr
            }
        }
    }
}
