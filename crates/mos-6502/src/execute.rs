//! Instruction semantics.

use emu_core::Bus;

use crate::Mos6502;
use crate::flags::{C, D, I, N, V, Z};
use crate::opcodes::{Mnemonic, Mode, OPCODES, R, W};

impl Mos6502 {
    pub(crate) fn execute(&mut self, bus: &mut impl Bus, opcode: u8) {
        let op = OPCODES[usize::from(opcode)];
        match op.mnemonic {
            Mnemonic::Brk => return self.brk(bus),
            Mnemonic::Jsr => return self.jsr(bus),
            Mnemonic::Stp => return self.halt(opcode),
            _ if op.is_unstable() && !self.unstable_opcodes => return self.halt(opcode),
            _ => {}
        }

        let addr = self.operand(bus, op);
        let mut val = 0;
        if op.has(R) {
            val = if op.mode == Mode::Acc {
                self.regs.a
            } else {
                self.read(bus, addr)
            };
        }
        // Read-modify-write instructions write the unmodified value back
        // before the result.
        if op.has(W) && op.mode != Mode::Acc {
            self.write(bus, addr, val);
        }

        let p = &mut self.regs.p;
        match op.mnemonic {
            Mnemonic::Adc => self.adc(val),
            Mnemonic::Sbc => self.adc(val ^ 0xFF),
            Mnemonic::And => {
                self.regs.a &= val;
                p.check_nz(self.regs.a);
            }
            Mnemonic::Ora => {
                self.regs.a |= val;
                p.check_nz(self.regs.a);
            }
            Mnemonic::Eor => {
                self.regs.a ^= val;
                p.check_nz(self.regs.a);
            }
            Mnemonic::Bit => {
                p.set_if(N, val & 0x80 != 0);
                p.set_if(V, val & 0x40 != 0);
                p.set_if(Z, self.regs.a & val == 0);
            }
            Mnemonic::Cmp => self.compare(self.regs.a, val),
            Mnemonic::Cpx => self.compare(self.regs.x, val),
            Mnemonic::Cpy => self.compare(self.regs.y, val),

            Mnemonic::Asl => val = self.asl(val),
            Mnemonic::Lsr => val = self.lsr(val),
            Mnemonic::Rol => val = self.rol(val),
            Mnemonic::Ror => val = self.ror(val),
            Mnemonic::Inc => {
                val = val.wrapping_add(1);
                p.check_nz(val);
            }
            Mnemonic::Dec => {
                val = val.wrapping_sub(1);
                p.check_nz(val);
            }

            Mnemonic::Slo => {
                val = self.asl(val);
                self.regs.a |= val;
                self.regs.p.check_nz(self.regs.a);
            }
            Mnemonic::Rla => {
                val = self.rol(val);
                self.regs.a &= val;
                self.regs.p.check_nz(self.regs.a);
            }
            Mnemonic::Sre => {
                val = self.lsr(val);
                self.regs.a ^= val;
                self.regs.p.check_nz(self.regs.a);
            }
            Mnemonic::Rra => {
                val = self.ror(val);
                self.adc(val);
            }
            Mnemonic::Dcp => {
                val = val.wrapping_sub(1);
                self.compare(self.regs.a, val);
            }
            Mnemonic::Isb => {
                val = val.wrapping_add(1);
                self.adc(val ^ 0xFF);
            }

            Mnemonic::Lda => {
                self.regs.a = val;
                p.check_nz(val);
            }
            Mnemonic::Ldx => {
                self.regs.x = val;
                p.check_nz(val);
            }
            Mnemonic::Ldy => {
                self.regs.y = val;
                p.check_nz(val);
            }
            Mnemonic::Lax => {
                self.regs.a = val;
                self.regs.x = val;
                p.check_nz(val);
            }
            Mnemonic::Sta => self.write(bus, addr, self.regs.a),
            Mnemonic::Stx => self.write(bus, addr, self.regs.x),
            Mnemonic::Sty => self.write(bus, addr, self.regs.y),
            Mnemonic::Sax => self.write(bus, addr, self.regs.a & self.regs.x),

            Mnemonic::Anc => {
                self.regs.a &= val;
                p.check_nz(self.regs.a);
                p.set_if(C, p.is_set(N));
            }
            Mnemonic::Alr => {
                self.regs.a &= val;
                self.regs.a = self.lsr(self.regs.a);
            }
            Mnemonic::Arr => {
                let carry_in = p.is_set(C);
                let mut a = (self.regs.a & val) >> 1;
                p.set_if(V, ((a >> 6) ^ (a >> 5)) & 0x01 != 0);
                if carry_in {
                    a |= 0x80;
                }
                p.check_nz(a);
                p.set_if(C, a & 0x40 != 0);
                self.regs.a = a;
            }
            Mnemonic::Sbx => {
                let result = i16::from(self.regs.a & self.regs.x) - i16::from(val);
                self.regs.x = result as u8;
                p.check_nz(self.regs.x);
                p.set_if(C, result >= 0);
            }
            Mnemonic::Las => {
                let v = self.regs.sp & val;
                self.regs.a = v;
                self.regs.x = v;
                self.regs.sp = v;
                p.check_nz(v);
            }
            Mnemonic::Ane => {
                self.regs.a = (self.regs.a | 0xEE) & self.regs.x & val;
                p.check_nz(self.regs.a);
            }
            Mnemonic::Lxa => {
                let v = (self.regs.a | 0xEE) & val;
                self.regs.a = v;
                self.regs.x = v;
                p.check_nz(v);
            }
            Mnemonic::Sha => {
                let value = self.regs.a & self.regs.x;
                self.store_high_and(bus, addr, self.regs.y, value);
            }
            Mnemonic::Shx => self.store_high_and(bus, addr, self.regs.y, self.regs.x),
            Mnemonic::Shy => self.store_high_and(bus, addr, self.regs.x, self.regs.y),
            Mnemonic::Tas => {
                self.regs.sp = self.regs.a & self.regs.x;
                self.store_high_and(bus, addr, self.regs.y, self.regs.sp);
            }

            Mnemonic::Nop => {
                if !matches!(op.mode, Mode::Imp | Mode::Acc | Mode::Imm | Mode::Rel) {
                    self.dummy_read(bus, addr);
                }
            }
            Mnemonic::Jmp => self.regs.pc = addr,

            Mnemonic::Bpl => self.branch(bus, !self.regs.p.is_set(N), addr),
            Mnemonic::Bmi => self.branch(bus, self.regs.p.is_set(N), addr),
            Mnemonic::Bvc => self.branch(bus, !self.regs.p.is_set(V), addr),
            Mnemonic::Bvs => self.branch(bus, self.regs.p.is_set(V), addr),
            Mnemonic::Bcc => self.branch(bus, !self.regs.p.is_set(C), addr),
            Mnemonic::Bcs => self.branch(bus, self.regs.p.is_set(C), addr),
            Mnemonic::Bne => self.branch(bus, !self.regs.p.is_set(Z), addr),
            Mnemonic::Beq => self.branch(bus, self.regs.p.is_set(Z), addr),

            Mnemonic::Clc => p.clear(C),
            Mnemonic::Sec => p.set(C),
            Mnemonic::Cli => p.clear(I),
            Mnemonic::Sei => p.set(I),
            Mnemonic::Cld => p.clear(D),
            Mnemonic::Sed => p.set(D),
            Mnemonic::Clv => p.clear(V),

            Mnemonic::Tax => {
                self.regs.x = self.regs.a;
                p.check_nz(self.regs.x);
            }
            Mnemonic::Tay => {
                self.regs.y = self.regs.a;
                p.check_nz(self.regs.y);
            }
            Mnemonic::Txa => {
                self.regs.a = self.regs.x;
                p.check_nz(self.regs.a);
            }
            Mnemonic::Tya => {
                self.regs.a = self.regs.y;
                p.check_nz(self.regs.a);
            }
            Mnemonic::Tsx => {
                self.regs.x = self.regs.sp;
                p.check_nz(self.regs.x);
            }
            Mnemonic::Txs => self.regs.sp = self.regs.x,
            Mnemonic::Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
                p.check_nz(self.regs.x);
            }
            Mnemonic::Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
                p.check_nz(self.regs.y);
            }
            Mnemonic::Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                p.check_nz(self.regs.x);
            }
            Mnemonic::Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                p.check_nz(self.regs.y);
            }

            Mnemonic::Pha => self.push(bus, self.regs.a),
            Mnemonic::Php => self.push(bus, self.regs.p.to_byte_brk()),
            Mnemonic::Pla => {
                self.dummy_read(bus, self.regs.stack_addr());
                self.regs.a = self.pull(bus);
                self.regs.p.check_nz(self.regs.a);
            }
            Mnemonic::Plp => {
                self.dummy_read(bus, self.regs.stack_addr());
                let v = self.pull(bus);
                self.regs.p.pull(v);
            }
            Mnemonic::Rti => {
                self.dummy_read(bus, self.regs.stack_addr());
                let v = self.pull(bus);
                self.regs.p.pull(v);
                self.regs.pc = self.pull_word(bus);
            }
            Mnemonic::Rts => {
                self.dummy_read(bus, self.regs.stack_addr());
                self.regs.pc = self.pull_word(bus);
                let _ = self.fetch(bus);
            }

            Mnemonic::Brk | Mnemonic::Jsr | Mnemonic::Stp => unreachable!(),
        }

        if op.has(W) {
            if op.mode == Mode::Acc {
                self.regs.a = val;
            } else {
                self.write(bus, addr, val);
            }
        }
    }

    fn adc(&mut self, val: u8) {
        let carry = u16::from(self.regs.p.is_set(C));
        let sum = u16::from(self.regs.a) + u16::from(val) + carry;
        self.regs.p.check_cv(self.regs.a, val, sum);
        self.regs.a = sum as u8;
        self.regs.p.check_nz(self.regs.a);
    }

    fn compare(&mut self, reg: u8, val: u8) {
        self.regs.p.check_nz(reg.wrapping_sub(val));
        self.regs.p.set_if(C, val <= reg);
    }

    fn asl(&mut self, val: u8) -> u8 {
        self.regs.p.set_if(C, val & 0x80 != 0);
        let r = val << 1;
        self.regs.p.check_nz(r);
        r
    }

    fn lsr(&mut self, val: u8) -> u8 {
        self.regs.p.set_if(C, val & 0x01 != 0);
        let r = val >> 1;
        self.regs.p.check_nz(r);
        r
    }

    fn rol(&mut self, val: u8) -> u8 {
        let r = (val << 1) | u8::from(self.regs.p.is_set(C));
        self.regs.p.set_if(C, val & 0x80 != 0);
        self.regs.p.check_nz(r);
        r
    }

    fn ror(&mut self, val: u8) -> u8 {
        let r = (val >> 1) | (u8::from(self.regs.p.is_set(C)) << 7);
        self.regs.p.set_if(C, val & 0x01 != 0);
        self.regs.p.check_nz(r);
        r
    }

    fn branch(&mut self, bus: &mut impl Bus, taken: bool, target: u16) {
        if !taken {
            return;
        }
        // A taken branch that doesn't cross a page delays an IRQ that became
        // pending during the branch until after the next instruction.
        if self.run_irq && !self.prev_run_irq {
            self.run_irq = false;
        }
        self.dummy_read(bus, self.regs.pc);
        if (self.regs.pc & 0xFF00) != (target & 0xFF00) {
            self.dummy_read(bus, (target & 0x00FF) | (self.regs.pc & 0xFF00));
        }
        self.regs.pc = target;
    }

    /// JSR pushes the address of its last operand byte.
    fn jsr(&mut self, bus: &mut impl Bus) {
        let lo = self.fetch(bus);
        self.dummy_read(bus, self.regs.stack_addr());
        self.push_word(bus, self.regs.pc);
        let hi = self.read(bus, self.regs.pc);
        self.regs.pc = u16::from_le_bytes([lo, hi]);
    }

    /// SHA/SHX/SHY/TAS: store `value & (base_high + 1)`. On a page cross the
    /// stored value also replaces the high byte of the target address.
    fn store_high_and(&mut self, bus: &mut impl Bus, addr: u16, index: u8, value: u8) {
        let base = addr.wrapping_sub(u16::from(index));
        let result = value & ((base >> 8) as u8).wrapping_add(1);
        let target = if base & 0xFF00 == addr & 0xFF00 {
            addr
        } else {
            (u16::from(result) << 8) | (addr & 0x00FF)
        };
        self.write(bus, target, result);
    }
}
