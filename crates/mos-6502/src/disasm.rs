//! Side-effect free disassembler producing nestest-style instruction text.

use std::fmt;

use crate::Registers;
use crate::opcodes::{Mnemonic, Mode, OPCODES, Opcode};

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disassembly {
    pub pc: u16,
    pub opcode: Opcode,
    /// Instruction bytes; only the first `opcode.mode.size()` are meaningful.
    pub bytes: [u8; 3],
    /// Operand with resolved effective address and memory value, as in
    /// `($80),Y = 0200 @ 0203 = 5A`.
    pub operand: String,
}

impl Disassembly {
    #[must_use]
    pub const fn size(&self) -> u16 {
        self.opcode.mode.size()
    }
}

impl fmt::Display for Disassembly {
    /// `PPPP  BB BB BB *MNE operand`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}  ", self.pc)?;
        for i in 0..3 {
            if i < usize::from(self.size()) {
                write!(f, "{:02X} ", self.bytes[i])?;
            } else {
                f.write_str("   ")?;
            }
        }
        let mark = if self.opcode.is_illegal() { '*' } else { ' ' };
        write!(f, "{mark}{} {}", self.opcode.mnemonic, self.operand)
    }
}

/// Decode the instruction at `pc`. `peek` must not have side effects.
pub fn disassemble(pc: u16, regs: &Registers, peek: impl Fn(u16) -> u8) -> Disassembly {
    let bytes = [peek(pc), peek(pc.wrapping_add(1)), peek(pc.wrapping_add(2))];
    let opcode = OPCODES[usize::from(bytes[0])];
    let zp = bytes[1];
    let abs = u16::from_le_bytes([bytes[1], bytes[2]]);
    let zp_word = |zp: u8| u16::from_le_bytes([peek(u16::from(zp)), peek(u16::from(zp.wrapping_add(1)))]);

    let operand = match opcode.mode {
        Mode::Imp => String::new(),
        Mode::Acc => "A".to_string(),
        Mode::Imm => format!("#${zp:02X}"),
        Mode::Zpg => format!("${zp:02X} = {:02X}", peek(u16::from(zp))),
        Mode::Zpx | Mode::Zpy => {
            let (name, index) = if opcode.mode == Mode::Zpx { ('X', regs.x) } else { ('Y', regs.y) };
            let addr = zp.wrapping_add(index);
            format!("${zp:02X},{name} @ {addr:02X} = {:02X}", peek(u16::from(addr)))
        }
        Mode::Abs => {
            if matches!(opcode.mnemonic, Mnemonic::Jmp | Mnemonic::Jsr) {
                format!("${abs:04X}")
            } else {
                format!("${abs:04X} = {:02X}", peek(abs))
            }
        }
        Mode::Abx | Mode::Aby => {
            let (name, index) = if opcode.mode == Mode::Abx { ('X', regs.x) } else { ('Y', regs.y) };
            let addr = abs.wrapping_add(u16::from(index));
            format!("${abs:04X},{name} @ {addr:04X} = {:02X}", peek(addr))
        }
        Mode::Ind => {
            let lo = peek(abs);
            let hi = peek((abs & 0xFF00) | (abs.wrapping_add(1) & 0x00FF));
            format!("(${abs:04X}) = {:04X}", u16::from_le_bytes([lo, hi]))
        }
        Mode::Izx => {
            let ptr = zp.wrapping_add(regs.x);
            let addr = zp_word(ptr);
            format!("(${zp:02X},X) @ {ptr:02X} = {addr:04X} = {:02X}", peek(addr))
        }
        Mode::Izy => {
            let base = zp_word(zp);
            let addr = base.wrapping_add(u16::from(regs.y));
            format!("(${zp:02X}),Y = {base:04X} @ {addr:04X} = {:02X}", peek(addr))
        }
        Mode::Rel => {
            let target = pc.wrapping_add(2).wrapping_add_signed(i16::from(zp as i8));
            format!("${target:04X}")
        }
    };

    Disassembly {
        pc,
        opcode,
        bytes,
        operand,
    }
}
