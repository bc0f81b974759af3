//! Opcode table.
//!
//! Every one of the 256 opcodes is described by its mnemonic, addressing
//! mode and a few detail bits. The executor derives the exact sequence of
//! bus cycles (including dummy reads and writes) from these entries.

use std::fmt;

/// Instruction mnemonics, including the undocumented ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[rustfmt::skip]
pub enum Mnemonic {
    Adc, Alr, Anc, And, Ane, Arr, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl,
    Brk, Bvc, Bvs, Clc, Cld, Cli, Clv, Cmp, Cpx, Cpy, Dcp, Dec, Dex, Dey,
    Eor, Inc, Inx, Iny, Isb, Jmp, Jsr, Las, Lax, Lda, Ldx, Ldy, Lsr, Lxa,
    Nop, Ora, Pha, Php, Pla, Plp, Rla, Rol, Ror, Rra, Rti, Rts, Sax, Sbc,
    Sbx, Sec, Sed, Sei, Sha, Shx, Shy, Slo, Sre, Sta, Stp, Stx, Sty, Tas,
    Tax, Tay, Tsx, Txa, Txs, Tya,
}

impl Mnemonic {
    #[must_use]
    #[rustfmt::skip]
    pub const fn name(self) -> &'static str {
        use Mnemonic::*;
        match self {
            Adc => "ADC", Alr => "ALR", Anc => "ANC", And => "AND", Ane => "ANE",
            Arr => "ARR", Asl => "ASL", Bcc => "BCC", Bcs => "BCS", Beq => "BEQ",
            Bit => "BIT", Bmi => "BMI", Bne => "BNE", Bpl => "BPL", Brk => "BRK",
            Bvc => "BVC", Bvs => "BVS", Clc => "CLC", Cld => "CLD", Cli => "CLI",
            Clv => "CLV", Cmp => "CMP", Cpx => "CPX", Cpy => "CPY", Dcp => "DCP",
            Dec => "DEC", Dex => "DEX", Dey => "DEY", Eor => "EOR", Inc => "INC",
            Inx => "INX", Iny => "INY", Isb => "ISB", Jmp => "JMP", Jsr => "JSR",
            Las => "LAS", Lax => "LAX", Lda => "LDA", Ldx => "LDX", Ldy => "LDY",
            Lsr => "LSR", Lxa => "LXA", Nop => "NOP", Ora => "ORA", Pha => "PHA",
            Php => "PHP", Pla => "PLA", Plp => "PLP", Rla => "RLA", Rol => "ROL",
            Ror => "ROR", Rra => "RRA", Rti => "RTI", Rts => "RTS", Sax => "SAX",
            Sbc => "SBC", Sbx => "SBX", Sec => "SEC", Sed => "SED", Sei => "SEI",
            Sha => "SHA", Shx => "SHX", Shy => "SHY", Slo => "SLO", Sre => "SRE",
            Sta => "STA", Stp => "STP", Stx => "STX", Sty => "STY", Tas => "TAS",
            Tax => "TAX", Tay => "TAY", Tsx => "TSX", Txa => "TXA", Txs => "TXS",
            Tya => "TYA",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Implied.
    Imp,
    /// Accumulator.
    Acc,
    /// Immediate.
    Imm,
    /// Zero page.
    Zpg,
    /// Zero page indexed by X.
    Zpx,
    /// Zero page indexed by Y.
    Zpy,
    /// Absolute.
    Abs,
    /// Absolute indexed by X.
    Abx,
    /// Absolute indexed by Y.
    Aby,
    /// Indirect (JMP only).
    Ind,
    /// Indexed indirect, `($zp,X)`.
    Izx,
    /// Indirect indexed, `($zp),Y`.
    Izy,
    /// Relative (branches).
    Rel,
}

impl Mode {
    /// Instruction length in bytes, opcode included.
    #[must_use]
    pub const fn size(self) -> u16 {
        match self {
            Mode::Imp | Mode::Acc => 1,
            Mode::Imm | Mode::Zpg | Mode::Zpx | Mode::Zpy | Mode::Izx | Mode::Izy | Mode::Rel => 2,
            Mode::Abs | Mode::Abx | Mode::Aby | Mode::Ind => 3,
        }
    }
}

/// The operand value is read before the operation runs.
pub const R: u8 = 0x01;
/// The result is written back (read-modify-write).
pub const W: u8 = 0x02;
/// Indexed modes take an extra cycle only when the page is crossed.
pub const X: u8 = 0x04;
/// Indexed modes always take the extra cycle.
pub const A: u8 = 0x08;
/// Undocumented opcode.
pub const ILL: u8 = 0x10;

/// One opcode table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub mnemonic: Mnemonic,
    pub mode: Mode,
    pub flags: u8,
}

impl Opcode {
    #[must_use]
    pub const fn has(self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    #[must_use]
    pub const fn is_illegal(self) -> bool {
        self.has(ILL)
    }

    /// Opcodes whose behaviour depends on analog effects of the chip; they
    /// only execute when explicitly enabled.
    #[must_use]
    pub const fn is_unstable(self) -> bool {
        matches!(
            self.mnemonic,
            Mnemonic::Ane
                | Mnemonic::Lxa
                | Mnemonic::Sha
                | Mnemonic::Shx
                | Mnemonic::Shy
                | Mnemonic::Tas
        )
    }
}

const fn op(mnemonic: Mnemonic, mode: Mode, flags: u8) -> Opcode {
    Opcode {
        mnemonic,
        mode,
        flags,
    }
}

use Mnemonic::*;
use Mode::{Abs, Abx, Aby, Acc, Imm, Imp, Ind, Izx, Izy, Rel, Zpg, Zpx, Zpy};

/// Indexed by opcode byte.
#[rustfmt::skip]
pub static OPCODES: [Opcode; 256] = [
    /* 00 */ op(Brk, Imp, 0),
    /* 01 */ op(Ora, Izx, R),
    /* 02 */ op(Stp, Imp, ILL),
    /* 03 */ op(Slo, Izx, R | W | ILL),
    /* 04 */ op(Nop, Zpg, ILL),
    /* 05 */ op(Ora, Zpg, R),
    /* 06 */ op(Asl, Zpg, R | W),
    /* 07 */ op(Slo, Zpg, R | W | ILL),
    /* 08 */ op(Php, Imp, 0),
    /* 09 */ op(Ora, Imm, R),
    /* 0A */ op(Asl, Acc, R | W),
    /* 0B */ op(Anc, Imm, R | ILL),
    /* 0C */ op(Nop, Abs, ILL),
    /* 0D */ op(Ora, Abs, R),
    /* 0E */ op(Asl, Abs, R | W),
    /* 0F */ op(Slo, Abs, R | W | ILL),
    /* 10 */ op(Bpl, Rel, 0),
    /* 11 */ op(Ora, Izy, R | X),
    /* 12 */ op(Stp, Imp, ILL),
    /* 13 */ op(Slo, Izy, R | W | A | ILL),
    /* 14 */ op(Nop, Zpx, ILL),
    /* 15 */ op(Ora, Zpx, R),
    /* 16 */ op(Asl, Zpx, R | W),
    /* 17 */ op(Slo, Zpx, R | W | ILL),
    /* 18 */ op(Clc, Imp, 0),
    /* 19 */ op(Ora, Aby, R | X),
    /* 1A */ op(Nop, Imp, ILL),
    /* 1B */ op(Slo, Aby, R | W | ILL),
    /* 1C */ op(Nop, Abx, X | ILL),
    /* 1D */ op(Ora, Abx, R | X),
    /* 1E */ op(Asl, Abx, R | W),
    /* 1F */ op(Slo, Abx, R | W | ILL),
    /* 20 */ op(Jsr, Abs, 0),
    /* 21 */ op(And, Izx, R),
    /* 22 */ op(Stp, Imp, ILL),
    /* 23 */ op(Rla, Izx, R | W | ILL),
    /* 24 */ op(Bit, Zpg, R),
    /* 25 */ op(And, Zpg, R),
    /* 26 */ op(Rol, Zpg, R | W),
    /* 27 */ op(Rla, Zpg, R | W | ILL),
    /* 28 */ op(Plp, Imp, 0),
    /* 29 */ op(And, Imm, R),
    /* 2A */ op(Rol, Acc, R | W),
    /* 2B */ op(Anc, Imm, R | ILL),
    /* 2C */ op(Bit, Abs, R),
    /* 2D */ op(And, Abs, R),
    /* 2E */ op(Rol, Abs, R | W),
    /* 2F */ op(Rla, Abs, R | W | ILL),
    /* 30 */ op(Bmi, Rel, 0),
    /* 31 */ op(And, Izy, R | X),
    /* 32 */ op(Stp, Imp, ILL),
    /* 33 */ op(Rla, Izy, R | W | A | ILL),
    /* 34 */ op(Nop, Zpx, ILL),
    /* 35 */ op(And, Zpx, R),
    /* 36 */ op(Rol, Zpx, R | W),
    /* 37 */ op(Rla, Zpx, R | W | ILL),
    /* 38 */ op(Sec, Imp, 0),
    /* 39 */ op(And, Aby, R | X),
    /* 3A */ op(Nop, Imp, ILL),
    /* 3B */ op(Rla, Aby, R | W | ILL),
    /* 3C */ op(Nop, Abx, X | ILL),
    /* 3D */ op(And, Abx, R | X),
    /* 3E */ op(Rol, Abx, R | W),
    /* 3F */ op(Rla, Abx, R | W | ILL),
    /* 40 */ op(Rti, Imp, 0),
    /* 41 */ op(Eor, Izx, R),
    /* 42 */ op(Stp, Imp, ILL),
    /* 43 */ op(Sre, Izx, R | W | ILL),
    /* 44 */ op(Nop, Zpg, ILL),
    /* 45 */ op(Eor, Zpg, R),
    /* 46 */ op(Lsr, Zpg, R | W),
    /* 47 */ op(Sre, Zpg, R | W | ILL),
    /* 48 */ op(Pha, Imp, 0),
    /* 49 */ op(Eor, Imm, R),
    /* 4A */ op(Lsr, Acc, R | W),
    /* 4B */ op(Alr, Imm, R | ILL),
    /* 4C */ op(Jmp, Abs, 0),
    /* 4D */ op(Eor, Abs, R),
    /* 4E */ op(Lsr, Abs, R | W),
    /* 4F */ op(Sre, Abs, R | W | ILL),
    /* 50 */ op(Bvc, Rel, 0),
    /* 51 */ op(Eor, Izy, R | X),
    /* 52 */ op(Stp, Imp, ILL),
    /* 53 */ op(Sre, Izy, R | W | A | ILL),
    /* 54 */ op(Nop, Zpx, ILL),
    /* 55 */ op(Eor, Zpx, R),
    /* 56 */ op(Lsr, Zpx, R | W),
    /* 57 */ op(Sre, Zpx, R | W | ILL),
    /* 58 */ op(Cli, Imp, 0),
    /* 59 */ op(Eor, Aby, R | X),
    /* 5A */ op(Nop, Imp, ILL),
    /* 5B */ op(Sre, Aby, R | W | ILL),
    /* 5C */ op(Nop, Abx, X | ILL),
    /* 5D */ op(Eor, Abx, R | X),
    /* 5E */ op(Lsr, Abx, R | W),
    /* 5F */ op(Sre, Abx, R | W | ILL),
    /* 60 */ op(Rts, Imp, 0),
    /* 61 */ op(Adc, Izx, R),
    /* 62 */ op(Stp, Imp, ILL),
    /* 63 */ op(Rra, Izx, R | W | ILL),
    /* 64 */ op(Nop, Zpg, ILL),
    /* 65 */ op(Adc, Zpg, R),
    /* 66 */ op(Ror, Zpg, R | W),
    /* 67 */ op(Rra, Zpg, R | W | ILL),
    /* 68 */ op(Pla, Imp, 0),
    /* 69 */ op(Adc, Imm, R),
    /* 6A */ op(Ror, Acc, R | W),
    /* 6B */ op(Arr, Imm, R | ILL),
    /* 6C */ op(Jmp, Ind, 0),
    /* 6D */ op(Adc, Abs, R),
    /* 6E */ op(Ror, Abs, R | W),
    /* 6F */ op(Rra, Abs, R | W | ILL),
    /* 70 */ op(Bvs, Rel, 0),
    /* 71 */ op(Adc, Izy, R | X),
    /* 72 */ op(Stp, Imp, ILL),
    /* 73 */ op(Rra, Izy, R | W | A | ILL),
    /* 74 */ op(Nop, Zpx, ILL),
    /* 75 */ op(Adc, Zpx, R),
    /* 76 */ op(Ror, Zpx, R | W),
    /* 77 */ op(Rra, Zpx, R | W | ILL),
    /* 78 */ op(Sei, Imp, 0),
    /* 79 */ op(Adc, Aby, R | X),
    /* 7A */ op(Nop, Imp, ILL),
    /* 7B */ op(Rra, Aby, R | W | ILL),
    /* 7C */ op(Nop, Abx, X | ILL),
    /* 7D */ op(Adc, Abx, R | X),
    /* 7E */ op(Ror, Abx, R | W),
    /* 7F */ op(Rra, Abx, R | W | ILL),
    /* 80 */ op(Nop, Imm, R | ILL),
    /* 81 */ op(Sta, Izx, 0),
    /* 82 */ op(Nop, Imm, R | ILL),
    /* 83 */ op(Sax, Izx, ILL),
    /* 84 */ op(Sty, Zpg, 0),
    /* 85 */ op(Sta, Zpg, 0),
    /* 86 */ op(Stx, Zpg, 0),
    /* 87 */ op(Sax, Zpg, ILL),
    /* 88 */ op(Dey, Imp, 0),
    /* 89 */ op(Nop, Imm, R | ILL),
    /* 8A */ op(Txa, Imp, 0),
    /* 8B */ op(Ane, Imm, R | ILL),
    /* 8C */ op(Sty, Abs, 0),
    /* 8D */ op(Sta, Abs, 0),
    /* 8E */ op(Stx, Abs, 0),
    /* 8F */ op(Sax, Abs, ILL),
    /* 90 */ op(Bcc, Rel, 0),
    /* 91 */ op(Sta, Izy, A),
    /* 92 */ op(Stp, Imp, ILL),
    /* 93 */ op(Sha, Izy, A | ILL),
    /* 94 */ op(Sty, Zpx, 0),
    /* 95 */ op(Sta, Zpx, 0),
    /* 96 */ op(Stx, Zpy, 0),
    /* 97 */ op(Sax, Zpy, ILL),
    /* 98 */ op(Tya, Imp, 0),
    /* 99 */ op(Sta, Aby, 0),
    /* 9A */ op(Txs, Imp, 0),
    /* 9B */ op(Tas, Aby, ILL),
    /* 9C */ op(Shy, Abx, ILL),
    /* 9D */ op(Sta, Abx, 0),
    /* 9E */ op(Shx, Aby, ILL),
    /* 9F */ op(Sha, Aby, ILL),
    /* A0 */ op(Ldy, Imm, R),
    /* A1 */ op(Lda, Izx, R),
    /* A2 */ op(Ldx, Imm, R),
    /* A3 */ op(Lax, Izx, R | ILL),
    /* A4 */ op(Ldy, Zpg, R),
    /* A5 */ op(Lda, Zpg, R),
    /* A6 */ op(Ldx, Zpg, R),
    /* A7 */ op(Lax, Zpg, R | ILL),
    /* A8 */ op(Tay, Imp, 0),
    /* A9 */ op(Lda, Imm, R),
    /* AA */ op(Tax, Imp, 0),
    /* AB */ op(Lxa, Imm, R | ILL),
    /* AC */ op(Ldy, Abs, R),
    /* AD */ op(Lda, Abs, R),
    /* AE */ op(Ldx, Abs, R),
    /* AF */ op(Lax, Abs, R | ILL),
    /* B0 */ op(Bcs, Rel, 0),
    /* B1 */ op(Lda, Izy, R | X),
    /* B2 */ op(Stp, Imp, ILL),
    /* B3 */ op(Lax, Izy, R | X | ILL),
    /* B4 */ op(Ldy, Zpx, R),
    /* B5 */ op(Lda, Zpx, R),
    /* B6 */ op(Ldx, Zpy, R),
    /* B7 */ op(Lax, Zpy, R | ILL),
    /* B8 */ op(Clv, Imp, 0),
    /* B9 */ op(Lda, Aby, R | X),
    /* BA */ op(Tsx, Imp, 0),
    /* BB */ op(Las, Aby, R | X | ILL),
    /* BC */ op(Ldy, Abx, R | X),
    /* BD */ op(Lda, Abx, R | X),
    /* BE */ op(Ldx, Aby, R | X),
    /* BF */ op(Lax, Aby, R | X | ILL),
    /* C0 */ op(Cpy, Imm, R),
    /* C1 */ op(Cmp, Izx, R),
    /* C2 */ op(Nop, Imm, R | ILL),
    /* C3 */ op(Dcp, Izx, R | W | ILL),
    /* C4 */ op(Cpy, Zpg, R),
    /* C5 */ op(Cmp, Zpg, R),
    /* C6 */ op(Dec, Zpg, R | W),
    /* C7 */ op(Dcp, Zpg, R | W | ILL),
    /* C8 */ op(Iny, Imp, 0),
    /* C9 */ op(Cmp, Imm, R),
    /* CA */ op(Dex, Imp, 0),
    /* CB */ op(Sbx, Imm, R | ILL),
    /* CC */ op(Cpy, Abs, R),
    /* CD */ op(Cmp, Abs, R),
    /* CE */ op(Dec, Abs, R | W),
    /* CF */ op(Dcp, Abs, R | W | ILL),
    /* D0 */ op(Bne, Rel, 0),
    /* D1 */ op(Cmp, Izy, R | X),
    /* D2 */ op(Stp, Imp, ILL),
    /* D3 */ op(Dcp, Izy, R | W | A | ILL),
    /* D4 */ op(Nop, Zpx, ILL),
    /* D5 */ op(Cmp, Zpx, R),
    /* D6 */ op(Dec, Zpx, R | W),
    /* D7 */ op(Dcp, Zpx, R | W | ILL),
    /* D8 */ op(Cld, Imp, 0),
    /* D9 */ op(Cmp, Aby, R | X),
    /* DA */ op(Nop, Imp, ILL),
    /* DB */ op(Dcp, Aby, R | W | ILL),
    /* DC */ op(Nop, Abx, X | ILL),
    /* DD */ op(Cmp, Abx, R | X),
    /* DE */ op(Dec, Abx, R | W),
    /* DF */ op(Dcp, Abx, R | W | ILL),
    /* E0 */ op(Cpx, Imm, R),
    /* E1 */ op(Sbc, Izx, R),
    /* E2 */ op(Nop, Imm, R | ILL),
    /* E3 */ op(Isb, Izx, R | W | ILL),
    /* E4 */ op(Cpx, Zpg, R),
    /* E5 */ op(Sbc, Zpg, R),
    /* E6 */ op(Inc, Zpg, R | W),
    /* E7 */ op(Isb, Zpg, R | W | ILL),
    /* E8 */ op(Inx, Imp, 0),
    /* E9 */ op(Sbc, Imm, R),
    /* EA */ op(Nop, Imp, 0),
    /* EB */ op(Sbc, Imm, R | ILL),
    /* EC */ op(Cpx, Abs, R),
    /* ED */ op(Sbc, Abs, R),
    /* EE */ op(Inc, Abs, R | W),
    /* EF */ op(Isb, Abs, R | W | ILL),
    /* F0 */ op(Beq, Rel, 0),
    /* F1 */ op(Sbc, Izy, R | X),
    /* F2 */ op(Stp, Imp, ILL),
    /* F3 */ op(Isb, Izy, R | W | A | ILL),
    /* F4 */ op(Nop, Zpx, ILL),
    /* F5 */ op(Sbc, Zpx, R),
    /* F6 */ op(Inc, Zpx, R | W),
    /* F7 */ op(Isb, Zpx, R | W | ILL),
    /* F8 */ op(Sed, Imp, 0),
    /* F9 */ op(Sbc, Aby, R | X),
    /* FA */ op(Nop, Imp, ILL),
    /* FB */ op(Isb, Aby, R | W | ILL),
    /* FC */ op(Nop, Abx, X | ILL),
    /* FD */ op(Sbc, Abx, R | X),
    /* FE */ op(Inc, Abx, R | W),
    /* FF */ op(Isb, Abx, R | W | ILL),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn official_opcode_count() {
        assert_eq!(OPCODES.iter().filter(|o| !o.is_illegal()).count(), 151);
    }

    #[test]
    fn jam_opcodes_share_a_column() {
        for (i, o) in OPCODES.iter().enumerate() {
            let jam = o.mnemonic == Mnemonic::Stp;
            assert_eq!(jam, i & 0x0F == 0x02 && i & 0x90 != 0x80, "{i:02X}");
        }
    }

    #[test]
    fn stores_always_pay_the_index_cycle() {
        assert!(OPCODES[0x91].has(A));
        assert!(!OPCODES[0x9D].has(X));
        assert!(OPCODES[0xB1].has(X));
    }
}
