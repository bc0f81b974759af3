//! Ricoh 2A03 CPU core: an NMOS 6502 without decimal arithmetic.
//!
//! The core runs one instruction per [`Mos6502::step`]. Every bus access,
//! dummy reads and writes included, is a separate [`emu_core::Bus`] call,
//! so the machine around the CPU advances cycle by cycle. All 256 opcodes
//! are implemented; the six unstable ones (ANE, LXA, SHA, SHX, SHY, TAS)
//! halt the CPU unless [`Mos6502::unstable_opcodes`] is set.

mod addressing;
mod cpu;
mod disasm;
mod execute;
pub mod flags;
pub mod opcodes;
mod registers;

pub use cpu::{IRQ_VECTOR, InterruptEvent, Mos6502, NMI_VECTOR, RESET_VECTOR};
pub use disasm::{Disassembly, disassemble};
pub use flags::Status;
pub use opcodes::{Mnemonic, Mode, OPCODES, Opcode};
pub use registers::Registers;
