//! CPU state, instruction stepping and interrupt handling.
//!
//! The core executes one instruction per [`Mos6502::step`], but every bus
//! access is a separate call into the [`Bus`], so the rest of the machine
//! still advances one CPU cycle at a time. Interrupt lines are sampled at
//! the end of every cycle, the same way the real chip polls them during
//! the last cycle of an instruction.

use emu_core::{Bus, Observable, Value};
use log::error;

use crate::flags::{C, D, I, N, V, Z};
use crate::{OPCODES, Registers};

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// An interrupt sequence that was just taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptEvent {
    /// PC of the instruction that would have run next.
    pub from: u16,
    /// Handler address loaded from the vector.
    pub to: u16,
    pub nmi: bool,
}

/// The 2A03 CPU core.
#[derive(Debug)]
pub struct Mos6502 {
    pub regs: Registers,

    /// Bus cycles since power-on. Starts at -1 so that the reset sequence
    /// ends on cycle 7.
    cycles: i64,

    /// Execute ANE/LXA/SHA/SHX/SHY/TAS instead of halting on them.
    pub unstable_opcodes: bool,

    halted: bool,
    last_interrupt: Option<InterruptEvent>,

    // Interrupt polling pipeline.
    need_nmi: bool,
    prev_need_nmi: bool,
    prev_nmi_line: bool,
    pub(crate) run_irq: bool,
    pub(crate) prev_run_irq: bool,
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6502 {
    /// A CPU in its power-on state. Call [`reset`](Self::reset) before
    /// stepping to load PC from the reset vector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::power_on(),
            cycles: -1,
            unstable_opcodes: false,
            halted: false,
            last_interrupt: None,
            need_nmi: false,
            prev_need_nmi: false,
            prev_nmi_line: false,
            run_irq: false,
            prev_run_irq: false,
        }
    }

    /// Run the reset sequence.
    ///
    /// A hard reset restores the power-on registers and cycle counter; a
    /// soft reset keeps A/X/Y, sets I and drops SP by 3. Either way PC is
    /// loaded from $FFFC without side effects and eight cycles pass.
    pub fn reset(&mut self, bus: &mut impl Bus, soft: bool) {
        if soft {
            self.regs.sp = self.regs.sp.wrapping_sub(3);
            self.regs.p.set(I);
        } else {
            self.regs = Registers::power_on();
            self.cycles = -1;
        }
        self.halted = false;
        self.last_interrupt = None;
        self.need_nmi = false;
        self.prev_need_nmi = false;
        self.prev_nmi_line = false;
        self.run_irq = false;
        self.prev_run_irq = false;

        self.regs.pc = u16::from_le_bytes([bus.peek(RESET_VECTOR), bus.peek(RESET_VECTOR + 1)]);
        for _ in 0..8 {
            self.dummy_read(bus, self.regs.pc);
        }
    }

    /// Execute one instruction, then the interrupt sequence if one was
    /// pending at its last cycle. Does nothing once halted.
    pub fn step(&mut self, bus: &mut impl Bus) {
        if self.halted {
            return;
        }
        let opcode = self.fetch(bus);
        self.execute(bus, opcode);

        if self.prev_run_irq || self.prev_need_nmi {
            self.interrupt(bus);
        }
    }

    /// Bus cycles since power-on.
    #[must_use]
    pub const fn cycles(&self) -> i64 {
        self.cycles
    }

    /// Whether a JAM (or a disabled unstable opcode) stopped the CPU.
    #[must_use]
    pub const fn halted(&self) -> bool {
        self.halted
    }

    /// The interrupt taken by the last `step`, if any.
    pub fn take_interrupt(&mut self) -> Option<InterruptEvent> {
        self.last_interrupt.take()
    }

    pub(crate) fn halt(&mut self, opcode: u8) {
        if !self.halted {
            error!(
                "cpu halted: opcode {opcode:02X} ({}) at {:04X}",
                OPCODES[usize::from(opcode)].mnemonic,
                self.regs.pc.wrapping_sub(1)
            );
        }
        self.halted = true;
    }

    /// Sample the interrupt lines at the end of a cycle.
    pub(crate) fn poll_interrupts(&mut self, nmi_line: bool, irq_line: bool) {
        self.prev_need_nmi = self.need_nmi;
        if !self.prev_nmi_line && nmi_line {
            self.need_nmi = true;
        }
        self.prev_nmi_line = nmi_line;
        self.prev_run_irq = self.run_irq;
        self.run_irq = irq_line && !self.regs.p.is_set(I);
    }

    pub(crate) fn end_cycle(&mut self, bus: &mut impl Bus) {
        let stalls = bus.take_stall_cycles();
        self.cycles += 1 + i64::from(stalls);
        let (nmi, irq) = (bus.nmi_line(), bus.irq_line());
        for _ in 0..=stalls {
            self.poll_interrupts(nmi, irq);
        }
    }

    /// Hardware interrupt sequence (IRQ or NMI): seven cycles.
    fn interrupt(&mut self, bus: &mut impl Bus) {
        let from = self.regs.pc;
        self.dummy_read(bus, from);
        self.dummy_read(bus, from);
        self.push_word(bus, from);

        // An NMI that arrives while the PC is pushed hijacks the vector.
        let nmi = self.need_nmi;
        let vector = if nmi {
            self.need_nmi = false;
            NMI_VECTOR
        } else {
            IRQ_VECTOR
        };
        self.push(bus, self.regs.p.to_byte_irq());
        self.regs.p.set(I);
        self.regs.pc = self.read_word(bus, vector);
        self.last_interrupt = Some(InterruptEvent {
            from,
            to: self.regs.pc,
            nmi,
        });
    }

    /// BRK: like an IRQ, but with B set in the pushed status and PC+1
    /// pushed. A pending NMI takes over the vector.
    pub(crate) fn brk(&mut self, bus: &mut impl Bus) {
        self.dummy_read(bus, self.regs.pc);
        self.push_word(bus, self.regs.pc.wrapping_add(1));

        let vector = if self.need_nmi {
            self.need_nmi = false;
            NMI_VECTOR
        } else {
            IRQ_VECTOR
        };
        self.push(bus, self.regs.p.to_byte_brk());
        self.regs.p.set(I);
        self.regs.pc = self.read_word(bus, vector);
        self.prev_need_nmi = false;
    }
}

impl Observable for Mos6502 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "pc" => Some(self.regs.pc.into()),
            "a" => Some(self.regs.a.into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "sp" => Some(self.regs.sp.into()),
            "p" => Some(self.regs.p.to_byte().into()),
            "flags.c" => Some(self.regs.p.is_set(C).into()),
            "flags.z" => Some(self.regs.p.is_set(Z).into()),
            "flags.i" => Some(self.regs.p.is_set(I).into()),
            "flags.d" => Some(self.regs.p.is_set(D).into()),
            "flags.v" => Some(self.regs.p.is_set(V).into()),
            "flags.n" => Some(self.regs.p.is_set(N).into()),
            "cycles" => Some(self.cycles.into()),
            "halted" => Some(self.halted.into()),
            "nmi_pending" => Some(self.need_nmi.into()),
            "irq_pending" => Some(self.run_irq.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc",
            "a",
            "x",
            "y",
            "sp",
            "p",
            "flags.c",
            "flags.z",
            "flags.i",
            "flags.d",
            "flags.v",
            "flags.n",
            "cycles",
            "halted",
            "nmi_pending",
            "irq_pending",
        ]
    }
}
