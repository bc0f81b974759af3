//! Per-instruction trace in the nestest log format.

use std::io::Write;

use log::error;
use mos_6502::{Registers, disassemble};
use ricoh_ppu_2c02::PRE_RENDER_LINE;

/// Column where the register dump starts.
const REGS_COLUMN: usize = 48;

/// Machine state shown on one trace line, captured before the
/// instruction's opcode fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceState {
    pub regs: Registers,
    pub scanline: u16,
    pub dot: u16,
    pub cycles: i64,
}

/// Format one trace line (without the newline).
///
/// `C000  4C F5 C5  JMP $C5F5   ...   A:00 X:00 Y:00 P:24 SP:FD PPU:  0, 21 CYC:7`
///
/// `peek` must be side-effect free. The pre-render line prints as -1.
pub fn format_line(state: &TraceState, peek: impl Fn(u16) -> u8) -> String {
    let regs = &state.regs;
    let disasm = disassemble(regs.pc, regs, peek).to_string();
    let scanline = if state.scanline == PRE_RENDER_LINE {
        -1
    } else {
        i32::from(state.scanline)
    };
    format!(
        "{disasm:<REGS_COLUMN$}A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} PPU:{scanline:3},{:3} CYC:{}",
        regs.a,
        regs.x,
        regs.y,
        regs.p.to_byte(),
        regs.sp,
        state.dot,
        state.cycles,
    )
}

/// Writes trace lines to a byte sink until the sink fails.
pub struct Tracer {
    out: Box<dyn Write>,
}

impl Tracer {
    #[must_use]
    pub fn new(out: Box<dyn Write>) -> Self {
        Self { out }
    }

    /// Append a line. Returns false once the sink has failed; the caller
    /// drops the tracer then.
    pub fn write_line(&mut self, line: &str) -> bool {
        match writeln!(self.out, "{line}") {
            Ok(()) => true,
            Err(e) => {
                error!("trace output failed, tracing stopped: {e}");
                false
            }
        }
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.out.flush() {
            error!("trace flush failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mos_6502::Status;

    fn state(pc: u16, scanline: u16, dot: u16, cycles: i64) -> TraceState {
        TraceState {
            regs: Registers {
                pc,
                p: Status(0x24),
                ..Registers::power_on()
            },
            scanline,
            dot,
            cycles,
        }
    }

    fn mem(addr: u16) -> u8 {
        match addr {
            0xC000 => 0x4C,
            0xC001 => 0xF5,
            0xC002 => 0xC5,
            _ => 0,
        }
    }

    #[test]
    fn nestest_first_line() {
        let line = format_line(&state(0xC000, 0, 21, 7), mem);
        assert_eq!(
            line,
            "C000  4C F5 C5  JMP $C5F5                       A:00 X:00 Y:00 P:24 SP:FD PPU:  0, 21 CYC:7"
        );
    }

    #[test]
    fn pre_render_line_is_minus_one() {
        let line = format_line(&state(0xC000, PRE_RENDER_LINE, 340, 100), mem);
        assert!(line.ends_with("PPU: -1,340 CYC:100"), "{line}");
    }

    struct Failing;

    impl Write for Failing {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failing_sink_reports_false() {
        let mut tracer = Tracer::new(Box::new(Failing));
        assert!(!tracer.write_line("x"));
    }
}
