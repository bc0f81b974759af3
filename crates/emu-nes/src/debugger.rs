//! Debugger hooks.

/// Callbacks a debugger front end receives from the running machine.
///
/// Every method has an empty default, so an implementation only overrides
/// what it needs. Hooks run synchronously on the emulation thread; a front
/// end that wants to pause does so by not calling `run_one_frame` again.
pub trait Debugger {
    /// About to execute the instruction at `pc`.
    fn trace(&mut self, _pc: u16) {}

    /// An IRQ or NMI moved execution from `prev_pc` to its handler at
    /// `cur_pc`.
    fn interrupt(&mut self, _prev_pc: u16, _cur_pc: u16, _is_nmi: bool) {}

    /// CPU read cycle. DMA cycles are not reported.
    fn watch_read(&mut self, _addr: u16) {}

    /// CPU write cycle.
    fn watch_write(&mut self, _addr: u16, _val: u8) {}

    /// Execution stopped (JAM or a disabled unstable opcode). Reported once
    /// per halt.
    fn halt(&mut self, _msg: &str) {}

    /// `run_one_frame` finished.
    fn frame_end(&mut self) {}
}
