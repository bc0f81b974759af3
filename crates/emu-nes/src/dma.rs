//! OAM and DMC DMA.
//!
//! Both units share one controller so their cycles interleave the way
//! they do on the 2A03. DMA only takes the bus on a CPU read cycle: the
//! CPU is halted for one cycle, transfers start on an even ("get") cycle,
//! and the DMC may need extra dummy or alignment cycles before its read.
//! OAM DMA copies 256 bytes to $2004 in 513 or 514 cycles.

use emu_core::{Observable, Value};
use log::{debug, trace};

use crate::bus::{NesBus, PORT_OPEN_BUS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dma {
    need_halt: bool,
    /// The DMC still owes a dummy cycle before its read.
    dummy: bool,
    dmc_running: bool,
    abort_dmc: bool,
    oam_page: u8,
    oam_running: bool,
}

impl Dma {
    pub(crate) const fn new() -> Self {
        Self {
            need_halt: false,
            dummy: true,
            dmc_running: false,
            abort_dmc: false,
            oam_page: 0,
            oam_running: false,
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    /// $4014 write.
    pub(crate) fn start_oam(&mut self, page: u8) {
        debug!("OAM DMA from ${page:02X}00");
        self.oam_page = page;
        self.oam_running = true;
        self.need_halt = true;
    }

    pub(crate) fn start_dmc(&mut self) {
        trace!("DMC DMA requested");
        self.dmc_running = true;
        self.dummy = true;
        self.need_halt = true;
    }

    pub(crate) fn stop_dmc(&mut self) {
        if !self.dmc_running {
            return;
        }
        if self.need_halt {
            // Not started yet: drop it.
            trace!("DMC DMA cancelled");
            self.dmc_running = false;
            self.dummy = false;
            self.need_halt = false;
        } else {
            // Only possible during the first cycle of the transfer.
            trace!("DMC DMA aborted");
            self.abort_dmc = true;
        }
    }

    /// State change at the start of each DMA cycle. OAM cycles double as
    /// the DMC's halt and dummy cycles when both run together.
    fn advance(&mut self) {
        if self.abort_dmc {
            self.dmc_running = false;
            self.abort_dmc = false;
            self.dummy = false;
            self.need_halt = false;
        } else if self.need_halt {
            self.need_halt = false;
        } else if self.dummy {
            self.dummy = false;
        }
    }

    const fn dmc_ready(&self) -> bool {
        self.dmc_running && !self.need_halt && !self.dummy
    }
}

/// The CPU address the DMC reads through when it is halted on one of the
/// 2A03's internal registers.
const fn internal_register(addr: u16) -> u16 {
    0x4000 | (addr & 0x1F)
}

const fn is_internal(addr: u16) -> bool {
    addr & 0xFFE0 == 0x4000
}

impl NesBus {
    /// Run any pending DMA before the CPU read of `addr`.
    pub(crate) fn process_dma(&mut self, addr: u16) {
        if !self.dma.need_halt {
            return;
        }

        let halted_on_internal = is_internal(addr);
        let on_ports = addr == 0x4016 || addr == 0x4017;

        // The DMC reading the port the CPU is halted on keeps /OE low the
        // whole time, which hides the halt cycle's read from the pad.
        let skip_halt_read = halted_on_internal
            && self.dma.dmc_running
            && on_ports
            && self.apu.dmc_address() & 0x1F == addr & 0x1F;

        self.dma.need_halt = false;

        self.dma_cycle_begin();
        let aborted_on_ports = self.dma.abort_dmc && on_ports;
        if !aborted_on_ports && !skip_halt_read {
            self.read_handler(addr);
        }
        self.dma_cycle_end();

        if self.dma.abort_dmc {
            self.dma.dmc_running = false;
            self.dma.abort_dmc = false;
            if !self.dma.oam_running {
                self.dma.dummy = false;
                return;
            }
        }

        let mut oam_count = 0u16;
        let mut oam_addr = 0u8;
        let mut val = 0u8;

        while self.dma.dmc_running || self.dma.oam_running {
            let get_cycle = self.cycle & 1 == 0;
            if get_cycle {
                if self.dma.dmc_ready() {
                    self.dma.advance();
                    self.dma_cycle_begin();
                    let dmc_addr = self.apu.dmc_address();
                    let byte = self.dma_read(dmc_addr, halted_on_internal);
                    self.dma_cycle_end();
                    self.dma.dmc_running = false;
                    self.dma.abort_dmc = false;
                    trace!("DMC DMA ${dmc_addr:04X} = {byte:02X}");
                    self.apu.set_dmc_read_buffer(byte);
                } else if self.dma.oam_running {
                    self.dma.advance();
                    self.dma_cycle_begin();
                    let src = u16::from(self.dma.oam_page) << 8 | u16::from(oam_addr);
                    val = self.dma_read(src, halted_on_internal);
                    self.dma_cycle_end();
                    oam_addr = oam_addr.wrapping_add(1);
                    oam_count += 1;
                } else {
                    // DMC waiting on its halt or dummy cycle.
                    self.dma.advance();
                    self.dma_cycle_begin();
                    if !on_ports {
                        self.read_handler(addr);
                    }
                    self.dma_cycle_end();
                }
            } else if self.dma.oam_running && oam_count & 1 != 0 {
                self.dma.advance();
                self.dma_cycle_begin();
                self.write_handler(0x2004, val);
                self.dma_cycle_end();
                oam_count += 1;
                if oam_count == 0x200 {
                    self.dma.oam_running = false;
                }
            } else {
                // Alignment cycle before a get.
                self.dma.advance();
                self.dma_cycle_begin();
                if !on_ports {
                    self.read_handler(addr);
                }
                self.dma_cycle_end();
            }
        }
    }

    fn dma_cycle_begin(&mut self) {
        self.cycle_begin(true);
        self.stall_cycle();
    }

    fn dma_cycle_end(&mut self) {
        self.cycle_end(true);
    }

    /// A DMA read of `addr`.
    ///
    /// Nothing drives $4000-$401F on the external bus. When the CPU was
    /// halted on an internal register, though, the 2A03 also reads the
    /// internal register selected by the low five bits of the DMA address.
    fn dma_read(&mut self, addr: u16, halted_on_internal: bool) -> u8 {
        if !halted_on_internal {
            return if is_internal(addr) {
                self.open_bus
            } else {
                self.read_handler(addr)
            };
        }

        let internal = internal_register(addr);
        let same = internal == addr;
        match internal {
            0x4015 => {
                let val = self.read_handler(internal);
                if !same {
                    self.read_handler(addr);
                }
                val
            }
            0x4016 | 0x4017 => {
                let val = self.read_handler(internal);
                if same {
                    val
                } else {
                    let ext = self.read_handler(addr);
                    (ext & PORT_OPEN_BUS) | (val & !PORT_OPEN_BUS & ext)
                }
            }
            _ => self.read_handler(addr),
        }
    }
}

impl Observable for Dma {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "oam_running" => Some(self.oam_running.into()),
            "oam_page" => Some(self.oam_page.into()),
            "dmc_running" => Some(self.dmc_running.into()),
            "need_halt" => Some(self.need_halt.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["oam_running", "oam_page", "dmc_running", "need_halt"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::tests::test_bus;
    use emu_core::Bus;

    fn fill_page(bus: &mut NesBus, page: u8) {
        for i in 0..=255u8 {
            bus.write_handler(u16::from(page) << 8 | u16::from(i), i ^ 0xA5);
        }
    }

    /// Cycles the read after a $4014 write takes, beyond its own.
    fn oam_dma_stall(start_odd: bool) -> (u32, NesBus) {
        let mut bus = test_bus();
        fill_page(&mut bus, 0x02);
        // The halt cycle is two cycles after the current one.
        if (bus.cycle & 1 == 1) != start_odd {
            bus.read(0x0000);
        }
        bus.write(0x4014, 0x02);
        let _ = bus.take_stall_cycles();
        bus.read(0x8000);
        (bus.take_stall_cycles(), bus)
    }

    #[test]
    fn oam_dma_copies_the_page() {
        let (_, bus) = oam_dma_stall(false);
        for i in 0..=255u8 {
            let mask = if i & 3 == 2 { 0xE3 } else { 0xFF };
            assert_eq!(bus.ppu.oam()[usize::from(i)], (i ^ 0xA5) & mask);
        }
        assert!(!bus.dma.oam_running);
    }

    #[test]
    fn oam_dma_length_depends_on_parity() {
        let (even, _) = oam_dma_stall(false);
        let (odd, _) = oam_dma_stall(true);
        assert_eq!(even, 513);
        assert_eq!(odd, 514);
    }

    #[test]
    fn dmc_stop_before_halt_cancels() {
        let mut dma = Dma::new();
        dma.start_dmc();
        dma.stop_dmc();
        assert!(!dma.dmc_running);
        assert!(!dma.need_halt);
    }

    #[test]
    fn dmc_stop_after_halt_aborts() {
        let mut dma = Dma::new();
        dma.start_dmc();
        dma.need_halt = false;
        dma.stop_dmc();
        assert!(dma.abort_dmc);
        dma.advance();
        assert!(!dma.dmc_running);
    }

    #[test]
    fn dmc_needs_halt_and_dummy_before_reading() {
        let mut dma = Dma::new();
        dma.start_dmc();
        assert!(!dma.dmc_ready());
        dma.advance();
        assert!(!dma.dmc_ready());
        dma.advance();
        assert!(dma.dmc_ready());
    }

    #[test]
    fn internal_register_address() {
        assert_eq!(internal_register(0xC016), 0x4016);
        assert_eq!(internal_register(0x4015), 0x4015);
        assert!(is_internal(0x401F));
        assert!(!is_internal(0x4020));
    }
}
