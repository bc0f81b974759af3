//! Memory and I/O bus interface.

/// Memory and I/O bus interface.
///
/// A CPU accesses memory and peripherals through this trait. Every `read`
/// and `write` is one bus cycle: the implementor advances the rest of the
/// machine as part of the access. `peek` is the side-effect free variant used
/// by debuggers, tracers and vector fetches at reset.
pub trait Bus {
    /// Read a byte from the given address, consuming one bus cycle.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address, consuming one bus cycle.
    fn write(&mut self, address: u16, value: u8);

    /// Read a byte without side effects and without consuming time.
    fn peek(&self, address: u16) -> u8;

    /// Level of the (active high) non-maskable interrupt line.
    ///
    /// The CPU detects rising edges on this line.
    fn nmi_line(&self) -> bool {
        false
    }

    /// Level of the (active high) maskable interrupt line.
    fn irq_line(&self) -> bool {
        false
    }

    /// Number of cycles the CPU was held off the bus (DMA) since the last
    /// call. The CPU still samples its interrupt lines on those cycles.
    fn take_stall_cycles(&mut self) -> u32 {
        0
    }
}

/// Flat 64K RAM bus with manually driven interrupt lines.
///
/// Used to test CPU cores in isolation. Every access is logged so tests can
/// check cycle-by-cycle bus activity.
pub struct SimpleBus {
    memory: Box<[u8; 0x10000]>,
    /// Current NMI line level.
    pub nmi: bool,
    /// Current IRQ line level.
    pub irq: bool,
    /// Bus cycles performed so far, in order.
    pub cycles: Vec<BusCycle>,
    /// When false, `cycles` is not recorded.
    pub record: bool,
}

/// One recorded access on a [`SimpleBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusCycle {
    pub address: u16,
    pub value: u8,
    pub write: bool,
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
            nmi: false,
            irq: false,
            cycles: Vec::new(),
            record: false,
        }
    }

    /// Copy `data` into memory starting at `address`, wrapping at $FFFF.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        for (i, &b) in data.iter().enumerate() {
            self.memory[usize::from(address.wrapping_add(i as u16))] = b;
        }
    }

    /// Poke a byte without recording a bus cycle.
    pub fn poke(&mut self, address: u16, value: u8) {
        self.memory[usize::from(address)] = value;
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        let value = self.memory[usize::from(address)];
        if self.record {
            self.cycles.push(BusCycle {
                address,
                value,
                write: false,
            });
        }
        value
    }

    fn write(&mut self, address: u16, value: u8) {
        self.memory[usize::from(address)] = value;
        if self.record {
            self.cycles.push(BusCycle {
                address,
                value,
                write: true,
            });
        }
    }

    fn peek(&self, address: u16) -> u8 {
        self.memory[usize::from(address)]
    }

    fn nmi_line(&self) -> bool {
        self.nmi
    }

    fn irq_line(&self) -> bool {
        self.irq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_wraps_at_top_of_memory() {
        let mut bus = SimpleBus::new();
        bus.load(0xFFFF, &[0x11, 0x22]);
        assert_eq!(bus.peek(0xFFFF), 0x11);
        assert_eq!(bus.peek(0x0000), 0x22);
    }

    #[test]
    fn records_cycles_when_enabled() {
        let mut bus = SimpleBus::new();
        bus.write(0x10, 1);
        bus.record = true;
        bus.write(0x20, 2);
        let _ = bus.read(0x20);
        assert_eq!(
            bus.cycles,
            vec![
                BusCycle { address: 0x20, value: 2, write: true },
                BusCycle { address: 0x20, value: 2, write: false },
            ]
        );
    }
}
