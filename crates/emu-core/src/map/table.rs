//! Two-level page table routing bus addresses to handlers.

use log::{error, trace};
use thiserror::Error;

use super::reg::{RegAccess, RegDesc};

/// Addresses per second-level page.
pub const PAGE_SIZE: usize = 256;
const PAGE_COUNT: usize = 0x10000 / PAGE_SIZE;

/// Index of a memory block owned by a [`Table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(u16);

impl BlockId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Write policy of a memory mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    ReadWrite,
    /// Writes are dropped and logged.
    ReadOnly,
    /// Writes are dropped without logging.
    ReadOnlySilent,
}

/// A window into a memory block.
///
/// The block is `size` bytes long starting at `base`; mapping it over a
/// longer address range mirrors it. `size` must be a power of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub block: BlockId,
    pub base: u32,
    pub size: u32,
    pub access: Access,
    /// When set, writes that hit this region are also reported to the owner
    /// of the table (e.g. mapper registers behind PRG ROM).
    pub notify: bool,
}

impl Region {
    #[must_use]
    pub const fn new(block: BlockId, base: u32, size: u32) -> Self {
        Self {
            block,
            base,
            size,
            access: Access::ReadWrite,
            notify: false,
        }
    }

    #[must_use]
    pub const fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    #[must_use]
    pub const fn notify(mut self) -> Self {
        self.notify = true;
        self
    }
}

/// Resolved memory handler for one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemSlot {
    pub block: BlockId,
    /// First address of the mapping.
    pub start: u16,
    pub base: u32,
    pub mask: u32,
    pub access: Access,
    pub notify: bool,
}

impl MemSlot {
    /// Byte offset of `addr` inside the block.
    #[inline]
    #[must_use]
    pub const fn index(&self, addr: u16) -> usize {
        (self.base + (addr.wrapping_sub(self.start) as u32 & self.mask)) as usize
    }
}

/// A single register mapped at one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegSlot<D> {
    pub id: D,
    pub name: &'static str,
    pub access: RegAccess,
}

/// What lives at one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler<D> {
    Unmapped,
    Mem(MemSlot),
    Reg(RegSlot<D>),
    /// The whole access is forwarded to a device.
    Device(D),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("overlapping range ${begin:04X}-${end:04X}")]
    Overlap { begin: u16, end: u16 },
    #[error("region size {0:#X} is not a power of two")]
    BadSize(u32),
    #[error("region ${base:X}+{size:#X} is outside its block")]
    OutOfBlock { base: u32, size: u32 },
}

/// Routing table for one bus.
///
/// Lookups are two array indexings: the high address byte selects a page,
/// the low byte selects the handler. Pages are allocated on first use.
pub struct Table<D> {
    name: &'static str,
    pages: Vec<Option<Box<[Handler<D>; PAGE_SIZE]>>>,
    blocks: Vec<Vec<u8>>,
}

impl<D: Copy> Table<D> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            pages: (0..PAGE_COUNT).map(|_| None).collect(),
            blocks: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Handler for `addr`. Unallocated pages read as [`Handler::Unmapped`].
    #[inline]
    #[must_use]
    pub fn search(&self, addr: u16) -> Handler<D> {
        match &self.pages[usize::from(addr >> 8)] {
            Some(page) => page[usize::from(addr & 0xFF)],
            None => Handler::Unmapped,
        }
    }

    /// Install `handler` on every address of `begin..=end`.
    ///
    /// Unless `allow_remap` is set, any address that already has a handler
    /// makes the whole call fail without modifying the table.
    pub fn insert_range(
        &mut self,
        begin: u16,
        end: u16,
        handler: Handler<D>,
        allow_remap: bool,
    ) -> Result<(), MapError> {
        if !allow_remap {
            if let Some(addr) = (begin..=end).find(|&a| !matches!(self.search(a), Handler::Unmapped)) {
                error!(target: "emu_core::map", "{}: overlap at ${addr:04X} mapping ${begin:04X}-${end:04X}", self.name);
                return Err(MapError::Overlap { begin, end });
            }
        }
        for addr in begin..=end {
            self.set(addr, handler);
        }
        Ok(())
    }

    fn set(&mut self, addr: u16, handler: Handler<D>) {
        let page = self.pages[usize::from(addr >> 8)]
            .get_or_insert_with(|| Box::new([Handler::Unmapped; PAGE_SIZE]));
        page[usize::from(addr & 0xFF)] = handler;
    }

    /// Map a device over `begin..=end`.
    pub fn map_device(
        &mut self,
        begin: u16,
        end: u16,
        device: D,
        allow_remap: bool,
    ) -> Result<(), MapError> {
        self.insert_range(begin, end, Handler::Device(device), allow_remap)
    }

    /// Map the registers of `bank` found in `regs`.
    ///
    /// Register `r` lands at `begin + r.offset` and is mirrored every
    /// `stride` bytes up to `end`. `wrap` turns a component's register id
    /// into this table's device type.
    pub fn map_regs<R: Copy>(
        &mut self,
        begin: u16,
        end: u16,
        stride: u16,
        bank: u8,
        regs: &[RegDesc<R>],
        wrap: impl Fn(R) -> D,
    ) -> Result<(), MapError> {
        for desc in regs.iter().filter(|d| d.bank == bank) {
            let slot = Handler::Reg(RegSlot {
                id: wrap(desc.id),
                name: desc.name,
                access: desc.access,
            });
            let mut addr = u32::from(begin) + u32::from(desc.offset);
            while addr <= u32::from(end) {
                self.insert_range(addr as u16, addr as u16, slot, false)?;
                trace!(target: "emu_core::map", "{}: {} at ${addr:04X}", self.name, desc.name);
                addr += u32::from(stride.max(1));
            }
        }
        Ok(())
    }

    /// Read a byte through a memory handler.
    #[inline]
    #[must_use]
    pub fn read_mem(&self, slot: &MemSlot, addr: u16) -> u8 {
        self.blocks[slot.block.index()][slot.index(addr)]
    }

    /// Write a byte through a memory handler.
    ///
    /// Returns false when the mapping is read-only and the byte was dropped.
    #[inline]
    pub fn write_mem(&mut self, slot: &MemSlot, addr: u16, val: u8) -> bool {
        let ok = slot.access == Access::ReadWrite;
        let cell = &mut self.blocks[slot.block.index()][slot.index(addr)];
        *cell = if ok { val } else { *cell };
        if !ok {
            self.rejected_write(slot, addr, val);
        }
        ok
    }

    #[cold]
    fn rejected_write(&self, slot: &MemSlot, addr: u16, val: u8) {
        if slot.access == Access::ReadOnly {
            error!(target: "emu_core::map", "{}: write ${val:02X} to read-only ${addr:04X}", self.name);
        }
    }

    /// Contiguous bytes from `addr` to the end of its mapping window.
    ///
    /// Only memory handlers have a backing slice; anything else is `None`.
    #[must_use]
    pub fn fetch_pointer(&self, addr: u16) -> Option<&[u8]> {
        match self.search(addr) {
            Handler::Mem(slot) => {
                let block = &self.blocks[slot.block.index()];
                let end = (slot.base + slot.mask + 1) as usize;
                block.get(slot.index(addr)..end.min(block.len()))
            }
            _ => None,
        }
    }
}

/// The parts of a [`Table`] a cartridge mapper may touch, independent of the
/// table's device type.
pub trait MemMap {
    /// Register a new memory block. The table owns it from now on.
    fn add_block(&mut self, data: Vec<u8>) -> BlockId;

    fn block(&self, id: BlockId) -> &[u8];

    fn block_mut(&mut self, id: BlockId) -> &mut [u8];

    /// Map `region` over `begin..=end`, mirroring it if the range is longer.
    fn map_mem(
        &mut self,
        begin: u16,
        end: u16,
        region: Region,
        allow_remap: bool,
    ) -> Result<(), MapError>;

    /// Remove every handler in `begin..=end`.
    fn unmap(&mut self, begin: u16, end: u16);

    /// Memory byte at `addr` if a memory handler is mapped there.
    fn peek_mem(&self, addr: u16) -> Option<u8>;
}

impl<D: Copy> MemMap for Table<D> {
    fn add_block(&mut self, data: Vec<u8>) -> BlockId {
        let id = BlockId(self.blocks.len() as u16);
        self.blocks.push(data);
        id
    }

    fn block(&self, id: BlockId) -> &[u8] {
        &self.blocks[id.index()]
    }

    fn block_mut(&mut self, id: BlockId) -> &mut [u8] {
        &mut self.blocks[id.index()]
    }

    fn map_mem(
        &mut self,
        begin: u16,
        end: u16,
        region: Region,
        allow_remap: bool,
    ) -> Result<(), MapError> {
        if !region.size.is_power_of_two() {
            return Err(MapError::BadSize(region.size));
        }
        let len = self.blocks[region.block.index()].len() as u32;
        if region.base + region.size > len {
            return Err(MapError::OutOfBlock {
                base: region.base,
                size: region.size,
            });
        }
        let slot = MemSlot {
            block: region.block,
            start: begin,
            base: region.base,
            mask: region.size - 1,
            access: region.access,
            notify: region.notify,
        };
        self.insert_range(begin, end, Handler::Mem(slot), allow_remap)
    }

    fn unmap(&mut self, begin: u16, end: u16) {
        for addr in begin..=end {
            if self.pages[usize::from(addr >> 8)].is_some() {
                self.set(addr, Handler::Unmapped);
            }
        }
    }

    fn peek_mem(&self, addr: u16) -> Option<u8> {
        match self.search(addr) {
            Handler::Mem(slot) => Some(self.read_mem(&slot, addr)),
            _ => None,
        }
    }
}
