//! Address routing.
//!
//! A [`Table`] maps every address of a 16-bit bus to a [`Handler`]: a slice
//! of a memory block, a single hardware register, or a whole device. Mappers
//! rebuild parts of a table at runtime through the object-safe [`MemMap`]
//! trait.

mod reg;
mod table;

pub use reg::{Reg8, RegAccess, RegDesc};
pub use table::{
    Access, BlockId, Handler, MapError, MemMap, MemSlot, PAGE_SIZE, Region, RegSlot, Table,
};
