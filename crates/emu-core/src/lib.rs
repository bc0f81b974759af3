//! Core traits and types for cycle-accurate emulation.
//!
//! Components talk to each other through a [`Bus`], and every memory-mapped
//! chip routes its accesses through a [`map::Table`]. Everything is
//! observable: queries never affect emulation state.

mod bus;
mod clock;
pub mod map;
mod observable;

pub use bus::{Bus, BusCycle, SimpleBus};
pub use clock::MasterClock;
pub use observable::{Observable, Value, parse_address};
