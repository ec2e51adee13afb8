//! Time intervals and free slot detection.
//!
//! This module provides:
//! - The half-open [`Interval`] value type shared by the allocator and the splitter
//! - Free slot detection between busy intervals inside a working window

mod gap;
mod interval;

pub use gap::{free_slots, FreeSlotFinder};
pub use interval::Interval;
