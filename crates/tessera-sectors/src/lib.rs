//! Tessera Sectors - Interval sets over sparse buffers
//!
//! A sector marks a contiguous half-open range `[start, end)` of a buffer
//! as authoritative: the positions were explicitly written, as opposed to
//! implicitly holding a default filler. This crate implements the sector
//! set used by the sparse sequence engine:
//! - Disjoint, sorted, coalescing range arithmetic (`add`/`sub`)
//! - Point and range membership, bisection
//! - Ordered event walks over one or two sets (`iter_indices`,
//!   `iter_joined_sectors`)

pub mod set;

pub use set::*;
