//! Tessera Core - Partial values and inclusive merge
//!
//! This crate defines the value model used throughout Tessera:
//! - The `Value` union (abstract placeholders, scalars, byte blocks,
//!   sequences, records, packets)
//! - Sparse sequences and sparse byte strings over partially decoded
//!   buffers
//! - Python-style slice resolution against uncertain lengths
//! - The `imerge` reconciliation operation and its error chain

pub mod error;
pub mod guard;
pub mod merge;
pub mod packet;
pub mod record;
pub mod slice;
pub mod sparse;
pub mod value;

pub use error::*;
pub use guard::*;
pub use merge::*;
pub use packet::*;
pub use record::*;
pub use slice::*;
pub use sparse::*;
pub use value::*;
