//! Tessera Test Harness - Reconciliation fuzzing and merge validation
//!
//! This crate provides:
//! - Proptest strategies for partial values, sparse containers and
//!   slice specs
//! - Reference models for slice arithmetic and sector arithmetic
//! - Merge law predicates (idempotence, identity absorption,
//!   left-operand subsumption)
//! - End-to-end reconciliation scenarios

pub mod strategies;
pub mod model;
pub mod integration;

pub use strategies::*;
pub use model::*;
pub use integration::*;
