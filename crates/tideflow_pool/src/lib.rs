//! TIDEFLOW Pool
//!
//! The data pool owns every stored native value exactly once,
//! reference-counted across the immutable data states that mirror it.
//! The integrity auditor re-derives the counts from scratch and compares.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod integrity;
pub mod pool;
pub mod state;

pub use integrity::check_integrity;
pub use pool::{DataPool, PoolConfig};
pub use state::{DataState, Simulation};
