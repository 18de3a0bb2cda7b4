//! TIDEFLOW Control
//!
//! The writing and reading halves of the engine's consumer API. The
//! controller commits data states — from raw declaration values or from
//! an interface execution — as all-or-nothing batches. The loader
//! answers resolution questions over a simulation's committed history:
//! current values, merged views, and whether an interface's declared
//! inputs are satisfied.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod controller;
pub mod loader;

pub use controller::{add_datastate, execute_interface, release_simulation};
pub use loader::{can_load, create_merged_state, get_data_value, has_data, missing_required};
