//! TIDEFLOW Plugin System
//!
//! The interface contract (declared inputs, outputs, optional and masked
//! requirements, local id map, execution entry point) and the socket
//! registry that indexes interface factories per capability family.
//! Discovery is an explicit registration table populated at start-up;
//! there is no runtime reflection.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod interface;
pub mod socket;

pub use interface::{IdMap, InputRequirement, Interface, InterfaceContext};
pub use socket::{InterfaceFactory, PluginRegistry, Socket};
