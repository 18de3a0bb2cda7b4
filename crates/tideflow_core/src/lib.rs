//! TIDEFLOW Core Types
//!
//! This crate contains pure types with no I/O: variable identifiers,
//! the native value model, entity identities, and the engine error kinds.
//! All types are serializable so pool/state graphs survive a deep copy.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod value;
pub mod variable;

// Re-exports
pub use error::{EngineError, EngineResult};
pub use id::{PipelineId, SimulationId, StateId};
pub use value::Value;
pub use variable::VariableId;
