//! TIDEFLOW Engine
//!
//! Per-run scheduling: an insertion-ordered scheduled queue, an
//! append-only completed log, and the sequencer operations that move
//! interfaces between them — including undo and rollback, which are
//! pure truncation-and-requeue over the log, never replay.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod pipeline;
pub mod sequencer;

pub use pipeline::{CompletionPolicy, RunContext};
pub use sequencer::Sequencer;
