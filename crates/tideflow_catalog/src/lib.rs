//! TIDEFLOW Catalog
//!
//! Variable declarations, the metadata registry, and the structure
//! marshallers that convert raw values to and from their native shape.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod metadata;
pub mod structure;

pub use catalog::DataCatalog;
pub use metadata::{DeclarationRecord, DeclarationSource, MetaData, BASE_PROPERTIES};
pub use structure::{Structure, StructureRegistry};
