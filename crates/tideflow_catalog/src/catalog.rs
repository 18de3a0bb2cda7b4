//! The metadata registry.
//!
//! One validated `MetaData` per declared variable, built once from the
//! package/company-scoped declaration sources and immutable afterwards.

use crate::metadata::{DeclarationSource, MetaData};
use crate::structure::StructureRegistry;
use indexmap::IndexMap;
use tideflow_core::{EngineError, EngineResult, VariableId};
use tracing::debug;

/// Catalog of every declared variable, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataCatalog {
    entries: IndexMap<VariableId, MetaData>,
}

impl DataCatalog {
    /// Build a catalog from declaration sources
    ///
    /// Fails before returning a partial catalog: the first duplicate
    /// identifier, malformed key, missing required property, or unknown
    /// structure kind aborts the build.
    ///
    /// # Errors
    ///
    /// Returns a declaration error naming the offending record
    pub fn build(
        sources: &[DeclarationSource],
        structures: &StructureRegistry,
    ) -> EngineResult<Self> {
        let mut entries = IndexMap::new();

        for source in sources {
            let scope = source.scope();
            for record in &source.records {
                let meta = MetaData::from_record(record, &scope)?;

                if entries.contains_key(&meta.identifier) {
                    return Err(EngineError::declaration(format!(
                        "duplicate identifier '{}' declared in {}",
                        meta.identifier, scope
                    )));
                }

                let structure = structures.get(&meta.structure).map_err(|_| {
                    EngineError::declaration(format!(
                        "variable '{}' declares unknown structure kind '{}'",
                        meta.identifier, meta.structure
                    ))
                })?;

                for property in structure.required_properties() {
                    if record.property(property).is_none() {
                        return Err(EngineError::declaration(format!(
                            "variable '{}' missing required property '{}' for structure '{}'",
                            meta.identifier, property, meta.structure
                        )));
                    }
                }

                debug!(identifier = %meta.identifier, structure = %meta.structure, "declared");
                entries.insert(meta.identifier.clone(), meta);
            }
        }

        Ok(Self { entries })
    }

    /// Get metadata for a declared variable
    ///
    /// # Errors
    ///
    /// Returns not-found if the variable is undeclared
    pub fn get(&self, id: &VariableId) -> EngineResult<&MetaData> {
        self.entries
            .get(id)
            .ok_or_else(|| EngineError::not_found("Variable", id.as_str()))
    }

    /// Check whether a variable is declared
    #[must_use]
    pub fn contains(&self, id: &VariableId) -> bool {
        self.entries.contains_key(id)
    }

    /// All declared variables, in declaration order
    #[must_use]
    pub fn variables(&self) -> Vec<&VariableId> {
        self.entries.keys().collect()
    }

    /// Number of declared variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate declared entries in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&VariableId, &MetaData)> {
        self.entries.iter()
    }
}
