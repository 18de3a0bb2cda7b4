//! Variable declaration records and validated metadata.
//!
//! Declarations arrive as package/company-scoped sources, one record per
//! variable. A record becomes a `MetaData` only after the required
//! property set is verified.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tideflow_core::{EngineError, EngineResult, VariableId};

/// Properties every declaration must carry, regardless of structure kind
pub const BASE_PROPERTIES: &[&str] = &["identifier", "structure", "title"];

/// One raw declaration record, as read from a declaration source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationRecord {
    /// Namespaced variable key
    #[serde(default)]
    pub identifier: Option<String>,
    /// Structure kind name
    #[serde(default)]
    pub structure: Option<String>,
    /// Human-readable title
    #[serde(default)]
    pub title: Option<String>,
    /// Measurement units
    #[serde(default)]
    pub units: Option<String>,
    /// Element type hints
    #[serde(default)]
    pub types: Option<Vec<String>>,
    /// Structure-specific properties
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl DeclarationRecord {
    /// Look up a property by name, covering both the fixed fields and
    /// the structure-specific extras
    #[must_use]
    pub fn property(&self, name: &str) -> Option<serde_json::Value> {
        match name {
            "identifier" => self.identifier.clone().map(serde_json::Value::String),
            "structure" => self.structure.clone().map(serde_json::Value::String),
            "title" => self.title.clone().map(serde_json::Value::String),
            "units" => self.units.clone().map(serde_json::Value::String),
            "types" => self
                .types
                .clone()
                .map(|t| serde_json::json!(t)),
            other => self.extra.get(other).cloned(),
        }
    }

    /// List the base properties this record is missing
    #[must_use]
    pub fn missing_base_properties(&self) -> Vec<&'static str> {
        BASE_PROPERTIES
            .iter()
            .filter(|p| self.property(p).is_none())
            .copied()
            .collect()
    }
}

/// A package/company-scoped group of declaration records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationSource {
    /// Package the declarations belong to
    pub package: String,
    /// Company scope within the package
    pub company: String,
    /// The records themselves, in declaration order
    pub records: Vec<DeclarationRecord>,
}

impl DeclarationSource {
    /// Create an empty source for a scope
    #[must_use]
    pub fn new(package: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            company: company.into(),
            records: Vec::new(),
        }
    }

    /// Append a record
    pub fn push(&mut self, record: DeclarationRecord) {
        self.records.push(record);
    }

    /// Load a source from a JSON file
    ///
    /// # Errors
    ///
    /// Returns a declaration error if the file cannot be read or parsed
    pub fn from_path(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            EngineError::declaration(format!(
                "cannot read declaration source {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_slice(&data).map_err(|e| {
            EngineError::declaration(format!(
                "cannot parse declaration source {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Scope label used in diagnostics
    #[must_use]
    pub fn scope(&self) -> String {
        format!("{}/{}", self.package, self.company)
    }
}

/// Validated metadata for one declared variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaData {
    /// Namespaced variable key
    pub identifier: VariableId,
    /// Structure kind name, resolved against the structure registry
    pub structure: String,
    /// Human-readable title
    pub title: String,
    /// Measurement units
    pub units: Option<String>,
    /// Element type hints
    pub types: Option<Vec<String>>,
    /// Structure-specific properties carried through from the record
    pub extra: IndexMap<String, serde_json::Value>,
}

impl MetaData {
    /// Build metadata from a record whose base properties are present
    ///
    /// # Errors
    ///
    /// Returns a declaration error naming the record's identifier (or the
    /// source scope when the identifier itself is missing) if a base
    /// property is absent or the key is malformed
    pub fn from_record(record: &DeclarationRecord, scope: &str) -> EngineResult<Self> {
        let missing = record.missing_base_properties();
        if !missing.is_empty() {
            let label = record
                .identifier
                .clone()
                .unwrap_or_else(|| format!("<unnamed record in {}>", scope));
            return Err(EngineError::declaration(format!(
                "record '{}' missing required properties: {}",
                label,
                missing.join(", ")
            )));
        }

        // missing_base_properties covered these three
        let identifier = VariableId::new(record.identifier.as_deref().unwrap_or_default())?;
        let structure = record.structure.clone().unwrap_or_default();
        let title = record.title.clone().unwrap_or_default();

        Ok(Self {
            identifier,
            structure,
            title,
            units: record.units.clone(),
            types: record.types.clone(),
            extra: record.extra.clone(),
        })
    }

    /// Look up a structure-specific property
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
        self.extra.get(name)
    }
}
