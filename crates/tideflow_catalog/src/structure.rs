//! Structure marshallers.
//!
//! A structure converts one variable's raw value into its native shape
//! (`get_data`), projects it back out (`get_value`), and supplies the
//! equality test the data pool interns with. Marshallers are stateless
//! and live for the process.

use crate::metadata::MetaData;
use indexmap::IndexMap;
use std::sync::Arc;
use tideflow_core::{EngineError, EngineResult, Value};

/// Marshaller for one structure kind
pub trait Structure: Send + Sync {
    /// The kind name declarations refer to
    fn kind(&self) -> &'static str;

    /// Declaration properties this kind requires beyond the base set
    fn required_properties(&self) -> &'static [&'static str] {
        &[]
    }

    /// Convert a raw value into its native shape
    ///
    /// # Errors
    ///
    /// Returns a declaration error naming the variable if the raw value
    /// does not fit this structure
    fn get_data(&self, raw: &serde_json::Value, meta: &MetaData) -> EngineResult<Value>;

    /// Project a native value back to its external form
    fn get_value(&self, native: &Value) -> serde_json::Value;

    /// Equality test used when interning values of this kind
    fn equals(&self, a: &Value, b: &Value) -> bool {
        a == b
    }
}

fn shape_error(meta: &MetaData, expected: &str, raw: &serde_json::Value) -> EngineError {
    EngineError::declaration(format!(
        "variable '{}' expects {}, got {}",
        meta.identifier, expected, raw
    ))
}

/// Integer scalar marshaller
pub struct SimpleInteger;

impl Structure for SimpleInteger {
    fn kind(&self) -> &'static str {
        "simple_integer"
    }

    fn get_data(&self, raw: &serde_json::Value, meta: &MetaData) -> EngineResult<Value> {
        raw.as_i64()
            .map(Value::Integer)
            .ok_or_else(|| shape_error(meta, "an integer", raw))
    }

    fn get_value(&self, native: &Value) -> serde_json::Value {
        match native {
            Value::Integer(v) => serde_json::json!(v),
            other => serde_json::json!(other.to_string()),
        }
    }
}

/// Real scalar marshaller; accepts integers and widens them
pub struct SimpleReal;

impl Structure for SimpleReal {
    fn kind(&self) -> &'static str {
        "simple_real"
    }

    fn get_data(&self, raw: &serde_json::Value, meta: &MetaData) -> EngineResult<Value> {
        raw.as_f64()
            .map(Value::Real)
            .ok_or_else(|| shape_error(meta, "a real number", raw))
    }

    fn get_value(&self, native: &Value) -> serde_json::Value {
        match native {
            Value::Real(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            other => serde_json::json!(other.to_string()),
        }
    }
}

/// Boolean scalar marshaller
pub struct SimpleFlag;

impl Structure for SimpleFlag {
    fn kind(&self) -> &'static str {
        "simple_flag"
    }

    fn get_data(&self, raw: &serde_json::Value, meta: &MetaData) -> EngineResult<Value> {
        raw.as_bool()
            .map(Value::Flag)
            .ok_or_else(|| shape_error(meta, "a boolean", raw))
    }

    fn get_value(&self, native: &Value) -> serde_json::Value {
        match native {
            Value::Flag(v) => serde_json::json!(v),
            other => serde_json::json!(other.to_string()),
        }
    }
}

/// Text scalar marshaller
pub struct SimpleText;

impl Structure for SimpleText {
    fn kind(&self) -> &'static str {
        "simple_text"
    }

    fn get_data(&self, raw: &serde_json::Value, meta: &MetaData) -> EngineResult<Value> {
        raw.as_str()
            .map(|s| Value::Text(s.to_string()))
            .ok_or_else(|| shape_error(meta, "a string", raw))
    }

    fn get_value(&self, native: &Value) -> serde_json::Value {
        match native {
            Value::Text(v) => serde_json::json!(v),
            other => serde_json::json!(other.to_string()),
        }
    }
}

/// Integer sequence marshaller
pub struct IntegerSequence;

impl Structure for IntegerSequence {
    fn kind(&self) -> &'static str {
        "integer_sequence"
    }

    fn get_data(&self, raw: &serde_json::Value, meta: &MetaData) -> EngineResult<Value> {
        let items = raw
            .as_array()
            .ok_or_else(|| shape_error(meta, "an array of integers", raw))?;
        let mut seq = Vec::with_capacity(items.len());
        for item in items {
            seq.push(
                item.as_i64()
                    .ok_or_else(|| shape_error(meta, "an array of integers", raw))?,
            );
        }
        Ok(Value::IntegerSeq(seq))
    }

    fn get_value(&self, native: &Value) -> serde_json::Value {
        match native {
            Value::IntegerSeq(v) => serde_json::json!(v),
            other => serde_json::json!(other.to_string()),
        }
    }
}

/// Real sequence marshaller; accepts mixed integer/real arrays
pub struct RealSequence;

impl Structure for RealSequence {
    fn kind(&self) -> &'static str {
        "real_sequence"
    }

    fn get_data(&self, raw: &serde_json::Value, meta: &MetaData) -> EngineResult<Value> {
        let items = raw
            .as_array()
            .ok_or_else(|| shape_error(meta, "an array of reals", raw))?;
        let mut seq = Vec::with_capacity(items.len());
        for item in items {
            seq.push(
                item.as_f64()
                    .ok_or_else(|| shape_error(meta, "an array of reals", raw))?,
            );
        }
        Ok(Value::RealSeq(seq))
    }

    fn get_value(&self, native: &Value) -> serde_json::Value {
        match native {
            Value::RealSeq(v) => serde_json::json!(v),
            other => serde_json::json!(other.to_string()),
        }
    }
}

/// Text sequence marshaller
pub struct TextSequence;

impl Structure for TextSequence {
    fn kind(&self) -> &'static str {
        "text_sequence"
    }

    fn get_data(&self, raw: &serde_json::Value, meta: &MetaData) -> EngineResult<Value> {
        let items = raw
            .as_array()
            .ok_or_else(|| shape_error(meta, "an array of strings", raw))?;
        let mut seq = Vec::with_capacity(items.len());
        for item in items {
            seq.push(
                item.as_str()
                    .ok_or_else(|| shape_error(meta, "an array of strings", raw))?
                    .to_string(),
            );
        }
        Ok(Value::TextSeq(seq))
    }

    fn get_value(&self, native: &Value) -> serde_json::Value {
        match native {
            Value::TextSeq(v) => serde_json::json!(v),
            other => serde_json::json!(other.to_string()),
        }
    }
}

/// Record table marshaller.
///
/// Declarations for this kind must carry a `columns` property; rows may
/// only use declared column names.
pub struct RecordTable;

impl RecordTable {
    fn columns(meta: &MetaData) -> EngineResult<Vec<String>> {
        let raw = meta.property("columns").ok_or_else(|| {
            EngineError::declaration(format!(
                "variable '{}' declares a record_table without 'columns'",
                meta.identifier
            ))
        })?;
        let items = raw.as_array().ok_or_else(|| {
            EngineError::declaration(format!(
                "variable '{}': 'columns' must be an array of names",
                meta.identifier
            ))
        })?;
        items
            .iter()
            .map(|c| {
                c.as_str().map(str::to_string).ok_or_else(|| {
                    EngineError::declaration(format!(
                        "variable '{}': 'columns' must be an array of names",
                        meta.identifier
                    ))
                })
            })
            .collect()
    }

    fn cell_to_native(cell: &serde_json::Value, meta: &MetaData) -> EngineResult<Value> {
        match cell {
            serde_json::Value::Bool(b) => Ok(Value::Flag(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Integer(i))
                } else if let Some(r) = n.as_f64() {
                    Ok(Value::Real(r))
                } else {
                    Err(shape_error(meta, "a scalar cell", cell))
                }
            }
            serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
            other => Err(shape_error(meta, "a scalar cell", other)),
        }
    }

    fn cell_to_raw(cell: &Value) -> serde_json::Value {
        match cell {
            Value::Integer(v) => serde_json::json!(v),
            Value::Real(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Flag(v) => serde_json::json!(v),
            Value::Text(v) => serde_json::json!(v),
            other => serde_json::json!(other.to_string()),
        }
    }
}

impl Structure for RecordTable {
    fn kind(&self) -> &'static str {
        "record_table"
    }

    fn required_properties(&self) -> &'static [&'static str] {
        &["columns"]
    }

    fn get_data(&self, raw: &serde_json::Value, meta: &MetaData) -> EngineResult<Value> {
        let columns = Self::columns(meta)?;
        let rows = raw
            .as_array()
            .ok_or_else(|| shape_error(meta, "an array of row objects", raw))?;

        let mut table = Vec::with_capacity(rows.len());
        for row in rows {
            let object = row
                .as_object()
                .ok_or_else(|| shape_error(meta, "an array of row objects", raw))?;
            let mut native_row = IndexMap::new();
            for column in &columns {
                if let Some(cell) = object.get(column) {
                    native_row.insert(column.clone(), Self::cell_to_native(cell, meta)?);
                }
            }
            for key in object.keys() {
                if !columns.contains(key) {
                    return Err(EngineError::declaration(format!(
                        "variable '{}': row uses undeclared column '{}'",
                        meta.identifier, key
                    )));
                }
            }
            table.push(native_row);
        }
        Ok(Value::Table(table))
    }

    fn get_value(&self, native: &Value) -> serde_json::Value {
        match native {
            Value::Table(rows) => {
                let out: Vec<serde_json::Value> = rows
                    .iter()
                    .map(|row| {
                        let object: serde_json::Map<String, serde_json::Value> = row
                            .iter()
                            .map(|(k, v)| (k.clone(), Self::cell_to_raw(v)))
                            .collect();
                        serde_json::Value::Object(object)
                    })
                    .collect();
                serde_json::Value::Array(out)
            }
            other => serde_json::json!(other.to_string()),
        }
    }
}

/// Registry mapping structure kind names to marshallers
pub struct StructureRegistry {
    kinds: IndexMap<String, Arc<dyn Structure>>,
}

impl StructureRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            kinds: IndexMap::new(),
        }
    }

    /// Create a registry pre-populated with the built-in marshallers
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for structure in [
            Arc::new(SimpleInteger) as Arc<dyn Structure>,
            Arc::new(SimpleReal),
            Arc::new(SimpleFlag),
            Arc::new(SimpleText),
            Arc::new(IntegerSequence),
            Arc::new(RealSequence),
            Arc::new(TextSequence),
            Arc::new(RecordTable),
        ] {
            // Built-in kinds are distinct by construction
            let _ = registry.register(structure);
        }
        registry
    }

    /// Register a marshaller
    ///
    /// # Errors
    ///
    /// Returns a declaration error if the kind name is already taken
    pub fn register(&mut self, structure: Arc<dyn Structure>) -> EngineResult<()> {
        let kind = structure.kind().to_string();
        if self.kinds.contains_key(&kind) {
            return Err(EngineError::declaration(format!(
                "structure kind '{}' registered twice",
                kind
            )));
        }
        self.kinds.insert(kind, structure);
        Ok(())
    }

    /// Get the marshaller for a kind
    ///
    /// # Errors
    ///
    /// Returns not-found if the kind is unknown
    pub fn get(&self, kind: &str) -> EngineResult<Arc<dyn Structure>> {
        self.kinds
            .get(kind)
            .cloned()
            .ok_or_else(|| EngineError::not_found("Structure kind", kind))
    }

    /// Check whether a kind is registered
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    /// List registered kind names in registration order
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        self.kinds.keys().map(String::as_str).collect()
    }
}

impl Default for StructureRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
