//! The interface contract.
//!
//! An interface declares what it reads and writes in catalog keys, maps
//! them to local short names through a bijective id map, and implements
//! `connect` against a pre-bound local view. Setting local output names
//! inside `connect` is the side effect the controller commits.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tideflow_core::{EngineError, EngineResult, Value, VariableId};

/// One declared input requirement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputRequirement {
    /// Must resolve before the interface can load
    Required(VariableId),
    /// Used when present, never blocks
    Optional(VariableId),
    /// Masked: required only while the controlling variable's current
    /// value is one of `activates_on`
    Conditional {
        /// The conditionally required variable
        id: VariableId,
        /// The controlling variable
        controls: VariableId,
        /// Values of the controller that activate the requirement
        activates_on: Vec<Value>,
    },
}

impl InputRequirement {
    /// The variable this requirement is about
    #[must_use]
    pub fn id(&self) -> &VariableId {
        match self {
            Self::Required(id) | Self::Optional(id) => id,
            Self::Conditional { id, .. } => id,
        }
    }
}

/// Bijection between local short names and catalog keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMap {
    forward: IndexMap<String, VariableId>,
    reverse: IndexMap<VariableId, String>,
}

impl IdMap {
    /// Build an id map from (local, catalog) pairs
    ///
    /// # Errors
    ///
    /// Returns a declaration error if either side repeats
    pub fn new<I>(pairs: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (String, VariableId)>,
    {
        let mut forward = IndexMap::new();
        let mut reverse = IndexMap::new();
        for (local, id) in pairs {
            if forward.contains_key(&local) {
                return Err(EngineError::declaration(format!(
                    "id map repeats local name '{}'",
                    local
                )));
            }
            if reverse.contains_key(&id) {
                return Err(EngineError::declaration(format!(
                    "id map repeats catalog key '{}'",
                    id
                )));
            }
            forward.insert(local.clone(), id.clone());
            reverse.insert(id, local);
        }
        Ok(Self { forward, reverse })
    }

    /// Catalog key for a local name
    #[must_use]
    pub fn to_catalog(&self, local: &str) -> Option<&VariableId> {
        self.forward.get(local)
    }

    /// Local name for a catalog key
    #[must_use]
    pub fn to_local(&self, id: &VariableId) -> Option<&str> {
        self.reverse.get(id).map(String::as_str)
    }

    /// Local names in declaration order
    #[must_use]
    pub fn locals(&self) -> Vec<&str> {
        self.forward.keys().map(String::as_str).collect()
    }

    /// Number of mapped pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Check whether the map is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// Pre-bound local view one `connect` call runs against
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterfaceContext {
    inputs: IndexMap<String, Value>,
    outputs: IndexMap<String, Value>,
}

impl InterfaceContext {
    /// Create an empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind one local input
    pub fn bind(&mut self, local: impl Into<String>, value: Value) {
        self.inputs.insert(local.into(), value);
    }

    /// Read a bound input, if present
    #[must_use]
    pub fn get(&self, local: &str) -> Option<&Value> {
        self.inputs.get(local)
    }

    /// Read a bound input that must be present
    ///
    /// # Errors
    ///
    /// Returns not-found naming the local name
    pub fn require(&self, local: &str) -> EngineResult<&Value> {
        self.inputs
            .get(local)
            .ok_or_else(|| EngineError::not_found("Bound input", local))
    }

    /// Set one local output; what `connect` sets here is what gets
    /// committed
    pub fn set(&mut self, local: impl Into<String>, value: Value) {
        self.outputs.insert(local.into(), value);
    }

    /// Outputs set so far, in set order
    #[must_use]
    pub fn outputs(&self) -> &IndexMap<String, Value> {
        &self.outputs
    }
}

/// A unit of computation declaring named inputs and outputs
pub trait Interface: Send {
    /// Display name used for scheduling and discovery
    fn name(&self) -> &str;

    /// Declared input requirements
    fn declare_inputs(&self) -> Vec<InputRequirement>;

    /// Declared outputs
    fn declare_outputs(&self) -> Vec<VariableId>;

    /// Optional inputs that double as outputs
    fn declare_optional(&self) -> Vec<VariableId> {
        Vec::new()
    }

    /// The local-name bijection used inside `connect`
    fn declare_id_map(&self) -> IdMap;

    /// Run once per execution against the pre-bound local view
    ///
    /// # Errors
    ///
    /// Returns any engine error; nothing is committed on failure
    fn connect(&mut self, ctx: &mut InterfaceContext) -> EngineResult<()>;
}

impl std::fmt::Debug for dyn Interface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interface").field("name", &self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(key: &str) -> VariableId {
        VariableId::new(key).unwrap()
    }

    #[test]
    fn test_id_map_bijection() {
        let map = IdMap::new([
            ("rows".to_string(), var("demo:demo:rows")),
            ("hs".to_string(), var("site:wave:hs")),
        ])
        .unwrap();

        assert_eq!(map.to_catalog("rows"), Some(&var("demo:demo:rows")));
        assert_eq!(map.to_local(&var("site:wave:hs")), Some("hs"));
        assert_eq!(map.locals(), vec!["rows", "hs"]);
    }

    #[test]
    fn test_id_map_rejects_duplicate_local() {
        let err = IdMap::new([
            ("rows".to_string(), var("demo:demo:rows")),
            ("rows".to_string(), var("site:wave:hs")),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("rows"));
    }

    #[test]
    fn test_id_map_rejects_duplicate_catalog_key() {
        let err = IdMap::new([
            ("rows".to_string(), var("demo:demo:rows")),
            ("rows2".to_string(), var("demo:demo:rows")),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("demo:demo:rows"));
    }

    #[test]
    fn test_requirement_id() {
        let required = InputRequirement::Required(var("site:wave:hs"));
        let masked = InputRequirement::Conditional {
            id: var("device:tidal:cut_in"),
            controls: var("device:any:kind"),
            activates_on: vec![Value::Text("tidal".to_string())],
        };
        assert_eq!(required.id(), &var("site:wave:hs"));
        assert_eq!(masked.id(), &var("device:tidal:cut_in"));
    }

    #[test]
    fn test_context_bind_and_require() {
        let mut ctx = InterfaceContext::new();
        ctx.bind("rows", Value::Integer(5));

        assert_eq!(ctx.require("rows").unwrap(), &Value::Integer(5));
        assert!(ctx.require("missing").is_err());
    }

    #[test]
    fn test_context_outputs_in_set_order() {
        let mut ctx = InterfaceContext::new();
        ctx.set("b", Value::Integer(2));
        ctx.set("a", Value::Integer(1));

        let keys: Vec<&str> = ctx.outputs().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }
}
