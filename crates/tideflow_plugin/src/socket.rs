//! Sockets and the plugin registry.
//!
//! A socket is one capability family: a registration table of interface
//! factories keyed by declared display name, with provider and variable
//! indexes derived from the declarations. The registry holds one socket
//! per family.

use crate::interface::Interface;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use tideflow_core::{EngineError, EngineResult, VariableId};
use tracing::debug;

/// Factory producing a fresh interface object
pub type InterfaceFactory = Arc<dyn Fn() -> Box<dyn Interface> + Send + Sync>;

/// One capability family's registration table
pub struct Socket {
    name: String,
    factories: IndexMap<String, InterfaceFactory>,
}

impl Socket {
    /// Create an empty socket for a capability family
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            factories: IndexMap::new(),
        }
    }

    /// Capability family name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register an interface factory under its declared display name
    ///
    /// Instantiates once to read the declarations and validates the id
    /// map covers every declared variable.
    ///
    /// # Errors
    ///
    /// Returns a declaration error on a duplicate display name or an id
    /// map that misses a declared variable
    pub fn register(&mut self, factory: InterfaceFactory) -> EngineResult<()> {
        let instance = factory();
        let display_name = instance.name().to_string();

        if self.factories.contains_key(&display_name) {
            return Err(EngineError::declaration(format!(
                "interface '{}' registered twice in socket '{}'",
                display_name, self.name
            )));
        }

        let id_map = instance.declare_id_map();
        let mut declared: Vec<VariableId> = Vec::new();
        declared.extend(instance.declare_inputs().iter().map(|r| r.id().clone()));
        declared.extend(instance.declare_outputs());
        declared.extend(instance.declare_optional());
        for id in &declared {
            if id_map.to_local(id).is_none() {
                return Err(EngineError::declaration(format!(
                    "interface '{}' declares '{}' without a local name in its id map",
                    display_name, id
                )));
            }
        }

        debug!(socket = %self.name, interface = %display_name, "registered");
        self.factories.insert(display_name, factory);
        Ok(())
    }

    /// Instantiate an interface by display name
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown name
    pub fn get_interface_object(&self, name: &str) -> EngineResult<Box<dyn Interface>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| EngineError::not_found("Interface", name))
    }

    /// Check whether a display name is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered display names, in registration order
    #[must_use]
    pub fn interface_names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Every interface whose declared outputs (or optional inputs, which
    /// double as outputs) include the variable
    #[must_use]
    pub fn get_providing_interfaces(&self, id: &VariableId) -> Vec<String> {
        self.factories
            .iter()
            .filter(|(_, factory)| {
                let instance = factory();
                instance.declare_outputs().contains(id)
                    || instance.declare_optional().contains(id)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Union of every declared input, output, and optional variable,
    /// sorted for cross-validation against the catalog
    #[must_use]
    pub fn get_all_variables(&self) -> BTreeSet<VariableId> {
        let mut all = BTreeSet::new();
        for factory in self.factories.values() {
            let instance = factory();
            all.extend(instance.declare_inputs().iter().map(|r| r.id().clone()));
            all.extend(instance.declare_outputs());
            all.extend(instance.declare_optional());
        }
        all
    }

    /// Number of registered interfaces
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check whether the socket is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Registry of independent sockets, one per capability family
#[derive(Default)]
pub struct PluginRegistry {
    sockets: IndexMap<String, Socket>,
}

impl PluginRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            sockets: IndexMap::new(),
        }
    }

    /// Create a socket for a new capability family
    ///
    /// # Errors
    ///
    /// Returns a declaration error if the family already exists
    pub fn create_socket(&mut self, name: &str) -> EngineResult<&mut Socket> {
        if self.sockets.contains_key(name) {
            return Err(EngineError::declaration(format!(
                "socket '{}' created twice",
                name
            )));
        }
        Ok(self
            .sockets
            .entry(name.to_string())
            .or_insert_with(|| Socket::new(name)))
    }

    /// Get a socket by family name
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown family
    pub fn socket(&self, name: &str) -> EngineResult<&Socket> {
        self.sockets
            .get(name)
            .ok_or_else(|| EngineError::not_found("Socket", name))
    }

    /// Get a socket mutably by family name
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown family
    pub fn socket_mut(&mut self, name: &str) -> EngineResult<&mut Socket> {
        self.sockets
            .get_mut(name)
            .ok_or_else(|| EngineError::not_found("Socket", name))
    }

    /// Family names in creation order
    #[must_use]
    pub fn socket_names(&self) -> Vec<&str> {
        self.sockets.keys().map(String::as_str).collect()
    }

    /// Union of declared variables across every socket, for catalog
    /// cross-validation
    #[must_use]
    pub fn get_all_variables(&self) -> BTreeSet<VariableId> {
        self.sockets
            .values()
            .flat_map(Socket::get_all_variables)
            .collect()
    }
}
