//! Immutable data states and mutable simulation histories.
//!
//! A data state is one named commit: a mirror map from variable key to
//! pool slot index. It owns nothing but that map. A simulation is the
//! ordered list of states for one run, with a cached merged view.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tideflow_core::{SimulationId, StateId, VariableId};

/// One immutable named commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataState {
    id: StateId,
    title: String,
    mirror: IndexMap<VariableId, usize>,
}

impl DataState {
    /// Create a state from a finished mirror map
    #[must_use]
    pub fn new(title: impl Into<String>, mirror: IndexMap<VariableId, usize>) -> Self {
        Self {
            id: StateId::new(),
            title: title.into(),
            mirror,
        }
    }

    /// Identity of this commit
    #[must_use]
    pub fn id(&self) -> StateId {
        self.id
    }

    /// Commit title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The full mirror map, in commit order
    #[must_use]
    pub fn mirror(&self) -> &IndexMap<VariableId, usize> {
        &self.mirror
    }

    /// Slot index for a variable, if this commit defines it
    #[must_use]
    pub fn get(&self, id: &VariableId) -> Option<usize> {
        self.mirror.get(id).copied()
    }

    /// Check whether this commit defines a variable
    #[must_use]
    pub fn contains(&self, id: &VariableId) -> bool {
        self.mirror.contains_key(id)
    }

    /// Number of variables this commit defines
    #[must_use]
    pub fn len(&self) -> usize {
        self.mirror.len()
    }

    /// Check whether the commit is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mirror.is_empty()
    }
}

/// Ordered commit history for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    id: SimulationId,
    title: String,
    levels: Vec<Arc<DataState>>,
    /// Cached merged view; rebuilt on demand, never serialized
    #[serde(skip)]
    merged: Option<Arc<IndexMap<VariableId, usize>>>,
}

impl Simulation {
    /// Create an empty simulation
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: SimulationId::new(),
            title: title.into(),
            levels: Vec::new(),
            merged: None,
        }
    }

    /// Identity of this simulation
    #[must_use]
    pub fn id(&self) -> SimulationId {
        self.id
    }

    /// Simulation title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The commit levels, earliest first
    #[must_use]
    pub fn levels(&self) -> &[Arc<DataState>] {
        &self.levels
    }

    /// Append a commit and drop the stale merged view
    pub fn add_state(&mut self, state: Arc<DataState>) {
        self.levels.push(state);
        self.merged = None;
    }

    /// Check whether any level defines a variable
    #[must_use]
    pub fn has(&self, id: &VariableId) -> bool {
        self.levels.iter().any(|level| level.contains(id))
    }

    /// Slot index for a variable from the most recent level defining it
    #[must_use]
    pub fn most_recent_slot(&self, id: &VariableId) -> Option<usize> {
        self.levels.iter().rev().find_map(|level| level.get(id))
    }

    /// The cached merged view, if one is current
    #[must_use]
    pub fn merged(&self) -> Option<Arc<IndexMap<VariableId, usize>>> {
        self.merged.clone()
    }

    /// Install a freshly computed merged view
    pub fn set_merged(&mut self, merged: Arc<IndexMap<VariableId, usize>>) {
        self.merged = Some(merged);
    }

    /// Drop the cached merged view
    pub fn invalidate_merged(&mut self) {
        self.merged = None;
    }
}
