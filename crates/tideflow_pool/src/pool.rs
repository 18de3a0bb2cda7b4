//! The interned value arena.
//!
//! Values are stored once per distinct content (distinctness judged by
//! the owning structure's `equals`) and addressed by slot index. Indices
//! never move: reclaimed slots are tombstoned, so every index held by a
//! live data state stays valid, including across a serde deep copy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tideflow_catalog::Structure;
use tideflow_core::{EngineError, EngineResult, Value};
use tracing::debug;

/// Pool policy knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Tombstone a slot as soon as its link count reaches zero,
    /// instead of waiting for an explicit `reclaim`
    pub reclaim_on_unlink: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            reclaim_on_unlink: false,
        }
    }
}

/// Reference-counted arena of interned native values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPool {
    /// Slot values; `None` marks a reclaimed slot
    slots: Vec<Option<Value>>,
    /// Recorded link count per slot, parallel to `slots`
    links: Vec<usize>,
    /// Policy
    config: PoolConfig,
}

impl DataPool {
    /// Create an empty pool with default policy
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Create an empty pool with explicit policy
    #[must_use]
    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            slots: Vec::new(),
            links: Vec::new(),
            config,
        }
    }

    /// Store a value, reusing an existing slot when the structure's
    /// equality finds one. Returns the slot index; the caller still has
    /// to `link` it for every data state entry that references it.
    pub fn intern(&mut self, value: Value, structure: &dyn Structure) -> usize {
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(existing) = slot {
                if structure.equals(existing, &value) {
                    debug!(slot = index, "interned value matched existing slot");
                    return index;
                }
            }
        }

        let index = self.slots.len();
        self.slots.push(Some(value));
        self.links.push(0);
        debug!(slot = index, "allocated new slot");
        index
    }

    /// Record one more data-state reference to a slot
    ///
    /// # Errors
    ///
    /// Returns not-found if the slot is out of range or reclaimed
    pub fn link(&mut self, slot: usize) -> EngineResult<()> {
        self.occupied(slot)?;
        self.links[slot] += 1;
        Ok(())
    }

    /// Drop one data-state reference to a slot
    ///
    /// # Errors
    ///
    /// Returns an integrity error if the slot has no recorded references
    /// left, or not-found if it is vacant — either means the caller's
    /// bookkeeping has already diverged
    pub fn unlink(&mut self, slot: usize) -> EngineResult<()> {
        self.occupied(slot)?;
        if self.links[slot] == 0 {
            return Err(EngineError::Integrity {
                findings: vec![format!("slot {}: unlink below zero", slot)],
            });
        }
        self.links[slot] -= 1;
        if self.links[slot] == 0 && self.config.reclaim_on_unlink {
            self.slots[slot] = None;
            debug!(slot, "reclaimed on unlink");
        }
        Ok(())
    }

    /// Get the value stored in a slot
    ///
    /// # Errors
    ///
    /// Returns not-found if the slot is out of range or reclaimed
    pub fn get(&self, slot: usize) -> EngineResult<&Value> {
        self.slots
            .get(slot)
            .and_then(Option::as_ref)
            .ok_or_else(|| EngineError::not_found("Pool slot", slot.to_string()))
    }

    /// Snapshot of recorded per-slot link counts, occupied slots only
    #[must_use]
    pub fn mirror_links(&self) -> BTreeMap<usize, usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| (index, self.links[index]))
            .collect()
    }

    /// Tombstone every zero-link slot, returning the reclaimed indices.
    /// Indices of surviving slots are unaffected.
    pub fn reclaim(&mut self) -> Vec<usize> {
        let mut reclaimed = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_some() && self.links[index] == 0 {
                *slot = None;
                reclaimed.push(index);
            }
        }
        if !reclaimed.is_empty() {
            debug!(count = reclaimed.len(), "reclaimed zero-link slots");
        }
        reclaimed
    }

    /// Number of occupied slots
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Check whether the pool holds no values
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total slots ever allocated, including tombstones
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn occupied(&self, slot: usize) -> EngineResult<()> {
        match self.slots.get(slot) {
            Some(Some(_)) => Ok(()),
            _ => Err(EngineError::not_found("Pool slot", slot.to_string())),
        }
    }
}

impl Default for DataPool {
    fn default() -> Self {
        Self::new()
    }
}
