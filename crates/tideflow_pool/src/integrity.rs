//! The integrity auditor.
//!
//! Recomputes, from scratch, what the pool's link counts should be given
//! every tracked simulation, and checks identity uniqueness. It only
//! reads; it never repairs. A failure names every offending slot and
//! identity so the caller can abort with a complete picture.

use crate::pool::DataPool;
use crate::state::{DataState, Simulation};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tideflow_core::{EngineError, EngineResult, StateId};
use tracing::warn;

/// Audit link counts and identity uniqueness across the tracked set
///
/// # Errors
///
/// Returns an integrity error listing every mismatched slot, every slot
/// referenced but vacant, and every duplicated identity
pub fn check_integrity(pool: &DataPool, simulations: &[&Simulation]) -> EngineResult<()> {
    let mut findings = Vec::new();

    // Simulation identities must be unique within the checked set
    let mut sim_counts = BTreeMap::new();
    for sim in simulations {
        *sim_counts.entry(sim.id()).or_insert(0usize) += 1;
    }
    for (id, count) in &sim_counts {
        if *count > 1 {
            findings.push(format!(
                "duplicate simulation identity {} ({} occurrences)",
                id, count
            ));
        }
    }

    // A state shared by many simulations counts once: the state owns the
    // mirror map, the simulations merely hold it
    let mut seen: BTreeSet<StateId> = BTreeSet::new();
    let mut states: Vec<&Arc<DataState>> = Vec::new();
    for sim in simulations {
        for state in sim.levels() {
            if seen.insert(state.id()) {
                states.push(state);
            }
        }
    }

    // Distinct state objects reusing an identity corrupt the dedup above
    for (i, a) in states.iter().enumerate() {
        for b in &states[i + 1..] {
            if a.id() == b.id() && !Arc::ptr_eq(a, b) && a.mirror() != b.mirror() {
                findings.push(format!(
                    "state identity {} shared by differing commits",
                    a.id()
                ));
            }
        }
    }

    // Expected per-slot counts, re-derived from the mirror maps
    let mut expected: BTreeMap<usize, usize> = BTreeMap::new();
    for state in &states {
        for slot in state.mirror().values() {
            *expected.entry(*slot).or_insert(0) += 1;
        }
    }

    let recorded = pool.mirror_links();
    for (slot, count) in &expected {
        match recorded.get(slot) {
            Some(have) if have == count => {}
            Some(have) => findings.push(format!(
                "slot {}: recorded {}, expected {}",
                slot, have, count
            )),
            None => findings.push(format!(
                "slot {}: referenced by states but vacant in pool",
                slot
            )),
        }
    }
    for (slot, have) in &recorded {
        if !expected.contains_key(slot) && *have != 0 {
            findings.push(format!("slot {}: recorded {}, expected 0", slot, have));
        }
    }

    if findings.is_empty() {
        Ok(())
    } else {
        warn!(count = findings.len(), "integrity audit failed");
        Err(EngineError::Integrity { findings })
    }
}
