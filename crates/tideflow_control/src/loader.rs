//! Resolution over committed history.
//!
//! Everything here is read-side: projecting current values back to raw
//! form, flattening a simulation's levels into one merged view, and
//! deciding whether an interface's declared inputs resolve. The merged
//! view is cached on the simulation; `create_merged_state` is the only
//! function that writes the cache.

use indexmap::IndexMap;
use std::sync::Arc;
use tideflow_catalog::{DataCatalog, StructureRegistry};
use tideflow_core::{EngineError, EngineResult, VariableId};
use tideflow_plugin::{InputRequirement, Interface};
use tideflow_pool::{DataPool, Simulation};
use tracing::debug;

/// Flatten every level's mirror into one map, later levels overriding
/// earlier ones, and cache the result on the simulation
///
/// With `use_existing` the cached view is returned untouched when one
/// is current. Without it the view is recomputed and re-cached; the
/// result is content-equal to any prior cache but a distinct object.
pub fn create_merged_state(
    sim: &mut Simulation,
    use_existing: bool,
) -> Arc<IndexMap<VariableId, usize>> {
    if use_existing {
        if let Some(cached) = sim.merged() {
            return cached;
        }
    }
    let merged = Arc::new(flatten(sim));
    sim.set_merged(Arc::clone(&merged));
    debug!(simulation = %sim.id(), entries = merged.len(), "merged view rebuilt");
    merged
}

/// Current raw-form value of a variable: the most recent level defining
/// it, projected back through its declared structure
///
/// # Errors
///
/// Returns not-found when no level commits the variable, and
/// propagates catalog and pool lookup failures
pub fn get_data_value(
    pool: &DataPool,
    sim: &Simulation,
    catalog: &DataCatalog,
    structures: &StructureRegistry,
    id: &VariableId,
) -> EngineResult<serde_json::Value> {
    let slot = sim
        .most_recent_slot(id)
        .ok_or_else(|| EngineError::not_found("Committed variable", id.as_str()))?;
    let meta = catalog.get(id)?;
    let structure = structures.get(&meta.structure)?;
    Ok(structure.get_value(pool.get(slot)?))
}

/// Check whether any level of the simulation commits the variable
#[must_use]
pub fn has_data(sim: &Simulation, id: &VariableId) -> bool {
    sim.has(id)
}

/// Non-optional declared inputs of an interface that do not resolve in
/// the simulation's merged view
///
/// A masked requirement whose controlling variable is itself unresolved
/// counts as inactive here; the controller treats that case as a hard
/// dependency failure before execution instead.
///
/// # Errors
///
/// Propagates pool lookup failures while reading controlling values
pub fn missing_required(
    pool: &DataPool,
    sim: &Simulation,
    interface: &dyn Interface,
) -> EngineResult<Vec<VariableId>> {
    let merged = merged_view(sim);
    let mut missing = Vec::new();
    for requirement in interface.declare_inputs() {
        match requirement {
            InputRequirement::Required(id) => {
                if !merged.contains_key(&id) {
                    missing.push(id);
                }
            }
            InputRequirement::Optional(_) => {}
            InputRequirement::Conditional {
                id,
                controls,
                activates_on,
            } => {
                let Some(controller_slot) = merged.get(&controls).copied() else {
                    continue;
                };
                let current = pool.get(controller_slot)?;
                if activates_on.contains(current) && !merged.contains_key(&id) {
                    missing.push(id);
                }
            }
        }
    }
    Ok(missing)
}

/// Check whether every non-optional declared input of the interface
/// resolves, masked requirements included
///
/// # Errors
///
/// Propagates pool lookup failures while reading controlling values
pub fn can_load(
    pool: &DataPool,
    sim: &Simulation,
    interface: &dyn Interface,
) -> EngineResult<bool> {
    Ok(missing_required(pool, sim, interface)?.is_empty())
}

/// Merged view without touching the cache: the cached object when one
/// is current, a freshly flattened map otherwise
pub(crate) fn merged_view(sim: &Simulation) -> Arc<IndexMap<VariableId, usize>> {
    sim.merged().unwrap_or_else(|| Arc::new(flatten(sim)))
}

fn flatten(sim: &Simulation) -> IndexMap<VariableId, usize> {
    let mut merged = IndexMap::new();
    for level in sim.levels() {
        for (id, slot) in level.mirror() {
            merged.insert(id.clone(), *slot);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap as Map;
    use tideflow_core::Value;
    use tideflow_plugin::IdMap;
    use tideflow_pool::DataState;

    fn var(key: &str) -> VariableId {
        VariableId::new(key).unwrap()
    }

    fn state(title: &str, entries: &[(&str, usize)]) -> Arc<DataState> {
        let mirror = entries.iter().map(|(k, s)| (var(k), *s)).collect();
        Arc::new(DataState::new(title, mirror))
    }

    struct Consumer {
        inputs: Vec<InputRequirement>,
    }

    impl Interface for Consumer {
        fn name(&self) -> &str {
            "Consumer"
        }
        fn declare_inputs(&self) -> Vec<InputRequirement> {
            self.inputs.clone()
        }
        fn declare_outputs(&self) -> Vec<VariableId> {
            Vec::new()
        }
        fn declare_id_map(&self) -> IdMap {
            IdMap::new([]).unwrap()
        }
        fn connect(
            &mut self,
            _ctx: &mut tideflow_plugin::InterfaceContext,
        ) -> EngineResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_merged_later_levels_override() {
        let mut sim = Simulation::new("run");
        sim.add_state(state("first", &[("demo:demo:rows", 0), ("site:wave:hs", 1)]));
        sim.add_state(state("second", &[("demo:demo:rows", 4)]));

        let merged = create_merged_state(&mut sim, true);
        assert_eq!(merged.get(&var("demo:demo:rows")), Some(&4));
        assert_eq!(merged.get(&var("site:wave:hs")), Some(&1));
    }

    #[test]
    fn test_merge_cache_identity() {
        let mut sim = Simulation::new("run");
        sim.add_state(state("first", &[("demo:demo:rows", 0)]));

        let first = create_merged_state(&mut sim, true);
        let second = create_merged_state(&mut sim, true);
        assert!(Arc::ptr_eq(&first, &second));

        let forced = create_merged_state(&mut sim, false);
        assert!(!Arc::ptr_eq(&first, &forced));
        assert_eq!(*first, *forced);
    }

    #[test]
    fn test_merge_cache_dropped_on_commit() {
        let mut sim = Simulation::new("run");
        sim.add_state(state("first", &[("demo:demo:rows", 0)]));
        let first = create_merged_state(&mut sim, true);

        sim.add_state(state("second", &[("site:wave:hs", 1)]));
        let second = create_merged_state(&mut sim, true);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn test_can_load_required_inputs() {
        let structures = StructureRegistry::with_defaults();
        let integer = structures.get("simple_integer").unwrap();
        let mut pool = DataPool::new();
        let x = pool.intern(Value::Integer(1), integer.as_ref());
        let y = pool.intern(Value::Integer(2), integer.as_ref());

        let mut mirror: Map<VariableId, usize> = Map::new();
        mirror.insert(var("demo:demo:x"), x);
        mirror.insert(var("demo:demo:y"), y);
        let mut sim = Simulation::new("run");
        sim.add_state(Arc::new(DataState::new("input", mirror)));

        let consumer = Consumer {
            inputs: vec![
                InputRequirement::Required(var("demo:demo:x")),
                InputRequirement::Required(var("demo:demo:y")),
            ],
        };
        assert!(can_load(&pool, &sim, &consumer).unwrap());

        let mut partial = Simulation::new("partial");
        let mut only_x: Map<VariableId, usize> = Map::new();
        only_x.insert(var("demo:demo:x"), x);
        partial.add_state(Arc::new(DataState::new("input", only_x)));
        assert!(!can_load(&pool, &partial, &consumer).unwrap());
    }

    #[test]
    fn test_can_load_optional_never_blocks() {
        let pool = DataPool::new();
        let sim = Simulation::new("run");
        let consumer = Consumer {
            inputs: vec![InputRequirement::Optional(var("demo:demo:x"))],
        };
        assert!(can_load(&pool, &sim, &consumer).unwrap());
    }

    #[test]
    fn test_masked_requirement_follows_controller() {
        let structures = StructureRegistry::with_defaults();
        let text = structures.get("simple_text").unwrap();
        let mut pool = DataPool::new();
        let tidal = pool.intern(Value::Text("tidal".to_string()), text.as_ref());
        let wave = pool.intern(Value::Text("wave".to_string()), text.as_ref());

        let masked = Consumer {
            inputs: vec![InputRequirement::Conditional {
                id: var("device:tidal:cut_in"),
                controls: var("device:any:kind"),
                activates_on: vec![Value::Text("tidal".to_string())],
            }],
        };

        // Controller says "tidal": the requirement is active and unmet
        let mut sim = Simulation::new("run");
        let mut mirror: Map<VariableId, usize> = Map::new();
        mirror.insert(var("device:any:kind"), tidal);
        sim.add_state(Arc::new(DataState::new("input", mirror)));
        assert!(!can_load(&pool, &sim, &masked).unwrap());
        assert_eq!(
            missing_required(&pool, &sim, &masked).unwrap(),
            vec![var("device:tidal:cut_in")]
        );

        // Controller says "wave": the requirement is dormant
        let mut other = Simulation::new("other");
        let mut mirror: Map<VariableId, usize> = Map::new();
        mirror.insert(var("device:any:kind"), wave);
        other.add_state(Arc::new(DataState::new("input", mirror)));
        assert!(can_load(&pool, &other, &masked).unwrap());
    }

    #[test]
    fn test_masked_requirement_dormant_without_controller() {
        let pool = DataPool::new();
        let sim = Simulation::new("run");
        let masked = Consumer {
            inputs: vec![InputRequirement::Conditional {
                id: var("device:tidal:cut_in"),
                controls: var("device:any:kind"),
                activates_on: vec![Value::Text("tidal".to_string())],
            }],
        };
        assert!(can_load(&pool, &sim, &masked).unwrap());
    }

    #[test]
    fn test_get_data_value_never_committed() {
        let structures = StructureRegistry::with_defaults();
        let catalog = DataCatalog::build(&[], &structures).unwrap();
        let pool = DataPool::new();
        let sim = Simulation::new("run");

        let err = get_data_value(&pool, &sim, &catalog, &structures, &var("demo:demo:rows"))
            .unwrap_err();
        assert!(err.to_string().contains("demo:demo:rows"));
    }

    #[test]
    fn test_has_data() {
        let mut sim = Simulation::new("run");
        assert!(!has_data(&sim, &var("demo:demo:rows")));
        sim.add_state(state("input", &[("demo:demo:rows", 0)]));
        assert!(has_data(&sim, &var("demo:demo:rows")));
    }
}
