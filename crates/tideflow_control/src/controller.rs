//! Committing data states.
//!
//! Two ways data enters a simulation: `add_datastate` marshals raw
//! declaration values through their structures, and `execute_interface`
//! runs one interface's `connect` and commits what it set. Both are
//! all-or-nothing: every failure is raised before the first pool write,
//! or (for `connect` itself) before anything is interned.

use indexmap::IndexMap;
use std::sync::Arc;
use tideflow_catalog::{DataCatalog, Structure, StructureRegistry};
use tideflow_core::{EngineError, EngineResult, StateId, Value, VariableId};
use tideflow_plugin::{IdMap, InputRequirement, Interface, InterfaceContext};
use tideflow_pool::{DataPool, DataState, Simulation};
use tracing::info;

use crate::loader;

/// Marshal raw values through their declared structures and commit one
/// immutable data state to the simulation
///
/// Validation and marshalling run to completion before the first pool
/// write, so a failing batch leaves pool and simulation untouched.
///
/// # Errors
///
/// Returns a declaration error when the slices differ in length, a
/// variable repeats within the batch, a variable is undeclared, or a
/// raw value does not match its structure's shape
pub fn add_datastate(
    pool: &mut DataPool,
    sim: &mut Simulation,
    title: &str,
    catalog: &DataCatalog,
    structures: &StructureRegistry,
    var_ids: &[VariableId],
    values: &[serde_json::Value],
) -> EngineResult<StateId> {
    if var_ids.len() != values.len() {
        return Err(EngineError::declaration(format!(
            "batch '{}' pairs {} identifiers with {} values",
            title,
            var_ids.len(),
            values.len()
        )));
    }

    let mut marshalled: Vec<(VariableId, Value, Arc<dyn Structure>)> = Vec::new();
    for (id, raw) in var_ids.iter().zip(values) {
        if marshalled.iter().any(|(seen, _, _)| seen == id) {
            return Err(EngineError::declaration(format!(
                "batch '{}' names '{}' twice",
                title, id
            )));
        }
        let meta = catalog.get(id)?;
        let structure = structures.get(&meta.structure)?;
        let native = structure.get_data(raw, meta)?;
        marshalled.push((id.clone(), native, structure));
    }

    let mut mirror: IndexMap<VariableId, usize> = IndexMap::new();
    for (id, native, structure) in marshalled {
        let slot = pool.intern(native, structure.as_ref());
        pool.link(slot)?;
        mirror.insert(id, slot);
    }

    let state = Arc::new(DataState::new(title, mirror));
    let state_id = state.id();
    info!(simulation = %sim.id(), state = %state_id, title, "data state committed");
    sim.add_state(state);
    Ok(state_id)
}

/// Run one interface against the simulation's current merged view and
/// commit its outputs as a new data state titled by the interface
///
/// The dependency gate runs first: an unresolved controlling variable
/// of a masked requirement, or any missing non-optional input, fails
/// before `connect` is called. A failing `connect` commits nothing.
///
/// # Errors
///
/// Returns a dependency error naming the missing identifiers, a
/// declaration error for an output with no catalog key in the id map,
/// and propagates catalog and pool failures
pub fn execute_interface(
    pool: &mut DataPool,
    sim: &mut Simulation,
    catalog: &DataCatalog,
    structures: &StructureRegistry,
    interface: &mut dyn Interface,
) -> EngineResult<StateId> {
    let name = interface.name().to_string();
    let merged = loader::create_merged_state(sim, true);

    for requirement in interface.declare_inputs() {
        if let InputRequirement::Conditional { controls, .. } = requirement {
            if !merged.contains_key(&controls) {
                return Err(EngineError::Dependency {
                    interface: name,
                    missing: vec![format!("controlling variable '{}'", controls)],
                });
            }
        }
    }

    let missing = loader::missing_required(pool, sim, interface)?;
    if !missing.is_empty() {
        return Err(EngineError::Dependency {
            interface: name,
            missing: missing.iter().map(ToString::to_string).collect(),
        });
    }

    let id_map = interface.declare_id_map();
    let mut ctx = InterfaceContext::new();
    for requirement in interface.declare_inputs() {
        bind_if_resolved(pool, &merged, &id_map, &name, requirement.id(), &mut ctx)?;
    }
    for id in interface.declare_optional() {
        bind_if_resolved(pool, &merged, &id_map, &name, &id, &mut ctx)?;
    }

    interface.connect(&mut ctx)?;

    let mut mirror: IndexMap<VariableId, usize> = IndexMap::new();
    let mut pending: Vec<(VariableId, Value, Arc<dyn Structure>)> = Vec::new();
    for (local, value) in ctx.outputs() {
        let id = id_map.to_catalog(local).ok_or_else(|| {
            EngineError::declaration(format!(
                "interface '{}' set output '{}' with no catalog key in its id map",
                name, local
            ))
        })?;
        let meta = catalog.get(id)?;
        let structure = structures.get(&meta.structure)?;
        pending.push((id.clone(), value.clone(), structure));
    }
    for (id, value, structure) in pending {
        let slot = pool.intern(value, structure.as_ref());
        pool.link(slot)?;
        mirror.insert(id, slot);
    }

    let state = Arc::new(DataState::new(&name, mirror));
    let state_id = state.id();
    info!(simulation = %sim.id(), interface = %name, state = %state_id, "interface outputs committed");
    sim.add_state(state);
    Ok(state_id)
}

/// Release every pool link held by the simulation's levels
///
/// The caller owns the sharing question: a data state shared with
/// another simulation must not be released twice.
///
/// # Errors
///
/// Propagates an integrity error if a slot's link count would drop
/// below zero
pub fn release_simulation(pool: &mut DataPool, sim: &Simulation) -> EngineResult<()> {
    for level in sim.levels() {
        for slot in level.mirror().values() {
            pool.unlink(*slot)?;
        }
    }
    info!(simulation = %sim.id(), levels = sim.levels().len(), "simulation released");
    Ok(())
}

fn bind_if_resolved(
    pool: &DataPool,
    merged: &IndexMap<VariableId, usize>,
    id_map: &IdMap,
    interface_name: &str,
    id: &VariableId,
    ctx: &mut InterfaceContext,
) -> EngineResult<()> {
    let Some(slot) = merged.get(id).copied() else {
        return Ok(());
    };
    let local = id_map.to_local(id).ok_or_else(|| {
        EngineError::declaration(format!(
            "interface '{}' reads '{}' with no local name in its id map",
            interface_name, id
        ))
    })?;
    ctx.bind(local, pool.get(slot)?.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tideflow_catalog::{DeclarationRecord, DeclarationSource};
    use tideflow_pool::check_integrity;

    fn var(key: &str) -> VariableId {
        VariableId::new(key).unwrap()
    }

    fn record(identifier: &str, structure: &str) -> DeclarationRecord {
        DeclarationRecord {
            identifier: Some(identifier.to_string()),
            structure: Some(structure.to_string()),
            title: Some(identifier.to_string()),
            units: None,
            types: None,
            extra: IndexMap::new(),
        }
    }

    fn demo_catalog(structures: &StructureRegistry) -> DataCatalog {
        let mut source = DeclarationSource::new("demo", "demo");
        source.push(record("demo:demo:rows", "simple_integer"));
        source.push(record("demo:demo:doubled", "simple_integer"));
        source.push(record("device:any:kind", "simple_text"));
        source.push(record("device:tidal:cut_in", "simple_real"));
        DataCatalog::build(std::slice::from_ref(&source), structures).unwrap()
    }

    struct RowsDoubler;

    impl Interface for RowsDoubler {
        fn name(&self) -> &str {
            "Rows Doubler"
        }
        fn declare_inputs(&self) -> Vec<InputRequirement> {
            vec![InputRequirement::Required(var("demo:demo:rows"))]
        }
        fn declare_outputs(&self) -> Vec<VariableId> {
            vec![var("demo:demo:doubled")]
        }
        fn declare_id_map(&self) -> IdMap {
            IdMap::new([
                ("rows".to_string(), var("demo:demo:rows")),
                ("doubled".to_string(), var("demo:demo:doubled")),
            ])
            .unwrap()
        }
        fn connect(&mut self, ctx: &mut InterfaceContext) -> EngineResult<()> {
            let rows = match ctx.require("rows")? {
                Value::Integer(v) => *v,
                other => {
                    return Err(EngineError::declaration(format!(
                        "rows must be an integer, got {}",
                        other.kind_name()
                    )))
                }
            };
            ctx.set("doubled", Value::Integer(rows * 2));
            Ok(())
        }
    }

    struct TidalReader;

    impl Interface for TidalReader {
        fn name(&self) -> &str {
            "Tidal Reader"
        }
        fn declare_inputs(&self) -> Vec<InputRequirement> {
            vec![InputRequirement::Conditional {
                id: var("device:tidal:cut_in"),
                controls: var("device:any:kind"),
                activates_on: vec![Value::Text("tidal".to_string())],
            }]
        }
        fn declare_outputs(&self) -> Vec<VariableId> {
            Vec::new()
        }
        fn declare_id_map(&self) -> IdMap {
            IdMap::new([
                ("cut_in".to_string(), var("device:tidal:cut_in")),
                ("kind".to_string(), var("device:any:kind")),
            ])
            .unwrap()
        }
        fn connect(&mut self, _ctx: &mut InterfaceContext) -> EngineResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_add_then_read_back() {
        let structures = StructureRegistry::with_defaults();
        let catalog = demo_catalog(&structures);
        let mut pool = DataPool::new();
        let mut sim = Simulation::new("run");

        add_datastate(
            &mut pool,
            &mut sim,
            "input1",
            &catalog,
            &structures,
            &[var("demo:demo:rows")],
            &[serde_json::json!(5)],
        )
        .unwrap();

        let value = loader::get_data_value(
            &pool,
            &sim,
            &catalog,
            &structures,
            &var("demo:demo:rows"),
        )
        .unwrap();
        assert_eq!(value, serde_json::json!(5));
    }

    #[test]
    fn test_add_is_all_or_nothing() {
        let structures = StructureRegistry::with_defaults();
        let catalog = demo_catalog(&structures);
        let mut pool = DataPool::new();
        let mut sim = Simulation::new("run");

        // Length mismatch
        let err = add_datastate(
            &mut pool,
            &mut sim,
            "bad",
            &catalog,
            &structures,
            &[var("demo:demo:rows")],
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("bad"));

        // Undeclared identifier, listed after a valid one
        let err = add_datastate(
            &mut pool,
            &mut sim,
            "bad",
            &catalog,
            &structures,
            &[var("demo:demo:rows"), var("site:wave:hs")],
            &[serde_json::json!(5), serde_json::json!(1.5)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("site:wave:hs"));

        // Shape mismatch on the second value
        assert!(add_datastate(
            &mut pool,
            &mut sim,
            "bad",
            &catalog,
            &structures,
            &[var("demo:demo:rows"), var("demo:demo:doubled")],
            &[serde_json::json!(5), serde_json::json!("ten")],
        )
        .is_err());

        assert!(pool.is_empty());
        assert!(sim.levels().is_empty());
    }

    #[test]
    fn test_add_rejects_repeated_identifier() {
        let structures = StructureRegistry::with_defaults();
        let catalog = demo_catalog(&structures);
        let mut pool = DataPool::new();
        let mut sim = Simulation::new("run");

        let err = add_datastate(
            &mut pool,
            &mut sim,
            "dup",
            &catalog,
            &structures,
            &[var("demo:demo:rows"), var("demo:demo:rows")],
            &[serde_json::json!(5), serde_json::json!(6)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("demo:demo:rows"));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_execute_commits_outputs() {
        let structures = StructureRegistry::with_defaults();
        let catalog = demo_catalog(&structures);
        let mut pool = DataPool::new();
        let mut sim = Simulation::new("run");

        add_datastate(
            &mut pool,
            &mut sim,
            "input1",
            &catalog,
            &structures,
            &[var("demo:demo:rows")],
            &[serde_json::json!(5)],
        )
        .unwrap();

        let mut doubler = RowsDoubler;
        execute_interface(&mut pool, &mut sim, &catalog, &structures, &mut doubler).unwrap();

        assert_eq!(sim.levels().len(), 2);
        assert_eq!(sim.levels()[1].title(), "Rows Doubler");
        let value = loader::get_data_value(
            &pool,
            &sim,
            &catalog,
            &structures,
            &var("demo:demo:doubled"),
        )
        .unwrap();
        assert_eq!(value, serde_json::json!(10));
        check_integrity(&pool, &[&sim]).unwrap();
    }

    #[test]
    fn test_execute_without_inputs_fails() {
        let structures = StructureRegistry::with_defaults();
        let catalog = demo_catalog(&structures);
        let mut pool = DataPool::new();
        let mut sim = Simulation::new("run");

        let mut doubler = RowsDoubler;
        let err = execute_interface(&mut pool, &mut sim, &catalog, &structures, &mut doubler)
            .unwrap_err();
        match err {
            EngineError::Dependency { interface, missing } => {
                assert_eq!(interface, "Rows Doubler");
                assert_eq!(missing, vec!["demo:demo:rows".to_string()]);
            }
            other => panic!("expected dependency error, got {other}"),
        }
        assert!(sim.levels().is_empty());
    }

    #[test]
    fn test_execute_unresolved_controller_fails() {
        let structures = StructureRegistry::with_defaults();
        let catalog = demo_catalog(&structures);
        let mut pool = DataPool::new();
        let mut sim = Simulation::new("run");

        let mut reader = TidalReader;
        let err = execute_interface(&mut pool, &mut sim, &catalog, &structures, &mut reader)
            .unwrap_err();
        assert!(err.to_string().contains("device:any:kind"));
    }

    #[test]
    fn test_equal_values_share_a_slot() {
        let structures = StructureRegistry::with_defaults();
        let catalog = demo_catalog(&structures);
        let mut pool = DataPool::new();
        let mut sim = Simulation::new("run");

        add_datastate(
            &mut pool,
            &mut sim,
            "input1",
            &catalog,
            &structures,
            &[var("demo:demo:rows")],
            &[serde_json::json!(5)],
        )
        .unwrap();
        add_datastate(
            &mut pool,
            &mut sim,
            "input2",
            &catalog,
            &structures,
            &[var("demo:demo:doubled")],
            &[serde_json::json!(5)],
        )
        .unwrap();

        // One stored value, two links
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.mirror_links().get(&0), Some(&2));
        check_integrity(&pool, &[&sim]).unwrap();
    }

    #[test]
    fn test_release_then_reclaim_empties_pool() {
        let structures = StructureRegistry::with_defaults();
        let catalog = demo_catalog(&structures);
        let mut pool = DataPool::new();
        let mut sim = Simulation::new("run");

        add_datastate(
            &mut pool,
            &mut sim,
            "input1",
            &catalog,
            &structures,
            &[var("demo:demo:rows"), var("demo:demo:doubled")],
            &[serde_json::json!(5), serde_json::json!(10)],
        )
        .unwrap();
        assert_eq!(pool.len(), 2);

        release_simulation(&mut pool, &sim).unwrap();
        let reclaimed = pool.reclaim();
        assert_eq!(reclaimed.len(), 2);
        assert!(pool.is_empty());
        check_integrity(&pool, &[]).unwrap();
    }
}
