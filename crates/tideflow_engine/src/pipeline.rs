//! Per-run scheduling bookkeeping.
//!
//! One `RunContext` tracks a single run: which interfaces are scheduled
//! (insertion order) and which have completed (commit order). Pipelines
//! and hubs share the bookkeeping and differ only in completion policy.

use indexmap::IndexMap;
use tideflow_core::{EngineError, EngineResult, PipelineId};
use tideflow_plugin::Interface;

/// Which scheduled entries may complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPolicy {
    /// Only the earliest-inserted scheduled entry (pipeline)
    HeadOnly,
    /// Any scheduled entry (hub)
    Any,
}

/// Bookkeeping for one run: scheduled queue plus completed log
pub struct RunContext {
    id: PipelineId,
    socket_name: String,
    policy: CompletionPolicy,
    scheduled: IndexMap<String, Box<dyn Interface>>,
    completed: IndexMap<String, Box<dyn Interface>>,
}

impl RunContext {
    /// Create an empty context bound to one socket
    #[must_use]
    pub fn new(socket_name: impl Into<String>, policy: CompletionPolicy) -> Self {
        Self {
            id: PipelineId::new(),
            socket_name: socket_name.into(),
            policy,
            scheduled: IndexMap::new(),
            completed: IndexMap::new(),
        }
    }

    /// Run identity
    #[must_use]
    pub fn id(&self) -> PipelineId {
        self.id
    }

    /// Capability family this run draws interfaces from
    #[must_use]
    pub fn socket_name(&self) -> &str {
        &self.socket_name
    }

    /// Completion policy
    #[must_use]
    pub fn policy(&self) -> CompletionPolicy {
        self.policy
    }

    /// Earliest-inserted scheduled name, if any
    #[must_use]
    pub fn next_name(&self) -> Option<&str> {
        self.scheduled.keys().next().map(String::as_str)
    }

    /// Scheduled names in insertion order
    #[must_use]
    pub fn scheduled_names(&self) -> Vec<&str> {
        self.scheduled.keys().map(String::as_str).collect()
    }

    /// Completed names in commit order
    #[must_use]
    pub fn completed_names(&self) -> Vec<&str> {
        self.completed.keys().map(String::as_str).collect()
    }

    /// Check whether a name is scheduled
    #[must_use]
    pub fn is_scheduled(&self, name: &str) -> bool {
        self.scheduled.contains_key(name)
    }

    /// Check whether a name has completed
    #[must_use]
    pub fn is_completed(&self, name: &str) -> bool {
        self.completed.contains_key(name)
    }

    /// Mutable access to a scheduled interface, for execution
    #[must_use]
    pub fn scheduled_mut(&mut self, name: &str) -> Option<&mut Box<dyn Interface>> {
        self.scheduled.get_mut(name)
    }

    /// Shared access to a scheduled interface
    #[must_use]
    pub fn scheduled_get(&self, name: &str) -> Option<&dyn Interface> {
        self.scheduled.get(name).map(Box::as_ref)
    }

    pub(crate) fn insert_scheduled(&mut self, name: String, interface: Box<dyn Interface>) {
        self.scheduled.insert(name, interface);
    }

    pub(crate) fn move_to_completed(&mut self, name: &str) -> EngineResult<()> {
        if self.completed.contains_key(name) {
            return Ok(());
        }
        if self.policy == CompletionPolicy::HeadOnly {
            if let Some(head) = self.next_name() {
                if head != name {
                    return Err(EngineError::Dependency {
                        interface: name.to_string(),
                        missing: vec![format!("pipeline head '{}' must complete first", head)],
                    });
                }
            }
        }
        let interface = self
            .scheduled
            .shift_remove(name)
            .ok_or_else(|| EngineError::not_found("Scheduled interface", name))?;
        self.completed.insert(name.to_string(), interface);
        Ok(())
    }

    /// Remove the most recent completion, if any
    pub(crate) fn pop_completed(&mut self) -> Option<(String, Box<dyn Interface>)> {
        self.completed.pop()
    }

    /// Split the completed log at a name, returning the tail from that
    /// name onward in commit order
    pub(crate) fn truncate_completed_from(
        &mut self,
        name: &str,
    ) -> EngineResult<Vec<(String, Box<dyn Interface>)>> {
        let index = self
            .completed
            .get_index_of(name)
            .ok_or_else(|| EngineError::not_found("Completed interface", name))?;
        let tail = self.completed.split_off(index);
        Ok(tail.into_iter().collect())
    }

    /// Requeue entries at the front of the scheduled queue, preserving
    /// their relative order
    pub(crate) fn requeue_front(&mut self, entries: Vec<(String, Box<dyn Interface>)>) {
        if entries.is_empty() {
            return;
        }
        let mut queue: IndexMap<String, Box<dyn Interface>> = entries.into_iter().collect();
        queue.extend(std::mem::take(&mut self.scheduled));
        self.scheduled = queue;
    }

    /// Replace every bound interface object using the given factory
    /// lookup, leaving the bookkeeping untouched
    pub(crate) fn replace_interfaces<F>(&mut self, mut instantiate: F) -> EngineResult<()>
    where
        F: FnMut(&str) -> EngineResult<Box<dyn Interface>>,
    {
        for (name, slot) in &mut self.scheduled {
            *slot = instantiate(name)?;
        }
        for (name, slot) in &mut self.completed {
            *slot = instantiate(name)?;
        }
        Ok(())
    }
}
