//! The sequencer.
//!
//! Moves interfaces through Unscheduled → Scheduled → Completed within
//! one run context, and reverses completions by truncating the commit
//! log and requeueing the truncated entries at the front of the
//! scheduled queue.
//!
//! Eligibility is insertion order only: whether the next interface's
//! inputs actually resolve is a separate, explicit question answered by
//! the loader, never an implicit side effect of ordering here.

use crate::pipeline::{CompletionPolicy, RunContext};
use tideflow_core::EngineResult;
use tideflow_plugin::PluginRegistry;
use tracing::{debug, info};

/// Scheduling operations over run contexts, resolving interface names
/// through one plugin registry
pub struct Sequencer<'a> {
    registry: &'a PluginRegistry,
}

impl<'a> Sequencer<'a> {
    /// Create a sequencer over a registry
    #[must_use]
    pub fn new(registry: &'a PluginRegistry) -> Self {
        Self { registry }
    }

    /// Build an empty pipeline bound to one socket
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown socket
    pub fn create_new_pipeline(&self, socket_name: &str) -> EngineResult<RunContext> {
        self.registry.socket(socket_name)?;
        Ok(RunContext::new(socket_name, CompletionPolicy::HeadOnly))
    }

    /// Build an empty hub bound to one socket
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown socket
    pub fn create_new_hub(&self, socket_name: &str) -> EngineResult<RunContext> {
        self.registry.socket(socket_name)?;
        Ok(RunContext::new(socket_name, CompletionPolicy::Any))
    }

    /// Schedule an interface by display name; a no-op when the name is
    /// already scheduled or completed
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown interface name
    pub fn sequence(&self, ctx: &mut RunContext, name: &str) -> EngineResult<()> {
        if ctx.is_scheduled(name) || ctx.is_completed(name) {
            debug!(interface = name, "sequence is a no-op");
            return Ok(());
        }
        let socket = self.registry.socket(ctx.socket_name())?;
        let interface = socket.get_interface_object(name)?;
        ctx.insert_scheduled(name.to_string(), interface);
        info!(interface = name, "scheduled");
        Ok(())
    }

    /// Earliest-inserted scheduled name, or `None` when nothing is
    /// scheduled
    #[must_use]
    pub fn get_next_name<'c>(&self, ctx: &'c RunContext) -> Option<&'c str> {
        ctx.next_name()
    }

    /// Mark a scheduled interface completed, appending it to the commit
    /// log; a no-op when already completed
    ///
    /// # Errors
    ///
    /// Returns not-found when the name was never scheduled, or a
    /// dependency error when a pipeline is asked to complete past its
    /// head
    pub fn complete(&self, ctx: &mut RunContext, name: &str) -> EngineResult<()> {
        ctx.move_to_completed(name)?;
        info!(interface = name, "completed");
        Ok(())
    }

    /// Reverse exactly the most recent completion, returning its name;
    /// `None` when nothing has completed
    pub fn undo(&self, ctx: &mut RunContext) -> Option<String> {
        let (name, interface) = ctx.pop_completed()?;
        ctx.requeue_front(vec![(name.clone(), interface)]);
        info!(interface = %name, "undone");
        Some(name)
    }

    /// Reverse a named completion and everything committed strictly
    /// after it. The reversed entries return to the front of the
    /// scheduled queue in their original relative order; completions
    /// before the pivot are untouched.
    ///
    /// # Errors
    ///
    /// Returns not-found when the name was never completed
    pub fn rollback(&self, ctx: &mut RunContext, name: &str) -> EngineResult<()> {
        let tail = ctx.truncate_completed_from(name)?;
        let count = tail.len();
        ctx.requeue_front(tail);
        info!(interface = name, requeued = count, "rolled back");
        Ok(())
    }

    /// Re-instantiate every bound interface object from its factory.
    /// Identities change; scheduling bookkeeping does not.
    ///
    /// # Errors
    ///
    /// Returns not-found if a bound name no longer resolves in the
    /// socket
    pub fn refresh_interfaces(&self, ctx: &mut RunContext) -> EngineResult<()> {
        let socket = self.registry.socket(ctx.socket_name())?;
        ctx.replace_interfaces(|name| socket.get_interface_object(name))
    }

    /// The registry this sequencer resolves names through
    #[must_use]
    pub fn registry(&self) -> &PluginRegistry {
        self.registry
    }
}

impl std::fmt::Debug for Sequencer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer").finish_non_exhaustive()
    }
}
