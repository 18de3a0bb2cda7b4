//! Engine error kinds for TIDEFLOW.
//!
//! Four kinds cover the whole engine surface. Every constructor site is
//! expected to name the offending identifier(s) or slot index(es) so a
//! failure can be diagnosed without re-running.

use std::fmt;

/// Engine result type
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Unknown or duplicate identifier, missing required property,
    /// malformed variable key, or malformed id map
    Declaration {
        /// What was declared wrongly, naming the identifier involved
        reason: String,
    },

    /// Execution attempted before the interface's inputs resolve
    Dependency {
        /// Interface whose execution was attempted
        interface: String,
        /// Variables that failed to resolve
        missing: Vec<String>,
    },

    /// Link-count or identity mismatch found by the integrity auditor.
    /// Unrecoverable: callers abort rather than repair.
    Integrity {
        /// One line per offending slot or duplicated identity
        findings: Vec<String>,
    },

    /// Unknown plugin name, unknown structure kind, or variable never
    /// committed
    NotFound {
        /// Kind of entity that was looked up
        kind: String,
        /// The identifier that missed
        id: String,
    },
}

impl EngineError {
    /// Build a declaration error from anything displayable
    #[must_use]
    pub fn declaration(reason: impl Into<String>) -> Self {
        Self::Declaration {
            reason: reason.into(),
        }
    }

    /// Build a not-found error
    #[must_use]
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declaration { reason } => write!(f, "Declaration error: {}", reason),
            Self::Dependency { interface, missing } => {
                write!(
                    f,
                    "Dependency error: interface '{}' cannot load, unresolved: {}",
                    interface,
                    missing.join(", ")
                )
            }
            Self::Integrity { findings } => {
                write!(f, "Integrity error: {}", findings.join("; "))
            }
            Self::NotFound { kind, id } => write!(f, "{} not found: {}", kind, id),
        }
    }
}

impl std::error::Error for EngineError {}
