//! Simulation errors
//!
//! Every error is recoverable and returned as a value. An operation that
//! fails leaves the shared state exactly as it was before the call.

use thiserror::Error;

use crate::model::{ProcessId, ResourceId};
use crate::runtime::memory::Strategy;
use crate::util::config::ConfigError;

/// Simulation error
#[derive(Debug, Error)]
pub enum SimError {
    /// Missing or malformed caller input
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// A process or resource with this name already exists in the run
    #[error("{kind} `{name}` already exists")]
    DuplicateName { kind: &'static str, name: String },

    /// Stale or foreign process handle
    #[error("unknown process {0}")]
    UnknownProcess(ProcessId),

    /// Stale or foreign resource handle
    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),

    /// No free block satisfies the request under the chosen strategy
    #[error("no free block of at least {size_kb}KB for `{process}` ({strategy})")]
    NoSpaceAvailable {
        process: String,
        size_kb: u32,
        strategy: Strategy,
    },

    /// Granting the request would create a wait-for cycle
    #[error("`{resource}` refused to `{process}` to prevent deadlock (cycle: {})", .cycle.join(" -> "))]
    RefusedDeadlockPrevention {
        process: String,
        resource: String,
        cycle: Vec<String>,
    },

    /// The operation does not apply to the current state
    #[error("precondition not met: {0}")]
    PreconditionNotMet(String),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A worker thread could not be started
    #[error("failed to spawn worker thread: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    pub(crate) fn invalid(
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        SimError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn precondition(reason: impl Into<String>) -> Self {
        SimError::PreconditionNotMet(reason.into())
    }

    /// The request was refused and fully rolled back.
    pub fn is_refusal(&self) -> bool {
        matches!(self, SimError::RefusedDeadlockPrevention { .. })
    }
}

/// Simulation result type
pub type SimResult<T> = Result<T, SimError>;
