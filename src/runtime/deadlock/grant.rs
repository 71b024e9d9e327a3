//! Two-phase resource grant
//!
//! A request is applied tentatively ([`Proposal::apply`]), checked against the
//! wait-for graph ([`Proposal::validate`]) and then either kept
//! ([`Proposal::commit`]) or rolled back ([`Proposal::undo`]). Undo restores
//! the resource holder and the requester's `resources_held` / `waiting_for`
//! to exactly their values before `apply`.
//!
//! Only grants are validated. A request for a held resource records the wait
//! unchecked and reports it as not granted, so a cross-wait can close a cycle;
//! every later grant is then refused while that cycle stands.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::graph::WaitForGraph;
use crate::model::{ProcessId, ProcessTable, ResourceId, ResourceTable};

/// Result of a request that was not refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum RequestOutcome {
    /// The resource now belongs to the requester.
    Granted,
    /// The requester already held the resource; nothing changed.
    AlreadyHeld,
    /// Another process holds the resource; the requester now waits for it.
    Waiting { holder: ProcessId },
}

/// Why a request could not be applied at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrantError {
    #[error("unknown process {0}")]
    UnknownProcess(ProcessId),
    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),
}

/// The tentative change a request makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    /// Resource was free and has been handed to the requester.
    Grant,
    /// Resource is held by `holder`; requester recorded as waiting.
    Wait { holder: ProcessId },
    /// Requester already holds it.
    Noop,
}

/// A request applied to the tables but not yet committed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a proposal must be committed or undone"]
pub struct Proposal {
    process: ProcessId,
    resource: ResourceId,
    change: Change,
    prev_waiting_for: Option<ResourceId>,
}

impl Proposal {
    /// Apply the request tentatively.
    pub fn apply(
        processes: &mut ProcessTable,
        resources: &mut ResourceTable,
        process: ProcessId,
        resource: ResourceId,
    ) -> Result<Self, GrantError> {
        let holder = resources
            .get(resource)
            .ok_or(GrantError::UnknownResource(resource))?
            .allocated_to;
        let requester = processes
            .get_mut(process)
            .ok_or(GrantError::UnknownProcess(process))?;
        let prev_waiting_for = requester.waiting_for;

        let change = match holder {
            Some(h) if h == process => Change::Noop,
            Some(h) => {
                requester.waiting_for = Some(resource);
                Change::Wait { holder: h }
            }
            None => {
                requester.resources_held.insert(resource);
                requester.waiting_for = None;
                if let Some(r) = resources.get_mut(resource) {
                    r.allocated_to = Some(process);
                }
                Change::Grant
            }
        };

        Ok(Self {
            process,
            resource,
            change,
            prev_waiting_for,
        })
    }

    /// Check a tentative grant for deadlock. `Err` carries the cycle.
    ///
    /// Waits and no-ops always pass.
    pub fn validate(
        &self,
        processes: &ProcessTable,
        resources: &ResourceTable,
    ) -> Result<(), Vec<ProcessId>> {
        if self.change != Change::Grant {
            return Ok(());
        }
        match WaitForGraph::build(processes, resources).find_cycle() {
            Some(cycle) => Err(cycle),
            None => Ok(()),
        }
    }

    /// Keep the change.
    pub fn commit(self) -> RequestOutcome {
        match self.change {
            Change::Grant => RequestOutcome::Granted,
            Change::Wait { holder } => RequestOutcome::Waiting { holder },
            Change::Noop => RequestOutcome::AlreadyHeld,
        }
    }

    /// Roll the change back to the pre-`apply` state.
    pub fn undo(
        self,
        processes: &mut ProcessTable,
        resources: &mut ResourceTable,
    ) {
        if self.change == Change::Grant {
            if let Some(r) = resources.get_mut(self.resource) {
                r.allocated_to = None;
            }
        }
        if let Some(p) = processes.get_mut(self.process) {
            if self.change == Change::Grant {
                p.resources_held.shift_remove(&self.resource);
            }
            p.waiting_for = self.prev_waiting_for;
        }
        debug!(process = %self.process, resource = %self.resource, "tentative grant rolled back");
    }

    #[inline]
    pub fn process(&self) -> ProcessId {
        self.process
    }

    #[inline]
    pub fn resource(&self) -> ResourceId {
        self.resource
    }
}

/// A grant refused because the wait-for graph has a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refusal {
    pub cycle: Vec<ProcessId>,
}

/// Apply, validate and commit or undo a request in one step.
pub fn request(
    processes: &mut ProcessTable,
    resources: &mut ResourceTable,
    process: ProcessId,
    resource: ResourceId,
) -> Result<Result<RequestOutcome, Refusal>, GrantError> {
    let proposal = Proposal::apply(processes, resources, process, resource)?;
    match proposal.validate(processes, resources) {
        Ok(()) => Ok(Ok(proposal.commit())),
        Err(cycle) => {
            proposal.undo(processes, resources);
            Ok(Err(Refusal { cycle }))
        }
    }
}
