//! Shared simulation state
//!
//! [`SimState`] is everything the scheduler, the I/O-block workers and the
//! caller mutate. It lives behind one coarse mutex owned by the facade; every
//! method here assumes the caller holds that lock, so each method is one
//! atomic step with respect to the scheduler tick.

use rand::Rng;
use tracing::{debug, info, warn};

use super::deadlock::{self, GrantError, RequestOutcome};
use super::memory::{BlockAllocator, MemoryPool, Pager, Strategy};
use crate::model::{
    BlockId, Process, ProcessId, ProcessSpec, ProcessState, ProcessTable, ResourceId,
    ResourceTable,
};
use crate::simulation::error::{SimError, SimResult};
use crate::util::config::{MemoryMode, SimConfig};

/// Processes, resources, blocks and run-wide counters.
#[derive(Debug, Clone)]
pub struct SimState {
    pub(crate) processes: ProcessTable,
    pub(crate) resources: ResourceTable,
    pub(crate) pool: MemoryPool,
    pub(crate) allocator: BlockAllocator,
    pub(crate) pager: Pager,
    pub(crate) mode: MemoryMode,
    /// Bumped by every reset so stale I/O workers can tell their process is gone.
    pub(crate) generation: u64,
    pub(crate) ticks: u64,
}

/// An I/O wait in progress, returned by [`SimState::begin_io_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoTicket {
    pub process: ProcessId,
    pub(crate) generation: u64,
}

impl SimState {
    pub fn new(config: &SimConfig) -> Self {
        let pool = match config.memory.mode {
            MemoryMode::Contiguous => MemoryPool::new(&config.memory.block_sizes_kb),
            MemoryMode::Paged => {
                MemoryPool::uniform(config.paging.block_count, config.paging.page_size_kb)
            }
        };
        Self {
            processes: ProcessTable::new(),
            resources: ResourceTable::new(),
            pool,
            allocator: BlockAllocator::new(),
            pager: Pager::new(config.paging.page_size_kb)
                .with_retry_on_release(config.paging.retry_on_release),
            mode: config.memory.mode,
            generation: 0,
            ticks: 0,
        }
    }

    #[inline]
    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    #[inline]
    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    #[inline]
    pub fn pool(&self) -> &MemoryPool {
        &self.pool
    }

    #[inline]
    pub fn mode(&self) -> MemoryMode {
        self.mode
    }

    #[inline]
    pub fn fault_count(&self) -> usize {
        self.pager.fault_count()
    }

    #[inline]
    pub fn next_fit_cursor(&self) -> usize {
        self.allocator.cursor()
    }

    #[inline]
    pub fn page_size_kb(&self) -> u32 {
        self.pager.page_size_kb()
    }

    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn process(
        &self,
        id: ProcessId,
    ) -> SimResult<&Process> {
        self.processes.get(id).ok_or(SimError::UnknownProcess(id))
    }

    fn process_mut(
        &mut self,
        id: ProcessId,
    ) -> SimResult<&mut Process> {
        self.processes
            .get_mut(id)
            .ok_or(SimError::UnknownProcess(id))
    }

    pub fn create_process(
        &mut self,
        spec: ProcessSpec,
    ) -> SimResult<ProcessId> {
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(SimError::invalid("name", "process name must not be empty"));
        }
        let spec = ProcessSpec {
            name: name.to_string(),
            ..spec
        };
        let name = spec.name.clone();
        let id = self
            .processes
            .insert(spec)
            .ok_or_else(|| SimError::DuplicateName {
                kind: "process",
                name: name.clone(),
            })?;
        debug!(%id, %name, "process created");
        Ok(id)
    }

    pub fn create_resource(
        &mut self,
        name: &str,
    ) -> SimResult<ResourceId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SimError::invalid("name", "resource name must not be empty"));
        }
        let id = self
            .resources
            .insert(name.to_string())
            .ok_or_else(|| SimError::DuplicateName {
                kind: "resource",
                name: name.to_string(),
            })?;
        debug!(%id, %name, "resource created");
        Ok(id)
    }

    /// Check a process can be placed in memory under `mode`.
    fn check_placeable(
        &self,
        id: ProcessId,
        mode: MemoryMode,
    ) -> SimResult<()> {
        if self.mode != mode {
            return Err(SimError::precondition(format!(
                "simulation runs {:?} memory, not {:?}",
                self.mode, mode
            )));
        }
        let process = self.process(id)?;
        if process.size_kb == 0 {
            return Err(SimError::invalid("size", "process size must be positive"));
        }
        if !process.awaits_placement() {
            return Err(SimError::precondition(format!(
                "process `{}` is already in memory",
                process.name
            )));
        }
        Ok(())
    }

    /// Place `id` into one block chosen by `strategy`.
    pub fn allocate_memory(
        &mut self,
        id: ProcessId,
        strategy: Strategy,
    ) -> SimResult<BlockId> {
        self.check_placeable(id, MemoryMode::Contiguous)?;
        let size_kb = self.process(id)?.size_kb;

        match self.allocator.allocate(&mut self.pool, id, size_kb, strategy) {
            Some(block) => {
                let process = self.process_mut(id)?;
                if !process.blocked {
                    process.state = ProcessState::Ready;
                } else {
                    process.resume_state = ProcessState::Ready;
                }
                Ok(block)
            }
            None => {
                let process = self.process(id)?;
                warn!(process = %process.name, size_kb, %strategy, "no space available");
                Err(SimError::NoSpaceAvailable {
                    process: process.name.clone(),
                    size_kb,
                    strategy,
                })
            }
        }
    }

    /// Place every page of `id`. Returns the faults this produced.
    pub fn allocate_paged(
        &mut self,
        id: ProcessId,
    ) -> SimResult<usize> {
        self.check_placeable(id, MemoryMode::Paged)?;
        let process = self
            .processes
            .get_mut(id)
            .ok_or(SimError::UnknownProcess(id))?;
        let faults = self.pager.place(&mut self.pool, process);
        if !process.blocked {
            process.state = ProcessState::Ready;
        } else {
            process.resume_state = ProcessState::Ready;
        }
        Ok(faults)
    }

    /// Request `resource` for `process`, refusing requests that would deadlock.
    pub fn request_resource(
        &mut self,
        process: ProcessId,
        resource: ResourceId,
    ) -> SimResult<RequestOutcome> {
        let result = deadlock::request(&mut self.processes, &mut self.resources, process, resource)
            .map_err(|e| match e {
                GrantError::UnknownProcess(id) => SimError::UnknownProcess(id),
                GrantError::UnknownResource(id) => SimError::UnknownResource(id),
            })?;

        match result {
            Ok(outcome) => Ok(outcome),
            Err(refusal) => {
                let cycle = refusal
                    .cycle
                    .iter()
                    .filter_map(|&id| self.processes.get(id))
                    .map(|p| p.name.clone())
                    .collect();
                let process = self.process(process)?.name.clone();
                let resource = self
                    .resources
                    .get(resource)
                    .map(|r| r.name.clone())
                    .unwrap_or_default();
                warn!(%process, %resource, "request refused to prevent deadlock");
                Err(SimError::RefusedDeadlockPrevention {
                    process,
                    resource,
                    cycle,
                })
            }
        }
    }

    /// Free every block of `id` and mark its pages non-resident.
    ///
    /// With retry-on-release enabled, freed blocks go to on-disk pages.
    pub(crate) fn release_memory(
        &mut self,
        id: ProcessId,
    ) -> Vec<BlockId> {
        let Some(process) = self.processes.get_mut(id) else {
            return Vec::new();
        };
        let freed = self.pager.release(&mut self.pool, process);
        if !freed.is_empty() {
            self.pager.retry_on_disk(&mut self.pool, &mut self.processes);
        }
        freed
    }

    /// Block a uniformly random process for I/O.
    pub fn begin_io_block<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> SimResult<IoTicket> {
        if self.processes.is_empty() {
            return Err(SimError::precondition("no processes to block"));
        }
        let id = ProcessId(rng.random_range(0..self.processes.len()));
        let process = self.process_mut(id)?;
        process.block_for_io();
        info!(process = %process.name, "blocked on I/O");
        Ok(IoTicket {
            process: id,
            generation: self.generation,
        })
    }

    /// End an I/O wait. Returns false if the run was reset meanwhile or the
    /// process is still held by another wait.
    pub fn end_io_block(
        &mut self,
        ticket: IoTicket,
    ) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        let Some(process) = self.processes.get_mut(ticket.process) else {
            return false;
        };
        let unblocked = process.unblock_from_io();
        if unblocked {
            info!(process = %process.name, "I/O complete");
        }
        unblocked
    }

    /// Clear every process, resource and block; zero the cursor and fault counter.
    pub fn reset(&mut self) {
        self.processes.clear();
        self.resources.clear();
        self.pool.clear();
        self.allocator.reset();
        self.pager.reset();
        self.ticks = 0;
        self.generation += 1;
        info!("simulation reset");
    }
}
