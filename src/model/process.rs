//! Process records and the process table.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::fmt;

use super::id::{BlockId, PageId, ProcessId, ResourceId};

/// Process lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Created but not yet placed in memory.
    New,
    /// Placed in memory and eligible for scheduling.
    Ready,
    /// Selected by the scheduler in the current tick.
    Running,
    /// Held by an I/O-block simulation.
    Blocked,
    /// Ran to completion; its memory has been released.
    Finished,
}

impl fmt::Display for ProcessState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let label = match self {
            ProcessState::New => "NEW",
            ProcessState::Ready => "READY",
            ProcessState::Running => "RUNNING",
            ProcessState::Blocked => "BLOCKED",
            ProcessState::Finished => "FINISHED",
        };
        f.write_str(label)
    }
}

/// A fixed-size slice of a process in the paging model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub(crate) id: PageId,
    pub(crate) resident: bool,
    pub(crate) on_disk: bool,
    pub(crate) block: Option<BlockId>,
}

impl Page {
    fn new(id: PageId) -> Self {
        Self {
            id,
            resident: false,
            on_disk: false,
            block: None,
        }
    }

    #[inline]
    pub fn id(&self) -> PageId {
        self.id
    }

    /// Mapped to a block right now.
    #[inline]
    pub fn is_resident(&self) -> bool {
        self.resident
    }

    /// Faulted at placement time and still waiting for a block.
    #[inline]
    pub fn is_on_disk(&self) -> bool {
        self.on_disk
    }

    #[inline]
    pub fn block(&self) -> Option<BlockId> {
        self.block
    }

    pub(crate) fn map_to(
        &mut self,
        block: BlockId,
    ) {
        self.block = Some(block);
        self.resident = true;
        self.on_disk = false;
    }

    pub(crate) fn swap_out(&mut self) {
        self.block = None;
        self.resident = false;
        self.on_disk = true;
    }

    pub(crate) fn release(&mut self) {
        self.block = None;
        self.resident = false;
        self.on_disk = false;
    }
}

/// Number of pages needed to hold `size_kb` with pages of `page_size_kb`.
pub fn page_count(
    size_kb: u32,
    page_size_kb: u32,
) -> usize {
    if page_size_kb == 0 {
        return 0;
    }
    size_kb.div_ceil(page_size_kb) as usize
}

/// A simulated process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Process {
    pub(crate) id: ProcessId,
    pub(crate) name: String,
    pub(crate) size_kb: u32,
    pub(crate) priority: i32,
    pub(crate) remaining_time: u32,
    pub(crate) blocked: bool,
    pub(crate) running: bool,
    pub(crate) state: ProcessState,
    pub(crate) resources_held: IndexSet<ResourceId>,
    pub(crate) waiting_for: Option<ResourceId>,
    pub(crate) pages: Vec<Page>,
    /// In-flight I/O-block simulations holding this process.
    #[serde(skip)]
    pub(crate) io_waits: u32,
    /// State to return to when the last I/O wait ends.
    #[serde(skip)]
    pub(crate) resume_state: ProcessState,
}

impl Process {
    pub(crate) fn from_spec(
        id: ProcessId,
        spec: ProcessSpec,
    ) -> Self {
        Self {
            id,
            name: spec.name,
            size_kb: spec.size_kb,
            priority: spec.priority,
            remaining_time: spec.remaining_time,
            blocked: false,
            running: false,
            state: ProcessState::New,
            resources_held: IndexSet::new(),
            waiting_for: None,
            pages: Vec::new(),
            io_waits: 0,
            resume_state: ProcessState::New,
        }
    }

    #[inline]
    pub fn id(&self) -> ProcessId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn size_kb(&self) -> u32 {
        self.size_kb
    }

    #[inline]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    #[inline]
    pub fn remaining_time(&self) -> u32 {
        self.remaining_time
    }

    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Resources currently held, in acquisition order.
    #[inline]
    pub fn resources_held(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.resources_held.iter().copied()
    }

    #[inline]
    pub fn holds(
        &self,
        resource: ResourceId,
    ) -> bool {
        self.resources_held.contains(&resource)
    }

    #[inline]
    pub fn waiting_for(&self) -> Option<ResourceId> {
        self.waiting_for
    }

    #[inline]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Pages that faulted and were never given a block.
    pub fn pages_on_disk(&self) -> usize {
        self.pages.iter().filter(|p| p.on_disk).count()
    }

    pub fn resident_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.resident).count()
    }

    /// KB actually demanded by page `page` (the last page may be partial).
    pub fn page_demand_kb(
        &self,
        page: PageId,
        page_size_kb: u32,
    ) -> u32 {
        let offset = u32::try_from(page.0)
            .unwrap_or(u32::MAX)
            .saturating_mul(page_size_kb);
        self.size_kb.saturating_sub(offset).min(page_size_kb)
    }

    /// Not yet placed in memory, including while an I/O wait holds it.
    pub fn awaits_placement(&self) -> bool {
        match self.state {
            ProcessState::New => true,
            ProcessState::Blocked => self.resume_state == ProcessState::New,
            _ => false,
        }
    }

    /// Eligible for selection by the scheduler this tick.
    pub fn is_schedulable(&self) -> bool {
        matches!(self.state, ProcessState::Ready | ProcessState::Running)
            && !self.blocked
            && self.remaining_time > 0
    }

    /// Enter an I/O wait. Nested waits keep the process blocked until the last ends.
    pub(crate) fn block_for_io(&mut self) {
        if self.io_waits == 0 {
            self.resume_state = match self.state {
                ProcessState::Running => ProcessState::Ready,
                other => other,
            };
        }
        self.io_waits += 1;
        self.blocked = true;
        if self.state != ProcessState::Finished {
            self.state = ProcessState::Blocked;
        }
    }

    /// Leave an I/O wait. Returns true when the process is no longer blocked.
    pub(crate) fn unblock_from_io(&mut self) -> bool {
        self.io_waits = self.io_waits.saturating_sub(1);
        if self.io_waits > 0 {
            return false;
        }
        self.blocked = false;
        if self.state == ProcessState::Blocked {
            self.state = self.resume_state;
        }
        true
    }

    pub(crate) fn split_into_pages(
        &mut self,
        page_size_kb: u32,
    ) {
        self.pages = (0..page_count(self.size_kb, page_size_kb))
            .map(|i| Page::new(PageId(i)))
            .collect();
    }
}

impl fmt::Display for Process {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{} ({}KB)", self.name, self.size_kb)?;
        if self.blocked {
            write!(f, " [BLOCKED]")?;
        }
        Ok(())
    }
}

/// Process builder used by the simulation's creation operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSpec {
    pub(crate) name: String,
    pub(crate) size_kb: u32,
    pub(crate) priority: i32,
    pub(crate) remaining_time: u32,
}

impl ProcessSpec {
    /// Create a spec with only a name; size, priority and run time default to 0.
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the requested memory in KB.
    #[inline]
    pub fn size(
        mut self,
        size_kb: u32,
    ) -> Self {
        self.size_kb = size_kb;
        self
    }

    /// Set the scheduling priority (higher runs first).
    #[inline]
    pub fn priority(
        mut self,
        priority: i32,
    ) -> Self {
        self.priority = priority;
        self
    }

    /// Set the number of ticks needed to finish.
    #[inline]
    pub fn remaining_time(
        mut self,
        ticks: u32,
    ) -> Self {
        self.remaining_time = ticks;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Creation-ordered process arena keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ProcessTable {
    entries: IndexMap<String, Process>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new process. Returns `None` if the name is taken.
    pub(crate) fn insert(
        &mut self,
        spec: ProcessSpec,
    ) -> Option<ProcessId> {
        if self.entries.contains_key(&spec.name) {
            return None;
        }
        let id = ProcessId(self.entries.len());
        let name = spec.name.clone();
        self.entries.insert(name, Process::from_spec(id, spec));
        Some(id)
    }

    #[inline]
    pub fn get(
        &self,
        id: ProcessId,
    ) -> Option<&Process> {
        self.entries.get_index(id.0).map(|(_, p)| p)
    }

    #[inline]
    pub(crate) fn get_mut(
        &mut self,
        id: ProcessId,
    ) -> Option<&mut Process> {
        self.entries.get_index_mut(id.0).map(|(_, p)| p)
    }

    #[inline]
    pub fn id_of(
        &self,
        name: &str,
    ) -> Option<ProcessId> {
        self.entries.get_index_of(name).map(ProcessId)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Processes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Process> {
        self.entries.values_mut()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
