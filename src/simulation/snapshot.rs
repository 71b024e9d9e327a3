//! Point-in-time copy of the simulation for rendering.

use serde::Serialize;
use std::fmt;

use crate::model::{MemoryBlock, Process, Resource};
use crate::runtime::state::SimState;
use crate::util::config::MemoryMode;

/// Everything a UI needs to redraw, captured in one critical section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub mode: MemoryMode,
    pub blocks: Vec<MemoryBlock>,
    pub processes: Vec<Process>,
    pub resources: Vec<Resource>,
    pub total_kb: u64,
    pub used_kb: u64,
    pub free_kb: u64,
    /// Unused capacity inside occupied blocks.
    pub fragmentation_kb: u64,
    pub fault_count: usize,
    pub next_fit_cursor: usize,
    pub page_size_kb: u32,
    pub ticks: u64,
}

impl Snapshot {
    /// Copy `state`. The caller holds the state lock.
    pub fn capture(state: &SimState) -> Self {
        let pool = state.pool();
        Self {
            mode: state.mode(),
            blocks: pool.blocks().to_vec(),
            processes: state.processes().iter().cloned().collect(),
            resources: state.resources().iter().cloned().collect(),
            total_kb: pool.total_kb(),
            used_kb: pool.used_kb(),
            free_kb: pool.free_kb(),
            fragmentation_kb: fragmentation(state),
            fault_count: state.fault_count(),
            next_fit_cursor: state.next_fit_cursor(),
            page_size_kb: state.page_size_kb(),
            ticks: state.ticks(),
        }
    }

    pub fn process(
        &self,
        name: &str,
    ) -> Option<&Process> {
        self.processes.iter().find(|p| p.name() == name)
    }

    pub fn resource(
        &self,
        name: &str,
    ) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name() == name)
    }

    pub fn free_blocks(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_free()).count()
    }
}

fn fragmentation(state: &SimState) -> u64 {
    let page_size = state.page_size_kb();
    state
        .pool()
        .blocks()
        .iter()
        .filter_map(|block| {
            let occupant = block.occupant()?;
            let process = state.processes().get(occupant.process)?;
            let demand = match occupant.page {
                Some(page) => process.page_demand_kb(page, page_size),
                None => process.size_kb(),
            };
            Some(u64::from(block.size_kb().saturating_sub(demand)))
        })
        .sum()
}

impl fmt::Display for Snapshot {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(
            f,
            "Memory: Total: {}KB | Used: {}KB | Free: {}KB | Fragmentation: {}KB",
            self.total_kb, self.used_kb, self.free_kb, self.fragmentation_kb
        )?;
        for block in &self.blocks {
            write!(f, "  Block {}: {}KB", block.id().index(), block.size_kb())?;
            if let Some(occupant) = block.occupant() {
                if let Some(process) = self.processes.get(occupant.process.index()) {
                    write!(f, "  {process}")?;
                }
                if let Some(page) = occupant.page {
                    write!(f, " page {}", page.index())?;
                }
            }
            writeln!(f)?;
        }
        if self.mode == MemoryMode::Paged {
            writeln!(f, "Page faults: {}", self.fault_count)?;
        }
        for process in &self.processes {
            write!(f, "  {process} {}", process.state())?;
            if self.mode == MemoryMode::Paged {
                write!(
                    f,
                    " priority={} remaining={}",
                    process.priority(),
                    process.remaining_time()
                )?;
            }
            writeln!(f)?;
        }
        for resource in &self.resources {
            match resource.allocated_to() {
                Some(holder) => {
                    let holder = self
                        .processes
                        .get(holder.index())
                        .map_or("?", |p| p.name());
                    writeln!(f, "  {resource} -> {holder}")?;
                }
                None => writeln!(f, "  {resource} (free)")?,
            }
        }
        Ok(())
    }
}
