//! Memory management over a fixed pool of blocks
//!
//! This module implements the two memory models of the simulator:
//! contiguous whole-block allocation (see [`allocator`]) and paging (see
//! [`pager`]). Both operate on a [`MemoryPool`], an ordered list of
//! fixed-size [`MemoryBlock`]s whose order and sizes never change for the
//! lifetime of a simulation run.
//!
//! # Model
//! - A block holds at most one occupant (a process, or one page of a process)
//! - Blocks are never split or merged
//! - Unused capacity inside an occupied block is internal fragmentation

mod allocator;
mod pager;

pub use allocator::{
    BestFit, BlockAllocator, FirstFit, NextFit, PlacementPolicy, Strategy, StrategyParseError,
    WorstFit,
};
pub use pager::Pager;

use crate::model::{BlockId, MemoryBlock, Occupant, ProcessId};

/// Ordered, fixed set of memory blocks.
#[derive(Debug, Clone)]
pub struct MemoryPool {
    blocks: Vec<MemoryBlock>,
}

impl MemoryPool {
    /// Create a pool from block sizes, in order.
    pub fn new(sizes_kb: &[u32]) -> Self {
        let blocks = sizes_kb
            .iter()
            .enumerate()
            .map(|(i, &size)| MemoryBlock::new(BlockId(i), size))
            .collect();
        Self { blocks }
    }

    /// Create a pool of `count` blocks of the same size.
    pub fn uniform(
        count: usize,
        size_kb: u32,
    ) -> Self {
        Self::new(&vec![size_kb; count])
    }

    #[inline]
    pub fn blocks(&self) -> &[MemoryBlock] {
        &self.blocks
    }

    #[inline]
    pub fn block(
        &self,
        id: BlockId,
    ) -> Option<&MemoryBlock> {
        self.blocks.get(id.0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total capacity; fixed for the run.
    pub fn total_kb(&self) -> u64 {
        self.blocks.iter().map(|b| u64::from(b.size_kb())).sum()
    }

    /// Capacity of occupied blocks, counted whole.
    pub fn used_kb(&self) -> u64 {
        self.blocks
            .iter()
            .filter(|b| !b.is_free())
            .map(|b| u64::from(b.size_kb()))
            .sum()
    }

    pub fn free_kb(&self) -> u64 {
        self.total_kb() - self.used_kb()
    }

    pub fn free_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_free()).count()
    }

    /// Blocks currently held by `process`.
    pub fn owned_by(
        &self,
        process: ProcessId,
    ) -> impl Iterator<Item = &MemoryBlock> {
        self.blocks
            .iter()
            .filter(move |b| b.occupant().is_some_and(|o| o.process == process))
    }

    /// First free block of at least `size_kb`, in pool order.
    pub(crate) fn first_fit(
        &self,
        size_kb: u32,
    ) -> Option<BlockId> {
        self.blocks.iter().find(|b| b.fits(size_kb)).map(|b| b.id())
    }

    pub(crate) fn bind(
        &mut self,
        id: BlockId,
        occupant: Occupant,
    ) {
        if let Some(block) = self.blocks.get_mut(id.0) {
            block.occupy(occupant);
        }
    }

    /// Free every block held by `process`. Returns the freed ids.
    pub(crate) fn release_process(
        &mut self,
        process: ProcessId,
    ) -> Vec<BlockId> {
        let mut freed = Vec::new();
        for block in &mut self.blocks {
            if block.occupant().is_some_and(|o| o.process == process) {
                block.clear();
                freed.push(block.id());
            }
        }
        freed
    }

    /// Free every block.
    pub(crate) fn clear(&mut self) {
        for block in &mut self.blocks {
            block.clear();
        }
    }
}
