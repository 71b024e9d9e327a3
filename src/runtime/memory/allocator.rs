//! Contiguous allocation strategies
//!
//! A process is placed into exactly one free block large enough to hold it.
//! Which block is chosen depends on the [`Strategy`]:
//!
//! - `FirstFit`: lowest-indexed eligible block
//! - `BestFit`: smallest eligible block, first wins ties
//! - `WorstFit`: largest eligible block, first wins ties
//! - `NextFit`: first eligible block scanning circularly from a persistent cursor
//!
//! Each strategy is a [`PlacementPolicy`]; [`Strategy`] is the closed set the
//! caller chooses from and dispatches to them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use super::MemoryPool;
use crate::model::{BlockId, MemoryBlock, Occupant, ProcessId};

/// Block selection policy
///
/// Implementations only choose; binding the block is done by [`BlockAllocator`].
pub trait PlacementPolicy {
    /// Pick the index of a free block with capacity for `size_kb`.
    ///
    /// # Arguments
    /// * `blocks` - The pool, in its fixed order
    /// * `size_kb` - Requested size
    /// * `cursor` - Next-fit start index (ignored by other policies)
    fn select(
        &self,
        blocks: &[MemoryBlock],
        size_kb: u32,
        cursor: usize,
    ) -> Option<usize>;
}

/// First eligible block in pool order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFit;

impl PlacementPolicy for FirstFit {
    fn select(
        &self,
        blocks: &[MemoryBlock],
        size_kb: u32,
        _cursor: usize,
    ) -> Option<usize> {
        blocks.iter().position(|b| b.fits(size_kb))
    }
}

/// Smallest eligible block.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestFit;

impl PlacementPolicy for BestFit {
    fn select(
        &self,
        blocks: &[MemoryBlock],
        size_kb: u32,
        _cursor: usize,
    ) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, block) in blocks.iter().enumerate() {
            if !block.fits(size_kb) {
                continue;
            }
            // strict comparison keeps the earliest block on ties
            if best.is_none_or(|b| block.size_kb() < blocks[b].size_kb()) {
                best = Some(i);
            }
        }
        best
    }
}

/// Largest eligible block.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorstFit;

impl PlacementPolicy for WorstFit {
    fn select(
        &self,
        blocks: &[MemoryBlock],
        size_kb: u32,
        _cursor: usize,
    ) -> Option<usize> {
        let mut worst: Option<usize> = None;
        for (i, block) in blocks.iter().enumerate() {
            if !block.fits(size_kb) {
                continue;
            }
            if worst.is_none_or(|w| block.size_kb() > blocks[w].size_kb()) {
                worst = Some(i);
            }
        }
        worst
    }
}

/// First eligible block scanning circularly from the cursor, wrapping once.
#[derive(Debug, Clone, Copy, Default)]
pub struct NextFit;

impl PlacementPolicy for NextFit {
    fn select(
        &self,
        blocks: &[MemoryBlock],
        size_kb: u32,
        cursor: usize,
    ) -> Option<usize> {
        let n = blocks.len();
        (0..n)
            .map(|i| (cursor + i) % n)
            .find(|&index| blocks[index].fits(size_kb))
    }
}

/// Contiguous allocation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    FirstFit,
    BestFit,
    WorstFit,
    NextFit,
}

impl Strategy {
    /// All strategies, in menu order.
    pub const ALL: [Strategy; 4] = [
        Strategy::FirstFit,
        Strategy::BestFit,
        Strategy::WorstFit,
        Strategy::NextFit,
    ];

    /// Canonical label.
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::FirstFit => "first-fit",
            Strategy::BestFit => "best-fit",
            Strategy::WorstFit => "worst-fit",
            Strategy::NextFit => "next-fit",
        }
    }

    fn policy(&self) -> &'static dyn PlacementPolicy {
        match self {
            Strategy::FirstFit => &FirstFit,
            Strategy::BestFit => &BestFit,
            Strategy::WorstFit => &WorstFit,
            Strategy::NextFit => &NextFit,
        }
    }
}

impl PlacementPolicy for Strategy {
    fn select(
        &self,
        blocks: &[MemoryBlock],
        size_kb: u32,
        cursor: usize,
    ) -> Option<usize> {
        self.policy().select(blocks, size_kb, cursor)
    }
}

impl fmt::Display for Strategy {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unknown strategy label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown allocation strategy `{0}` (expected first-fit, best-fit, worst-fit or next-fit)")]
pub struct StrategyParseError(pub String);

impl FromStr for Strategy {
    type Err = StrategyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        match normalized.as_str() {
            "first-fit" | "first" | "firstfit" => Ok(Strategy::FirstFit),
            "best-fit" | "best" | "bestfit" => Ok(Strategy::BestFit),
            "worst-fit" | "worst" | "worstfit" => Ok(Strategy::WorstFit),
            "next-fit" | "next" | "nextfit" => Ok(Strategy::NextFit),
            _ => Err(StrategyParseError(s.to_string())),
        }
    }
}

/// Whole-block allocator holding the persistent next-fit cursor.
#[derive(Debug, Clone, Default)]
pub struct BlockAllocator {
    cursor: usize,
}

impl BlockAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a block to `process` according to `strategy`.
    ///
    /// Returns `None` without touching the pool or the cursor when no free
    /// block of at least `size_kb` exists.
    pub fn allocate(
        &mut self,
        pool: &mut MemoryPool,
        process: ProcessId,
        size_kb: u32,
        strategy: Strategy,
    ) -> Option<BlockId> {
        let index = strategy.select(pool.blocks(), size_kb, self.cursor)?;
        let id = BlockId(index);
        pool.bind(
            id,
            Occupant {
                process,
                page: None,
            },
        );
        if strategy == Strategy::NextFit {
            self.cursor = (index + 1) % pool.len();
        }
        debug!(%process, block = %id, size_kb, %strategy, "block allocated");
        Some(id)
    }

    /// Where the next next-fit scan starts.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}
