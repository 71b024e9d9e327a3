//! Fixed-size memory blocks.

use serde::Serialize;

use super::id::{BlockId, PageId, ProcessId};

/// What currently sits in a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occupant {
    pub process: ProcessId,
    /// Set only in the paging model.
    pub page: Option<PageId>,
}

/// One unit of the memory pool. Its size never changes after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryBlock {
    pub(crate) id: BlockId,
    pub(crate) size_kb: u32,
    pub(crate) occupant: Option<Occupant>,
}

impl MemoryBlock {
    pub fn new(
        id: BlockId,
        size_kb: u32,
    ) -> Self {
        Self {
            id,
            size_kb,
            occupant: None,
        }
    }

    #[inline]
    pub fn id(&self) -> BlockId {
        self.id
    }

    #[inline]
    pub fn size_kb(&self) -> u32 {
        self.size_kb
    }

    #[inline]
    pub fn occupant(&self) -> Option<Occupant> {
        self.occupant
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.occupant.is_none()
    }

    /// Free and large enough for `size_kb`.
    #[inline]
    pub fn fits(
        &self,
        size_kb: u32,
    ) -> bool {
        self.is_free() && self.size_kb >= size_kb
    }

    pub(crate) fn occupy(
        &mut self,
        occupant: Occupant,
    ) {
        debug_assert!(self.is_free(), "block {} already occupied", self.id);
        self.occupant = Some(occupant);
    }

    pub(crate) fn clear(&mut self) {
        self.occupant = None;
    }
}
