//! Paging over the block pool
//!
//! A process is split into `ceil(size / page_size)` pages. Each page goes into
//! the first free block that can hold a page; a page with no free block is
//! marked on disk and counts as one page fault. Placement never fails.

use tracing::{debug, trace};

use super::MemoryPool;
use crate::model::{BlockId, Occupant, Process, ProcessState, ProcessTable};

/// Page placement with a run-wide fault counter.
#[derive(Debug, Clone)]
pub struct Pager {
    page_size_kb: u32,
    faults: usize,
    retry_on_release: bool,
}

impl Pager {
    pub fn new(page_size_kb: u32) -> Self {
        Self {
            page_size_kb,
            faults: 0,
            retry_on_release: false,
        }
    }

    /// Re-place on-disk pages whenever blocks are released.
    pub fn with_retry_on_release(
        mut self,
        retry: bool,
    ) -> Self {
        self.retry_on_release = retry;
        self
    }

    #[inline]
    pub fn page_size_kb(&self) -> u32 {
        self.page_size_kb
    }

    /// Faults recorded since construction or the last reset.
    #[inline]
    pub fn fault_count(&self) -> usize {
        self.faults
    }

    #[inline]
    pub fn retries_on_release(&self) -> bool {
        self.retry_on_release
    }

    /// Place every page of `process`, in page order.
    ///
    /// Returns the number of faults this call produced.
    pub fn place(
        &mut self,
        pool: &mut MemoryPool,
        process: &mut Process,
    ) -> usize {
        if process.pages.is_empty() {
            process.split_into_pages(self.page_size_kb);
        }

        let mut faults = 0;
        for page in process.pages.iter_mut().filter(|p| !p.resident) {
            match pool.first_fit(self.page_size_kb) {
                Some(block) => {
                    pool.bind(
                        block,
                        Occupant {
                            process: process.id,
                            page: Some(page.id),
                        },
                    );
                    page.map_to(block);
                    trace!(process = %process.id, page = %page.id, %block, "page resident");
                }
                None => {
                    page.swap_out();
                    faults += 1;
                }
            }
        }

        self.faults += faults;
        debug!(
            process = %process.name,
            pages = process.pages.len(),
            faults,
            "pages placed"
        );
        faults
    }

    /// Free every block held by `process` and mark all its pages non-resident.
    pub fn release(
        &mut self,
        pool: &mut MemoryPool,
        process: &mut Process,
    ) -> Vec<BlockId> {
        let freed = pool.release_process(process.id);
        for page in &mut process.pages {
            page.release();
        }
        freed
    }

    /// Give freed blocks to on-disk pages, in process-creation then page order.
    ///
    /// Does nothing unless retry-on-release is enabled. A successful retry is
    /// not a new fault. Returns how many pages became resident.
    pub fn retry_on_disk(
        &mut self,
        pool: &mut MemoryPool,
        processes: &mut ProcessTable,
    ) -> usize {
        if !self.retry_on_release {
            return 0;
        }

        let mut placed = 0;
        for process in processes
            .iter_mut()
            .filter(|p| p.state != ProcessState::Finished)
        {
            let id = process.id;
            for page in process.pages.iter_mut().filter(|p| p.on_disk) {
                let Some(block) = pool.first_fit(self.page_size_kb) else {
                    return placed;
                };
                pool.bind(
                    block,
                    Occupant {
                        process: id,
                        page: Some(page.id),
                    },
                );
                page.map_to(block);
                placed += 1;
            }
        }
        if placed > 0 {
            debug!(placed, "on-disk pages re-placed");
        }
        placed
    }

    pub fn reset(&mut self) {
        self.faults = 0;
    }
}
